//! Suite configuration
//!
//! Two layers: [`Config`] is resolved from environment variables (after
//! loading `.env`) and carries the per-environment secret; [`Settings`] is the
//! optional YAML file describing runner, browser, data and endpoint knobs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::harness::DataPolicy;

/// Environment selector variable
pub const TEST_ENV_VAR: &str = "TEST_ENV";

/// Optional browser base URL for relative navigations
pub const BASE_URL_VAR: &str = "BASE_URL";

/// Set by CI systems; switches runner defaults
pub const CI_VAR: &str = "CI";

/// Target environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Qa,
    Cert,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Qa => "qa",
            Environment::Cert => "cert",
        }
    }

    /// Name of the variable holding this environment's secret
    pub fn secret_var(&self) -> &'static str {
        match self {
            Environment::Qa => "SECRET_KEY_QA",
            Environment::Cert => "SECRET_KEY_CERT",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = E2eError;

    fn from_str(s: &str) -> E2eResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qa" => Ok(Environment::Qa),
            "cert" => Ok(Environment::Cert),
            _ => Err(E2eError::UnknownEnvironment {
                var: TEST_ENV_VAR.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Resolved process configuration
#[derive(Clone)]
pub struct Config {
    pub environment: Environment,
    secret_key: String,
    pub base_url: Option<String>,
}

impl Config {
    /// Load `.env` if present, then resolve from the process environment
    pub fn resolve() -> E2eResult<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => debug!("Ignoring unreadable .env: {}", e),
        }
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Resolve from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> E2eResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup(TEST_ENV_VAR) {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => Environment::default(),
        };

        let var = environment.secret_var();
        let secret_key = lookup(var)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| E2eError::MissingSecret { var: var.to_string() })?;

        let base_url = lookup(BASE_URL_VAR).filter(|s| !s.trim().is_empty());

        info!("Resolved configuration for environment '{}'", environment);

        Ok(Self {
            environment,
            secret_key,
            base_url,
        })
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("environment", &self.environment)
            .field("secret_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Whether the process runs under CI
pub fn running_in_ci() -> bool {
    std::env::var_os(CI_VAR).map(|v| !v.is_empty()).unwrap_or(false)
}

/// Suite settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub runner: RunnerSettings,
    pub browser: BrowserSettings,
    pub data: DataSettings,
    pub endpoints: Endpoints,
    pub limits: Limits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Per-attempt timeout
    pub timeout_ms: u64,

    /// Retry budget; `None` picks the CI-dependent default
    pub retries: Option<u32>,

    /// Concurrent cases; `None` picks the CI-dependent default
    pub workers: Option<usize>,

    /// Directory for results.json
    pub output_dir: PathBuf,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            retries: None,
            workers: None,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub browser: String,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub navigation_timeout_ms: u64,
    pub action_timeout_ms: u64,

    /// node_modules directory that provides the `playwright` package
    pub node_modules: PathBuf,

    /// Save a full-page screenshot of every article here
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            browser: "chromium".to_string(),
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            navigation_timeout_ms: 30_000,
            action_timeout_ms: 15_000,
            node_modules: PathBuf::from("node_modules"),
            screenshot_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub fixture_path: PathBuf,
    pub policy: DataPolicy,
    pub images_dir: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            fixture_path: PathBuf::from("data/creatures.xlsx"),
            policy: DataPolicy::default(),
            images_dir: PathBuf::from("images"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub catalog_url: String,
    pub posts_url: String,
    pub wiki_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            catalog_url: "https://pokeapi.co/api/v2".to_string(),
            posts_url: "https://jsonplaceholder.typicode.com".to_string(),
            wiki_url: "https://en.wikipedia.org".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub response_budget_ms: u64,
    pub max_image_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            response_budget_ms: 10_000,
            max_image_bytes: 500_000,
        }
    }
}

impl Settings {
    /// Parse settings from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Load settings from a file, falling back to defaults if it is absent
    pub fn load_or_default(path: &Path) -> E2eResult<Self> {
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
