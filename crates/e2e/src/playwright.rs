//! Playwright browser automation
//!
//! Every page interaction is compiled into a standalone Node script that
//! launches the browser, runs the steps in order and prints one JSON line
//! with the captured values. The Rust side never holds a live browser.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::BrowserSettings;
use crate::error::{E2eError, E2eResult};

/// Playwright browser handle
#[derive(Debug, Clone)]
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "firefox" => Browser::Firefox,
            "webkit" => Browser::Webkit,
            _ => Browser::Chromium,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

/// What a capture step reads from the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTarget {
    /// `document.title`
    Title,
    /// `textContent` of the first match
    Text(String),
    /// Rendered `innerText` of the first match
    InnerText(String),
    /// Attribute of the first match
    Attribute { selector: String, name: String },
}

/// A single step in a browser session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStep {
    /// Navigate to a URL (relative URLs are joined to the base URL)
    Navigate { url: String },

    /// Wait for the `load` event
    WaitForLoad,

    /// Wait for the first match of a selector to reach a state
    WaitFor {
        selector: String,
        state: WaitState,
        timeout_ms: u64,
        /// Swallow the timeout instead of failing the session
        optional: bool,
    },

    /// Store a page value under `key`; absent elements store `null`
    Capture { key: String, target: CaptureTarget },

    /// Save a screenshot
    Screenshot { path: PathBuf, full_page: bool },
}

impl PageStep {
    /// Short label used in logs and generated comments
    pub fn name(&self) -> String {
        match self {
            PageStep::Navigate { url } => format!("navigate:{}", url),
            PageStep::WaitForLoad => "wait:load".to_string(),
            PageStep::WaitFor { selector, .. } => format!("wait:{}", selector),
            PageStep::Capture { key, .. } => format!("capture:{}", key),
            PageStep::Screenshot { path, .. } => format!("screenshot:{}", path.display()),
        }
    }
}

/// Values printed by a finished script
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptOutput {
    pub success: bool,
    #[serde(default)]
    pub captures: HashMap<String, Option<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub async fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed().await?;
        Ok(Self { config })
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed() -> E2eResult<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Handle that skips the installation check
    #[cfg(test)]
    pub(crate) fn unchecked(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    /// Resolve a navigation target against the base URL
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        match &self.config.base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            ),
            None => url.to_string(),
        }
    }

    /// Build the Playwright script for a set of steps
    pub fn build_script(&self, steps: &[PageStep]) -> String {
        let mut script = String::new();

        // Header
        script.push_str(&format!(r#"
const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  context.setDefaultNavigationTimeout({nav_timeout});
  context.setDefaultTimeout({action_timeout});
  const page = await context.newPage();
  const captures = {{}};

  try {{
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = self.config.viewport_width,
            height = self.config.viewport_height,
            nav_timeout = self.config.navigation_timeout_ms,
            action_timeout = self.config.action_timeout_ms,
        ));

        for (i, step) in steps.iter().enumerate() {
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, step.name()));
            script.push_str(&self.step_to_js(step));
            script.push('\n');
        }

        // Footer
        script.push_str(r#"
    console.log(JSON.stringify({ success: true, captures }));
  } catch (error) {
    console.error(JSON.stringify({ success: false, error: error.message, captures }));
    process.exitCode = 1;
  } finally {
    await browser.close();
  }
})();
"#);

        script
    }

    /// Convert a step to JavaScript code
    fn step_to_js(&self, step: &PageStep) -> String {
        match step {
            PageStep::Navigate { url } => {
                format!(
                    "    await page.goto({}, {{ waitUntil: 'domcontentloaded' }});",
                    js_str(&self.resolve_url(url))
                )
            }
            PageStep::WaitForLoad => "    await page.waitForLoadState('load');".to_string(),
            PageStep::WaitFor { selector, state, timeout_ms, optional } => {
                let wait = format!(
                    "await page.locator({}).first().waitFor({{ state: '{}', timeout: {} }});",
                    js_str(selector),
                    state.as_str(),
                    timeout_ms
                );
                if *optional {
                    format!("    try {{ {} }} catch (e) {{}}", wait)
                } else {
                    format!("    {}", wait)
                }
            }
            PageStep::Capture { key, target } => {
                let key = js_str(key);
                match target {
                    CaptureTarget::Title => {
                        format!("    captures[{}] = await page.title();", key)
                    }
                    CaptureTarget::Text(selector) => {
                        capture_first(&key, selector, "loc.textContent()")
                    }
                    CaptureTarget::InnerText(selector) => {
                        capture_first(&key, selector, "loc.innerText()")
                    }
                    CaptureTarget::Attribute { selector, name } => capture_first(
                        &key,
                        selector,
                        &format!("loc.getAttribute({})", js_str(name)),
                    ),
                }
            }
            PageStep::Screenshot { path, full_page } => {
                format!(
                    "    await page.screenshot({{ path: {}, fullPage: {} }});",
                    js_str(&path.to_string_lossy()),
                    full_page
                )
            }
        }
    }

    /// Build and run a script for the steps, returning its captures
    pub async fn run_steps(&self, steps: &[PageStep]) -> E2eResult<ScriptOutput> {
        let script = self.build_script(steps);
        self.run_script(&script).await
    }

    /// Execute the full script via node
    pub async fn run_script(&self, script: &str) -> E2eResult<ScriptOutput> {
        // Write script to temp file
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("session.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let node_path = std::fs::canonicalize(&self.config.node_modules)
            .unwrap_or_else(|_| self.config.node_modules.clone());

        let output = Command::new("node")
            .arg(&script_path)
            .current_dir(temp_dir.path())
            .env("NODE_PATH", node_path)
            .kill_on_drop(true)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let reason = parse_output(&stderr)
                .and_then(|o| o.error)
                .unwrap_or_else(|| format!("Script failed:\nstdout: {}\nstderr: {}", stdout, stderr));
            return Err(E2eError::Playwright(reason));
        }

        match parse_output(&stdout) {
            Some(out) if out.success => Ok(out),
            Some(out) => Err(E2eError::Playwright(
                out.error.unwrap_or_else(|| "script reported failure".to_string()),
            )),
            None => {
                warn!("Playwright script produced no result line");
                Err(E2eError::Playwright(format!("No result in output: {}", stdout)))
            }
        }
    }
}

fn capture_first(key: &str, selector: &str, read: &str) -> String {
    format!(
        "    {{ const loc = page.locator({}).first(); captures[{}] = (await loc.count()) > 0 ? await {} : null; }}",
        js_str(selector),
        key,
        read
    )
}

/// Quote a string as a JavaScript literal
fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Find the last line of output that parses as a script result
fn parse_output(output: &str) -> Option<ScriptOutput> {
    output
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str(line).ok())
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: Option<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,
    pub navigation_timeout_ms: u64,
    pub action_timeout_ms: u64,
    pub node_modules: PathBuf,
    pub screenshot_dir: Option<PathBuf>,
}

impl PlaywrightConfig {
    pub fn from_settings(settings: &BrowserSettings, base_url: Option<String>) -> Self {
        Self {
            base_url,
            viewport_width: settings.viewport_width,
            viewport_height: settings.viewport_height,
            browser: Browser::from_name(&settings.browser),
            headless: settings.headless,
            navigation_timeout_ms: settings.navigation_timeout_ms,
            action_timeout_ms: settings.action_timeout_ms,
            node_modules: settings.node_modules.clone(),
            screenshot_dir: settings.screenshot_dir.clone(),
        }
    }
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self::from_settings(&BrowserSettings::default(), None)
    }
}
