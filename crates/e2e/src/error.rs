//! Error types for the E2E suite

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("{var} is not defined in environment variables. Please check your .env file.")]
    MissingSecret { var: String },

    #[error("{var} has unrecognized value '{value}' (expected qa or cert)")]
    UnknownEnvironment { var: String, value: String },

    #[error("Failed to read fixture file {}: {reason}", path.display())]
    FixtureLoad { path: PathBuf, reason: String },

    #[error("Failed to access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install chromium")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout after {0} ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Whether the error stops the run before any case starts
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            E2eError::MissingSecret { .. }
                | E2eError::UnknownEnvironment { .. }
                | E2eError::FixtureLoad { .. }
                | E2eError::Yaml(_)
        )
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Fail the enclosing function with [`E2eError::AssertionFailed`] unless the
/// condition holds.
#[macro_export]
macro_rules! expect_that {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::E2eError::AssertionFailed(format!($($arg)+)));
        }
    };
}
