//! HTTP clients for the public APIs under test

pub mod catalog;
pub mod posts;

pub use catalog::{CatalogClient, Creature, CreatureKey};
pub use posts::{NewPost, Post, PostsClient};

use reqwest::StatusCode;
use std::time::Duration;

use crate::error::{E2eError, E2eResult};

const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// A decoded response body with the time the exchange took
#[derive(Debug, Clone)]
pub struct Timed<T> {
    pub status: StatusCode,
    pub elapsed: Duration,
    pub body: T,
}

impl<T> Timed<T> {
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

pub(crate) fn http_client() -> E2eResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(CLIENT_TIMEOUT)
        .user_agent(concat!("dexcheck/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(E2eError::from)
}

/// Non-2xx is a network failure; an unexpected 2xx is an assertion failure
pub fn expect_status(url: &str, actual: StatusCode, expected: StatusCode) -> E2eResult<()> {
    if !actual.is_success() {
        return Err(E2eError::Network(format!("{} returned {}", url, actual)));
    }
    crate::expect_that!(
        actual == expected,
        "{} returned {}, expected {}",
        url,
        actual,
        expected
    );
    Ok(())
}
