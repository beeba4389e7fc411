//! Dexcheck E2E Test Framework
//!
//! Data-driven end-to-end checks for a public creature catalog:
//! - Reads the creature list (id, name) from a spreadsheet fixture
//! - Validates catalog API lookups and post-store writes over HTTP
//! - Drives Playwright via generated scripts to check wiki articles
//! - Runs every case through a bounded, retrying runner with a JSON report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    dexcheck (binary)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config::resolve()       TEST_ENV + <ENV>_SECRET_KEY (.env) │
//! │  Settings (YAML)         runner, browser, data, endpoints   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Suite                                                       │
//! │    ├── before_each: EncryptedKeyHook                        │
//! │    ├── fixtures: TestLogger, TestData, EncryptedKey         │
//! │    └── specs::register_all(records)                         │
//! │          ├── creature_api  -> api::CatalogClient            │
//! │          ├── posts_api     -> api::PostsClient              │
//! │          ├── wiki          -> pages::WikipediaPage          │
//! │          └── fixture_data  -> harness::TestData             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                  │
//! │    ├── run(suite) -> TestSuiteResult   (workers, retries)   │
//! │    └── write_results() -> results.json                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod digest;
pub mod error;
pub mod files;
pub mod fixture;
pub mod harness;
pub mod logger;
pub mod pages;
pub mod playwright;
pub mod runner;
pub mod specs;

pub use config::{Config, Environment, Settings};
pub use digest::EncryptedKey;
pub use error::{E2eError, E2eResult};
pub use fixture::Record;
pub use harness::{
    BeforeEach, CaseContext, DataPolicy, DataProvider, EncryptedKeyHook, Fixture, Suite, TestData,
    WorkbookProvider,
};
pub use logger::TestLogger;
pub use runner::{CaseStatus, RunnerConfig, TestResult, TestRunner, TestSuiteResult};
