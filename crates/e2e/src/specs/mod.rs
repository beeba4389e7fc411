//! Registered test projects
//!
//! Each submodule adds the cases of one project to a [`Suite`]. Data-driven
//! projects take the fixture records loaded at registration time; the
//! `Fixture Data` project reads them again through the suite's provider.

pub mod creature_api;
pub mod fixture_data;
pub mod posts_api;
pub mod wiki;

use crate::config::{Config, Settings};
use crate::fixture::Record;
use crate::harness::Suite;
use crate::playwright::PlaywrightConfig;

pub const CREATURE_API_PROJECT: &str = "API Tests - Pokemon";
pub const POSTS_API_PROJECT: &str = "API Tests - JSONPlaceholder";
pub const WIKI_PROJECT: &str = "Web Tests - Chromium";
pub const FIXTURE_DATA_PROJECT: &str = "Fixture Data";

/// Every project name, in registration order
pub const PROJECTS: &[&str] = &[
    CREATURE_API_PROJECT,
    POSTS_API_PROJECT,
    WIKI_PROJECT,
    FIXTURE_DATA_PROJECT,
];

/// Register every project's cases
pub fn register_all(suite: &mut Suite, records: &[Record], settings: &Settings, config: &Config) {
    creature_api::register(suite, records, &settings.endpoints, &settings.limits);
    posts_api::register(suite, &settings.endpoints);
    wiki::register(
        suite,
        records,
        wiki::WikiSettings {
            playwright: PlaywrightConfig::from_settings(&settings.browser, config.base_url.clone()),
            wiki_url: settings.endpoints.wiki_url.clone(),
            images_dir: settings.data.images_dir.clone(),
            max_image_bytes: settings.limits.max_image_bytes,
        },
    );
    fixture_data::register(suite);
}
