//! Creature article checks in a real browser

use std::path::PathBuf;
use std::sync::Arc;

use super::WIKI_PROJECT;
use crate::error::E2eResult;
use crate::expect_that;
use crate::files::{file_size, valid_extension, validate_file_size};
use crate::fixture::Record;
use crate::harness::Suite;
use crate::logger::TestLogger;
use crate::pages::WikipediaPage;
use crate::playwright::{PlaywrightConfig, PlaywrightHandle};

#[derive(Debug, Clone)]
pub struct WikiSettings {
    pub playwright: PlaywrightConfig,
    pub wiki_url: String,
    pub images_dir: PathBuf,
    pub max_image_bytes: u64,
}

pub fn register(suite: &mut Suite, records: &[Record], settings: WikiSettings) {
    let settings = Arc::new(settings);
    suite.parametrize::<TestLogger, _, _, _>(
        WIKI_PROJECT,
        records,
        |r| format!("Validate Wikipedia page for {}", r.name),
        move |_ctx, record, logger| {
            let settings = Arc::clone(&settings);
            async move { validate(&settings, &record, logger).await }
        },
    );
}

async fn validate(settings: &WikiSettings, record: &Record, logger: TestLogger) -> E2eResult<()> {
    let handle = PlaywrightHandle::new(settings.playwright.clone()).await?;
    let page = WikipediaPage::open(&handle, &settings.wiki_url, &record.name).await?;

    let title = page.page_title()?;
    expect_that!(!title.is_empty(), "{} has no page heading", page.url());
    expect_that!(
        title.to_lowercase().contains(&record.name.to_lowercase()),
        "page title '{}' does not mention '{}'",
        title,
        record.name
    );
    logger.log(format!("Page title: {}", title));

    let designer = page.artwork_designer()?;
    logger.log(format!("Artwork designer for {}: {}", record.name, designer));

    let path = page.download_main_image(&settings.images_dir, &record.name).await?;
    logger.log(format!("Image downloaded to: {}", path.display()));

    expect_that!(
        valid_extension(&path),
        "{} does not have an image extension",
        path.display()
    );

    let size = file_size(&path)?;
    expect_that!(
        validate_file_size(&path, settings.max_image_bytes)?,
        "{} is {} bytes, limit is {}",
        path.display(),
        size,
        settings.max_image_bytes
    );
    logger.log(format!(
        "Image file size: {} bytes (< {} bytes)",
        size, settings.max_image_bytes
    ));

    logger.end();
    Ok(())
}
