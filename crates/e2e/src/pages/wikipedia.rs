//! Wikipedia article page for a creature

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};
use crate::files::ensure_directory;
use crate::pages::base::{PageSession, PageSnapshot};
use crate::playwright::PlaywrightHandle;

// Selectors
const PAGE_CONTENT: &str = "#content";
const PAGE_HEADING: &str = "#firstHeading";
const INFOBOX_CAPTION: &str = ".infobox-caption";
const INFOBOX_IMAGE: &str = "table.infobox img.mw-file-element";

// Capture keys
const KEY_TITLE: &str = "title";
const KEY_HEADING: &str = "heading";
const KEY_CAPTION: &str = "caption";
const KEY_IMAGE_SRC: &str = "image_src";

const CONTENT_WAIT_MS: u64 = 15_000;
const IMAGE_WAIT_MS: u64 = 10_000;
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

// The capture runs to a `[` or the end of the caption and never crosses a line break.
static ARTWORK_BY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)artwork by\s+(.+?)(?:\[|$)").expect("valid regex"));
static CSS_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.mw-[a-z-]+\s+[^}]+\}").expect("valid regex"));
static BRACED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").expect("valid regex"));
static REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+\]").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Outcome of looking up the artwork designer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignerLookup {
    Found(String),
    NotFound,
}

impl DesignerLookup {
    pub fn name(&self) -> Option<&str> {
        match self {
            DesignerLookup::Found(name) => Some(name),
            DesignerLookup::NotFound => None,
        }
    }
}

impl fmt::Display for DesignerLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesignerLookup::Found(name) => f.write_str(name),
            DesignerLookup::NotFound => f.write_str("Designer not found"),
        }
    }
}

/// Pull the designer out of a caption such as "Pikachu artwork by Ken Sugimori[1]"
pub fn extract_designer(caption: &str) -> DesignerLookup {
    let Some(raw) = ARTWORK_BY.captures(caption).and_then(|c| c.get(1)) else {
        return DesignerLookup::NotFound;
    };
    let cleaned = clean_designer_text(raw.as_str());
    if cleaned.is_empty() {
        DesignerLookup::NotFound
    } else {
        DesignerLookup::Found(cleaned)
    }
}

/// Strip inline CSS, reference markers and layout whitespace
fn clean_designer_text(text: &str) -> String {
    let cleaned = CSS_RULE.replace_all(text, "");
    let cleaned = BRACED.replace_all(&cleaned, "");
    let cleaned = REFERENCE.replace_all(&cleaned, "");
    WHITESPACE.replace_all(&cleaned, " ").trim().to_string()
}

/// A loaded creature article
pub struct WikipediaPage {
    url: String,
    origin: String,
    snapshot: PageSnapshot,
    http: reqwest::Client,
}

impl WikipediaPage {
    /// Article URL for a creature name
    pub fn article_url(wiki_base: &str, name: &str) -> String {
        format!("{}/wiki/{}", wiki_base.trim_end_matches('/'), name)
    }

    /// Navigate to the article and capture everything the checks need
    pub async fn open(handle: &PlaywrightHandle, wiki_base: &str, name: &str) -> E2eResult<Self> {
        let url = Self::article_url(wiki_base, name);
        info!("Opening {}", url);

        if let Some(dir) = &handle.config().screenshot_dir {
            ensure_directory(dir)?;
        }
        let snapshot = Self::session(handle, &url, name).run().await?;

        Self::from_snapshot(&url, wiki_base, snapshot)
    }

    /// Steps run by [`open`](Self::open)
    pub(crate) fn session<'a>(handle: &'a PlaywrightHandle, url: &str, name: &str) -> PageSession<'a> {
        let session = PageSession::new(handle)
            .goto(url)
            .wait_for_load()
            .wait_for(PAGE_CONTENT, CONTENT_WAIT_MS)
            .wait_for_optional(INFOBOX_IMAGE, IMAGE_WAIT_MS)
            .capture_title(KEY_TITLE)
            .capture_text(KEY_HEADING, PAGE_HEADING)
            .capture_inner_text(KEY_CAPTION, INFOBOX_CAPTION)
            .capture_attribute(KEY_IMAGE_SRC, INFOBOX_IMAGE, "src");

        match &handle.config().screenshot_dir {
            Some(dir) => session.screenshot(&dir.join(format!("{}.png", name)), true),
            None => session,
        }
    }

    /// Build a page from already captured values
    pub fn from_snapshot(url: &str, wiki_base: &str, snapshot: PageSnapshot) -> E2eResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("dexcheck/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            url: url.to_string(),
            origin: wiki_base.trim_end_matches('/').to_string(),
            snapshot,
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Main heading text, empty if the page has none
    pub fn page_title(&self) -> E2eResult<String> {
        Ok(self
            .snapshot
            .get(KEY_HEADING)?
            .map(|heading| heading.trim().to_string())
            .unwrap_or_default())
    }

    /// Browser tab title
    pub fn document_title(&self) -> E2eResult<Option<&str>> {
        self.snapshot.get(KEY_TITLE)
    }

    /// Designer credited in the infobox caption
    pub fn artwork_designer(&self) -> E2eResult<DesignerLookup> {
        Ok(match self.snapshot.get(KEY_CAPTION)? {
            Some(caption) => extract_designer(caption),
            None => {
                debug!("No {} element on {}", INFOBOX_CAPTION, self.url);
                DesignerLookup::NotFound
            }
        })
    }

    /// Absolute URL of the infobox image
    pub fn main_image_url(&self) -> E2eResult<String> {
        let src = self.snapshot.require(KEY_IMAGE_SRC, INFOBOX_IMAGE)?;
        Ok(absolutize(src, &self.origin))
    }

    /// Download the infobox image to `<dir>/<stem>.<ext>`
    pub async fn download_main_image(&self, dir: &Path, stem: &str) -> E2eResult<PathBuf> {
        let step = |reason: String| E2eError::StepFailed {
            step: "download main image".to_string(),
            reason,
        };

        let image_url = self.main_image_url()?;
        ensure_directory(dir)?;

        let response = self
            .http
            .get(&image_url)
            .send()
            .await
            .map_err(|e| step(format!("{}: {}", image_url, e)))?;
        if !response.status().is_success() {
            return Err(step(format!("{} returned {}", image_url, response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| step(format!("{}: {}", image_url, e)))?;

        let ext = image_extension(&image_url, &bytes)
            .ok_or_else(|| step(format!("cannot determine image type of {}", image_url)))?;
        let path = dir.join(format!("{}.{}", stem, ext));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| E2eError::FileAccess { path: path.clone(), source })?;

        info!("Image downloaded to: {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

/// Make protocol-relative and root-relative sources absolute
fn absolutize(src: &str, origin: &str) -> String {
    if let Some(rest) = src.strip_prefix("//") {
        format!("https://{}", rest)
    } else if src.starts_with('/') {
        format!("{}{}", origin, src)
    } else {
        src.to_string()
    }
}

/// Extension from the URL path, else sniffed from the bytes
fn image_extension(url: &str, bytes: &[u8]) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file = path.rsplit('/').next().unwrap_or(path);
    let from_url = Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase());

    from_url.or_else(|| {
        image::guess_format(bytes)
            .ok()
            .and_then(|format| format.extensions_str().first())
            .map(|ext| ext.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playwright::{PageStep, PlaywrightConfig};
    use std::collections::HashMap;
    use test_case::test_case;

    #[test_case("Pikachu artwork by Ken Sugimori[1]", Some("Ken Sugimori") ; "reference marker")]
    #[test_case("Official artwork by Atsuko Nishida", Some("Atsuko Nishida") ; "end of string")]
    #[test_case("ARTWORK BY Ken Sugimori", Some("Ken Sugimori") ; "case insensitive")]
    #[test_case(".mw-parser-output .x{color:red} artwork by Jane Doe", Some("Jane Doe") ; "leading css noise")]
    #[test_case("artwork by Jane {display:none} Doe", Some("Jane Doe") ; "braced noise")]
    #[test_case("artwork by .mw-parser-output .plainlist{margin:0}Ken Sugimori", Some("Ken Sugimori") ; "css rule in capture")]
    #[test_case("Artwork by   Ken\tSugimori   and  Atsuko Nishida[2]", Some("Ken Sugimori and Atsuko Nishida") ; "multiple names")]
    #[test_case("Pikachu as it appears in Pokemon Red", None ; "no phrase")]
    #[test_case("artwork by [3]", None ; "nothing captured")]
    #[test_case("", None ; "empty caption")]
    #[test_case("Pikachu artwork by Ken\nSugimori", None ; "name split by line break")]
    #[test_case("Pikachu artwork by\nKen Sugimori[1]", Some("Ken Sugimori") ; "line break before name")]
    fn test_extract_designer(caption: &str, expected: Option<&str>) {
        assert_eq!(extract_designer(caption).name(), expected);
    }

    #[test]
    fn test_not_found_display() {
        assert_eq!(DesignerLookup::NotFound.to_string(), "Designer not found");
        assert_eq!(DesignerLookup::Found("Ken Sugimori".into()).to_string(), "Ken Sugimori");
    }

    #[test]
    fn test_clean_designer_text_order() {
        assert_eq!(clean_designer_text(" Ken[12]\n Sugimori {x} "), "Ken Sugimori");
    }

    #[test]
    fn test_absolutize() {
        let origin = "https://en.wikipedia.org";
        assert_eq!(
            absolutize("//upload.wikimedia.org/a/b/Pikachu.png", origin),
            "https://upload.wikimedia.org/a/b/Pikachu.png"
        );
        assert_eq!(
            absolutize("/static/images/icon.png", origin),
            "https://en.wikipedia.org/static/images/icon.png"
        );
        assert_eq!(absolutize("https://x.test/y.png", origin), "https://x.test/y.png");
    }

    #[test]
    fn test_image_extension_from_url() {
        assert_eq!(
            image_extension("https://upload.wikimedia.org/thumb/250px-Pikachu.PNG?x=1", &[]),
            Some("png".to_string())
        );
        assert_eq!(
            image_extension("https://upload.wikimedia.org/thumb/Eevee.svg.png", &[]),
            Some("png".to_string())
        );
    }

    #[test]
    fn test_image_extension_sniffed() {
        let png_magic = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(
            image_extension("https://example.org/render", &png_magic),
            Some("png".to_string())
        );
        assert_eq!(image_extension("https://example.org/render", b"plain"), None);
    }

    fn page(captures: &[(&str, Option<&str>)]) -> WikipediaPage {
        let captures: HashMap<String, Option<String>> = captures
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(String::from)))
            .collect();
        WikipediaPage::from_snapshot(
            "https://en.wikipedia.org/wiki/Pikachu",
            "https://en.wikipedia.org",
            PageSnapshot::new(captures),
        )
        .unwrap()
    }

    #[test]
    fn test_page_reads_snapshot() {
        let page = page(&[
            (KEY_TITLE, Some("Pikachu - Wikipedia")),
            (KEY_HEADING, Some("  Pikachu\n")),
            (KEY_CAPTION, Some("Pikachu artwork by Ken Sugimori[1]")),
            (KEY_IMAGE_SRC, Some("//upload.wikimedia.org/Pikachu.png")),
        ]);
        assert_eq!(page.page_title().unwrap(), "Pikachu");
        assert_eq!(page.document_title().unwrap(), Some("Pikachu - Wikipedia"));
        assert_eq!(
            page.artwork_designer().unwrap(),
            DesignerLookup::Found("Ken Sugimori".into())
        );
        assert_eq!(page.main_image_url().unwrap(), "https://upload.wikimedia.org/Pikachu.png");
    }

    #[test]
    fn test_missing_elements() {
        let page = page(&[
            (KEY_TITLE, Some("Missingno")),
            (KEY_HEADING, None),
            (KEY_CAPTION, None),
            (KEY_IMAGE_SRC, None),
        ]);
        assert_eq!(page.page_title().unwrap(), "");
        assert_eq!(page.artwork_designer().unwrap(), DesignerLookup::NotFound);
        assert!(matches!(page.main_image_url(), Err(E2eError::ElementNotFound(_))));
    }

    #[test]
    fn test_unreported_caption_is_an_error() {
        let page = page(&[(KEY_TITLE, Some("Pikachu"))]);
        assert!(page.artwork_designer().is_err());
    }

    #[tokio::test]
    async fn test_download_without_image_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let page = page(&[(KEY_IMAGE_SRC, None)]);
        let err = page.download_main_image(dir.path(), "Pikachu").await.unwrap_err();
        assert!(matches!(err, E2eError::ElementNotFound(_)));
    }

    #[test]
    fn test_article_session_steps() {
        let handle = PlaywrightHandle::unchecked(PlaywrightConfig::default());
        let url = WikipediaPage::article_url("https://en.wikipedia.org/", "Pikachu");
        let session = WikipediaPage::session(&handle, &url, "Pikachu");
        let steps = session.steps();

        assert_eq!(
            steps[0],
            PageStep::Navigate { url: "https://en.wikipedia.org/wiki/Pikachu".into() }
        );
        assert!(matches!(
            &steps[2],
            PageStep::WaitFor { selector, optional: false, .. } if selector == PAGE_CONTENT
        ));
        assert!(matches!(
            &steps[3],
            PageStep::WaitFor { selector, optional: true, .. } if selector == INFOBOX_IMAGE
        ));
        assert!(!steps.iter().any(|s| matches!(s, PageStep::Screenshot { .. })));
    }

    #[test]
    fn test_article_session_screenshot_when_configured() {
        let handle = PlaywrightHandle::unchecked(PlaywrightConfig {
            screenshot_dir: Some(PathBuf::from("shots")),
            ..PlaywrightConfig::default()
        });
        let session = WikipediaPage::session(&handle, "https://en.wikipedia.org/wiki/Eevee", "Eevee");
        assert_eq!(
            session.steps().last(),
            Some(&PageStep::Screenshot {
                path: PathBuf::from("shots/Eevee.png"),
                full_page: true,
            })
        );
    }
}
