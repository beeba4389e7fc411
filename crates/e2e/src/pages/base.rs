//! Common page operations shared by all page objects

use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::playwright::{CaptureTarget, PageStep, PlaywrightHandle, WaitState};

/// A browser session under construction.
///
/// Steps are collected and executed in one browser launch by [`run`].
///
/// [`run`]: PageSession::run
pub struct PageSession<'a> {
    handle: &'a PlaywrightHandle,
    steps: Vec<PageStep>,
}

impl<'a> PageSession<'a> {
    pub fn new(handle: &'a PlaywrightHandle) -> Self {
        Self {
            handle,
            steps: Vec::new(),
        }
    }

    pub fn goto(mut self, url: impl Into<String>) -> Self {
        self.steps.push(PageStep::Navigate { url: url.into() });
        self
    }

    pub fn wait_for_load(mut self) -> Self {
        self.steps.push(PageStep::WaitForLoad);
        self
    }

    pub fn wait_for(mut self, selector: impl Into<String>, timeout_ms: u64) -> Self {
        self.steps.push(PageStep::WaitFor {
            selector: selector.into(),
            state: WaitState::Visible,
            timeout_ms,
            optional: false,
        });
        self
    }

    /// Wait for a selector but carry on if it never shows up
    pub fn wait_for_optional(mut self, selector: impl Into<String>, timeout_ms: u64) -> Self {
        self.steps.push(PageStep::WaitFor {
            selector: selector.into(),
            state: WaitState::Visible,
            timeout_ms,
            optional: true,
        });
        self
    }

    pub fn capture_title(self, key: impl Into<String>) -> Self {
        self.capture(key, CaptureTarget::Title)
    }

    pub fn capture_text(self, key: impl Into<String>, selector: impl Into<String>) -> Self {
        self.capture(key, CaptureTarget::Text(selector.into()))
    }

    pub fn capture_inner_text(self, key: impl Into<String>, selector: impl Into<String>) -> Self {
        self.capture(key, CaptureTarget::InnerText(selector.into()))
    }

    pub fn capture_attribute(
        self,
        key: impl Into<String>,
        selector: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.capture(
            key,
            CaptureTarget::Attribute {
                selector: selector.into(),
                name: name.into(),
            },
        )
    }

    pub fn screenshot(mut self, path: &Path, full_page: bool) -> Self {
        self.steps.push(PageStep::Screenshot {
            path: path.to_path_buf(),
            full_page,
        });
        self
    }

    fn capture(mut self, key: impl Into<String>, target: CaptureTarget) -> Self {
        self.steps.push(PageStep::Capture {
            key: key.into(),
            target,
        });
        self
    }

    pub fn steps(&self) -> &[PageStep] {
        &self.steps
    }

    /// Launch the browser and execute the collected steps
    pub async fn run(self) -> E2eResult<PageSnapshot> {
        debug!("Running page session with {} step(s)", self.steps.len());
        let output = self.handle.run_steps(&self.steps).await?;
        Ok(PageSnapshot::new(output.captures))
    }
}

/// Values captured from a finished session
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    captures: HashMap<String, Option<String>>,
}

impl PageSnapshot {
    pub fn new(captures: HashMap<String, Option<String>>) -> Self {
        Self { captures }
    }

    /// A captured value; `Ok(None)` when the element was absent.
    ///
    /// A key that was never reported means the script did not run the capture.
    pub fn get(&self, key: &str) -> E2eResult<Option<&str>> {
        self.captures
            .get(key)
            .map(|value| value.as_deref())
            .ok_or_else(|| E2eError::Playwright(format!("capture '{}' missing from script output", key)))
    }

    /// A captured value that must be present
    pub fn require(&self, key: &str, selector: &str) -> E2eResult<&str> {
        self.get(key)?
            .ok_or_else(|| E2eError::ElementNotFound(selector.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playwright::PlaywrightConfig;

    #[test]
    fn test_snapshot_lookup() {
        let mut captures = HashMap::new();
        captures.insert("title".to_string(), Some("Eevee".to_string()));
        captures.insert("caption".to_string(), None);
        let snapshot = PageSnapshot::new(captures);

        assert_eq!(snapshot.get("title").unwrap(), Some("Eevee"));
        assert_eq!(snapshot.get("caption").unwrap(), None);
        assert!(matches!(snapshot.get("image"), Err(E2eError::Playwright(_))));
        assert!(matches!(
            snapshot.require("caption", ".infobox-caption"),
            Err(E2eError::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_session_collects_steps() {
        let handle = PlaywrightHandle::unchecked(PlaywrightConfig::default());
        let session = PageSession::new(&handle)
            .goto("https://example.org")
            .wait_for_load()
            .wait_for_optional("img", 500)
            .capture_title("title");
        assert_eq!(session.steps().len(), 4);
        assert_eq!(session.steps()[1], PageStep::WaitForLoad);
        assert!(matches!(
            &session.steps()[2],
            PageStep::WaitFor { optional: true, timeout_ms: 500, .. }
        ));
    }

    #[test]
    fn test_required_wait_and_screenshot_steps() {
        let handle = PlaywrightHandle::unchecked(PlaywrightConfig::default());
        let session = PageSession::new(&handle)
            .wait_for("#content", 2_000)
            .screenshot(Path::new("out/page.png"), false);

        assert_eq!(
            session.steps(),
            &[
                PageStep::WaitFor {
                    selector: "#content".into(),
                    state: WaitState::Visible,
                    timeout_ms: 2_000,
                    optional: false,
                },
                PageStep::Screenshot {
                    path: "out/page.png".into(),
                    full_page: false,
                },
            ]
        );
    }
}
