// Page-world bridge. Runs in the page's own execution environment,
// outside extension privilege: a small synchronous utility surface,
// never reachable over the message bus.

use serde::Serialize;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use webext_host::{Mutation, PageDocument};
use webext_protocol::now_millis;

/// How long a bridge highlight lasts when a revert timer can run.
pub const HIGHLIGHT_REVERT: Duration = Duration::from_secs(2);

const HIGHLIGHT_PROPERTY: &str = "background-color";
const HIGHLIGHT_COLOR: &str = "yellow";

/// Snapshot returned by the bridge, the page-world subset of the
/// agent's richer report.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BridgePageInfo {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub timestamp: i64,
}

pub struct PageBridge {
    page: PageDocument,
}

impl PageBridge {
    /// Install the bridge into a page. Idempotent: the injection guard
    /// is consulted before anything else, so repeated injection leaves
    /// the surface exactly as one injection does.
    pub fn install(page: &PageDocument) -> Self {
        if page.mark_injected() {
            tracing::debug!("page bridge installed on {}", page.url());
        } else {
            tracing::debug!("page bridge already present on {}", page.url());
        }
        Self { page: page.clone() }
    }

    pub fn page_info(&self) -> BridgePageInfo {
        BridgePageInfo {
            title: self.page.title(),
            url: self.page.url(),
            domain: self.page.domain(),
            timestamp: now_millis(),
        }
    }

    /// Highlight every match and return the count. The revert timer
    /// needs a tokio runtime on the calling thread; without one the
    /// highlight simply stays.
    pub fn highlight(&self, selector: &str) -> usize {
        let count = self
            .page
            .set_inline_style(selector, HIGHLIGHT_PROPERTY, HIGHLIGHT_COLOR);
        if count > 0 {
            if let Ok(handle) = Handle::try_current() {
                let page = self.page.clone();
                handle.spawn(async move {
                    tokio::time::sleep(HIGHLIGHT_REVERT).await;
                    page.clear_inline_style(HIGHLIGHT_PROPERTY);
                });
            }
        }
        count
    }

    /// Text content under `selector`, the whole document by default.
    pub fn extract_text(&self, selector: Option<&str>) -> String {
        match selector {
            None | Some("body") => self.page.whole_text(),
            Some(selector) => self
                .page
                .select(selector)
                .first()
                .map(|el| el.text.trim().to_string())
                .unwrap_or_default(),
        }
    }

    pub fn add_style(&self, css: &str) {
        self.page.add_style_sheet(css);
    }

    /// Watch childList mutations. The receiver is the observer handle;
    /// dropping it disconnects.
    pub fn observe_dom(&self) -> mpsc::UnboundedReceiver<Mutation> {
        self.page.observe()
    }
}
