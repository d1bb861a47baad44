// Content script: the per-page agent. Injects the badge and highlight
// style on load, watches childList mutations, and answers the page
// actions over the bus.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use webext_host::{Element, PageDocument, Subscriber};
use webext_protocol::{
    decode, now_millis, ImageEntry, LinkEntry, ModifyData, PageData, PageInfo, PageRequest,
    Response, Viewport, MAX_IMAGES, MAX_LINKS, MAX_TEXT_BLOCKS,
};

/// Class applied by modifyPage highlights.
pub const HIGHLIGHT_CLASS: &str = "extension-highlight";
/// How long a highlight lasts before the auto-revert.
pub const HIGHLIGHT_REVERT: Duration = Duration::from_secs(2);
/// Id of the badge element injected on load.
pub const BADGE_ID: &str = "extension-badge";

const HIGHLIGHT_STYLE: &str = ".extension-highlight { background-color: yellow; }";

pub struct ContentScript {
    page: PageDocument,
}

impl ContentScript {
    /// Attach to a freshly loaded page: inject the badge and highlight
    /// style, start the mutation logging task.
    pub fn inject(page: PageDocument) -> Self {
        let script = Self { page };
        script.add_badge();
        script.page.add_style_sheet(HIGHLIGHT_STYLE);
        script.spawn_observer();
        tracing::debug!("content script loaded on {}", script.page.url());
        script
    }

    fn add_badge(&self) {
        self.page.append(
            Element::new("div")
                .with_id(BADGE_ID)
                .with_class("extension-badge")
                .with_text("🔧"),
        );
    }

    fn spawn_observer(&self) {
        let mut mutations = self.page.observe();
        let url = self.page.url();
        tokio::spawn(async move {
            while let Some(mutation) = mutations.recv().await {
                // observation hook only, no required reaction
                tracing::trace!("dom changed on {}: {:?}", url, mutation);
            }
        });
    }

    fn page_info(&self) -> Response {
        let (width, height) = self.page.viewport();
        Response::with_data(PageInfo {
            title: self.page.title(),
            url: self.page.url(),
            domain: self.page.domain(),
            timestamp: now_millis(),
            user_agent: self.page.user_agent(),
            viewport: Viewport { width, height },
        })
    }

    fn modify_page(&self, data: ModifyData) -> Response {
        let mut touched = 0;
        if let Some(selector) = &data.highlight {
            touched = self.page.add_class(selector, HIGHLIGHT_CLASS);
            if touched > 0 {
                let page = self.page.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(HIGHLIGHT_REVERT).await;
                    page.remove_class(HIGHLIGHT_CLASS);
                });
            }
        }
        // An empty match set is still a successful modification pass.
        Response::with_message(format!("highlighted {} element(s)", touched))
    }

    fn extract_data(&self) -> Response {
        let links = self
            .page
            .links()
            .into_iter()
            .take(MAX_LINKS)
            .map(|el| LinkEntry {
                text: el.text.trim().to_string(),
                href: el.attrs.get("href").cloned().unwrap_or_default(),
                title: el.attrs.get("title").cloned().unwrap_or_default(),
            })
            .collect();

        let images = self
            .page
            .images()
            .into_iter()
            .take(MAX_IMAGES)
            .map(|el| ImageEntry {
                src: el.attrs.get("src").cloned().unwrap_or_default(),
                alt: el.attrs.get("alt").cloned().unwrap_or_default(),
                title: el.attrs.get("title").cloned().unwrap_or_default(),
                width: el.attrs.get("width").and_then(|w| w.parse().ok()).unwrap_or(0),
                height: el.attrs.get("height").and_then(|h| h.parse().ok()).unwrap_or(0),
            })
            .collect();

        let text = self
            .page
            .text_blocks()
            .into_iter()
            .take(MAX_TEXT_BLOCKS)
            .collect::<Vec<_>>()
            .join("\n");

        Response::with_data(PageData {
            title: self.page.title(),
            description: self.page.meta("description").unwrap_or_default(),
            keywords: self.page.meta("keywords").unwrap_or_default(),
            links,
            images,
            text,
        })
    }
}

#[async_trait]
impl Subscriber for ContentScript {
    async fn on_message(&self, raw: Value) -> Response {
        let request = match decode::<PageRequest>(&raw) {
            Ok(request) => request,
            Err(e) => return e.into(),
        };

        match request {
            PageRequest::GetPageInfo => self.page_info(),
            PageRequest::ModifyPage { data } => self.modify_page(data),
            PageRequest::ExtractData => self.extract_data(),
        }
    }
}
