// Page agent behavior: snapshots, transient highlights, and the
// bounded scrape.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use webext_extension::{ContentScript, BADGE_ID, HIGHLIGHT_CLASS};
use webext_host::{ContextId, Element, MessageBus, PageDocument};
use webext_protocol::{PageData, PageInfo};

fn article_page() -> PageDocument {
    let page = PageDocument::new("https://news.example.org/story/42", "Big Story");
    page.set_meta("description", "A story");
    page.set_meta("keywords", "news, story");
    page.append(Element::new("h1").with_text("Big Story"));
    page.append(Element::new("p").with_text("Opening paragraph."));
    page.append(
        Element::new("a")
            .with_attr("href", "https://news.example.org/next")
            .with_text("next story"),
    );
    page
}

fn wire_agent(page: &PageDocument) -> MessageBus {
    let bus = MessageBus::new();
    bus.attach(
        ContextId::Tab(1),
        Arc::new(ContentScript::inject(page.clone())),
    );
    bus
}

#[tokio::test]
async fn test_inject_adds_the_badge_and_style() {
    let page = article_page();
    let _agent = ContentScript::inject(page.clone());

    assert!(page.has_element_id(BADGE_ID));
    assert_eq!(page.style_sheets().len(), 1);
}

#[tokio::test]
async fn test_get_page_info_snapshot() {
    let page = article_page();
    page.set_viewport(1024, 768);
    let bus = wire_agent(&page);

    let reply = bus
        .send(ContextId::Tab(1), json!({ "action": "getPageInfo" }))
        .await
        .unwrap();
    assert!(reply.success);

    let info: PageInfo = reply.data_as().unwrap();
    assert_eq!(info.title, "Big Story");
    assert_eq!(info.url, "https://news.example.org/story/42");
    assert_eq!(info.domain, "news.example.org");
    assert_eq!((info.viewport.width, info.viewport.height), (1024, 768));
    assert!(!info.user_agent.is_empty());
    assert!(info.timestamp > 0);
}

#[tokio::test]
async fn test_modify_page_with_no_matches_still_succeeds() {
    let page = article_page();
    let bus = wire_agent(&page);

    let reply = bus
        .send(
            ContextId::Tab(1),
            json!({ "action": "modifyPage", "data": { "highlight": "#missing" } }),
        )
        .await
        .unwrap();
    assert!(reply.success);
    assert!(!reply.message.unwrap().is_empty());
    assert!(reply.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_highlight_reverts_after_the_fixed_delay() {
    let page = article_page();
    let bus = wire_agent(&page);

    let reply = bus
        .send(
            ContextId::Tab(1),
            json!({ "action": "modifyPage", "data": { "highlight": "p" } }),
        )
        .await
        .unwrap();
    assert!(reply.success);
    assert!(page.select("p")[0].has_class(HIGHLIGHT_CLASS));

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(!page.select("p")[0].has_class(HIGHLIGHT_CLASS));
}

#[tokio::test]
async fn test_extract_data_is_bounded() {
    let page = article_page();
    for n in 0..1000 {
        page.append(
            Element::new("a")
                .with_attr("href", &format!("https://news.example.org/{}", n))
                .with_text(&format!("link {}", n)),
        );
        page.append(
            Element::new("img")
                .with_attr("src", &format!("https://img.example.org/{}.png", n))
                .with_attr("width", "10")
                .with_attr("height", "20"),
        );
    }
    for n in 0..100 {
        page.append(Element::new("p").with_text(&format!("paragraph {}", n)));
    }
    let bus = wire_agent(&page);

    let reply = bus
        .send(ContextId::Tab(1), json!({ "action": "extractData" }))
        .await
        .unwrap();
    assert!(reply.success);

    let data: PageData = reply.data_as().unwrap();
    assert!(data.links.len() <= 10);
    assert!(data.images.len() <= 10);
    assert!(data.text.lines().count() <= 20);
    assert_eq!(data.description, "A story");
    assert_eq!(data.keywords, "news, story");
    assert_eq!(data.images[0].width, 10);
}
