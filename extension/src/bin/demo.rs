// End-to-end simulated session for the extension scaffold: wires the
// host services, installs the extension, loads a page, and drives the
// popup and the page-world bridge the way a user would.

use anyhow::Result;
use std::env;
use std::sync::Arc;

use webext_extension::{
    BackgroundService, ContentScript, InstallDetails, Manifest, PageBridge, PopupController,
};
use webext_host::{
    Alarms, ContextId, Element, LocalStore, MessageBus, Notifications, PageDocument,
};
use webext_protocol::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let manifest = match env::var("MANIFEST_PATH") {
        Ok(path) => Manifest::load(&path)?,
        Err(_) => Manifest::builtin(),
    };

    tracing::info!("🚀 starting {} v{}", manifest.name, manifest.version);

    let store = LocalStore::new();
    let bus = MessageBus::new();
    let alarms = Alarms::new();
    let notifications = Arc::new(Notifications::new());

    // Background context comes up first, as the host would bring it up
    let background = Arc::new(BackgroundService::new(
        manifest.clone(),
        store.clone(),
        notifications.clone(),
    ));
    background.on_installed(InstallDetails::Install).await;
    background.clone().spawn_periodic(&alarms);
    bus.attach(ContextId::Background, background.clone());

    // A page finishes loading and its agent comes up
    let page = PageDocument::new("https://example.com/welcome", "Welcome to Example");
    page.set_meta("description", "A page for driving the scaffold");
    page.append(Element::new("h1").with_text("Welcome"));
    page.append(Element::new("p").with_text("This page exists to be scraped."));
    page.append(
        Element::new("a")
            .with_attr("href", "https://example.com/docs")
            .with_text("docs"),
    );
    let agent = Arc::new(ContentScript::inject(page.clone()));
    bus.attach(ContextId::Tab(1), agent);
    background.on_tab_updated(1, &page.url());
    background.on_tab_activated(1);

    // Popup session
    let popup = PopupController::new(bus.clone(), store.clone(), manifest.version.clone());
    popup.open().await;

    if let Some(info) = popup.show_extension_info().await {
        tracing::info!("extension info: {} v{}", info.name, info.version);
    }
    if let Some(page_info) = popup.show_current_page(1).await {
        tracing::info!("current page: {} ({})", page_info.title, page_info.domain);
    }
    popup.save_data().await;
    popup.load_data().await;
    tracing::info!("popup: {}", popup.status());

    popup
        .apply_settings(Settings {
            enabled: false,
            notifications: true,
        })
        .await;
    tracing::info!("popup: {}", popup.status());

    // Page code talking to the bridge directly, never over the router
    let bridge = PageBridge::install(&page);
    let highlighted = bridge.highlight("p");
    tracing::info!("bridge highlighted {} element(s)", highlighted);
    tracing::info!("bridge text:\n{}", bridge.extract_text(None));

    for notification in notifications.sent() {
        tracing::info!("notification sent: {}", notification.title);
    }

    tracing::info!("session complete");
    Ok(())
}
