// Popup controller. Stateless UI driver: each user action sends one
// routed request and renders the single reply, or the locally caught
// error, into the status line. Never retries.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Mutex;

use webext_host::{ContextId, LocalStore, MessageBus};
use webext_protocol::{
    now_millis, BackgroundRequest, ExtensionInfo, PageInfo, PageRequest, SavedData, Settings,
};

pub struct PopupController {
    bus: MessageBus,
    store: LocalStore,
    version: String,
    status: Mutex<String>,
}

impl PopupController {
    pub fn new(bus: MessageBus, store: LocalStore, version: impl Into<String>) -> Self {
        Self {
            bus,
            store,
            version: version.into(),
            status: Mutex::new("Ready".to_string()),
        }
    }

    /// Popup opened: surface when data was last saved.
    pub async fn open(&self) {
        if let Some(stamp) = self.store.get_typed::<i64>("lastSaved").await {
            self.set_status(format!("Last saved at {}", stamp));
        }
    }

    /// Ask the tab's page agent for its snapshot and render it.
    pub async fn show_current_page(&self, tab: u32) -> Option<PageInfo> {
        let reply = match self
            .bus
            .send(ContextId::Tab(tab), encode(&PageRequest::GetPageInfo))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                self.set_status(format!("Failed to reach page: {}", e));
                return None;
            }
        };

        if !reply.success {
            self.set_status(error_text(&reply.error));
            return None;
        }
        match reply.data_as::<PageInfo>() {
            Some(info) => {
                self.set_status(format!("Page: {} ({})", info.title, info.url));
                Some(info)
            }
            None => {
                self.set_status("Page reply carried no snapshot");
                None
            }
        }
    }

    /// Ask the background coordinator who we are.
    pub async fn show_extension_info(&self) -> Option<ExtensionInfo> {
        let reply = match self
            .bus
            .send(
                ContextId::Background,
                encode(&BackgroundRequest::GetExtensionInfo),
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                self.set_status(format!("Failed to reach background: {}", e));
                return None;
            }
        };

        if !reply.success {
            self.set_status(error_text(&reply.error));
            return None;
        }
        match reply.data_as::<ExtensionInfo>() {
            Some(info) => {
                self.set_status(format!("{} v{}", info.name, info.version));
                Some(info)
            }
            None => {
                self.set_status("Background reply carried no info");
                None
            }
        }
    }

    /// Route new settings to the background coordinator.
    pub async fn apply_settings(&self, settings: Settings) {
        let request = encode(&BackgroundRequest::UpdateSettings { settings });
        match self.bus.send(ContextId::Background, request).await {
            Ok(reply) if reply.success => self.set_status("Settings updated"),
            Ok(reply) => self.set_status(error_text(&reply.error)),
            Err(e) => self.set_status(format!("Failed to update settings: {}", e)),
        }
    }

    /// Write the demo record under `savedData`, stamping `lastSaved`.
    pub async fn save_data(&self) -> SavedData {
        let saved = SavedData {
            timestamp: now_millis(),
            message: "Saved from the popup".to_string(),
            version: self.version.clone(),
        };

        self.store
            .set_many(vec![
                ("savedData".to_string(), json!(saved)),
                ("lastSaved".to_string(), json!(saved.timestamp)),
            ])
            .await;

        self.set_status("Data saved");
        saved
    }

    /// Read back whatever `savedData` holds.
    pub async fn load_data(&self) -> Option<SavedData> {
        match self.store.get_typed::<SavedData>("savedData").await {
            Some(saved) => {
                self.set_status(format!(
                    "Loaded: {} (v{}, at {})",
                    saved.message, saved.version, saved.timestamp
                ));
                Some(saved)
            }
            None => {
                self.set_status("No saved data found");
                None
            }
        }
    }

    /// The rendered status line.
    pub fn status(&self) -> String {
        self.status.lock().expect("popup status poisoned").clone()
    }

    fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        tracing::debug!("popup status: {}", status);
        *self.status.lock().expect("popup status poisoned") = status;
    }
}

/// Requests are plain serde types; encoding them cannot fail.
fn encode<T: Serialize>(request: &T) -> Value {
    serde_json::to_value(request).expect("request is JSON-encodable")
}

/// Error text is rendered verbatim; the envelope invariant guarantees
/// it is present on failures.
fn error_text(error: &Option<String>) -> String {
    error.clone().unwrap_or_else(|| "unspecified error".to_string())
}
