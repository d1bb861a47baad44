// Background coordinator. Long-lived context: owns store initialization
// on install and update, answers its routed actions, fires the welcome
// notification, and keeps the periodic task off the router path.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use webext_host::{Alarms, LocalStore, Notifications, Subscriber};
use webext_protocol::{decode, now_millis, BackgroundRequest, ExtensionInfo, Response, Settings};

use crate::manifest::Manifest;

/// Name of the recurring background alarm.
pub const PERIODIC_ALARM: &str = "periodicTask";

/// Why the install lifecycle hook fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallDetails {
    Install,
    Update { previous_version: String },
}

pub struct BackgroundService {
    manifest: Manifest,
    store: LocalStore,
    notifications: Arc<Notifications>,
}

impl BackgroundService {
    pub fn new(manifest: Manifest, store: LocalStore, notifications: Arc<Notifications>) -> Self {
        Self {
            manifest,
            store,
            notifications,
        }
    }

    /// Lifecycle hook, driven by the host when the extension is
    /// installed or updated.
    pub async fn on_installed(&self, details: InstallDetails) {
        match details {
            InstallDetails::Install => self.on_first_install().await,
            InstallDetails::Update { previous_version } => {
                self.on_update(&previous_version).await;
            }
        }
    }

    async fn on_first_install(&self) {
        tracing::info!("first install of {}", self.manifest.name);

        self.store
            .set_many(vec![
                ("installDate".to_string(), json!(now_millis())),
                ("version".to_string(), json!(self.manifest.version)),
                ("settings".to_string(), json!(Settings::default())),
            ])
            .await;

        self.notifications
            .notify(&self.manifest.name, "Extension installed successfully");
    }

    async fn on_update(&self, previous_version: &str) {
        tracing::info!(
            "updated: {} -> {}",
            previous_version,
            self.manifest.version
        );

        self.store
            .set_many(vec![
                ("lastUpdate".to_string(), json!(now_millis())),
                ("version".to_string(), json!(self.manifest.version)),
            ])
            .await;
    }

    /// Start the recurring background task at the manifest's cadence.
    /// Takes over the host's alarm event stream.
    pub fn spawn_periodic(self: Arc<Self>, alarms: &Alarms) {
        alarms.create(
            PERIODIC_ALARM,
            Duration::from_secs(self.manifest.periodic_delay_secs),
            Duration::from_secs(self.manifest.periodic_period_secs),
        );

        if let Some(mut events) = alarms.take_events() {
            let service = self;
            tokio::spawn(async move {
                while let Some(alarm) = events.recv().await {
                    if alarm.name == PERIODIC_ALARM {
                        service.periodic_tick().await;
                    }
                }
            });
        }
    }

    /// Periodic task body. Deliberately empty: an extension point for
    /// maintenance work, kept off the router path.
    async fn periodic_tick(&self) {
        tracing::debug!("periodic task fired");
    }

    /// Tab lifecycle hooks. Log-only.
    pub fn on_tab_updated(&self, tab: u32, url: &str) {
        tracing::debug!("tab {} updated: {}", tab, url);
    }

    pub fn on_tab_activated(&self, tab: u32) {
        tracing::debug!("tab {} activated", tab);
    }

    async fn settings(&self) -> Settings {
        self.store.get_typed("settings").await.unwrap_or_default()
    }

    async fn extension_info(&self) -> Response {
        let info = ExtensionInfo {
            name: self.manifest.name.clone(),
            version: self.manifest.version.clone(),
            install_date: self.store.get_typed("installDate").await,
            settings: self.settings().await,
        };
        Response::with_data(info)
    }

    async fn perform_action(&self, data: Option<Value>) -> Response {
        tracing::info!("performing action: {:?}", data);
        Response::with_message("action completed").timestamped()
    }

    async fn update_settings(&self, settings: Settings) -> Response {
        match self.store.set_typed("settings", &settings).await {
            Ok(()) => Response::ok(),
            Err(e) => Response::err(e.to_string()),
        }
    }
}

#[async_trait]
impl Subscriber for BackgroundService {
    async fn on_message(&self, raw: Value) -> Response {
        let request = match decode::<BackgroundRequest>(&raw) {
            Ok(request) => request,
            Err(e) => return e.into(),
        };

        match request {
            BackgroundRequest::GetExtensionInfo => self.extension_info().await,
            BackgroundRequest::PerformAction { data } => self.perform_action(data).await,
            BackgroundRequest::UpdateSettings { settings } => self.update_settings(settings).await,
        }
    }
}
