// Typed actions and payloads for each receiving context.
// Wire spelling matches the original JSON envelopes, e.g.
// { "action": "modifyPage", "data": { "highlight": "#id" } }.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::Routed;

/// Cap on link entries crossing the context boundary.
pub const MAX_LINKS: usize = 10;
/// Cap on image entries crossing the context boundary.
pub const MAX_IMAGES: usize = 10;
/// Cap on text blocks folded into extracted page text.
pub const MAX_TEXT_BLOCKS: usize = 20;

/// Actions answered by the background coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BackgroundRequest {
    GetExtensionInfo,
    PerformAction {
        #[serde(default)]
        data: Option<Value>,
    },
    UpdateSettings {
        settings: Settings,
    },
}

impl Routed for BackgroundRequest {
    const ACTIONS: &'static [&'static str] =
        &["getExtensionInfo", "performAction", "updateSettings"];
}

/// Actions answered by a page agent (content-script context).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageRequest {
    GetPageInfo,
    ModifyPage {
        #[serde(default)]
        data: ModifyData,
    },
    ExtractData,
}

impl Routed for PageRequest {
    const ACTIONS: &'static [&'static str] = &["getPageInfo", "modifyPage", "extractData"];
}

/// Payload of `modifyPage`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModifyData {
    /// Selector whose matches receive a transient highlight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

/// User-tunable settings persisted under the `settings` store key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub enabled: bool,
    pub notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            notifications: true,
        }
    }
}

/// Reply payload of `getExtensionInfo`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionInfo {
    pub name: String,
    pub version: String,
    /// Absent until the first-install hook has run.
    pub install_date: Option<i64>,
    pub settings: Settings,
}

/// Reply payload of `getPageInfo`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub timestamp: i64,
    pub user_agent: String,
    pub viewport: Viewport,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Reply payload of `extractData`. Arrays respect [`MAX_LINKS`] and
/// [`MAX_IMAGES`]; `text` folds at most [`MAX_TEXT_BLOCKS`] blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageData {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub links: Vec<LinkEntry>,
    pub images: Vec<ImageEntry>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkEntry {
    pub text: String,
    pub href: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageEntry {
    pub src: String,
    pub alt: String,
    pub title: String,
    pub width: u32,
    pub height: u32,
}

/// Record the popup round-trips through the `savedData` store key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedData {
    pub timestamp: i64,
    pub message: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::decode;
    use serde_json::json;

    #[test]
    fn test_background_actions_wire_spelling() {
        let req: BackgroundRequest = decode(&json!({ "action": "getExtensionInfo" })).unwrap();
        assert_eq!(req, BackgroundRequest::GetExtensionInfo);

        let req: BackgroundRequest =
            decode(&json!({ "action": "performAction", "data": { "kind": "sync" } })).unwrap();
        match req {
            BackgroundRequest::PerformAction { data } => {
                assert_eq!(data.unwrap()["kind"], "sync");
            }
            other => panic!("unexpected request: {:?}", other),
        }

        // performAction data is optional on the wire
        let req: BackgroundRequest = decode(&json!({ "action": "performAction" })).unwrap();
        assert_eq!(req, BackgroundRequest::PerformAction { data: None });
    }

    #[test]
    fn test_page_actions_wire_spelling() {
        let req: PageRequest =
            decode(&json!({ "action": "modifyPage", "data": { "highlight": ".hero" } })).unwrap();
        assert_eq!(
            req,
            PageRequest::ModifyPage {
                data: ModifyData {
                    highlight: Some(".hero".to_string())
                }
            }
        );

        // modifyPage without a payload is a valid no-op request
        let req: PageRequest = decode(&json!({ "action": "modifyPage" })).unwrap();
        assert_eq!(
            req,
            PageRequest::ModifyPage {
                data: ModifyData::default()
            }
        );
    }

    #[test]
    fn test_settings_default_to_enabled_with_notifications() {
        let settings = Settings::default();
        assert!(settings.enabled);
        assert!(settings.notifications);
    }

    #[test]
    fn test_extension_info_uses_camel_case_keys() {
        let info = ExtensionInfo {
            name: "Scaffold".to_string(),
            version: "1.0.0".to_string(),
            install_date: Some(1_700_000_000_000),
            settings: Settings::default(),
        };
        let wire = serde_json::to_value(&info).unwrap();
        assert!(wire.get("installDate").is_some());
        assert!(wire.get("install_date").is_none());
    }

    #[test]
    fn test_saved_data_round_trips() {
        let saved = SavedData {
            timestamp: 1_700_000_000_000,
            message: "test payload".to_string(),
            version: "1.0.0".to_string(),
        };
        let wire = serde_json::to_value(&saved).unwrap();
        let back: SavedData = serde_json::from_value(wire).unwrap();
        assert_eq!(back, saved);
    }
}
