// Request/response envelope and the defensive decode boundary.
//
// Dispatch inside each context is a closed enum, so exhaustiveness is
// checked at compile time. The checks here only guard the edge where a
// raw envelope enters from another context: missing tag, unknown tag,
// or a payload that does not match the tagged shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Closed action list of a receiving context's dispatch table.
pub trait Routed: DeserializeOwned {
    /// Actions this context answers, in wire spelling.
    const ACTIONS: &'static [&'static str];
}

/// The single reply envelope every handler produces.
///
/// Invariants: `success: false` always carries a non-empty `error`;
/// `success: true` never carries one. The constructors enforce both.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Response {
    /// Bare success with no payload.
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            message: None,
            timestamp: None,
        }
    }

    /// Success carrying a `data` payload.
    pub fn with_data(data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self {
                data: Some(value),
                ..Self::ok()
            },
            Err(e) => Self::err(format!("failed to encode response data: {}", e)),
        }
    }

    /// Success carrying a human-readable `message`.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    /// Failure. An empty error text is replaced so the invariant holds.
    pub fn err(error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            error = "unspecified error".to_string();
        }
        Self {
            success: false,
            data: None,
            error: Some(error),
            message: None,
            timestamp: None,
        }
    }

    /// Stamp the reply with the current time.
    pub fn timestamped(mut self) -> Self {
        self.timestamp = Some(now_millis());
        self
    }

    /// Decode the `data` payload into a typed value.
    pub fn data_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.data
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Why an incoming envelope failed to route.
#[derive(Debug, PartialEq)]
pub enum DecodeError {
    /// Envelope had no `action` field, or an empty one.
    MissingAction,
    /// `action` named no handler in the receiving context.
    UnknownAction(String),
    /// Action was known but the payload did not match its shape.
    BadPayload { action: String, detail: String },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::MissingAction => write!(f, "message is missing an action"),
            DecodeError::UnknownAction(action) => write!(f, "unknown action: {}", action),
            DecodeError::BadPayload { action, detail } => {
                write!(f, "malformed payload for {}: {}", action, detail)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<DecodeError> for Response {
    fn from(e: DecodeError) -> Self {
        Response::err(e.to_string())
    }
}

/// Extract the `action` tag from a raw envelope.
pub fn action_of(raw: &Value) -> Result<&str, DecodeError> {
    match raw.get("action").and_then(Value::as_str) {
        Some(action) if !action.is_empty() => Ok(action),
        _ => Err(DecodeError::MissingAction),
    }
}

/// Decode a raw envelope against a context's closed dispatch table.
pub fn decode<T: Routed>(raw: &Value) -> Result<T, DecodeError> {
    let action = action_of(raw)?;
    if !T::ACTIONS.contains(&action) {
        return Err(DecodeError::UnknownAction(action.to_string()));
    }
    serde_json::from_value(raw.clone()).map_err(|e| DecodeError::BadPayload {
        action: action.to_string(),
        detail: e.to_string(),
    })
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
