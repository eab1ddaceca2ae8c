use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A provider notification, already decoded from its transport envelope.
///
/// `event_type` identifies the event family and, for most families, a subtype (e.g.
/// `EC2_Instance_State_change_Notification_running` or `AWS_API_CALL_StartInstances`). `payload`
/// is the notification body as decoded JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event family and subtype.
    #[serde(alias = "eventType")]
    pub event_type: String,
    /// Decoded notification body. Missing payloads deserialize as `null`.
    #[serde(default, alias = "full_data")]
    pub payload: Value,
}

impl Event {
    /// Create an event from its type and decoded payload.
    pub fn new(event_type: impl Into<String>, payload: Value) -> Event {
        Event {
            event_type: event_type.into(),
            payload,
        }
    }
}
