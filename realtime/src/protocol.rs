//! Realtime message protocol definitions.
//!
//! Every frame is a JSON object `{"type", "data", "timestamp", "id"}`.
//! `type` is a snake_case event name; unknown names are kept as
//! [`EventKind::Custom`] rather than rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// WebSocket close codes the channel cares about.
pub mod close_code {
    /// Intentional shutdown; the only code that does not trigger a reconnect.
    pub const NORMAL: u16 = 1000;
    /// No close status was present in the close frame.
    pub const NO_STATUS: u16 = 1005;
    /// The transport went away without a close frame.
    pub const ABNORMAL: u16 = 1006;
}

/// Kinds of realtime events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// Keep-alive; never dispatched to subscribers
    Heartbeat,
    Notification,
    Chat,
    Announcement,
    GradeUpdated,
    AttendanceMarked,
    QuizSubmitted,
    /// A collection record was created, updated or deleted
    DataChanged,
    Custom(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Heartbeat => "heartbeat",
            EventKind::Notification => "notification",
            EventKind::Chat => "chat",
            EventKind::Announcement => "announcement",
            EventKind::GradeUpdated => "grade_updated",
            EventKind::AttendanceMarked => "attendance_marked",
            EventKind::QuizSubmitted => "quiz_submitted",
            EventKind::DataChanged => "data_changed",
            EventKind::Custom(name) => name,
        }
    }
}

impl From<&str> for EventKind {
    fn from(name: &str) -> Self {
        match name {
            "heartbeat" => EventKind::Heartbeat,
            "notification" => EventKind::Notification,
            "chat" => EventKind::Chat,
            "announcement" => EventKind::Announcement,
            "grade_updated" => EventKind::GradeUpdated,
            "attendance_marked" => EventKind::AttendanceMarked,
            "quiz_submitted" => EventKind::QuizSubmitted,
            "data_changed" => EventKind::DataChanged,
            other => EventKind::Custom(other.to_string()),
        }
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        match EventKind::from(name.as_str()) {
            EventKind::Custom(_) => EventKind::Custom(name),
            known => known,
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single realtime frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeMessage {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Opaque payload
    #[serde(default)]
    pub data: Value,
    /// Epoch milliseconds at send time
    #[serde(default)]
    pub timestamp: u64,
    /// Correlation id
    #[serde(default)]
    pub id: String,
}

impl RealtimeMessage {
    /// Create a message with a fresh correlation id.
    pub fn new(kind: EventKind, data: Value, timestamp: u64) -> Self {
        Self {
            kind,
            data,
            timestamp,
            id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Create a heartbeat message.
    pub fn heartbeat(timestamp: u64) -> Self {
        Self::new(EventKind::Heartbeat, Value::Null, timestamp)
    }

    pub fn is_heartbeat(&self) -> bool {
        self.kind == EventKind::Heartbeat
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_serialization() {
        let msg = RealtimeMessage {
            kind: EventKind::GradeUpdated,
            data: json!({"studentId": "s-1", "score": 18}),
            timestamp: 1706745600000,
            id: "m-1".to_string(),
        };

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "grade_updated",
                "data": {"studentId": "s-1", "score": 18},
                "timestamp": 1706745600000u64,
                "id": "m-1"
            })
        );

        let parsed = RealtimeMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_unknown_kinds_are_custom() {
        let msg = RealtimeMessage::decode(r#"{"type": "lesson_started", "data": 1}"#).unwrap();
        assert_eq!(msg.kind, EventKind::Custom("lesson_started".to_string()));
        assert_eq!(msg.timestamp, 0);
        assert!(msg.id.is_empty());

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"lesson_started""#));
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in [
            EventKind::Heartbeat,
            EventKind::Notification,
            EventKind::Chat,
            EventKind::Announcement,
            EventKind::GradeUpdated,
            EventKind::AttendanceMarked,
            EventKind::QuizSubmitted,
            EventKind::DataChanged,
        ] {
            assert_eq!(EventKind::from(kind.as_str()), kind);
        }
    }

    #[test]
    fn test_heartbeat() {
        let hb = RealtimeMessage::heartbeat(42);
        assert!(hb.is_heartbeat());
        assert_eq!(hb.timestamp, 42);
        assert!(!hb.id.is_empty());

        let a = RealtimeMessage::new(EventKind::Chat, json!({}), 0);
        let b = RealtimeMessage::new(EventKind::Chat, json!({}), 0);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_missing_type_is_rejected() {
        assert!(RealtimeMessage::decode(r#"{"data": {}}"#).is_err());
        assert!(RealtimeMessage::decode("not json").is_err());
    }
}
