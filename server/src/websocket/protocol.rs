//! Server-originated realtime messages.
//!
//! Frames on the wire are [`RealtimeMessage`]s, the same envelope the
//! channel client speaks. The server adds one message of its own:
//! `data_changed`, pushed to every connection after a collection mutation.

use schoolhub_engine::BulkAction;
use schoolhub_realtime::{EventKind, RealtimeMessage};
use serde::Serialize;
use serde_json::json;

/// What happened to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
    Archived,
    Unarchived,
}

impl From<BulkAction> for ChangeAction {
    fn from(action: BulkAction) -> Self {
        match action {
            BulkAction::Delete => ChangeAction::Deleted,
            BulkAction::Update => ChangeAction::Updated,
            BulkAction::Archive => ChangeAction::Archived,
            BulkAction::Unarchive => ChangeAction::Unarchived,
        }
    }
}

/// Build a `data_changed` message for one record.
pub fn data_changed(collection: &str, action: ChangeAction, id: &str) -> RealtimeMessage {
    RealtimeMessage::new(
        EventKind::DataChanged,
        json!({
            "collection": collection,
            "action": action,
            "id": id,
        }),
        now_ms(),
    )
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
