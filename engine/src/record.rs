//! Record types for storing data.

use crate::{RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Field names the engine owns. Callers cannot overwrite them through
/// `create` or `update` payloads.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// Field toggled by the archive / unarchive bulk operations.
pub const ACTIVE_FIELD: &str = "isActive";

/// A data record in a collection.
///
/// Serializes flat: `{"id": .., "createdAt": .., "updatedAt": .., ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier for this record
    pub id: RecordId,
    /// When the record was created (milliseconds since epoch)
    pub created_at: Timestamp,
    /// When the record was last modified (milliseconds since epoch)
    pub updated_at: Timestamp,
    /// Domain fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create a new record. Reserved keys in `fields` are dropped.
    pub fn new(id: impl Into<RecordId>, mut fields: Map<String, Value>, timestamp: Timestamp) -> Self {
        strip_reserved(&mut fields);
        Self {
            id: id.into(),
            created_at: timestamp,
            updated_at: timestamp,
            fields,
        }
    }

    /// Read a field by name, including the engine-managed ones.
    pub fn get(&self, field: &str) -> Option<Cow<'_, Value>> {
        match field {
            "id" => Some(Cow::Owned(Value::String(self.id.clone()))),
            "createdAt" => Some(Cow::Owned(Value::from(self.created_at))),
            "updatedAt" => Some(Cow::Owned(Value::from(self.updated_at))),
            _ => self.fields.get(field).map(Cow::Borrowed),
        }
    }

    /// Shallow-merge `partial` into the domain fields and bump `updated_at`.
    ///
    /// Nested objects are replaced wholesale, not merged.
    pub fn merge(&mut self, mut partial: Map<String, Value>, timestamp: Timestamp) {
        strip_reserved(&mut partial);
        for (key, value) in partial {
            self.fields.insert(key, value);
        }
        self.updated_at = timestamp;
    }

    /// Set the `isActive` flag and bump `updated_at`.
    pub fn set_active(&mut self, active: bool, timestamp: Timestamp) {
        self.fields.insert(ACTIVE_FIELD.to_string(), Value::Bool(active));
        self.updated_at = timestamp;
    }

    /// Records without an `isActive` field count as active.
    pub fn is_active(&self) -> bool {
        self.fields
            .get(ACTIVE_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }

    /// Case-insensitive substring match over the id and every string field.
    ///
    /// `needle` must already be lowercase.
    pub fn matches_text(&self, needle: &str) -> bool {
        if self.id.to_lowercase().contains(needle) {
            return true;
        }
        self.fields.values().any(|value| match value {
            Value::String(s) => s.to_lowercase().contains(needle),
            _ => false,
        })
    }

    /// Serialize into a single JSON object.
    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("id".into(), Value::String(self.id.clone()));
        object.insert("createdAt".into(), Value::from(self.created_at));
        object.insert("updatedAt".into(), Value::from(self.updated_at));
        Value::Object(object)
    }
}

fn strip_reserved(fields: &mut Map<String, Value>) {
    for key in RESERVED_FIELDS {
        fields.remove(key);
    }
}
