//! Bulk operations over many record ids.

use crate::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a bulk request does to each id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    Delete,
    /// Shallow-merge `data` into each record
    Update,
    /// Set `isActive = false`
    Archive,
    /// Set `isActive = true`
    Unarchive,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Delete => "delete",
            BulkAction::Update => "update",
            BulkAction::Archive => "archive",
            BulkAction::Unarchive => "unarchive",
        }
    }
}

impl std::fmt::Display for BulkAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bulk request: `{ids, operation, data?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub ids: Vec<RecordId>,
    pub operation: BulkAction,
    /// Partial fields, required for [`BulkAction::Update`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl BulkRequest {
    pub fn new(ids: Vec<RecordId>, operation: BulkAction) -> Self {
        Self {
            ids,
            operation,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Outcome for one id of a bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemResult {
    pub id: RecordId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-id outcomes of a bulk request, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkReport {
    pub results: Vec<BulkItemResult>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkReport {
    pub(crate) fn record_success(&mut self, id: RecordId) {
        self.succeeded += 1;
        self.results.push(BulkItemResult {
            id,
            success: true,
            error: None,
        });
    }

    pub(crate) fn record_failure(&mut self, id: RecordId, error: String) {
        self.failed += 1;
        self.results.push(BulkItemResult {
            id,
            success: false,
            error: Some(error),
        });
    }

    /// Ids the operation was applied to.
    pub fn succeeded_ids(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.id.as_str())
    }
}
