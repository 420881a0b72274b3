//! The uniform result shape returned by [`crate::DataService`].

use crate::{error::Result, BulkAction, BulkReport, Pagination, Record};
use serde::{Deserialize, Serialize};

/// `{success, data?, error?, message?, pagination?}`.
///
/// Failures are values, never panics: a missing record yields
/// `success: false` with `error` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            pagination: None,
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            message: None,
            pagination: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Success envelopes for mutations, shared by every surface that reports them.
impl Envelope<Record> {
    pub fn created(collection: &str, record: Record) -> Self {
        Self::ok(record).with_message(format!("Created {collection} record"))
    }

    pub fn updated(collection: &str, record: Record) -> Self {
        Self::ok(record).with_message(format!("Updated {collection} record"))
    }

    pub fn deleted(collection: &str, record: Record) -> Self {
        Self::ok(record).with_message(format!("Deleted {collection} record"))
    }
}

impl Envelope<BulkReport> {
    pub fn bulk_completed(operation: BulkAction, report: BulkReport) -> Self {
        let message = format!(
            "Bulk {operation} completed: {} succeeded, {} failed",
            report.succeeded, report.failed
        );
        Self::ok(report).with_message(message)
    }
}

impl<T> From<Result<T>> for Envelope<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Envelope::ok(data),
            Err(e) => Envelope::failure(e),
        }
    }
}
