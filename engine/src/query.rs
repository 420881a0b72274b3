//! Query options and the filter / search / sort / paginate pipeline.

use crate::Record;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Page used when the caller does not pick one.
pub const DEFAULT_PAGE: usize = 1;
/// Page size used when the caller does not pick one.
pub const DEFAULT_LIMIT: usize = 10;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Options for [`crate::Store::find_many`].
///
/// Stages run in a fixed order: filters, search, sort, pagination.
/// `page` and `limit` are not validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    /// Field → value (equality) or array (set membership).
    /// Null and empty-string values are ignored.
    #[serde(default)]
    pub filters: BTreeMap<String, Value>,
    /// Case-insensitive substring matched against string fields
    #[serde(default)]
    pub search: Option<String>,
    /// Field to sort by; insertion order when absent
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: SortOrder,
    /// 1-based page number
    #[serde(default)]
    pub page: Option<usize>,
    /// Page size
    #[serde(default)]
    pub limit: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`.
    pub fn filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.insert(field.into(), value);
        self
    }

    /// Require `field` to be one of `values`.
    pub fn one_of(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.filters.insert(field.into(), Value::Array(values));
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(field.into());
        self.sort_order = order;
        self
    }

    pub fn paginate(mut self, page: usize, limit: usize) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    /// Run the pipeline over `records` (in collection order).
    pub fn apply<'a, I>(&self, records: I) -> (Vec<&'a Record>, Pagination)
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let needle = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matched: Vec<&Record> = records
            .into_iter()
            .filter(|r| self.matches_filters(r))
            .filter(|r| needle.as_deref().map_or(true, |n| r.matches_text(n)))
            .collect();

        if let Some(field) = self.sort_by.as_deref() {
            // sort_by is stable; reversing the comparator keeps ties in
            // encounter order for descending sorts too.
            matched.sort_by(|a, b| {
                let ord = compare_values(a.get(field).as_deref(), b.get(field).as_deref());
                match self.sort_order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        let pagination = Pagination::new(page, limit, matched.len());

        let rows = if limit == 0 {
            Vec::new()
        } else {
            let offset = page.saturating_sub(1).saturating_mul(limit);
            matched.into_iter().skip(offset).take(limit).collect()
        };

        (rows, pagination)
    }

    fn matches_filters(&self, record: &Record) -> bool {
        self.filters.iter().all(|(field, expected)| {
            if is_blank(expected) {
                return true;
            }
            let actual = record.get(field);
            match expected {
                Value::Array(allowed) => actual.is_some_and(|v| allowed.contains(v.as_ref())),
                _ => actual.is_some_and(|v| v.as_ref() == expected),
            }
        })
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Total order over JSON values used for sorting.
///
/// Missing and null sort first, then bools, numbers, strings, arrays, objects.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x.len().cmp(&y.len()),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Pagination metadata for a [`QueryResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    /// Matching records across all pages
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// One page of records plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub records: Vec<Record>,
    pub pagination: Pagination,
}
