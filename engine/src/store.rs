//! Store - the in-memory state container.
//!
//! The Store maps collection names to insertion-ordered lists of records.
//! It is a plain value: there is no global instance and no internal locking,
//! so concurrent users must serialize access themselves.

use crate::{
    error::Result, BulkAction, BulkReport, BulkRequest, Clock, CollectionName, Error,
    QueryOptions, QueryResult, Record, RecordId, SystemClock,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// An ordered collection of records.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    records: Vec<Record>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Get a record by ID.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Get a mutable record by ID.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Record> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    /// Append a record.
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Remove a record by ID, keeping the order of the rest.
    pub fn remove(&mut self, id: &str) -> Option<Record> {
        let index = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(index))
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Record counts per collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub collections: BTreeMap<CollectionName, usize>,
    pub total_records: usize,
}

/// The main store holding all collections.
#[derive(Debug, Clone)]
pub struct Store {
    clock: Arc<dyn Clock>,
    collections: HashMap<CollectionName, Collection>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create an empty store stamped by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamped by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            collections: HashMap::new(),
        }
    }

    /// Get a collection by name.
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// Insert a new record with a fresh id. Unknown collections are created.
    pub fn create(&mut self, collection: &str, fields: Value) -> Result<Record> {
        let fields = into_object(fields)?;
        let id = uuid::Uuid::new_v4().to_string();
        let record = Record::new(id, fields, self.clock.now());

        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());

        Ok(record)
    }

    /// Get a record by collection and ID.
    pub fn get(&self, collection: &str, id: &str) -> Result<&Record> {
        self.collections
            .get(collection)
            .and_then(|c| c.get(id))
            .ok_or_else(|| Error::not_found(collection, id))
    }

    /// Filter, search, sort and paginate a collection.
    ///
    /// An unknown collection behaves like an empty one.
    pub fn find_many(&self, collection: &str, options: &QueryOptions) -> QueryResult {
        let records = self
            .collections
            .get(collection)
            .into_iter()
            .flat_map(|c| c.iter());

        let (rows, pagination) = options.apply(records);

        QueryResult {
            records: rows.into_iter().cloned().collect(),
            pagination,
        }
    }

    /// Shallow-merge `partial` into a record and refresh `updatedAt`.
    ///
    /// The collection is left untouched when the id does not exist.
    pub fn update(&mut self, collection: &str, id: &str, partial: Value) -> Result<Record> {
        let partial = into_object(partial)?;
        let now = self.clock.now();

        let record = self
            .collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| Error::not_found(collection, id))?;

        record.merge(partial, now);
        Ok(record.clone())
    }

    /// Remove a record and return it.
    pub fn delete(&mut self, collection: &str, id: &str) -> Result<Record> {
        self.collections
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .ok_or_else(|| Error::not_found(collection, id))
    }

    /// Apply one action to every id independently.
    ///
    /// A missing id is reported in the [`BulkReport`] and does not stop the
    /// batch. Only a malformed request (update without a data object) fails
    /// as a whole.
    pub fn bulk(&mut self, collection: &str, request: &BulkRequest) -> Result<BulkReport> {
        let partial = match request.operation {
            BulkAction::Update => match &request.data {
                Some(data) => Some(into_object(data.clone())?),
                None => return Err(Error::MissingBulkData(request.operation.to_string())),
            },
            _ => None,
        };

        let mut report = BulkReport::default();
        for id in &request.ids {
            let outcome = match request.operation {
                BulkAction::Delete => self.delete(collection, id).map(|_| ()),
                BulkAction::Update => {
                    let partial = partial.clone().unwrap_or_default();
                    self.update(collection, id, Value::Object(partial)).map(|_| ())
                }
                BulkAction::Archive => self.set_active(collection, id, false),
                BulkAction::Unarchive => self.set_active(collection, id, true),
            };

            match outcome {
                Ok(()) => report.record_success(id.clone()),
                Err(e) => report.record_failure(id.clone(), e.to_string()),
            }
        }

        Ok(report)
    }

    fn set_active(&mut self, collection: &str, id: &str, active: bool) -> Result<()> {
        let now = self.clock.now();
        let record = self
            .collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| Error::not_found(collection, id))?;
        record.set_active(active, now);
        Ok(())
    }

    /// Ids of every record in a collection, in order.
    pub fn ids(&self, collection: &str) -> Vec<RecordId> {
        self.collections
            .get(collection)
            .map(|c| c.iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Record counts per collection.
    pub fn stats(&self) -> StoreStats {
        let collections: BTreeMap<_, _> = self
            .collections
            .iter()
            .map(|(name, c)| (name.clone(), c.len()))
            .collect();
        let total_records = collections.values().sum();
        StoreStats {
            collections,
            total_records,
        }
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidPayload(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
