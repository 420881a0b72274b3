//! Envelope-returning facade over a [`Store`].
//!
//! This is the surface UI code talks to: every operation returns an
//! [`Envelope`] and nothing here fails by panicking or by `Err`.

use crate::{BulkReport, BulkRequest, Envelope, QueryOptions, Record, Store};
use serde_json::Value;

/// CRUD, query and bulk operations over an injected [`Store`].
#[derive(Debug, Clone, Default)]
pub struct DataService {
    store: Store,
}

impl DataService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }

    pub fn create(&mut self, collection: &str, fields: Value) -> Envelope<Record> {
        match self.store.create(collection, fields) {
            Ok(record) => Envelope::created(collection, record),
            Err(e) => Envelope::failure(e),
        }
    }

    pub fn find_by_id(&self, collection: &str, id: &str) -> Envelope<Record> {
        self.store.get(collection, id).cloned().into()
    }

    pub fn find_many(&self, collection: &str, options: &QueryOptions) -> Envelope<Vec<Record>> {
        let result = self.store.find_many(collection, options);
        Envelope::ok(result.records).with_pagination(result.pagination)
    }

    pub fn update(&mut self, collection: &str, id: &str, partial: Value) -> Envelope<Record> {
        match self.store.update(collection, id, partial) {
            Ok(record) => Envelope::updated(collection, record),
            Err(e) => Envelope::failure(e),
        }
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> Envelope<Record> {
        match self.store.delete(collection, id) {
            Ok(record) => Envelope::deleted(collection, record),
            Err(e) => Envelope::failure(e),
        }
    }

    /// Apply a bulk request; per-id failures land in the report, not the envelope.
    pub fn bulk_operation(&mut self, collection: &str, request: &BulkRequest) -> Envelope<BulkReport> {
        match self.store.bulk(collection, request) {
            Ok(report) => Envelope::bulk_completed(request.operation, report),
            Err(e) => Envelope::failure(e),
        }
    }
}
