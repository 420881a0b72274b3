//! # SchoolHub Engine
//!
//! An in-memory collection query engine for prototyping school-management
//! data (students, classes, quizzes, lessons) without a database.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches files, network or a logger
//! - **Explicit state**: all data lives in a [`Store`] value the caller owns;
//!   there is no module-level singleton, so independent stores never interact
//! - **No locking**: mutations take `&mut Store`; callers that share a store
//!   across tasks bring their own lock
//! - **Injectable time**: timestamps come from a [`Clock`], so tests can pin them
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is a flat JSON object with three engine-managed fields:
//! - `id` - a fresh UUID v4 string
//! - `createdAt` / `updatedAt` - epoch milliseconds
//!
//! ### Queries
//!
//! [`QueryOptions`] runs filters, free-text search, a stable sort and
//! pagination, in that order, and reports [`Pagination`] metadata.
//!
//! ### Envelopes
//!
//! [`DataService`] wraps a [`Store`] and returns every result as an
//! [`Envelope`] (`{success, data, error, message, pagination}`), which is the
//! shape UI code and the HTTP layer consume.
//!
//! ## Quick Start
//!
//! ```rust
//! use schoolhub_engine::{DataService, QueryOptions, Store};
//! use serde_json::json;
//!
//! let mut service = DataService::new(Store::new());
//!
//! let created = service.create("students", json!({"name": "Ana", "grade": 9}));
//! let ana = created.data.unwrap();
//!
//! service.create("students", json!({"name": "Bruno", "grade": 10}));
//!
//! let page = service.find_many(
//!     "students",
//!     &QueryOptions::new().filter("grade", json!(9)),
//! );
//! assert_eq!(page.data.unwrap()[0].id, ana.id);
//! assert_eq!(page.pagination.unwrap().total, 1);
//! ```

pub mod bulk;
pub mod clock;
pub mod envelope;
pub mod error;
pub mod query;
pub mod record;
pub mod service;
pub mod store;

// Re-export main types at crate root
pub use bulk::{BulkAction, BulkItemResult, BulkReport, BulkRequest};
pub use clock::{Clock, ManualClock, SystemClock};
pub use envelope::Envelope;
pub use error::Error;
pub use query::{Pagination, QueryOptions, QueryResult, SortOrder};
pub use record::Record;
pub use service::DataService;
pub use store::{Collection, Store, StoreStats};

/// Type aliases for clarity
pub type RecordId = String;
pub type CollectionName = String;
pub type Timestamp = u64;
