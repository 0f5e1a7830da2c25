//! Document store drivers.
//!
//! A driver persists schemaless JSON documents grouped in collections and
//! knows nothing about entity schemas. Two backends ship with the crate:
//! an in-process map for development and tests, and PostgreSQL (JSONB)
//! through SeaORM. `RetryingStore` wraps either one with per-call
//! timeouts and retries.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Document;
use crate::types::SortOrder;

pub(crate) mod entities;
mod error;
mod memory;
mod postgres;
mod retry;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;
pub use retry::{RetryPolicy, RetryingStore};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// A persisted document with its store-assigned insertion sequence.
///
/// `seq` is the tiebreaker that keeps listings stable when sort keys are
/// equal or absent.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub body: Document,
    pub seq: i64,
}

/// Filtered, sorted, windowed read over one collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    pub collection: String,
    /// Top-level equality constraints
    pub filter: Document,
    pub sort: Vec<SortOrder>,
    pub offset: u64,
    pub limit: u64,
}

impl DocumentQuery {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            limit: u64::MAX,
            ..Default::default()
        }
    }

    pub fn filter(mut self, filter: Document) -> Self {
        self.filter = filter;
        self
    }

    pub fn sort(mut self, sort: Vec<SortOrder>) -> Self {
        self.sort = sort;
        self
    }

    pub fn window(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// Document store driver.
///
/// Implementations must be safe to share across request tasks.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document; `DuplicateId` if the id is taken
    async fn insert(&self, collection: &str, id: &str, body: Document)
        -> StoreResult<StoredDocument>;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<StoredDocument>>;

    /// Matching documents ordered by the sort keys, then by insertion
    async fn find(&self, query: &DocumentQuery) -> StoreResult<Vec<StoredDocument>>;

    async fn count(&self, collection: &str, filter: &Document) -> StoreResult<u64>;

    /// Replace the body of an existing document; `None` if it is absent
    async fn replace(
        &self,
        collection: &str,
        id: &str,
        body: Document,
    ) -> StoreResult<Option<StoredDocument>>;

    /// Remove a document, returning whether it existed
    async fn remove(&self, collection: &str, id: &str) -> StoreResult<bool>;

    /// Next value of the per-collection id sequence, starting at 1
    async fn next_sequence(&self, collection: &str) -> StoreResult<u64>;

    /// Check connectivity
    async fn ping(&self) -> StoreResult<()>;

    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}

/// Whether `body` satisfies every equality constraint in `filter`.
///
/// A `null` constraint matches an absent field.
pub(crate) fn matches_filter(body: &Document, filter: &Document) -> bool {
    filter.iter().all(|(field, expected)| match body.get(field) {
        Some(actual) => same_value(actual, expected),
        None => expected.is_null(),
    })
}

/// JSON equality with numbers compared by value, as JSONB does.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_f64() || y.is_f64() => {
            x.as_f64() == y.as_f64()
        }
        _ => a == b,
    }
}
