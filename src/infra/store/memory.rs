//! In-process document store.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use tokio::sync::RwLock;

use super::{matches_filter, DocumentQuery, DocumentStore, StoreError, StoreResult, StoredDocument};
use crate::domain::Document;
use crate::types::{Direction, SortOrder};

#[derive(Debug, Default)]
struct Collection {
    documents: HashMap<String, StoredDocument>,
    sequence: u64,
}

/// Document store backed by a map per collection.
///
/// Data lives as long as the process; nothing is persisted.
#[derive(Debug)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    insertions: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            insertions: AtomicI64::new(1),
        }
    }

    async fn matching(&self, collection: &str, filter: &Document) -> Vec<StoredDocument> {
        let guard = self.collections.read().await;
        guard
            .get(collection)
            .map(|c| {
                c.documents
                    .values()
                    .filter(|doc| matches_filter(&doc.body, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(
        &self,
        collection: &str,
        id: &str,
        body: Document,
    ) -> StoreResult<StoredDocument> {
        let mut guard = self.collections.write().await;
        let entry = guard.entry(collection.to_string()).or_default();
        if entry.documents.contains_key(id) {
            return Err(StoreError::DuplicateId {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let stored = StoredDocument {
            id: id.to_string(),
            body,
            seq: self.insertions.fetch_add(1, AtomicOrdering::SeqCst),
        };
        entry.documents.insert(id.to_string(), stored.clone());
        Ok(stored)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<StoredDocument>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|c| c.documents.get(id))
            .cloned())
    }

    async fn find(&self, query: &DocumentQuery) -> StoreResult<Vec<StoredDocument>> {
        let mut documents = self.matching(&query.collection, &query.filter).await;
        documents.sort_by(|a, b| compare_documents(a, b, &query.sort));

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        Ok(documents.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, collection: &str, filter: &Document) -> StoreResult<u64> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|c| {
                c.documents
                    .values()
                    .filter(|doc| matches_filter(&doc.body, filter))
                    .count() as u64
            })
            .unwrap_or(0))
    }

    async fn replace(
        &self,
        collection: &str,
        id: &str,
        body: Document,
    ) -> StoreResult<Option<StoredDocument>> {
        let mut guard = self.collections.write().await;
        let Some(existing) = guard
            .get_mut(collection)
            .and_then(|c| c.documents.get_mut(id))
        else {
            return Ok(None);
        };

        existing.body = body;
        Ok(Some(existing.clone()))
    }

    async fn remove(&self, collection: &str, id: &str) -> StoreResult<bool> {
        let mut guard = self.collections.write().await;
        Ok(guard
            .get_mut(collection)
            .and_then(|c| c.documents.remove(id))
            .is_some())
    }

    async fn next_sequence(&self, collection: &str) -> StoreResult<u64> {
        let mut guard = self.collections.write().await;
        let entry = guard.entry(collection.to_string()).or_default();
        entry.sequence += 1;
        Ok(entry.sequence)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Order two documents by the sort keys, then by insertion sequence.
fn compare_documents(a: &StoredDocument, b: &StoredDocument, sort: &[SortOrder]) -> Ordering {
    for order in sort {
        let ordering = compare_values(a.body.get(&order.field), b.body.get(&order.field));
        let ordering = match order.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.seq.cmp(&b.seq)
}

/// Total order over JSON values.
///
/// Absent and null sort after everything else ascending, as PostgreSQL
/// orders NULL.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            Some(Value::Bool(_)) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Array(_)) => 3,
            Some(Value::Object(_)) => 4,
            Some(Value::Null) | None => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    let x = x.as_f64().unwrap_or(f64::NAN);
                    let y = y.as_f64().unwrap_or(f64::NAN);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
            }
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
