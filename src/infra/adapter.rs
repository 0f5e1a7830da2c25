//! Schema-aware bridge between repositories and a document store driver.
//!
//! The adapter owns identifier generation, the entity <-> document
//! mapping and the translation of driver errors into application errors.
//! Reads are tolerant: a stored value that no longer fits its declared
//! type is passed through with a warning rather than failing the request.

use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use super::store::{DocumentQuery, DocumentStore, StoreError, StoredDocument};
use crate::config::MAX_ID_GENERATION_ATTEMPTS;
use crate::domain::{Document, Entity, EntityId, EntitySchema, IdStrategy};
use crate::errors::{AppError, AppResult};
use crate::types::ListQuery;

#[derive(Clone)]
pub struct StoreAdapter {
    store: Arc<dyn DocumentStore>,
}

impl StoreAdapter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await.map_err(AppError::from)
    }

    /// Persist a new entity, generating its identifier when none is given.
    pub async fn create(
        &self,
        schema: &EntitySchema,
        id: Option<EntityId>,
        fields: Document,
    ) -> AppResult<Entity> {
        let body = encode(fields);

        if let Some(id) = id {
            let stored = self
                .store
                .insert(&schema.collection, id.as_str(), body)
                .await?;
            return Ok(decode(schema, stored));
        }

        for attempt in 1..=MAX_ID_GENERATION_ATTEMPTS {
            let candidate = self.generate_id(schema).await?;
            match self
                .store
                .insert(&schema.collection, candidate.as_str(), body.clone())
                .await
            {
                Err(StoreError::DuplicateId { .. }) => {
                    // Client-chosen ids can occupy sequence values
                    tracing::debug!(
                        collection = %schema.collection,
                        id = %candidate,
                        attempt,
                        "Generated identifier already taken"
                    );
                }
                other => return Ok(decode(schema, other?)),
            }
        }

        Err(AppError::internal(format!(
            "no free identifier for {} after {} attempts",
            schema.name, MAX_ID_GENERATION_ATTEMPTS
        )))
    }

    async fn generate_id(&self, schema: &EntitySchema) -> AppResult<EntityId> {
        let raw = match schema.id_strategy {
            IdStrategy::Sequence => self
                .store
                .next_sequence(&schema.collection)
                .await?
                .to_string(),
            IdStrategy::Uuid => Uuid::new_v4().to_string(),
            IdStrategy::Client => {
                return Err(AppError::validation(format!(
                    "identifier '{}' must be supplied for {}",
                    schema.id_field, schema.name
                )))
            }
        };
        EntityId::parse(&raw)
    }

    pub async fn fetch(&self, schema: &EntitySchema, id: &EntityId) -> AppResult<Option<Entity>> {
        let stored = self.store.get(&schema.collection, id.as_str()).await?;
        Ok(stored.map(|doc| decode(schema, doc)))
    }

    pub async fn exists(&self, schema: &EntitySchema, id: &EntityId) -> AppResult<bool> {
        Ok(self
            .store
            .get(&schema.collection, id.as_str())
            .await?
            .is_some())
    }

    /// One window of matching entities, per the query's page request
    pub async fn find(&self, schema: &EntitySchema, query: &ListQuery) -> AppResult<Vec<Entity>> {
        let page = &query.page;
        let request = DocumentQuery::new(schema.collection.as_str())
            .filter(encode(query.filter.clone()))
            .sort(page.sort.clone())
            .window(page.offset(), page.size);

        let stored = self.store.find(&request).await?;
        Ok(stored.into_iter().map(|doc| decode(schema, doc)).collect())
    }

    pub async fn count(&self, schema: &EntitySchema, filter: &Document) -> AppResult<u64> {
        self.store
            .count(&schema.collection, &encode(filter.clone()))
            .await
            .map_err(AppError::from)
    }

    pub async fn replace(
        &self,
        schema: &EntitySchema,
        id: &EntityId,
        fields: Document,
    ) -> AppResult<Option<Entity>> {
        let stored = self
            .store
            .replace(&schema.collection, id.as_str(), encode(fields))
            .await?;
        Ok(stored.map(|doc| decode(schema, doc)))
    }

    pub async fn remove(&self, schema: &EntitySchema, id: &EntityId) -> AppResult<bool> {
        self.store
            .remove(&schema.collection, id.as_str())
            .await
            .map_err(AppError::from)
    }
}

/// Nulls are not stored; an absent field reads back as null.
fn encode(fields: Document) -> Document {
    fields.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

fn decode(schema: &EntitySchema, stored: StoredDocument) -> Entity {
    let id = match EntityId::parse(&stored.id) {
        Ok(id) => id,
        Err(_) => {
            tracing::warn!(collection = %schema.collection, id = %stored.id, "Stored identifier is not path-safe");
            EntityId::from_stored(stored.id.clone())
        }
    };

    let mut fields = Document::new();
    for (name, value) in stored.body {
        let Some(def) = schema.field_def(&name) else {
            tracing::debug!(collection = %schema.collection, id = %id, field = %name, "Dropping undeclared stored field");
            continue;
        };

        let value = match def.field_type.coerce(&value) {
            Ok(coerced) => coerced,
            Err(e) => {
                tracing::warn!(
                    collection = %schema.collection,
                    id = %id,
                    field = %name,
                    "Stored value does not match declared type: {}",
                    e
                );
                value
            }
        };
        if value != Value::Null {
            fields.insert(name, value);
        }
    }

    Entity::new(id, fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{catalog, FieldDef, FieldType};
    use crate::infra::store::{MemoryStore, MockDocumentStore};
    use crate::types::{PageRequest, SortOrder};
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn adapter() -> StoreAdapter {
        StoreAdapter::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_sequence_ids_start_at_one() {
        let adapter = adapter();
        let schema = catalog::widget();

        let first = adapter
            .create(&schema, None, doc(json!({"name": "bolt"})))
            .await
            .unwrap();
        let second = adapter
            .create(&schema, None, doc(json!({"name": "nut"})))
            .await
            .unwrap();

        assert_eq!(first.id.as_str(), "1");
        assert_eq!(second.id.as_str(), "2");
    }

    #[tokio::test]
    async fn test_generation_skips_client_chosen_ids() {
        let adapter = adapter();
        let schema = catalog::widget();

        adapter
            .create(&schema, Some(EntityId::parse("1").unwrap()), Document::new())
            .await
            .unwrap();
        let generated = adapter.create(&schema, None, Document::new()).await.unwrap();

        assert_eq!(generated.id.as_str(), "2");
    }

    #[tokio::test]
    async fn test_duplicate_client_id_is_validation_error() {
        let adapter = adapter();
        let schema = catalog::widget();
        let id = EntityId::parse("bolt-1").unwrap();

        adapter
            .create(&schema, Some(id.clone()), Document::new())
            .await
            .unwrap();
        let err = adapter
            .create(&schema, Some(id), Document::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_uuid_strategy() {
        let adapter = adapter();
        let schema = catalog::widget().id_strategy(IdStrategy::Uuid);

        let created = adapter.create(&schema, None, Document::new()).await.unwrap();
        assert!(Uuid::parse_str(created.id.as_str()).is_ok());
    }

    #[tokio::test]
    async fn test_nulls_are_not_stored() {
        let adapter = adapter();
        let schema = catalog::widget();

        let created = adapter
            .create(&schema, None, doc(json!({"name": "bolt", "qty": null})))
            .await
            .unwrap();
        assert!(!created.fields.contains_key("qty"));
    }

    #[tokio::test]
    async fn test_decode_tolerates_drifted_values() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert("widgets", "1", doc(json!({"name": 42, "legacy": true})))
            .await
            .unwrap();
        let adapter = StoreAdapter::new(store);

        let entity = adapter
            .fetch(&catalog::widget(), &EntityId::parse("1").unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(entity.fields.get("name"), Some(&json!(42)));
        assert!(!entity.fields.contains_key("legacy"));
    }

    #[tokio::test]
    async fn test_decode_normalizes_timestamps() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert("events", "1", doc(json!({"at": "2024-01-01T01:00:00+01:00"})))
            .await
            .unwrap();
        let adapter = StoreAdapter::new(store);
        let schema = EntitySchema::new("Event").field(FieldDef::new("at", FieldType::Timestamp));

        let entity = adapter
            .fetch(&schema, &EntityId::parse("1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entity.fields["at"], json!("2024-01-01T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_find_applies_page_window() {
        let adapter = adapter();
        let schema = catalog::widget();
        for qty in 1..=5 {
            adapter
                .create(&schema, None, doc(json!({"name": "w", "qty": qty})))
                .await
                .unwrap();
        }

        let query = ListQuery::new(
            Document::new(),
            PageRequest::new(1, 2).sorted_by(SortOrder::desc("qty")),
        );
        let page = adapter.find(&schema, &query).await.unwrap();
        let quantities: Vec<_> = page.iter().map(|e| e.fields["qty"].clone()).collect();
        assert_eq!(quantities, vec![json!(3), json!(2)]);
    }

    #[tokio::test]
    async fn test_store_outage_maps_to_unavailable() {
        let mut mock = MockDocumentStore::new();
        mock.expect_get()
            .returning(|_, _| Err(StoreError::Unavailable("refused".into())));
        let adapter = StoreAdapter::new(Arc::new(mock));

        let err = adapter
            .fetch(&catalog::widget(), &EntityId::parse("1").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }
}
