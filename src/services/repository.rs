//! Entity repositories - one per declared entity type.
//!
//! A repository validates payloads against its schema, checks that
//! references point at existing entities and drives the store adapter.
//! It knows nothing about HTTP.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use super::pager::EntityPager;
use crate::domain::{Document, Entity, EntityId, EntitySchema, FieldType, SchemaRegistry, WriteMode};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::StoreAdapter;
use crate::types::{ListQuery, PageRequest};

/// Whatever a relation path resolves to
#[derive(Debug, Clone)]
pub enum Related {
    /// Single-valued reference
    One(Arc<EntitySchema>, Entity),
    /// Multi-valued reference; dangling targets are left out
    Many(Arc<EntitySchema>, Vec<Entity>),
}

/// Repository trait for one entity type.
#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Schema this repository serves
    fn schema(&self) -> Arc<EntitySchema>;

    /// Validate and persist a new entity
    async fn create(&self, body: Document) -> AppResult<Entity>;

    async fn get_by_id(&self, id: &EntityId) -> AppResult<Entity>;

    /// Lazy listing; nothing is read until the pager is driven
    fn list(&self, query: ListQuery) -> EntityPager;

    /// Replace or merge the fields of an existing entity
    async fn update(&self, id: &EntityId, body: Document, mode: WriteMode) -> AppResult<Entity>;

    async fn delete(&self, id: &EntityId) -> AppResult<()>;

    /// Lazy listing restricted by a declared finder
    fn find_by(&self, finder: &str, raw_value: &str, page: PageRequest) -> AppResult<EntityPager>;

    /// Resolve a reference field of an existing entity
    async fn follow(&self, id: &EntityId, relation: &str) -> AppResult<Related>;
}

/// Concrete implementation of EntityRepository over the store adapter
pub struct DocumentRepository {
    schema: Arc<EntitySchema>,
    registry: Arc<SchemaRegistry>,
    adapter: Arc<StoreAdapter>,
}

impl DocumentRepository {
    /// Create new repository instance
    pub fn new(
        schema: Arc<EntitySchema>,
        registry: Arc<SchemaRegistry>,
        adapter: Arc<StoreAdapter>,
    ) -> Self {
        Self {
            schema,
            registry,
            adapter,
        }
    }

    /// Every reference value in `fields` must name an existing entity.
    async fn check_references(&self, fields: &Document) -> AppResult<()> {
        for def in self.schema.references() {
            let Some(value) = fields.get(&def.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let Some(target_name) = def.field_type.target() else {
                continue;
            };
            let target = self.registry.get(target_name)?;

            for id in reference_ids(value)? {
                if !self.adapter.exists(&target, &id).await? {
                    return Err(AppError::validation(format!(
                        "field '{}': {} {} does not exist",
                        def.name, target.name, id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Identifiers held by a coerced reference value (string or array of strings).
fn reference_ids(value: &Value) -> AppResult<Vec<EntityId>> {
    match value {
        Value::Array(items) => items.iter().map(EntityId::from_value).collect(),
        single => Ok(vec![EntityId::from_value(single)?]),
    }
}

/// Apply a partial update: present keys overwrite, nulls clear.
fn merge(mut current: Document, patch: Document) -> Document {
    for (key, value) in patch {
        if value.is_null() {
            current.remove(&key);
        } else {
            current.insert(key, value);
        }
    }
    current
}

#[async_trait]
impl EntityRepository for DocumentRepository {
    fn schema(&self) -> Arc<EntitySchema> {
        self.schema.clone()
    }

    async fn create(&self, body: Document) -> AppResult<Entity> {
        let (id, fields) = self.schema.check_payload(&body, WriteMode::Create)?;
        self.check_references(&fields).await?;

        let entity = self.adapter.create(&self.schema, id, fields).await?;
        tracing::info!(entity = %self.schema.name, id = %entity.id, "Entity created");
        Ok(entity)
    }

    async fn get_by_id(&self, id: &EntityId) -> AppResult<Entity> {
        self.adapter
            .fetch(&self.schema, id)
            .await?
            .ok_or_not_found()
    }

    fn list(&self, query: ListQuery) -> EntityPager {
        EntityPager::new(self.adapter.clone(), self.schema.clone(), query)
    }

    async fn update(&self, id: &EntityId, body: Document, mode: WriteMode) -> AppResult<Entity> {
        let (body_id, fields) = self.schema.check_payload(&body, mode)?;
        if let Some(body_id) = body_id {
            if body_id != *id {
                return Err(AppError::validation(format!(
                    "identifier '{}' in body does not match {}",
                    body_id, id
                )));
            }
        }
        self.check_references(&fields).await?;

        let fields = match mode {
            WriteMode::Patch => {
                let current = self.get_by_id(id).await?;
                merge(current.fields, fields)
            }
            WriteMode::Create | WriteMode::Replace => fields,
        };

        let entity = self
            .adapter
            .replace(&self.schema, id, fields)
            .await?
            .ok_or_not_found()?;
        tracing::info!(entity = %self.schema.name, id = %id, ?mode, "Entity updated");
        Ok(entity)
    }

    async fn delete(&self, id: &EntityId) -> AppResult<()> {
        if !self.adapter.remove(&self.schema, id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(entity = %self.schema.name, id = %id, "Entity deleted");
        Ok(())
    }

    fn find_by(&self, finder: &str, raw_value: &str, page: PageRequest) -> AppResult<EntityPager> {
        let finder = self.schema.find_finder(finder).ok_or_else(|| {
            AppError::unsupported(format!("{}/search/{}", self.schema.collection, finder))
        })?;
        let value = self.schema.coerce_param(&finder.field, raw_value)?;

        let mut filter = Map::new();
        filter.insert(finder.field.clone(), value);
        Ok(self.list(ListQuery::new(filter, page)))
    }

    async fn follow(&self, id: &EntityId, relation: &str) -> AppResult<Related> {
        let def = self
            .schema
            .field_def(relation)
            .filter(|d| d.field_type.is_reference())
            .ok_or_else(|| {
                AppError::unsupported(format!("{}/{}/{}", self.schema.collection, id, relation))
            })?;
        let target_name = def
            .field_type
            .target()
            .ok_or_else(|| AppError::internal(format!("reference '{}' has no target", relation)))?;
        let target = self.registry.get(target_name)?;
        let entity = self.get_by_id(id).await?;

        match &def.field_type {
            FieldType::References { .. } => {
                let ids = match entity.get(relation) {
                    Some(value) => reference_ids(value)?,
                    None => Vec::new(),
                };
                let fetches = ids.iter().map(|id| self.adapter.fetch(&target, id));
                let found = futures::future::try_join_all(fetches).await?;
                let related = found.into_iter().flatten().collect();
                Ok(Related::Many(target, related))
            }
            _ => {
                let target_id = entity
                    .get(relation)
                    .map(EntityId::from_value)
                    .transpose()?
                    .ok_or_not_found()?;
                let related = self
                    .adapter
                    .fetch(&target, &target_id)
                    .await?
                    .ok_or_not_found()?;
                Ok(Related::One(target, related))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{catalog, Capabilities, FieldDef, Finder, IdStrategy};
    use crate::infra::MemoryStore;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn team() -> EntitySchema {
        EntitySchema::new("Team")
            .field(FieldDef::new("title", FieldType::String))
            .field(FieldDef::new(
                "members",
                FieldType::References {
                    target: "Person".into(),
                },
            ))
    }

    fn registry() -> Arc<SchemaRegistry> {
        let mut schemas = catalog::builtin();
        schemas.push(team());
        Arc::new(SchemaRegistry::new(schemas).unwrap())
    }

    fn repository(name: &str) -> (DocumentRepository, Arc<StoreAdapter>, Arc<SchemaRegistry>) {
        let registry = registry();
        let adapter = Arc::new(StoreAdapter::new(Arc::new(MemoryStore::new())));
        let repo = DocumentRepository::new(
            registry.get(name).unwrap(),
            registry.clone(),
            adapter.clone(),
        );
        (repo, adapter, registry)
    }

    fn sibling(name: &str, adapter: &Arc<StoreAdapter>, registry: &Arc<SchemaRegistry>) -> DocumentRepository {
        DocumentRepository::new(registry.get(name).unwrap(), registry.clone(), adapter.clone())
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let (repo, _, _) = repository("Widget");

        let created = repo
            .create(doc(json!({"name": "bolt", "qty": 5})))
            .await
            .unwrap();
        let fetched = repo.get_by_id(&created.id).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.fields, doc(json!({"name": "bolt", "qty": 5})));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_payload() {
        let (repo, _, _) = repository("Widget");

        let missing = repo.create(doc(json!({"qty": 5}))).await.unwrap_err();
        assert!(matches!(missing, AppError::Validation(_)));

        let unknown = repo
            .create(doc(json!({"name": "bolt", "colour": "red"})))
            .await
            .unwrap_err();
        assert!(matches!(unknown, AppError::Validation(_)));

        let wrong_type = repo
            .create(doc(json!({"name": "bolt", "qty": "many"})))
            .await
            .unwrap_err();
        assert!(matches!(wrong_type, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let (repo, _, _) = repository("Widget");
        let created = repo.create(doc(json!({"name": "bolt"}))).await.unwrap();

        repo.delete(&created.id).await.unwrap();

        assert!(matches!(
            repo.get_by_id(&created.id).await.unwrap_err(),
            AppError::NotFound
        ));
        assert!(matches!(
            repo.delete(&created.id).await.unwrap_err(),
            AppError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_replace_is_idempotent() {
        let (repo, _, _) = repository("Widget");
        let created = repo
            .create(doc(json!({"name": "bolt", "qty": 5})))
            .await
            .unwrap();
        let body = doc(json!({"name": "nut"}));

        let once = repo
            .update(&created.id, body.clone(), WriteMode::Replace)
            .await
            .unwrap();
        let twice = repo
            .update(&created.id, body, WriteMode::Replace)
            .await
            .unwrap();

        assert_eq!(once, twice);
        assert!(!twice.fields.contains_key("qty"));
    }

    #[tokio::test]
    async fn test_patch_keeps_other_fields() {
        let (repo, _, _) = repository("Widget");
        let created = repo
            .create(doc(json!({"name": "bolt", "qty": 5})))
            .await
            .unwrap();

        let patched = repo
            .update(&created.id, doc(json!({"qty": 7})), WriteMode::Patch)
            .await
            .unwrap();
        assert_eq!(patched.fields, doc(json!({"name": "bolt", "qty": 7})));

        let cleared = repo
            .update(&created.id, doc(json!({"qty": null})), WriteMode::Patch)
            .await
            .unwrap();
        assert_eq!(cleared.fields, doc(json!({"name": "bolt"})));
    }

    #[tokio::test]
    async fn test_update_of_absent_entity_is_not_found() {
        let (repo, _, _) = repository("Widget");
        let id = EntityId::parse("42").unwrap();

        for mode in [WriteMode::Replace, WriteMode::Patch] {
            let err = repo
                .update(&id, doc(json!({"name": "bolt"})), mode)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound));
        }
    }

    #[tokio::test]
    async fn test_body_identifier_must_match_path() {
        let (repo, _, _) = repository("Widget");
        let created = repo.create(doc(json!({"name": "bolt"}))).await.unwrap();

        let err = repo
            .update(&created.id, doc(json!({"id": "99", "name": "nut"})), WriteMode::Replace)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let same = repo
            .update(
                &created.id,
                doc(json!({"id": created.id.as_str(), "name": "nut"})),
                WriteMode::Replace,
            )
            .await;
        assert!(same.is_ok());
    }

    #[tokio::test]
    async fn test_client_ids() {
        let registry = Arc::new(
            SchemaRegistry::new(vec![EntitySchema::new("Tag")
                .id_strategy(IdStrategy::Client)
                .field(FieldDef::new("label", FieldType::String))])
            .unwrap(),
        );
        let adapter = Arc::new(StoreAdapter::new(Arc::new(MemoryStore::new())));
        let repo = DocumentRepository::new(registry.get("Tag").unwrap(), registry, adapter);

        assert!(matches!(
            repo.create(doc(json!({"label": "x"}))).await.unwrap_err(),
            AppError::Validation(_)
        ));
        let created = repo
            .create(doc(json!({"id": "rust", "label": "Rust"})))
            .await
            .unwrap();
        assert_eq!(created.id.as_str(), "rust");
    }

    #[tokio::test]
    async fn test_references_must_exist() {
        let (people, _, _) = repository("Person");

        let err = people
            .create(doc(json!({"firstName": "Frodo", "manager": "9"})))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let boss = people
            .create(doc(json!({"firstName": "Bilbo"})))
            .await
            .unwrap();
        let frodo = people
            .create(doc(json!({"firstName": "Frodo", "manager": boss.id.as_str()})))
            .await
            .unwrap();
        assert_eq!(frodo.fields["manager"], json!(boss.id.as_str()));
    }

    #[tokio::test]
    async fn test_follow_single_reference() {
        let (people, _, _) = repository("Person");
        let boss = people
            .create(doc(json!({"firstName": "Bilbo"})))
            .await
            .unwrap();
        let frodo = people
            .create(doc(json!({"firstName": "Frodo", "manager": boss.id.as_str()})))
            .await
            .unwrap();

        match people.follow(&frodo.id, "manager").await.unwrap() {
            Related::One(schema, entity) => {
                assert_eq!(schema.name, "Person");
                assert_eq!(entity.id, boss.id);
            }
            other => panic!("expected a single entity, got {:?}", other),
        }

        // Unset reference
        assert!(matches!(
            people.follow(&boss.id, "manager").await.unwrap_err(),
            AppError::NotFound
        ));

        // Dangling after the target is deleted
        people.delete(&boss.id).await.unwrap();
        assert!(matches!(
            people.follow(&frodo.id, "manager").await.unwrap_err(),
            AppError::NotFound
        ));

        // Not a reference field
        assert!(matches!(
            people.follow(&frodo.id, "firstName").await.unwrap_err(),
            AppError::UnsupportedOperation(_)
        ));
    }

    #[tokio::test]
    async fn test_follow_many_skips_dangling() {
        let (teams, adapter, registry) = repository("Team");
        let people = sibling("Person", &adapter, &registry);
        let sam = people.create(doc(json!({"firstName": "Sam"}))).await.unwrap();
        let pippin = people
            .create(doc(json!({"firstName": "Pippin"})))
            .await
            .unwrap();

        let team = teams
            .create(doc(json!({
                "title": "Fellowship",
                "members": [sam.id.as_str(), pippin.id.as_str()]
            })))
            .await
            .unwrap();
        people.delete(&pippin.id).await.unwrap();

        match teams.follow(&team.id, "members").await.unwrap() {
            Related::Many(_, members) => {
                assert_eq!(members.len(), 1);
                assert_eq!(members[0].id, sam.id);
            }
            other => panic!("expected a collection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_find_by_declared_finder() {
        let (people, _, _) = repository("Person");
        for (first, last) in [("Frodo", "Baggins"), ("Bilbo", "Baggins"), ("Sam", "Gamgee")] {
            people
                .create(doc(json!({"firstName": first, "lastName": last})))
                .await
                .unwrap();
        }

        let page = people
            .find_by("findByLastName", "Baggins", PageRequest::default())
            .unwrap()
            .fetch()
            .await
            .unwrap();
        assert_eq!(page.total, 2);

        assert!(matches!(
            people
                .find_by("findByNickname", "x", PageRequest::default())
                .err(),
            Some(AppError::UnsupportedOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_finder_value_is_coerced() {
        let schema = catalog::widget()
            .finder(Finder::new("findByQty", "qty"))
            .capabilities(Capabilities::default());
        let registry = Arc::new(SchemaRegistry::new(vec![schema]).unwrap());
        let adapter = Arc::new(StoreAdapter::new(Arc::new(MemoryStore::new())));
        let repo = DocumentRepository::new(registry.get("Widget").unwrap(), registry, adapter);
        repo.create(doc(json!({"name": "bolt", "qty": 5}))).await.unwrap();

        let page = repo
            .find_by("findByQty", "5", PageRequest::default())
            .unwrap()
            .fetch()
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);

        assert!(matches!(
            repo.find_by("findByQty", "five", PageRequest::default()).err(),
            Some(AppError::MalformedRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (repo, _, _) = repository("Widget");
        for name in ["bolt", "nut", "bolt"] {
            repo.create(doc(json!({"name": name}))).await.unwrap();
        }

        let page = repo
            .list(ListQuery::new(doc(json!({"name": "bolt"})), PageRequest::default()))
            .fetch()
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);
    }
}
