//! Repository tests over the in-memory store.

use std::collections::HashSet;
use std::sync::Arc;

use futures::TryStreamExt;
use serde_json::{json, Value};

use data_rest::domain::{
    catalog, Document, EntityId, EntitySchema, FieldDef, FieldType, IdStrategy, SchemaRegistry,
    WriteMode,
};
use data_rest::errors::AppError;
use data_rest::infra::{MemoryStore, RetryPolicy, RetryingStore};
use data_rest::services::{EntityRepository, Repositories, RepositoryContainer};
use data_rest::types::{ListQuery, PageRequest, SortOrder};

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

fn container() -> Repositories {
    let ticket = EntitySchema::new("Ticket")
        .id_strategy(IdStrategy::Uuid)
        .expose_id()
        .field(FieldDef::new("subject", FieldType::String).required());

    let mut declarations = catalog::builtin();
    declarations.push(ticket);
    let registry = Arc::new(SchemaRegistry::new(declarations).unwrap());
    Repositories::new(registry, Arc::new(MemoryStore::new()))
}

fn widgets(container: &Repositories) -> Arc<dyn EntityRepository> {
    container.by_type("Widget").unwrap()
}

#[tokio::test]
async fn test_lookup_by_type_and_collection() {
    let container = container();

    assert_eq!(container.by_type("Person").unwrap().schema().collection, "people");
    assert!(container.by_collection("widgets").is_some());
    assert!(container.by_collection("gizmos").is_none());
    assert!(matches!(
        container.by_type("Gizmo"),
        Err(AppError::UnknownEntityType(_))
    ));
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_ids() {
    let container = container();
    let repository = widgets(&container);

    let handles: Vec<_> = (0..20)
        .map(|qty| {
            let repository = repository.clone();
            tokio::spawn(async move {
                repository
                    .create(doc(json!({"name": "w", "qty": qty})))
                    .await
                    .unwrap()
                    .id
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap());
    }
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn test_uuid_ids() {
    let container = container();
    let tickets = container.by_type("Ticket").unwrap();

    let ticket = tickets.create(doc(json!({"subject": "broken"}))).await.unwrap();
    assert!(uuid::Uuid::parse_str(ticket.id.as_str()).is_ok());
    assert_eq!(tickets.get_by_id(&ticket.id).await.unwrap(), ticket);
}

#[tokio::test]
async fn test_update_modes() {
    let container = container();
    let repository = widgets(&container);
    let created = repository
        .create(doc(json!({"name": "bolt", "qty": 5})))
        .await
        .unwrap();

    let patched = repository
        .update(&created.id, doc(json!({"qty": null})), WriteMode::Patch)
        .await
        .unwrap();
    assert_eq!(patched.get("name"), Some(&json!("bolt")));
    assert_eq!(patched.get("qty"), None);

    let err = repository
        .update(&created.id, doc(json!({"qty": 1})), WriteMode::Replace)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_pager_streams_every_page() {
    let container = container();
    let repository = widgets(&container);
    for qty in 0..7 {
        repository
            .create(doc(json!({"name": "w", "qty": qty})))
            .await
            .unwrap();
    }

    let pager = repository.list(ListQuery::new(
        Document::new(),
        PageRequest::new(0, 3).sorted_by(SortOrder::desc("qty")),
    ));

    let first = pager.fetch().await.unwrap();
    assert_eq!(first.total, 7);
    assert_eq!(first.items[0].get("qty"), Some(&json!(6)));

    let all: Vec<_> = pager.stream().try_collect().await.unwrap();
    assert_eq!(all.len(), 7);
    assert_eq!(all[6].get("qty"), Some(&json!(0)));
}

#[tokio::test]
async fn test_finder_through_retrying_store() {
    let registry = Arc::new(SchemaRegistry::new(catalog::builtin()).unwrap());
    let store = RetryingStore::new(Arc::new(MemoryStore::new()), RetryPolicy::default());
    let container = Repositories::new(registry, Arc::new(store));
    let people = container.by_type("Person").unwrap();

    for last in ["Baggins", "Gamgee", "Baggins"] {
        people
            .create(doc(json!({"lastName": last})))
            .await
            .unwrap();
    }

    let found = people
        .find_by("findByLastName", "Baggins", PageRequest::default())
        .unwrap()
        .fetch()
        .await
        .unwrap();
    assert_eq!(found.total, 2);

    let missing = people
        .get_by_id(&EntityId::parse("404").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::NotFound));
}
