//! Resource representations.
//!
//! A representation is derived from an entity and its schema only: every
//! declared non-reference field, the identifier when the schema exposes
//! it, and a `links` map holding the self URI plus one URI per reference
//! field.

use serde_json::{Map, Value};

use super::entity::{Entity, EntityId};
use super::registry::SchemaRegistry;
use super::schema::{EntitySchema, Finder};
use crate::config::{LINKS_KEY, REL_SELF, SEARCH_SEGMENT};

/// Builds resource URIs below the configured base path.
#[derive(Debug, Clone, Default)]
pub struct Links {
    base_path: String,
}

impl Links {
    /// `base_path` must already be normalized (`""` or `/segment`).
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn root(&self) -> String {
        if self.base_path.is_empty() {
            "/".to_string()
        } else {
            self.base_path.clone()
        }
    }

    pub fn collection(&self, schema: &EntitySchema) -> String {
        format!("{}/{}", self.base_path, schema.collection)
    }

    pub fn item(&self, schema: &EntitySchema, id: &EntityId) -> String {
        format!("{}/{}/{}", self.base_path, schema.collection, id)
    }

    pub fn relation(&self, schema: &EntitySchema, id: &EntityId, relation: &str) -> String {
        format!("{}/{}/{}/{}", self.base_path, schema.collection, id, relation)
    }

    pub fn search(&self, schema: &EntitySchema) -> String {
        format!("{}/{}/{}", self.base_path, schema.collection, SEARCH_SEGMENT)
    }

    pub fn finder(&self, schema: &EntitySchema, finder: &Finder) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_path, schema.collection, SEARCH_SEGMENT, finder.name
        )
    }
}

/// Render an entity as its resource representation.
pub fn render(entity: &Entity, schema: &EntitySchema, links: &Links) -> Value {
    let mut body = Map::new();

    if schema.expose_id {
        body.insert(
            schema.id_field.clone(),
            Value::String(entity.id.as_str().to_string()),
        );
    }

    for field in schema.fields.iter().filter(|f| !f.field_type.is_reference()) {
        let value = entity.fields.get(&field.name).cloned().unwrap_or(Value::Null);
        body.insert(field.name.clone(), value);
    }

    let mut link_map = Map::new();
    link_map.insert(
        REL_SELF.to_string(),
        Value::String(links.item(schema, &entity.id)),
    );
    for field in schema.references() {
        link_map.insert(
            field.name.clone(),
            Value::String(links.relation(schema, &entity.id, &field.name)),
        );
    }
    body.insert(LINKS_KEY.to_string(), Value::Object(link_map));

    Value::Object(body)
}

/// Render a sequence of entities of one type.
pub fn render_all(entities: &[Entity], schema: &EntitySchema, links: &Links) -> Value {
    Value::Array(
        entities
            .iter()
            .map(|entity| render(entity, schema, links))
            .collect(),
    )
}

/// Root document linking every exposed collection.
pub fn render_index(registry: &SchemaRegistry, links: &Links) -> Value {
    let mut link_map = Map::new();
    link_map.insert(REL_SELF.to_string(), Value::String(links.root()));
    for schema in registry.iter() {
        link_map.insert(
            schema.collection.clone(),
            Value::String(links.collection(schema)),
        );
    }

    let mut body = Map::new();
    body.insert(LINKS_KEY.to_string(), Value::Object(link_map));
    Value::Object(body)
}

/// Search document linking every finder of one type.
pub fn render_search_index(schema: &EntitySchema, links: &Links) -> Value {
    let mut link_map = Map::new();
    link_map.insert(REL_SELF.to_string(), Value::String(links.search(schema)));
    for finder in &schema.finders {
        link_map.insert(
            finder.name.clone(),
            Value::String(links.finder(schema, finder)),
        );
    }

    let mut body = Map::new();
    body.insert(LINKS_KEY.to_string(), Value::Object(link_map));
    Value::Object(body)
}
