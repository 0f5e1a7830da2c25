//! Entity schema registry.
//!
//! Built once at startup from static declarations and read-only after
//! that. It is shared through `Arc` and passed explicitly to whoever
//! needs it.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::schema::EntitySchema;
use crate::errors::{AppError, AppResult};

/// JSON document listing entity declarations.
#[derive(Debug, Deserialize)]
struct SchemaFile {
    entities: Vec<EntitySchema>,
}

/// Read-only lookup of declared entity types.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: Vec<Arc<EntitySchema>>,
    by_name: HashMap<String, usize>,
    by_collection: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Build the registry, validating every declaration and the references
    /// between them.
    pub fn new(declarations: Vec<EntitySchema>) -> AppResult<Self> {
        let mut schemas = Vec::with_capacity(declarations.len());
        let mut by_name = HashMap::new();
        let mut by_collection = HashMap::new();

        for declaration in declarations {
            let schema = declaration.normalize()?;
            let index = schemas.len();

            if by_name.insert(schema.name.clone(), index).is_some() {
                return Err(AppError::validation(format!(
                    "entity type '{}' declared twice",
                    schema.name
                )));
            }
            if by_collection.insert(schema.collection.clone(), index).is_some() {
                return Err(AppError::validation(format!(
                    "collection '{}' declared twice",
                    schema.collection
                )));
            }
            schemas.push(Arc::new(schema));
        }

        for schema in &schemas {
            for field in schema.references() {
                if let Some(target) = field.field_type.target() {
                    if !by_name.contains_key(target) {
                        tracing::error!(
                            entity = %schema.name,
                            field = %field.name,
                            "reference to undeclared type {}",
                            target
                        );
                        return Err(AppError::UnknownEntityType(target.to_string()));
                    }
                }
            }
        }

        tracing::debug!(entities = schemas.len(), "Schema registry built");

        Ok(Self {
            schemas,
            by_name,
            by_collection,
        })
    }

    /// Build the registry from a JSON document `{"entities": [...]}`.
    pub fn from_json(json: &str) -> AppResult<Self> {
        let file: SchemaFile = serde_json::from_str(json)
            .map_err(|e| AppError::validation(format!("invalid schema declarations: {}", e)))?;
        Self::new(file.entities)
    }

    /// Load declarations from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::internal(format!("cannot read schema file {}: {}", path.display(), e))
        })?;
        tracing::info!("Loading entity declarations from {}", path.display());
        Self::from_json(&json)
    }

    /// Schema of an entity type.
    pub fn get(&self, name: &str) -> AppResult<Arc<EntitySchema>> {
        self.by_name
            .get(name)
            .map(|&i| self.schemas[i].clone())
            .ok_or_else(|| AppError::UnknownEntityType(name.to_string()))
    }

    /// Schema exposed under a collection path segment.
    pub fn by_collection(&self, collection: &str) -> Option<Arc<EntitySchema>> {
        self.by_collection
            .get(collection)
            .map(|&i| self.schemas[i].clone())
    }

    /// All schemas in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<EntitySchema>> {
        self.schemas.iter()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::{FieldDef, FieldType};

    fn person() -> EntitySchema {
        EntitySchema::new("Person")
            .collection("people")
            .field(FieldDef::new("lastName", FieldType::String))
    }

    #[test]
    fn test_lookup_by_name_and_collection() {
        let registry = SchemaRegistry::new(vec![person()]).unwrap();
        assert_eq!(registry.get("Person").unwrap().collection, "people");
        assert_eq!(registry.by_collection("people").unwrap().name, "Person");
        assert!(registry.by_collection("persons").is_none());
    }

    #[test]
    fn test_unknown_type_fails() {
        let registry = SchemaRegistry::new(vec![person()]).unwrap();
        assert!(matches!(
            registry.get("Ghost"),
            Err(AppError::UnknownEntityType(name)) if name == "Ghost"
        ));
    }

    #[test]
    fn test_duplicates_rejected() {
        assert!(SchemaRegistry::new(vec![person(), person()]).is_err());
        assert!(SchemaRegistry::new(vec![
            person(),
            EntitySchema::new("Human").collection("people"),
        ])
        .is_err());
    }

    #[test]
    fn test_reference_targets_must_be_declared() {
        let widget = EntitySchema::new("Widget").field(FieldDef::new(
            "maker",
            FieldType::Reference {
                target: "Company".into(),
            },
        ));
        assert!(matches!(
            SchemaRegistry::new(vec![widget]),
            Err(AppError::UnknownEntityType(t)) if t == "Company"
        ));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let registry = SchemaRegistry::from_json(
            r#"{"entities": [{"name": "Widget", "fields": [{"name": "qty", "type": "integer"}]}]}"#,
        )
        .unwrap();
        let widget = registry.get("Widget").unwrap();
        assert_eq!(widget.collection, "widgets");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(SchemaRegistry::from_json("{\"entities\": 3}").is_err());
    }
}
