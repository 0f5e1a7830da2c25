//! Repository container - one repository per declared entity type.
//!
//! Built once at startup from the schema registry and shared read-only
//! by every request task.

use std::collections::HashMap;
use std::sync::Arc;

use super::repository::{DocumentRepository, EntityRepository};
use crate::domain::SchemaRegistry;
use crate::errors::{AppError, AppResult};
use crate::infra::{DocumentStore, StoreAdapter};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Repository container trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait RepositoryContainer: Send + Sync {
    /// Declared entity types
    fn registry(&self) -> Arc<SchemaRegistry>;

    /// Repository exposed under a collection path segment
    fn by_collection(&self, collection: &str) -> Option<Arc<dyn EntityRepository>>;

    /// Repository of an entity type, by type name
    fn by_type(&self, name: &str) -> AppResult<Arc<dyn EntityRepository>>;

    /// Store adapter shared by all repositories
    fn adapter(&self) -> Arc<StoreAdapter>;
}

/// Concrete implementation of RepositoryContainer
pub struct Repositories {
    registry: Arc<SchemaRegistry>,
    adapter: Arc<StoreAdapter>,
    by_collection: HashMap<String, Arc<dyn EntityRepository>>,
}

impl Repositories {
    /// Create a repository for every declared type over one store
    pub fn new(registry: Arc<SchemaRegistry>, store: Arc<dyn DocumentStore>) -> Self {
        let adapter = Arc::new(StoreAdapter::new(store));
        let by_collection = registry
            .iter()
            .map(|schema| {
                let repository: Arc<dyn EntityRepository> = Arc::new(DocumentRepository::new(
                    schema.clone(),
                    registry.clone(),
                    adapter.clone(),
                ));
                (schema.collection.clone(), repository)
            })
            .collect();

        Self {
            registry,
            adapter,
            by_collection,
        }
    }
}

impl RepositoryContainer for Repositories {
    fn registry(&self) -> Arc<SchemaRegistry> {
        self.registry.clone()
    }

    fn by_collection(&self, collection: &str) -> Option<Arc<dyn EntityRepository>> {
        self.by_collection.get(collection).cloned()
    }

    fn by_type(&self, name: &str) -> AppResult<Arc<dyn EntityRepository>> {
        let schema = self.registry.get(name)?;
        self.by_collection(&schema.collection)
            .ok_or_else(|| AppError::UnknownEntityType(name.to_string()))
    }

    fn adapter(&self) -> Arc<StoreAdapter> {
        self.adapter.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog;
    use crate::infra::MemoryStore;

    fn repositories() -> Repositories {
        let registry = Arc::new(SchemaRegistry::new(catalog::builtin()).unwrap());
        Repositories::new(registry, Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_lookup_by_collection_and_type() {
        let repos = repositories();

        assert_eq!(repos.by_collection("widgets").unwrap().schema().name, "Widget");
        assert_eq!(repos.by_type("Person").unwrap().schema().collection, "people");
        assert!(repos.by_collection("gadgets").is_none());
    }

    #[test]
    fn test_unknown_type() {
        let err = repositories().by_type("Gadget").err();
        assert!(matches!(err, Some(AppError::UnknownEntityType(_))));
    }
}
