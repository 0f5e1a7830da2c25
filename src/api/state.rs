//! Application state - Dependency injection container.
//!
//! Provides request handlers with the repositories and the link builder.

use std::sync::Arc;

use super::operation::Operation;
use crate::config::Config;
use crate::domain::{Links, SchemaRegistry};
use crate::errors::{AppError, AppResult};
use crate::infra::DocumentStore;
use crate::services::{EntityRepository, Repositories, RepositoryContainer};

/// Application state shared by every request task.
#[derive(Clone)]
pub struct AppState {
    /// Repository per declared entity type
    pub repositories: Arc<dyn RepositoryContainer>,
    /// URI builder below the configured base path
    pub links: Links,
}

impl AppState {
    /// Create application state over a store and a registry.
    pub fn from_config(
        store: Arc<dyn DocumentStore>,
        registry: Arc<SchemaRegistry>,
        config: &Config,
    ) -> Self {
        Self::new(
            Arc::new(Repositories::new(registry, store)),
            Links::new(config.base_path.clone()),
        )
    }

    /// Create new application state with a manually injected container.
    pub fn new(repositories: Arc<dyn RepositoryContainer>, links: Links) -> Self {
        Self {
            repositories,
            links,
        }
    }

    pub fn registry(&self) -> Arc<SchemaRegistry> {
        self.repositories.registry()
    }

    /// Map a collection segment and operation to the repository serving it.
    ///
    /// Unknown collections are `UnsupportedOperation` (404); a known type
    /// with the operation switched off answers 405.
    pub fn resolve(
        &self,
        collection: &str,
        operation: Operation,
    ) -> AppResult<Arc<dyn EntityRepository>> {
        let repository = self.repositories.by_collection(collection).ok_or_else(|| {
            AppError::unsupported(format!("{}/{}", self.links.base_path(), collection))
        })?;

        let schema = repository.schema();
        if !schema.capabilities.allows(operation.capability()) {
            return Err(AppError::method_not_allowed(
                operation.method(),
                self.links.collection(&schema),
            ));
        }

        tracing::debug!(
            stage = "resolved",
            entity = %schema.name,
            operation = operation.name(),
            "Request resolved"
        );
        Ok(repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{catalog, Capabilities};
    use crate::infra::MemoryStore;

    fn state() -> AppState {
        let registry = SchemaRegistry::new(vec![
            catalog::person().capabilities(Capabilities::read_only()),
            catalog::widget(),
        ])
        .unwrap();
        AppState::from_config(
            Arc::new(MemoryStore::new()),
            Arc::new(registry),
            &Config::default(),
        )
    }

    #[test]
    fn test_resolve_known_collection() {
        let repo = state().resolve("widgets", Operation::Create).ok().unwrap();
        assert_eq!(repo.schema().name, "Widget");
    }

    #[test]
    fn test_resolve_unknown_collection() {
        let err = state().resolve("gadgets", Operation::List).err().unwrap();
        assert!(matches!(err, AppError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_disabled_capability_is_method_not_allowed() {
        let state = state();
        assert!(state.resolve("people", Operation::GetById).is_ok());

        let err = state.resolve("people", Operation::Delete).err().unwrap();
        assert!(matches!(err, AppError::MethodNotAllowed { .. }));
        assert_eq!(err.status(), axum::http::StatusCode::METHOD_NOT_ALLOWED);
    }
}
