//! Infrastructure layer - Document store integration
//!
//! This module handles all persistence concerns:
//! - Document store drivers (memory, PostgreSQL) and the retry decorator
//! - Database connection and migrations for the PostgreSQL backend
//! - The schema-aware adapter repositories talk to

mod adapter;
pub mod db;
pub mod store;

use std::sync::Arc;

pub use adapter::StoreAdapter;
pub use db::{Database, MigrationState, Migrator};
pub use store::{
    DocumentQuery, DocumentStore, MemoryStore, PgDocumentStore, RetryPolicy, RetryingStore,
    StoreError, StoreResult, StoredDocument,
};

#[cfg(any(test, feature = "test-utils"))]
pub use store::MockDocumentStore;

use crate::config::{Config, StoreBackend};

/// Open the configured backend, wrapped with the configured retry policy.
pub async fn open_store(config: &Config) -> StoreResult<Arc<dyn DocumentStore>> {
    let driver: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Postgres => {
            let database = Database::connect(config)
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            Arc::new(PgDocumentStore::new(database.get_connection()))
        }
    };

    tracing::info!(backend = driver.backend_name(), "Document store ready");
    Ok(Arc::new(RetryingStore::new(
        driver,
        RetryPolicy::from_config(config),
    )))
}
