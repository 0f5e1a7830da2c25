//! Commands module - CLI command implementations.
//!
//! Each command is implemented in its own module for separation of concerns.

pub mod migrate;
pub mod schema;
pub mod serve;

use crate::config::Config;
use crate::domain::{catalog, SchemaRegistry};
use crate::errors::AppResult;

/// Entity declarations from the configured schema file, or the built-in catalog.
pub fn load_registry(config: &Config) -> AppResult<SchemaRegistry> {
    match config.schema_path.as_deref() {
        Some(path) => SchemaRegistry::load(path),
        None => {
            tracing::info!("No schema file configured, using the built-in catalog");
            SchemaRegistry::new(catalog::builtin())
        }
    }
}
