//! data-rest - Schema-driven CRUD over HTTP
//!
//! Entity types are declared once (name, fields, references, finders) and
//! each one is exposed as a REST collection backed by a document store.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Entity schemas, the registry and resource representations
//! - **services**: Repositories and lazy pagers over the store
//! - **infra**: Document store drivers (memory, PostgreSQL) and migrations
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared types (paging, sorting, responses)
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the gateway on the in-memory store
//! cargo run -- serve --store memory
//!
//! # Run migrations for the PostgreSQL store
//! cargo run -- migrate up
//!
//! # Show the routes a schema file produces
//! cargo run -- schema --schema entities.json
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::{create_router, AppState};
pub use config::Config;
pub use domain::{Entity, EntityId, EntitySchema, SchemaRegistry};
pub use errors::{AppError, AppResult};
pub use infra::{DocumentStore, MemoryStore, StoreError};
pub use services::{EntityRepository, RepositoryContainer};
