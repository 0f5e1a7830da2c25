//! Domain layer - Entity schemas and representations
//!
//! This module contains the entity model the gateway serves, independent
//! of the document store and of HTTP:
//! - Entities and identifiers
//! - Schema declarations and the registry built from them
//! - The built-in catalog
//! - Resource representation rendering

pub mod catalog;
pub mod entity;
pub mod registry;
pub mod representation;
pub mod schema;

pub use entity::{Document, Entity, EntityId};
pub use registry::SchemaRegistry;
pub use representation::{render, render_all, render_index, render_search_index, Links};
pub use schema::{
    Capabilities, Capability, EntitySchema, FieldDef, FieldType, Finder, IdStrategy, WriteMode,
};
