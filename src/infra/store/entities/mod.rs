//! SeaORM entity definitions
//!
//! These are storage-specific rows, separate from domain entities.

pub mod document;
