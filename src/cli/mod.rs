//! CLI module - Command-line interface for the application.
//!
//! Provides commands for:
//! - `serve` - Start the HTTP gateway
//! - `migrate` - PostgreSQL store migrations
//! - `schema` - Inspect the declared entity types

pub mod args;

pub use args::{Cli, Commands};
