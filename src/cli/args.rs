//! CLI argument definitions.
//!
//! Uses clap derive macros for type-safe argument parsing.

use clap::{Parser, Subcommand};

use crate::config::StoreBackend;

/// data-rest - Schema-driven CRUD over HTTP for a document store
#[derive(Parser, Debug)]
#[command(name = "data-rest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP gateway
    Serve(ServeArgs),

    /// Manage the PostgreSQL store schema
    Migrate(MigrateArgs),

    /// Print the declared entity types and their routes
    Schema(SchemaArgs),
}

/// Arguments for the serve command; each one overrides its environment setting
#[derive(Parser, Debug, Default)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Document store backend (memory or postgres)
    #[arg(short, long)]
    pub store: Option<StoreBackend>,

    /// JSON file of entity declarations
    #[arg(long)]
    pub schema: Option<String>,
}

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(subcommand)]
    pub action: MigrateAction,
}

/// Migration actions
#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset and re-run all migrations
    Fresh,
}

/// Arguments for the schema command
#[derive(Parser, Debug, Default)]
pub struct SchemaArgs {
    /// JSON file of entity declarations
    #[arg(long)]
    pub schema: Option<String>,
}
