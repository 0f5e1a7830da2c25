//! Migrate command - PostgreSQL store schema management.

use sea_orm::DbErr;

use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::{Config, StoreBackend};
use crate::errors::{AppError, AppResult};
use crate::infra::Database;

fn failed(step: &'static str) -> impl Fn(DbErr) -> AppError {
    move |e| AppError::internal(format!("{} failed: {}", step, e))
}

/// Execute the migrate command
pub async fn execute(args: MigrateArgs, config: Config) -> AppResult<()> {
    if config.store_backend != StoreBackend::Postgres {
        tracing::warn!(
            backend = %config.store_backend,
            "Migrations only apply to the postgres backend; using DATABASE_URL anyway"
        );
    }

    let db = Database::connect_without_migrations(&config)
        .await
        .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

    match args.action {
        MigrateAction::Up => {
            db.apply_pending().await.map_err(failed("Migration"))?;
            tracing::info!("Document schema is up to date");
        }
        MigrateAction::Down => {
            db.rollback_last().await.map_err(failed("Rollback"))?;
            tracing::info!("Rolled back the latest migration");
        }
        MigrateAction::Status => {
            for state in db.migration_status().await.map_err(failed("Status"))? {
                println!(
                    "{:<8} {}",
                    if state.applied { "applied" } else { "pending" },
                    state.name
                );
            }
        }
        MigrateAction::Fresh => {
            tracing::warn!("Dropping all documents and re-running every migration");
            db.reset().await.map_err(failed("Reset"))?;
            tracing::info!("Document schema recreated");
        }
    }

    Ok(())
}
