//! Serve command - Starts the HTTP gateway.

use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::open_store;

/// Apply command-line overrides on top of the environment configuration
fn apply_overrides(args: ServeArgs, mut config: Config) -> Config {
    if let Some(host) = args.host {
        config.server_host = host;
    }
    if let Some(port) = args.port {
        config.server_port = port;
    }
    if let Some(store) = args.store {
        config.store_backend = store;
    }
    if let Some(schema) = args.schema {
        config.schema_path = Some(schema);
    }
    config
}

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: Config) -> AppResult<()> {
    let config = apply_overrides(args, config);
    tracing::info!(backend = %config.store_backend, "Starting gateway...");

    // Entity declarations
    let registry = Arc::new(super::load_registry(&config)?);
    tracing::info!(entities = registry.len(), "Schema registry loaded");

    // Document store (with timeouts and retries)
    let store = open_store(&config).await?;

    let app_state = AppState::from_config(store, registry, &config);
    let app = create_router(app_state);

    // Start server
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

    tracing::info!("Gateway running on http://{}{}", addr, config.base_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    tracing::info!("Gateway stopped");
    Ok(())
}

/// Resolve on Ctrl-C; in-flight requests finish, new ones are refused.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;

    #[test]
    fn test_overrides_win_over_environment() {
        let args = ServeArgs {
            port: Some(9000),
            store: Some(StoreBackend::Postgres),
            ..Default::default()
        };
        let config = apply_overrides(args, Config::default());

        assert_eq!(config.server_port, 9000);
        assert_eq!(config.store_backend, StoreBackend::Postgres);
        assert_eq!(config.server_host, Config::default().server_host);
    }
}
