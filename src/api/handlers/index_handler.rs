//! Root index and health check handlers.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::api::AppState;
use crate::domain::render_index;

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    pub store: StoreHealth,
}

/// Document store status
#[derive(Debug, Serialize, ToSchema)]
pub struct StoreHealth {
    #[schema(example = "memory")]
    pub backend: String,
    #[schema(example = "healthy")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Links to every exposed collection
#[utoipa::path(
    get,
    path = "/",
    tag = "Index",
    responses((status = 200, description = "Root index with one link per collection"))
)]
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(render_index(&state.registry(), &state.links))
}

/// Health check endpoint with document store connectivity check
#[utoipa::path(
    get,
    path = "/health",
    tag = "Index",
    responses(
        (status = 200, description = "Store reachable", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let adapter = state.repositories.adapter();
    let store = match adapter.ping().await {
        Ok(()) => StoreHealth {
            backend: adapter.backend_name().to_string(),
            status: "healthy".to_string(),
            error: None,
        },
        Err(e) => StoreHealth {
            backend: adapter.backend_name().to_string(),
            status: "unhealthy".to_string(),
            error: Some(e.to_string()),
        },
    };

    let healthy = store.error.is_none();
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        store,
    };
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
