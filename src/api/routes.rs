//! Application route configuration.

use axum::{extract::OriginalUri, middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{index_handler, resource_routes};
use super::middleware::request_log_middleware;
use super::openapi::ApiDoc;
use super::AppState;
use crate::errors::AppError;

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let base_path = state.links.base_path().to_string();

    let api = Router::new()
        .route("/", get(index_handler::root))
        .route("/health", get(index_handler::health))
        .merge(resource_routes());

    let app = if base_path.is_empty() {
        api
    } else {
        Router::new().nest(&base_path, api)
    };

    app
        // OpenAPI Swagger UI documentation
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(unmatched)
        // Global middleware
        .layer(middleware::from_fn(request_log_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// No route shape matches the path
async fn unmatched(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::unsupported(uri.path().to_string())
}
