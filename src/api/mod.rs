//! API layer - REST gateway
//!
//! This module contains all HTTP-related concerns:
//! - Request handlers, one per repository operation
//! - Request lifecycle middleware
//! - Custom extractors (JSON object bodies, query grammar)
//! - Route definitions and the OpenAPI document

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod operation;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use operation::Operation;
pub use routes::create_router;
pub use state::AppState;
