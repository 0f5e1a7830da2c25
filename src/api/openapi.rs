//! OpenAPI documentation configuration.
//!
//! Entity types are declared at runtime, so the document describes the
//! generic route shapes with the collection as a path parameter.

use utoipa::OpenApi;

use crate::api::handlers::{index_handler, resource_handler};
use crate::errors::ErrorResponse;
use crate::types::Direction;

/// OpenAPI documentation for the data-rest gateway
#[derive(OpenApi)]
#[openapi(
    info(
        title = "data-rest",
        version = "0.1.0",
        description = "Schema-driven CRUD over HTTP for a document store",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Index endpoints
        index_handler::root,
        index_handler::health,
        // Resource endpoints
        resource_handler::list_resources,
        resource_handler::create_resource,
        resource_handler::get_resource,
        resource_handler::replace_resource,
        resource_handler::patch_resource,
        resource_handler::delete_resource,
        resource_handler::follow_relation,
        // Search endpoints
        resource_handler::search_index,
        resource_handler::find_resources,
    ),
    components(
        schemas(
            ErrorResponse,
            Direction,
            index_handler::HealthResponse,
            index_handler::StoreHealth,
        )
    ),
    tags(
        (name = "Index", description = "Root index and health"),
        (name = "Resources", description = "Entity operations for every declared collection"),
        (name = "Search", description = "Declared finders")
    )
)]
pub struct ApiDoc;
