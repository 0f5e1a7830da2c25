//! Entity resource handlers.
//!
//! One route shape per repository operation. Every handler resolves the
//! collection segment first, so an unknown collection is reported as such
//! even when the rest of the request is also wrong.

use axum::{
    extract::{OriginalUri, Path, State},
    http::Method,
    response::Json,
    routing::get,
    Router,
};
use serde_json::Value;
use url::form_urlencoded;

use crate::api::extractors::{JsonDocument, QueryParams};
use crate::api::operation::Operation;
use crate::api::AppState;
use crate::domain::{
    render, render_all, render_search_index, Entity, EntityId, EntitySchema, WriteMode,
};
use crate::errors::{AppError, AppResult, ErrorResponse};
use crate::services::Related;
use crate::types::{Created, NoContent, Page, PageParams, Paged};

/// Create resource routes (mounted below the base path)
pub fn resource_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:collection",
            get(list_resources)
                .post(create_resource)
                .fallback(unsupported_method),
        )
        .route(
            "/:collection/search",
            get(search_index).fallback(unsupported_method),
        )
        .route(
            "/:collection/search/:finder",
            get(find_resources).fallback(unsupported_method),
        )
        .route(
            "/:collection/:id",
            get(get_resource)
                .put(replace_resource)
                .patch(patch_resource)
                .delete(delete_resource)
                .fallback(unsupported_method),
        )
        .route(
            "/:collection/:id/:relation",
            get(follow_relation).fallback(unsupported_method),
        )
}

/// Path identifiers that cannot be valid are a malformed request, not a
/// validation failure of a body.
fn parse_id(raw: &str) -> AppResult<EntityId> {
    EntityId::parse(raw).map_err(|e| match e {
        AppError::Validation(msg) => AppError::MalformedRequest(msg),
        other => other,
    })
}

/// Render one page and its navigation headers.
fn paged(
    state: &AppState,
    schema: &EntitySchema,
    path: &str,
    params: &QueryParams,
    page: Page<Entity>,
) -> Paged {
    let body = render_all(&page.items, schema, &state.links);
    tracing::debug!(stage = "serialized", entity = %schema.name, items = page.items.len(), "Page rendered");

    Paged {
        links: Some(navigation_links(path, params, &page)),
        body,
        page: page.number,
        size: page.size,
        total: page.total,
    }
}

/// RFC 8288 `Link` value with first/prev/next/last relations.
fn navigation_links<T>(path: &str, params: &QueryParams, page: &Page<T>) -> String {
    let last = page.total_pages().saturating_sub(1);
    let mut relations = vec![("first", 0)];
    if page.has_prev() {
        relations.push(("prev", (page.number - 1).min(last)));
    }
    if page.has_next() {
        relations.push(("next", page.number.saturating_add(1)));
    }
    relations.push(("last", last));

    let links: Vec<String> = relations
        .into_iter()
        .map(|(rel, number)| {
            let mut query = form_urlencoded::Serializer::new(String::new());
            for (key, value) in params.without_page() {
                query.append_pair(key, value);
            }
            query.append_pair("page", &number.to_string());
            format!("<{}?{}>; rel=\"{}\"", path, query.finish(), rel)
        })
        .collect();

    links.join(", ")
}

/// List one page of a collection
#[utoipa::path(
    get,
    path = "/{collection}",
    tag = "Resources",
    params(
        ("collection" = String, Path, description = "Collection path segment"),
        PageParams
    ),
    responses(
        (status = 200, description = "JSON array of representations; paging in X-Total-Count, X-Page, X-Page-Size and Link headers"),
        (status = 400, description = "Malformed paging, sort or filter parameter", body = ErrorResponse),
        (status = 404, description = "Unknown collection", body = ErrorResponse),
        (status = 503, description = "Document store unavailable", body = ErrorResponse)
    )
)]
pub async fn list_resources(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(collection): Path<String>,
    params: QueryParams,
) -> AppResult<Paged> {
    let repository = state.resolve(&collection, Operation::List)?;
    let schema = repository.schema();
    let query = params.list_query(&schema)?;
    tracing::debug!(stage = "parsed", page = query.page.page, size = query.page.size, "List query parsed");

    let page = repository.list(query).fetch().await?;
    tracing::debug!(stage = "executed", total = page.total, "List executed");

    Ok(paged(&state, &schema, uri.path(), &params, page))
}

/// Create an entity
#[utoipa::path(
    post,
    path = "/{collection}",
    tag = "Resources",
    params(("collection" = String, Path, description = "Collection path segment")),
    request_body(content = Object, description = "Field values; the id field only for client-assigned identifiers"),
    responses(
        (status = 201, description = "Created; Location header holds the self URI"),
        (status = 400, description = "Validation failure or malformed body", body = ErrorResponse),
        (status = 404, description = "Unknown collection", body = ErrorResponse),
        (status = 405, description = "Creation disabled for this type", body = ErrorResponse)
    )
)]
pub async fn create_resource(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    body: Result<JsonDocument, AppError>,
) -> AppResult<Created> {
    let repository = state.resolve(&collection, Operation::Create)?;
    let JsonDocument(body) = body?;
    tracing::debug!(stage = "parsed", fields = body.len(), "Create body parsed");

    let entity = repository.create(body).await?;
    tracing::debug!(stage = "executed", id = %entity.id, "Create executed");

    let schema = repository.schema();
    Ok(Created {
        location: state.links.item(&schema, &entity.id),
        body: render(&entity, &schema, &state.links),
    })
}

/// Fetch one entity
#[utoipa::path(
    get,
    path = "/{collection}/{id}",
    tag = "Resources",
    params(
        ("collection" = String, Path, description = "Collection path segment"),
        ("id" = String, Path, description = "Entity identifier")
    ),
    responses(
        (status = 200, description = "Resource representation"),
        (status = 404, description = "Unknown collection or entity", body = ErrorResponse)
    )
)]
pub async fn get_resource(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> AppResult<Json<Value>> {
    let repository = state.resolve(&collection, Operation::GetById)?;
    let id = parse_id(&id)?;

    let entity = repository.get_by_id(&id).await?;
    Ok(Json(render(&entity, &repository.schema(), &state.links)))
}

/// Replace an entity's fields
#[utoipa::path(
    put,
    path = "/{collection}/{id}",
    tag = "Resources",
    params(
        ("collection" = String, Path, description = "Collection path segment"),
        ("id" = String, Path, description = "Entity identifier")
    ),
    request_body(content = Object, description = "Complete field values"),
    responses(
        (status = 200, description = "Updated representation"),
        (status = 400, description = "Validation failure or malformed body", body = ErrorResponse),
        (status = 404, description = "Unknown collection or entity", body = ErrorResponse)
    )
)]
pub async fn replace_resource(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    body: Result<JsonDocument, AppError>,
) -> AppResult<Json<Value>> {
    update(state, collection, id, body, Operation::Replace, WriteMode::Replace).await
}

/// Update some of an entity's fields
#[utoipa::path(
    patch,
    path = "/{collection}/{id}",
    tag = "Resources",
    params(
        ("collection" = String, Path, description = "Collection path segment"),
        ("id" = String, Path, description = "Entity identifier")
    ),
    request_body(content = Object, description = "Fields to change; null clears a field"),
    responses(
        (status = 200, description = "Updated representation"),
        (status = 400, description = "Validation failure or malformed body", body = ErrorResponse),
        (status = 404, description = "Unknown collection or entity", body = ErrorResponse)
    )
)]
pub async fn patch_resource(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    body: Result<JsonDocument, AppError>,
) -> AppResult<Json<Value>> {
    update(state, collection, id, body, Operation::Patch, WriteMode::Patch).await
}

async fn update(
    state: AppState,
    collection: String,
    id: String,
    body: Result<JsonDocument, AppError>,
    operation: Operation,
    mode: WriteMode,
) -> AppResult<Json<Value>> {
    let repository = state.resolve(&collection, operation)?;
    let id = parse_id(&id)?;
    let JsonDocument(body) = body?;
    tracing::debug!(stage = "parsed", fields = body.len(), "Update body parsed");

    let entity = repository.update(&id, body, mode).await?;
    tracing::debug!(stage = "executed", id = %entity.id, "Update executed");

    Ok(Json(render(&entity, &repository.schema(), &state.links)))
}

/// Delete an entity
#[utoipa::path(
    delete,
    path = "/{collection}/{id}",
    tag = "Resources",
    params(
        ("collection" = String, Path, description = "Collection path segment"),
        ("id" = String, Path, description = "Entity identifier")
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Unknown collection or entity", body = ErrorResponse)
    )
)]
pub async fn delete_resource(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> AppResult<NoContent> {
    let repository = state.resolve(&collection, Operation::Delete)?;
    let id = parse_id(&id)?;

    repository.delete(&id).await?;
    Ok(NoContent)
}

/// Follow a reference field
#[utoipa::path(
    get,
    path = "/{collection}/{id}/{relation}",
    tag = "Resources",
    params(
        ("collection" = String, Path, description = "Collection path segment"),
        ("id" = String, Path, description = "Entity identifier"),
        ("relation" = String, Path, description = "Reference field name")
    ),
    responses(
        (status = 200, description = "Referenced representation, or an array for to-many references"),
        (status = 404, description = "Unknown entity, unset or dangling reference", body = ErrorResponse)
    )
)]
pub async fn follow_relation(
    State(state): State<AppState>,
    Path((collection, id, relation)): Path<(String, String, String)>,
) -> AppResult<Json<Value>> {
    let repository = state.resolve(&collection, Operation::FollowRelation)?;
    let id = parse_id(&id)?;

    let body = match repository.follow(&id, &relation).await? {
        Related::One(target, entity) => render(&entity, &target, &state.links),
        Related::Many(target, entities) => render_all(&entities, &target, &state.links),
    };
    Ok(Json(body))
}

/// List the finders of an entity type
#[utoipa::path(
    get,
    path = "/{collection}/search",
    tag = "Search",
    params(("collection" = String, Path, description = "Collection path segment")),
    responses(
        (status = 200, description = "Links to every declared finder"),
        (status = 404, description = "Unknown collection", body = ErrorResponse)
    )
)]
pub async fn search_index(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> AppResult<Json<Value>> {
    let repository = state.resolve(&collection, Operation::SearchIndex)?;
    Ok(Json(render_search_index(&repository.schema(), &state.links)))
}

/// Run a declared finder
#[utoipa::path(
    get,
    path = "/{collection}/search/{finder}",
    tag = "Search",
    params(
        ("collection" = String, Path, description = "Collection path segment"),
        ("finder" = String, Path, description = "Finder name"),
        PageParams
    ),
    responses(
        (status = 200, description = "JSON array of matches, paged like a listing"),
        (status = 400, description = "Missing or malformed finder parameter", body = ErrorResponse),
        (status = 404, description = "Unknown collection or finder", body = ErrorResponse)
    )
)]
pub async fn find_resources(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path((collection, finder)): Path<(String, String)>,
    params: QueryParams,
) -> AppResult<Paged> {
    let repository = state.resolve(&collection, Operation::Find)?;
    let schema = repository.schema();
    let declared = schema
        .find_finder(&finder)
        .ok_or_else(|| AppError::unsupported(uri.path().to_string()))?;

    let mut rest = params.clone();
    let value = rest.take(declared.param())?.ok_or_else(|| {
        AppError::malformed(format!("finder '{}' needs parameter '{}'", finder, declared.param()))
    })?;
    let page = rest.page_request(&schema)?;
    tracing::debug!(stage = "parsed", finder = %finder, "Finder query parsed");

    let result = repository.find_by(&finder, &value, page)?.fetch().await?;
    tracing::debug!(stage = "executed", total = result.total, "Finder executed");

    Ok(paged(&state, &schema, uri.path(), &params, result))
}

/// Known path shape, method not served there.
pub async fn unsupported_method(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> AppError {
    let path = uri.path();
    let relative = path.strip_prefix(state.links.base_path()).unwrap_or(path);
    let collection = relative.trim_start_matches('/').split('/').next().unwrap_or_default();

    if state.repositories.by_collection(collection).is_none() {
        return AppError::unsupported(path.to_string());
    }
    AppError::method_not_allowed(method, path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        QueryParams(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_navigation_links_middle_page() {
        let page = Page::new(vec![(); 2], 1, 2, 5);
        let links = navigation_links("/widgets", &params(&[("size", "2"), ("page", "1")]), &page);

        assert!(links.contains("</widgets?size=2&page=0>; rel=\"first\""));
        assert!(links.contains("</widgets?size=2&page=0>; rel=\"prev\""));
        assert!(links.contains("</widgets?size=2&page=2>; rel=\"next\""));
        assert!(links.contains("</widgets?size=2&page=2>; rel=\"last\""));
    }

    #[test]
    fn test_navigation_links_encode_values() {
        let page = Page::new(Vec::<()>::new(), 0, 20, 0);
        let links = navigation_links("/people", &params(&[("lastName", "van Dyke")]), &page);

        assert!(links.contains("lastName=van+Dyke"));
        assert!(!links.contains("rel=\"next\""));
        assert!(!links.contains("rel=\"prev\""));
    }

    #[test]
    fn test_navigation_links_past_the_end() {
        let page = Page::new(Vec::<()>::new(), u64::MAX, 20, 3);
        let links = navigation_links("/widgets", &params(&[]), &page);

        assert!(!links.contains("rel=\"next\""));
        assert!(links.contains("</widgets?page=0>; rel=\"prev\""));
        assert!(links.contains("</widgets?page=0>; rel=\"last\""));
    }

    #[test]
    fn test_path_ids_are_malformed_when_invalid() {
        assert!(matches!(parse_id("a b"), Err(AppError::MalformedRequest(_))));
        assert!(parse_id("42").is_ok());
    }
}
