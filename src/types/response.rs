use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

/// Total number of items across all pages
pub const HEADER_TOTAL_COUNT: &str = "x-total-count";

/// Zero-based number of the returned page
pub const HEADER_PAGE: &str = "x-page";

/// Page size used for the returned page
pub const HEADER_PAGE_SIZE: &str = "x-page-size";

/// Created response helper (201 + Location header + representation)
pub struct Created {
    pub location: String,
    pub body: Value,
}

impl IntoResponse for Created {
    fn into_response(self) -> axum::response::Response {
        let mut headers = HeaderMap::new();
        if let Ok(location) = HeaderValue::from_str(&self.location) {
            headers.insert(header::LOCATION, location);
        }
        (StatusCode::CREATED, headers, Json(self.body)).into_response()
    }
}

/// No content response helper (DRY - common pattern for DELETE endpoints)
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> axum::response::Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

/// One page of representations: the JSON array as body, page metadata in headers
pub struct Paged {
    pub body: Value,
    pub page: u64,
    pub size: u64,
    pub total: u64,
    /// RFC 8288 `Link` header value, if there is anything to link
    pub links: Option<String>,
}

impl IntoResponse for Paged {
    fn into_response(self) -> axum::response::Response {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            (HEADER_TOTAL_COUNT, self.total),
            (HEADER_PAGE, self.page),
            (HEADER_PAGE_SIZE, self.size),
        ] {
            headers.insert(HeaderName::from_static(name), HeaderValue::from(value));
        }
        if let Some(links) = self.links.as_deref().and_then(|l| HeaderValue::from_str(l).ok()) {
            headers.insert(header::LINK, links);
        }
        (StatusCode::OK, headers, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_created_sets_location() {
        let response = Created {
            location: "/widgets/1".into(),
            body: json!({}),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/widgets/1");
    }

    #[test]
    fn test_paged_sets_metadata_headers() {
        let response = Paged {
            body: json!([]),
            page: 1,
            size: 10,
            total: 25,
            links: Some("</widgets?page=2&size=10>; rel=\"next\"".into()),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[HEADER_TOTAL_COUNT], "25");
        assert_eq!(response.headers()[HEADER_PAGE], "1");
        assert!(response.headers().contains_key(header::LINK));
    }

    #[test]
    fn test_no_content() {
        assert_eq!(NoContent.into_response().status(), StatusCode::NO_CONTENT);
    }
}
