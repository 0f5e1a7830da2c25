//! JSON object body extractor.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde_json::Value;

use crate::domain::Document;
use crate::errors::AppError;

/// Request body that must be a JSON object.
///
/// Schema validation happens later in the repository; this only rejects
/// bodies that are not JSON or not an object, as `MalformedRequest`.
/// Take it as `Result<JsonDocument, AppError>` to defer the rejection
/// until the target resource is known.
///
/// # Example
///
/// ```rust,ignore
/// async fn create(JsonDocument(body): JsonDocument) {
///     // body is a serde_json::Map
/// }
/// ```
#[derive(Debug)]
pub struct JsonDocument(pub Document);

#[async_trait]
impl<S> FromRequest<S> for JsonDocument
where
    S: Send + Sync,
    Json<Value>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| AppError::malformed(e.body_text()))?;

        match value {
            Value::Object(document) => Ok(JsonDocument(document)),
            other => Err(AppError::malformed(format!(
                "request body must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
