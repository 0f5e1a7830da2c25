//! Entity instances as the gateway sees them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::errors::{AppError, AppResult};

/// Field values of one entity, keyed by field name.
pub type Document = Map<String, Value>;

/// Identifier of an entity within its collection.
///
/// Identifiers are carried as strings whatever the generation strategy,
/// since they always travel through URI path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Parse an identifier taken from a path segment or a request body.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("identifier must not be empty"));
        }
        if trimmed
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#' | '%'))
        {
            return Err(AppError::validation(format!(
                "identifier '{}' contains characters not allowed in a path segment",
                trimmed
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parse an identifier carried as a JSON value (string or integer).
    pub fn from_value(value: &Value) -> AppResult<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::parse(&n.to_string()),
            other => Err(AppError::validation(format!(
                "identifier must be a string or an integer, got {}",
                other
            ))),
        }
    }

    /// Wrap an identifier read back from the store as-is.
    pub(crate) fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted entity: its identifier plus its declared field values.
///
/// The identifier is kept out of `fields`; it is rendered back into the
/// representation only when the schema exposes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub fields: Document,
}

impl Entity {
    pub fn new(id: EntityId, fields: Document) -> Self {
        Self { id, fields }
    }

    /// Value of a field, `None` when absent or null.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }
}
