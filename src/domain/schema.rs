//! Entity schema declarations.
//!
//! A schema describes one entity type: its collection path, identifier
//! field and generation strategy, typed fields (some of them references
//! to other entity types), enabled repository operations and finders.
//! Schemas are plain data so they can be declared in code or loaded
//! from a JSON file.

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::HashSet;
use std::fmt;

use super::entity::{Document, EntityId};
use crate::config::{DEFAULT_ID_FIELD, LINKS_KEY, SEARCH_SEGMENT};
use crate::errors::{AppError, AppResult};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles"));

/// Collection names that would shadow gateway routes.
const RESERVED_COLLECTIONS: &[&str] = &["health", SEARCH_SEGMENT];

/// Check that a declared name is usable as a path segment and JSON key.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// RFC 3339 instant, stored normalized to UTC
    Timestamp,
    Object,
    Array,
    /// Weak reference to one entity of `target` type, by identifier
    Reference { target: String },
    /// Weak references to many entities of `target` type
    References { target: String },
}

impl FieldType {
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Reference { .. } | FieldType::References { .. })
    }

    /// Target entity type of a reference field.
    pub fn target(&self) -> Option<&str> {
        match self {
            FieldType::Reference { target } | FieldType::References { target } => Some(target),
            _ => None,
        }
    }

    /// Whether values of this type have a meaningful ordering.
    pub fn is_sortable(&self) -> bool {
        !matches!(
            self,
            FieldType::Object | FieldType::Array | FieldType::References { .. }
        )
    }

    /// Coerce a JSON value into this type's canonical representation.
    ///
    /// `null` always passes; whether it is acceptable is decided by the
    /// field's `required` flag.
    pub fn coerce(&self, value: &Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match self {
            FieldType::String => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(format!("expected a string, got {}", value)),
            },
            FieldType::Integer => coerce_integer(value),
            FieldType::Number => coerce_number(value),
            FieldType::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
                _ => Err(format!("expected a boolean, got {}", value)),
            },
            FieldType::Timestamp => match value {
                Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                    .map(|ts| {
                        Value::String(
                            ts.with_timezone(&Utc)
                                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
                        )
                    })
                    .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e)),
                _ => Err(format!("expected an RFC 3339 timestamp, got {}", value)),
            },
            FieldType::Object => match value {
                Value::Object(_) => Ok(value.clone()),
                _ => Err(format!("expected an object, got {}", value)),
            },
            FieldType::Array => match value {
                Value::Array(_) => Ok(value.clone()),
                _ => Err(format!("expected an array, got {}", value)),
            },
            FieldType::Reference { .. } => reference_id(value).map(|id| Value::String(id.into_string())),
            FieldType::References { .. } => match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| reference_id(item).map(|id| Value::String(id.into_string())))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                _ => Err(format!("expected an array of references, got {}", value)),
            },
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Integer => write!(f, "integer"),
            FieldType::Number => write!(f, "number"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Timestamp => write!(f, "timestamp"),
            FieldType::Object => write!(f, "object"),
            FieldType::Array => write!(f, "array"),
            FieldType::Reference { target } => write!(f, "reference<{}>", target),
            FieldType::References { target } => write!(f, "references<{}>", target),
        }
    }
}

fn coerce_integer(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(Value::from(f as i64))
            }
            _ => Err(format!("expected an integer, got {}", n)),
        },
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("expected an integer, got \"{}\"", s)),
        _ => Err(format!("expected an integer, got {}", value)),
    }
}

fn coerce_number(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(n) => Ok(canonical_number(n)),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(Value::from(i));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(|n| canonical_number(&n))
                .ok_or_else(|| format!("expected a number, got \"{}\"", s))
        }
        _ => Err(format!("expected a number, got {}", value)),
    }
}

/// Whole floats are stored as integers so `5` and `5.0` compare equal.
fn canonical_number(n: &Number) -> Value {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Value::from(f as i64)
        }
        _ => Value::Number(n.clone()),
    }
}

/// Extract a referenced identifier from an id or a resource URI.
fn reference_id(value: &Value) -> Result<EntityId, String> {
    let parsed = match value {
        Value::String(s) if s.contains('/') => {
            let last = s.trim().trim_end_matches('/').rsplit('/').next().unwrap_or_default();
            EntityId::parse(last)
        }
        other => EntityId::from_value(other),
    };
    parsed.map_err(|e| format!("invalid reference: {}", e))
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// How identifiers are produced when a create request carries none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Per-collection increasing integers
    #[default]
    Sequence,
    /// Random v4 UUIDs
    Uuid,
    /// The caller must supply the identifier
    Client,
}

/// A repository operation that can be switched off per entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Create,
    Read,
    List,
    Update,
    Delete,
}

/// Which repository operations an entity type exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub create: bool,
    pub read: bool,
    pub list: bool,
    pub update: bool,
    pub delete: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            create: true,
            read: true,
            list: true,
            update: true,
            delete: true,
        }
    }
}

impl Capabilities {
    pub fn read_only() -> Self {
        Self {
            create: false,
            update: false,
            delete: false,
            ..Self::default()
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Create => self.create,
            Capability::Read => self.read,
            Capability::List => self.list,
            Capability::Update => self.update,
            Capability::Delete => self.delete,
        }
    }
}

/// A field-based lookup exposed under `/{collection}/search/{name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finder {
    pub name: String,
    pub field: String,
    /// Query parameter carrying the value, defaults to the field name
    #[serde(default)]
    pub param: Option<String>,
}

impl Finder {
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            param: None,
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    pub fn param(&self) -> &str {
        self.param.as_deref().unwrap_or(&self.field)
    }
}

/// How a write request treats fields it does not mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    /// Full replacement: required fields must be present
    Replace,
    /// Partial update: only the provided fields change
    Patch,
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

/// Declaration of one entity type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    /// Collection path segment; derived from `name` when empty
    #[serde(default)]
    pub collection: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default)]
    pub id_strategy: IdStrategy,
    #[serde(default)]
    pub expose_id: bool,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub finders: Vec<Finder>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            collection: default_collection(&name),
            name,
            id_field: default_id_field(),
            id_strategy: IdStrategy::default(),
            expose_id: false,
            fields: Vec::new(),
            capabilities: Capabilities::default(),
            finders: Vec::new(),
        }
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    pub fn expose_id(mut self) -> Self {
        self.expose_id = true;
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn finder(mut self, finder: Finder) -> Self {
        self.finders.push(finder);
        self
    }

    /// Look up a declared field.
    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared reference fields, in declaration order.
    pub fn references(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.field_type.is_reference())
    }

    pub fn find_finder(&self, name: &str) -> Option<&Finder> {
        self.finders.iter().find(|f| f.name == name)
    }

    /// Fill derived defaults and check the declaration is self-consistent.
    ///
    /// Cross-type checks (reference targets) belong to the registry.
    pub fn normalize(mut self) -> AppResult<Self> {
        if self.collection.trim().is_empty() {
            self.collection = default_collection(&self.name);
        }

        for (what, name) in [
            ("entity type", &self.name),
            ("collection", &self.collection),
            ("identifier field", &self.id_field),
        ] {
            if !is_identifier(name) {
                return Err(AppError::validation(format!(
                    "{} name '{}' is not a valid identifier",
                    what, name
                )));
            }
        }

        if RESERVED_COLLECTIONS.contains(&self.collection.as_str()) {
            return Err(AppError::validation(format!(
                "collection name '{}' is reserved",
                self.collection
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !is_identifier(&field.name) {
                return Err(AppError::validation(format!(
                    "{}: field name '{}' is not a valid identifier",
                    self.name, field.name
                )));
            }
            if field.name == self.id_field || field.name == LINKS_KEY {
                return Err(AppError::validation(format!(
                    "{}: field name '{}' is reserved",
                    self.name, field.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(AppError::validation(format!(
                    "{}: field '{}' declared twice",
                    self.name, field.name
                )));
            }
        }

        let mut finder_names = HashSet::new();
        for finder in &self.finders {
            if !is_identifier(&finder.name) || !is_identifier(finder.param()) {
                return Err(AppError::validation(format!(
                    "{}: finder '{}' has an invalid name or parameter",
                    self.name, finder.name
                )));
            }
            if !finder_names.insert(finder.name.as_str()) {
                return Err(AppError::validation(format!(
                    "{}: finder '{}' declared twice",
                    self.name, finder.name
                )));
            }
            match self.field_def(&finder.field) {
                Some(def) if def.field_type.is_sortable() => {}
                _ => {
                    return Err(AppError::validation(format!(
                        "{}: finder '{}' looks up undeclared or unsearchable field '{}'",
                        self.name, finder.name, finder.field
                    )))
                }
            }
        }

        Ok(self)
    }

    /// Validate and coerce a write payload.
    ///
    /// Returns the identifier carried in the body (if any) and the coerced
    /// fields. A top-level `links` key is ignored so representations can be
    /// sent back as they were received.
    pub fn check_payload(
        &self,
        body: &Document,
        mode: WriteMode,
    ) -> AppResult<(Option<EntityId>, Document)> {
        let mut body_id = None;
        let mut fields = Document::new();

        for (key, value) in body {
            if key == LINKS_KEY {
                continue;
            }
            if *key == self.id_field {
                if !value.is_null() {
                    body_id = Some(EntityId::from_value(value)?);
                }
                continue;
            }

            let def = self.field_def(key).ok_or_else(|| {
                AppError::validation(format!("unknown field '{}' for {}", key, self.name))
            })?;
            let coerced = def
                .field_type
                .coerce(value)
                .map_err(|e| AppError::validation(format!("field '{}': {}", key, e)))?;
            if coerced.is_null() && def.required {
                return Err(AppError::validation(format!("field '{}' is required", key)));
            }
            fields.insert(key.clone(), coerced);
        }

        if mode != WriteMode::Patch {
            if let Some(missing) = self
                .fields
                .iter()
                .filter(|f| f.required)
                .find(|f| fields.get(&f.name).map_or(true, Value::is_null))
            {
                return Err(AppError::validation(format!(
                    "field '{}' is required",
                    missing.name
                )));
            }
        }

        if mode == WriteMode::Create && body_id.is_none() && self.id_strategy == IdStrategy::Client
        {
            return Err(AppError::validation(format!(
                "identifier '{}' must be supplied for {}",
                self.id_field, self.name
            )));
        }

        Ok((body_id, fields))
    }

    /// Coerce a list query filter; reference fields are only reachable by
    /// following the relation or through a declared finder.
    pub fn coerce_filter(&self, field: &str, raw: &str) -> AppResult<Value> {
        if self
            .field_def(field)
            .is_some_and(|d| d.field_type.is_reference())
        {
            return Err(AppError::malformed(format!(
                "'{}' is a reference of {} and cannot be filtered on",
                field, self.name
            )));
        }
        self.coerce_param(field, raw)
    }

    /// Coerce a query-string value for an equality match on `field`.
    pub fn coerce_param(&self, field: &str, raw: &str) -> AppResult<Value> {
        let def = self
            .field_def(field)
            .filter(|d| d.field_type.is_sortable())
            .ok_or_else(|| {
                AppError::malformed(format!("'{}' is not a filterable field of {}", field, self.name))
            })?;
        def.field_type
            .coerce(&Value::String(raw.to_string()))
            .map_err(|e| AppError::malformed(format!("parameter '{}': {}", field, e)))
    }
}

/// Derive a collection segment from a type name: `Widget` -> `widgets`.
pub fn default_collection(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with('s') || lower.ends_with('x') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") && !lower.ends_with("oy") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}
