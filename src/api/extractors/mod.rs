//! Custom request extractors.

mod json_document;
mod query_params;

pub use json_document::JsonDocument;
pub use query_params::QueryParams;
