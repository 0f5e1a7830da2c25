//! HTTP request handlers.

pub mod index_handler;
pub mod resource_handler;

pub use resource_handler::resource_routes;
