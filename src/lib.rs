/// trailhead - A tour booking REST API
///
/// This library provides a query pipeline that translates HTTP query
/// strings into filtered, sorted, paginated reads, schema-driven resource
/// models for tours, users, and reviews, and the axum HTTP surface that
/// serves them over an in-memory document store.

pub mod config;
pub mod http;
pub mod models;
pub mod query;
pub mod state;
pub mod store;

// Re-export commonly used types
pub use http::AppError;
pub use models::{ModelError, Resource};
pub use query::{ApiQuery, Filter, FindOptions, QueryRequest};
pub use store::{DocumentStore, MemoryStore, StoreError};
