/// Document store abstraction
///
/// The trait decouples the CRUD layer from any particular persistence
/// backend; the in-memory implementation is the only one shipped.

mod memory;

pub use memory::MemoryStore;

use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

use crate::query::{Filter, FindOptions};

/// Errors surfaced by store operations.
///
/// Absence of a lookup target is not an error: reads return empty vectors
/// or `None` and the caller decides whether that is a not-found condition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("duplicate value for unique index ({fields}) on {collection}")]
    DuplicateKey { collection: String, fields: String },
}

/// One group produced by `group_stats`: the grouping key, the number of
/// matching documents, and the mean of each requested numeric field.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub key: Value,
    pub count: u64,
    pub averages: HashMap<String, f64>,
}

/// Trait for document persistence operations
pub trait DocumentStore: Send + Sync {
    /// Execute a fully described find against a collection
    fn find(&self, collection: &str, options: &FindOptions) -> Result<Vec<Value>, StoreError>;

    /// Fetch one document by id, honoring a base filter (a document hidden
    /// by the filter is indistinguishable from a missing one)
    fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        base: &Filter,
    ) -> Result<Option<Value>, StoreError>;

    /// Insert a document, assigning `_id` and `__v` and enforcing the
    /// collection's unique indexes
    fn insert(&self, collection: &str, document: Map<String, Value>) -> Result<Value, StoreError>;

    /// Merge a patch into the document with the given id; returns the
    /// updated document, or `None` if no document matched
    fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: &Map<String, Value>,
    ) -> Result<Option<Value>, StoreError>;

    /// Remove the document with the given id; returns the removed document,
    /// or `None` if no document matched
    fn delete_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// One-pass group-by over the documents matching `filter`: count per
    /// group plus the mean of each named numeric field
    fn group_stats(
        &self,
        collection: &str,
        filter: &Filter,
        group_by: &str,
        avg_fields: &[&str],
    ) -> Result<Vec<GroupRow>, StoreError>;
}
