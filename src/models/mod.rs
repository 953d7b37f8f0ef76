/// Resource models: tours, users, reviews
///
/// Each model contributes its collection schema, its persistence pipeline
/// stages (the explicit replacements for implicit schema hooks), and its
/// post-write rules. The generic `Resource` bundles them into the CRUD
/// service the HTTP layer calls.

pub mod hooks;
mod resource;
pub mod review;
pub mod tour;
pub mod user;

pub use resource::{PostWriteHook, Resource, SaveStage};

use thiserror::Error;

use crate::config::CollectionSchema;
use crate::store::StoreError;

/// Domain-level failures from the model layer.
///
/// `Validation` and `NotFound` are operational (safe to describe to the
/// client); everything funneled through `Store` keeps its own
/// classification.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<String>,
    },

    #[error("No {resource} found with that ID")]
    NotFound { resource: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl ModelError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }
}

/// All collection schemas, in seed order (reviews reference tours and users)
pub fn catalog() -> Vec<CollectionSchema> {
    vec![tour::schema(), user::schema(), review::schema()]
}
