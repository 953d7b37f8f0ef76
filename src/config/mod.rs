/// Configuration types for trailhead
///
/// This module contains the collection schema descriptions that drive
/// defaults, unique-index enforcement, and document validation.

mod schema;

pub use schema::{CollectionSchema, FieldDefinition, FieldType, IndexDefinition};
