use serde_json::{Map, Value, json};
use std::collections::HashMap;

use super::{ModelError, Resource, hooks, tour};
use crate::config::{CollectionSchema, FieldDefinition, FieldType, IndexDefinition};
use crate::query::Filter;
use crate::store::DocumentStore;

pub const COLLECTION: &str = "reviews";

/// Aggregate values written to a tour that has no reviews
pub const DEFAULT_QUANTITY: u64 = 0;
pub const DEFAULT_AVERAGE: f64 = 4.5;

/// Collection schema for reviews.
///
/// The compound unique index enforces at most one review per
/// (tour, user) pair.
pub fn schema() -> CollectionSchema {
    let mut fields = HashMap::new();
    fields.insert(
        "review",
        FieldDefinition::new(FieldType::String).required(),
    );
    fields.insert(
        "rating",
        FieldDefinition::new(FieldType::Integer)
            .required()
            .min(1.0)
            .max(5.0),
    );
    fields.insert("tour", FieldDefinition::new(FieldType::String).required());
    fields.insert("user", FieldDefinition::new(FieldType::String).required());

    CollectionSchema {
        name: COLLECTION,
        singular: "review",
        fields,
        indexes: vec![IndexDefinition {
            fields: vec!["tour", "user"],
            unique: true,
        }],
    }
}

pub fn resource() -> Resource {
    Resource::new(schema())
        .create_stage(hooks::apply_defaults)
        .create_stage(hooks::stamp_created_at)
        // A review cannot move to another tour or user: that would strand
        // the old tour's aggregate
        .update_allow_list(&["review", "rating"])
        .post_write(tour_stats_hook)
}

/// Post-write rule: any review mutation recomputes its tour's aggregate
fn tour_stats_hook(store: &dyn DocumentStore, review: &Value) -> Result<(), ModelError> {
    match review.get("tour").and_then(Value::as_str) {
        Some(tour_id) => recompute_tour_stats(store, tour_id),
        None => Ok(()),
    }
}

/// Recompute `{ratingsQuantity, ratingsAverage}` for one tour from scratch.
///
/// One aggregation pass over all reviews of the tour; an empty result set
/// (the last review was deleted) writes the defaults back. The write
/// targets exactly the two aggregate fields and is unconditional.
/// Concurrent review mutations on the same tour may each compute from a
/// snapshot missing the other's write; the last recomputation wins.
pub fn recompute_tour_stats(store: &dyn DocumentStore, tour_id: &str) -> Result<(), ModelError> {
    let rows = store.group_stats(
        COLLECTION,
        &Filter::equals("tour", json!(tour_id)),
        "tour",
        &["rating"],
    )?;

    let (quantity, average) = match rows.first() {
        Some(row) => (
            row.count,
            round_rating(row.averages.get("rating").copied().unwrap_or(DEFAULT_AVERAGE)),
        ),
        None => (DEFAULT_QUANTITY, DEFAULT_AVERAGE),
    };

    let mut patch = Map::new();
    patch.insert("ratingsQuantity".to_string(), json!(quantity));
    patch.insert("ratingsAverage".to_string(), json!(average));

    // A vanished tour is not an error here; there is nothing to write onto
    store.update_by_id(tour::COLLECTION, tour_id, &patch)?;
    tracing::debug!(tour_id, quantity, average, "tour ratings recomputed");
    Ok(())
}

/// Averages are stored with one decimal (4.6666 → 4.7)
pub fn round_rating(average: f64) -> f64 {
    (average * 10.0).round() / 10.0
}
