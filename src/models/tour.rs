use serde_json::{Value, json};
use std::collections::HashMap;

use super::{ModelError, Resource, hooks};
use crate::config::{CollectionSchema, FieldDefinition, FieldType, IndexDefinition};
use crate::query::{Filter, QueryRequest};
use crate::store::DocumentStore;

pub const COLLECTION: &str = "tours";

/// Collection schema for tours.
///
/// `ratingsAverage` / `ratingsQuantity` are derived fields owned by the
/// review recomputation rule; their defaults here are the empty-state
/// values. `secretTour` drives the base filter that hides a tour from the
/// whole API.
pub fn schema() -> CollectionSchema {
    let mut fields = HashMap::new();
    fields.insert(
        "name",
        FieldDefinition::new(FieldType::String)
            .required()
            .min(10.0)
            .max(40.0),
    );
    fields.insert("slug", FieldDefinition::new(FieldType::String));
    fields.insert(
        "duration",
        FieldDefinition::new(FieldType::Number).required(),
    );
    fields.insert(
        "maxGroupSize",
        FieldDefinition::new(FieldType::Number).required(),
    );
    fields.insert(
        "difficulty",
        FieldDefinition::new(FieldType::String)
            .required()
            .allowed(vec![json!("easy"), json!("medium"), json!("difficult")]),
    );
    fields.insert(
        "ratingsAverage",
        FieldDefinition::new(FieldType::Number)
            .default_value(json!(4.5))
            .min(1.0)
            .max(5.0),
    );
    fields.insert(
        "ratingsQuantity",
        FieldDefinition::new(FieldType::Integer)
            .default_value(json!(0))
            .min(0.0),
    );
    fields.insert("price", FieldDefinition::new(FieldType::Number).required());
    fields.insert("priceDiscount", FieldDefinition::new(FieldType::Number));
    fields.insert(
        "summary",
        FieldDefinition::new(FieldType::String).required(),
    );
    fields.insert("description", FieldDefinition::new(FieldType::String));
    fields.insert("imageCover", FieldDefinition::new(FieldType::String));
    fields.insert("images", FieldDefinition::new(FieldType::Array));
    fields.insert("startDates", FieldDefinition::new(FieldType::Array));
    fields.insert(
        "secretTour",
        FieldDefinition::new(FieldType::Boolean).default_value(json!(false)),
    );

    CollectionSchema {
        name: COLLECTION,
        singular: "tour",
        fields,
        indexes: vec![IndexDefinition {
            fields: vec!["name"],
            unique: true,
        }],
    }
}

pub fn resource() -> Resource {
    Resource::new(schema())
        .base_filter(base_filter())
        .create_stage(hooks::apply_defaults)
        .create_stage(hooks::stamp_created_at)
        .create_stage(hooks::slugify_name)
}

/// Secret tours behave as if they did not exist
pub fn base_filter() -> Filter {
    Filter::equals("secretTour", json!(false))
}

/// Preset query for the "top 5 cheap" alias route: best-rated first,
/// cheapest breaking ties, trimmed field list
pub fn top_five_request() -> QueryRequest {
    [
        ("limit", "5"),
        ("sort", "-ratingsAverage,price"),
        ("fields", "name,price,ratingsAverage,summary,difficulty"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Aggregate non-hidden tours by difficulty: count, average price,
/// average rating
pub fn stats(store: &dyn DocumentStore) -> Result<Vec<Value>, ModelError> {
    let rows = store.group_stats(
        COLLECTION,
        &base_filter(),
        "difficulty",
        &["price", "ratingsAverage"],
    )?;

    Ok(rows
        .into_iter()
        .map(|row| {
            json!({
                "difficulty": row.key,
                "numTours": row.count,
                "avgPrice": row.averages.get("price"),
                "avgRating": row.averages.get("ratingsAverage"),
            })
        })
        .collect())
}
