use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use validator::Validate;

use super::{ModelError, Resource, hooks};
use crate::config::{CollectionSchema, FieldDefinition, FieldType, IndexDefinition};
use crate::query::Filter;

pub const COLLECTION: &str = "users";

/// Collection schema for users. `password` is hidden from every response;
/// `active` is both hidden and the base-filter field that makes deactivated
/// users invisible to the API.
pub fn schema() -> CollectionSchema {
    let mut fields = HashMap::new();
    fields.insert(
        "name",
        FieldDefinition::new(FieldType::String)
            .required()
            .max(30.0),
    );
    fields.insert("email", FieldDefinition::new(FieldType::String).required());
    fields.insert("photo", FieldDefinition::new(FieldType::String));
    fields.insert(
        "role",
        FieldDefinition::new(FieldType::String)
            .default_value(json!("user"))
            .allowed(vec![
                json!("user"),
                json!("guide"),
                json!("lead-guide"),
                json!("admin"),
            ]),
    );
    fields.insert(
        "password",
        FieldDefinition::new(FieldType::String).required().hidden(),
    );
    fields.insert(
        "active",
        FieldDefinition::new(FieldType::Boolean)
            .default_value(json!(true))
            .hidden(),
    );

    CollectionSchema {
        name: COLLECTION,
        singular: "user",
        fields,
        indexes: vec![IndexDefinition {
            fields: vec!["email"],
            unique: true,
        }],
    }
}

pub fn resource() -> Resource {
    Resource::new(schema())
        .base_filter(Filter::equals("active", json!(true)))
        .create_stage(hooks::apply_defaults)
        .create_stage(hooks::stamp_created_at)
        .create_stage(normalize_email)
        .create_stage(hooks::hash_password)
        .update_stage(normalize_email)
        .update_stage(hooks::hash_password)
        .update_allow_list(&[
            "name",
            "email",
            "photo",
            "role",
            "password",
            "passwordConfirm",
        ])
}

/// Emails are stored lowercased so the unique index is case-insensitive
fn normalize_email(
    _schema: &CollectionSchema,
    doc: &mut Map<String, Value>,
) -> Result<(), ModelError> {
    if let Some(email) = doc.get("email").and_then(Value::as_str) {
        let lowered = email.to_lowercase();
        doc.insert("email".to_string(), Value::String(lowered));
    }
    Ok(())
}

/// Typed signup/create payload, validated before it becomes a document
#[derive(Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    #[validate(length(
        min = 1,
        max = 30,
        message = "A user name must have less or equal then 30 characters"
    ))]
    pub name: String,

    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[validate(length(
        min = 8,
        message = "Password must have more or equal then 8 characters"
    ))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords are not the same!"))]
    pub password_confirm: String,
}

impl CreateUser {
    /// Serialize to the document map the resource pipeline expects
    pub fn into_document(self) -> Result<Map<String, Value>, ModelError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => Err(ModelError::Internal(
                "failed to serialize user payload".to_string(),
            )),
        }
    }
}
