/// Persistence pipeline stages
///
/// Plain functions a `Resource` lists explicitly, so the order and the
/// triggering operation (create vs. update) are visible at the call site
/// and each stage is testable in isolation.

use chrono::Utc;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::ModelError;
use crate::config::CollectionSchema;
use crate::query::CREATED_AT_FIELD;

/// Fill missing fields from the schema's declared defaults
pub fn apply_defaults(schema: &CollectionSchema, doc: &mut Map<String, Value>) -> Result<(), ModelError> {
    for (name, def) in &schema.fields {
        if let Some(default) = &def.default {
            if !doc.contains_key(*name) {
                doc.insert(name.to_string(), default.clone());
            }
        }
    }
    Ok(())
}

/// Set the creation timestamp if the document does not carry one
pub fn stamp_created_at(_schema: &CollectionSchema, doc: &mut Map<String, Value>) -> Result<(), ModelError> {
    if !doc.contains_key(CREATED_AT_FIELD) {
        doc.insert(
            CREATED_AT_FIELD.to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
    }
    Ok(())
}

/// Derive a URL-safe slug from the document's `name`
pub fn slugify_name(_schema: &CollectionSchema, doc: &mut Map<String, Value>) -> Result<(), ModelError> {
    if let Some(name) = doc.get("name").and_then(Value::as_str) {
        doc.insert("slug".to_string(), Value::String(slugify(name)));
    }
    Ok(())
}

/// Replace a plaintext `password` with its salted hash.
///
/// Requires a matching `passwordConfirm`, which is dropped before the
/// document reaches the store. A document without a password passes
/// through untouched (updates that do not change it).
pub fn hash_password(_schema: &CollectionSchema, doc: &mut Map<String, Value>) -> Result<(), ModelError> {
    let confirm = doc.remove("passwordConfirm");

    let Some(password) = doc.get("password").and_then(Value::as_str) else {
        return Ok(());
    };

    match confirm.as_ref().and_then(Value::as_str) {
        Some(confirm) if confirm == password => {}
        _ => return Err(ModelError::validation("Passwords are not the same!")),
    }

    let salt = Uuid::new_v4().simple().to_string();
    let stored = format!("{salt}${}", digest(&salt, password));
    doc.insert("password".to_string(), Value::String(stored));
    Ok(())
}

/// Check a candidate password against a stored `salt$hash` value
pub fn verify_password(stored: &str, candidate: &str) -> bool {
    let Some((salt, hash)) = stored.split_once('$') else {
        return false;
    };
    digest(salt, candidate) == hash
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Lowercase, hyphen-separate, and strip everything non-alphanumeric
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_was_dash = true;
    for c in input.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
