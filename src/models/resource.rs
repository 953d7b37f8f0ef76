use serde_json::{Map, Value};

use super::ModelError;
use crate::config::CollectionSchema;
use crate::query::{ApiQuery, Filter, QueryRequest};
use crate::store::DocumentStore;

/// One persistence pipeline stage, run against the document (or patch)
/// before it reaches the store
pub type SaveStage = fn(&CollectionSchema, &mut Map<String, Value>) -> Result<(), ModelError>;

/// A rule run synchronously after a successful create, update, or delete,
/// receiving the affected document
pub type PostWriteHook = fn(&dyn DocumentStore, &Value) -> Result<(), ModelError>;

/// Generic CRUD service over one collection.
///
/// Bundles the collection schema, the base filter that hides documents from
/// every read, the explicit save stages, and the post-write rules. Route
/// handlers stay thin: they extract the request pieces and call into here.
pub struct Resource {
    schema: CollectionSchema,
    base_filter: Filter,
    create_stages: Vec<SaveStage>,
    update_stages: Vec<SaveStage>,
    post_write: Vec<PostWriteHook>,
    update_allow_list: Option<&'static [&'static str]>,
    hidden_fields: Vec<&'static str>,
}

impl Resource {
    pub fn new(schema: CollectionSchema) -> Self {
        let hidden_fields = schema.hidden_fields();
        Self {
            schema,
            base_filter: Filter::new(),
            create_stages: Vec::new(),
            update_stages: Vec::new(),
            post_write: Vec::new(),
            update_allow_list: None,
            hidden_fields,
        }
    }

    /// Predicates ANDed into every read; documents failing them behave as
    /// if they did not exist
    pub fn base_filter(mut self, filter: Filter) -> Self {
        self.base_filter = filter;
        self
    }

    pub fn create_stage(mut self, stage: SaveStage) -> Self {
        self.create_stages.push(stage);
        self
    }

    pub fn update_stage(mut self, stage: SaveStage) -> Self {
        self.update_stages.push(stage);
        self
    }

    pub fn post_write(mut self, hook: PostWriteHook) -> Self {
        self.post_write.push(hook);
        self
    }

    /// Restrict which fields an update patch may carry; everything else is
    /// silently dropped
    pub fn update_allow_list(mut self, fields: &'static [&'static str]) -> Self {
        self.update_allow_list = Some(fields);
        self
    }

    /// Collection name (plural)
    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    /// Singular resource name for envelopes and error messages
    pub fn singular(&self) -> &'static str {
        self.schema.singular
    }

    /// Run the query pipeline and return the matching documents
    pub fn list(
        &self,
        store: &dyn DocumentStore,
        request: &QueryRequest,
        extra: &Filter,
    ) -> Result<Vec<Value>, ModelError> {
        let base = self.base_filter.and(extra);
        let options = ApiQuery::new(request, base)
            .filter()
            .sorting()
            .limit_fields()
            .paginate()
            .into_options();

        let documents = store.find(self.schema.name, &options)?;
        tracing::debug!(
            collection = self.schema.name,
            results = documents.len(),
            "list query executed"
        );
        Ok(documents
            .into_iter()
            .map(|doc| self.conceal(doc))
            .collect())
    }

    /// Fetch one document; absence (or a hidden document) is a domain
    /// not-found, never a store error
    pub fn get(&self, store: &dyn DocumentStore, id: &str) -> Result<Value, ModelError> {
        store
            .find_by_id(self.schema.name, id, &self.base_filter)?
            .map(|doc| self.conceal(doc))
            .ok_or_else(|| ModelError::not_found(self.schema.singular))
    }

    /// Validate the body, run the create stages in order, insert, then run
    /// the post-write rules against the created document
    pub fn create(
        &self,
        store: &dyn DocumentStore,
        body: Map<String, Value>,
    ) -> Result<Value, ModelError> {
        self.validate_document(&Value::Object(body.clone()))?;

        let mut document = body;
        for stage in &self.create_stages {
            stage(&self.schema, &mut document)?;
        }

        let created = store.insert(self.schema.name, document)?;
        self.run_post_write(store, &created)?;
        Ok(self.conceal(created))
    }

    /// Apply the allow-list and update stages to the patch, validate the
    /// would-be merged document, write, then run the post-write rules
    pub fn update(
        &self,
        store: &dyn DocumentStore,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<Value, ModelError> {
        let mut patch: Map<String, Value> = match self.update_allow_list {
            Some(allowed) => patch
                .into_iter()
                .filter(|(key, _)| allowed.contains(&key.as_str()))
                .collect(),
            None => patch,
        };

        for stage in &self.update_stages {
            stage(&self.schema, &mut patch)?;
        }

        let current = store
            .find_by_id(self.schema.name, id, &self.base_filter)?
            .ok_or_else(|| ModelError::not_found(self.schema.singular))?;

        let mut merged = current.as_object().cloned().unwrap_or_default();
        for (key, value) in &patch {
            merged.insert(key.clone(), value.clone());
        }
        self.validate_document(&Value::Object(merged))?;

        let updated = store
            .update_by_id(self.schema.name, id, &patch)?
            .ok_or_else(|| ModelError::not_found(self.schema.singular))?;

        self.run_post_write(store, &updated)?;
        Ok(self.conceal(updated))
    }

    /// Delete one document and run the post-write rules against what was
    /// removed (the review hook needs the parent reference)
    pub fn delete(&self, store: &dyn DocumentStore, id: &str) -> Result<(), ModelError> {
        // A document hidden by the base filter is not deletable either
        store
            .find_by_id(self.schema.name, id, &self.base_filter)?
            .ok_or_else(|| ModelError::not_found(self.schema.singular))?;

        let removed = store
            .delete_by_id(self.schema.name, id)?
            .ok_or_else(|| ModelError::not_found(self.schema.singular))?;

        self.run_post_write(store, &removed)?;
        Ok(())
    }

    fn run_post_write(
        &self,
        store: &dyn DocumentStore,
        document: &Value,
    ) -> Result<(), ModelError> {
        for hook in &self.post_write {
            hook(store, document)?;
        }
        Ok(())
    }

    fn validate_document(&self, document: &Value) -> Result<(), ModelError> {
        let schema_json = self.schema.validation_schema();
        let validator = jsonschema::validator_for(&schema_json).map_err(|e| {
            ModelError::Internal(format!("failed to compile validation schema: {e}"))
        })?;

        if validator.is_valid(document) {
            return Ok(());
        }
        let errors: Vec<String> = validator
            .iter_errors(document)
            .map(|e| e.to_string())
            .collect();
        Err(ModelError::Validation {
            message: "Invalid input data".to_string(),
            errors,
        })
    }

    /// Strip hidden fields from a response document
    fn conceal(&self, document: Value) -> Value {
        if self.hidden_fields.is_empty() {
            return document;
        }
        let Value::Object(mut obj) = document else {
            return document;
        };
        for field in &self.hidden_fields {
            obj.remove(*field);
        }
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldDefinition, FieldType, IndexDefinition};
    use crate::models::hooks;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::collections::HashMap;

    fn gadgets_schema() -> CollectionSchema {
        let mut fields = HashMap::new();
        fields.insert(
            "name",
            FieldDefinition::new(FieldType::String).required().min(3.0),
        );
        fields.insert("price", FieldDefinition::new(FieldType::Number).required());
        fields.insert(
            "archived",
            FieldDefinition::new(FieldType::Boolean).default_value(json!(false)),
        );
        fields.insert("secret", FieldDefinition::new(FieldType::String).hidden());
        CollectionSchema {
            name: "gadgets",
            singular: "gadget",
            fields,
            indexes: vec![IndexDefinition {
                fields: vec!["name"],
                unique: true,
            }],
        }
    }

    fn resource() -> Resource {
        Resource::new(gadgets_schema())
            .base_filter(Filter::equals("archived", json!(false)))
            .create_stage(hooks::apply_defaults)
            .create_stage(hooks::stamp_created_at)
            .update_allow_list(&["name", "price"])
    }

    fn store() -> MemoryStore {
        MemoryStore::new(&[gadgets_schema()])
    }

    fn body(value: serde_json::Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_create_runs_stages_and_conceals() {
        let store = store();
        let resource = resource();

        let created = resource
            .create(&store, body(json!({"name": "Widget", "price": 10, "secret": "x"})))
            .unwrap();

        assert_eq!(created["archived"], json!(false));
        assert!(created["createdAt"].is_string());
        assert!(created.get("secret").is_none());
        assert!(created["_id"].is_string());
    }

    #[test]
    fn test_create_rejects_invalid_body() {
        let store = store();
        let err = resource()
            .create(&store, body(json!({"price": 10})))
            .unwrap_err();

        match err {
            ModelError::Validation { errors, .. } => assert!(!errors.is_empty()),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_surfaces_duplicate_key() {
        let store = store();
        let resource = resource();
        resource
            .create(&store, body(json!({"name": "Widget", "price": 10})))
            .unwrap();
        let err = resource
            .create(&store, body(json!({"name": "Widget", "price": 12})))
            .unwrap_err();

        assert!(matches!(
            err,
            ModelError::Store(crate::store::StoreError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = store();
        let err = resource().get(&store, "nope").unwrap_err();
        assert_eq!(err, ModelError::not_found("gadget"));
    }

    #[test]
    fn test_base_filter_hides_from_list_get_and_delete() {
        let store = store();
        let resource = resource();
        let created = resource
            .create(
                &store,
                body(json!({"name": "Hidden", "price": 5, "archived": true})),
            )
            .unwrap();
        let id = created["_id"].as_str().unwrap();

        let listed = resource.list(&store, &QueryRequest::new(), &Filter::new()).unwrap();
        assert!(listed.is_empty());
        assert!(matches!(
            resource.get(&store, id),
            Err(ModelError::NotFound { .. })
        ));
        assert!(matches!(
            resource.delete(&store, id),
            Err(ModelError::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_honors_allow_list_and_merges() {
        let store = store();
        let resource = resource();
        let created = resource
            .create(&store, body(json!({"name": "Widget", "price": 10})))
            .unwrap();
        let id = created["_id"].as_str().unwrap();

        let updated = resource
            .update(&store, id, body(json!({"price": 20, "archived": true})))
            .unwrap();

        // price merged, archived dropped by the allow-list
        assert_eq!(updated["price"], json!(20));
        assert_eq!(updated["archived"], json!(false));
        assert_eq!(updated["name"], json!("Widget"));
    }

    #[test]
    fn test_update_validates_merged_document() {
        let store = store();
        let resource = resource();
        let created = resource
            .create(&store, body(json!({"name": "Widget", "price": 10})))
            .unwrap();
        let id = created["_id"].as_str().unwrap();

        // merged name would violate minLength
        let err = resource.update(&store, id, body(json!({"name": "x"}))).unwrap_err();
        assert!(matches!(err, ModelError::Validation { .. }));
    }

    #[test]
    fn test_delete_then_get_is_not_found() {
        let store = store();
        let resource = resource();
        let created = resource
            .create(&store, body(json!({"name": "Widget", "price": 10})))
            .unwrap();
        let id = created["_id"].as_str().unwrap();

        resource.delete(&store, id).unwrap();
        assert!(matches!(
            resource.get(&store, id),
            Err(ModelError::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_runs_full_pipeline() {
        let store = store();
        let resource = resource();
        for (name, price) in [("Widget A", 30), ("Widget B", 10), ("Widget C", 20)] {
            resource
                .create(&store, body(json!({"name": name, "price": price})))
                .unwrap();
        }

        let request: QueryRequest = [
            ("sort".to_string(), "price".to_string()),
            ("fields".to_string(), "name,price".to_string()),
            ("limit".to_string(), "2".to_string()),
        ]
        .into_iter()
        .collect();
        let listed = resource.list(&store, &request, &Filter::new()).unwrap();

        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["name"], json!("Widget B"));
        assert_eq!(listed[1]["name"], json!("Widget C"));
        assert!(listed[0].get("archived").is_none());
    }
}
