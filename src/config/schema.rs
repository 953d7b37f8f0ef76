use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// Describes one collection: its fields, unique indexes, and names.
///
/// The schema is the single source of truth for field defaults, hidden
/// fields, and the JSON Schema used to validate incoming documents.
#[derive(Debug, Clone)]
pub struct CollectionSchema {
    /// Collection name (plural, e.g. "tours")
    pub name: &'static str,

    /// Singular resource name used in envelopes and error messages
    pub singular: &'static str,

    /// Field definitions
    pub fields: HashMap<&'static str, FieldDefinition>,

    /// Index definitions
    pub indexes: Vec<IndexDefinition>,
}

/// Field definition in a collection schema
#[derive(Debug, Clone, Default)]
pub struct FieldDefinition {
    /// Field type
    pub field_type: FieldType,

    /// Whether the field is required on create
    pub required: bool,

    /// Default value applied when the field is missing
    pub default: Option<Value>,

    /// Hidden fields are stripped from every response
    pub hidden: bool,

    /// Restricted set of allowed values
    pub allowed: Option<Vec<Value>>,

    /// Minimum value (numbers) or length (strings)
    pub min: Option<f64>,

    /// Maximum value (numbers) or length (strings)
    pub max: Option<f64>,
}

/// Field type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

/// Index definition
#[derive(Debug, Clone)]
pub struct IndexDefinition {
    /// Fields included in the index
    pub fields: Vec<&'static str>,

    /// Whether this is a unique index
    pub unique: bool,
}

impl FieldDefinition {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn allowed(mut self, values: Vec<Value>) -> Self {
        self.allowed = Some(values);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }
}

impl FieldType {
    fn json_type(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

impl CollectionSchema {
    /// Build the JSON Schema used to validate documents of this collection.
    ///
    /// String min/max become minLength/maxLength; numeric min/max become
    /// minimum/maximum. Extra properties are allowed so that internal fields
    /// (`_id`, `__v`, `createdAt`) pass validation on updates.
    pub fn validation_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required: Vec<&str> = Vec::new();

        for (name, def) in &self.fields {
            let mut prop = Map::new();
            prop.insert("type".to_string(), json!(def.field_type.json_type()));

            match def.field_type {
                FieldType::String => {
                    if let Some(min) = def.min {
                        prop.insert("minLength".to_string(), json!(min as u64));
                    }
                    if let Some(max) = def.max {
                        prop.insert("maxLength".to_string(), json!(max as u64));
                    }
                }
                FieldType::Number | FieldType::Integer => {
                    if let Some(min) = def.min {
                        prop.insert("minimum".to_string(), json!(min));
                    }
                    if let Some(max) = def.max {
                        prop.insert("maximum".to_string(), json!(max));
                    }
                }
                _ => {}
            }

            if let Some(allowed) = &def.allowed {
                prop.insert("enum".to_string(), Value::Array(allowed.clone()));
            }

            properties.insert(name.to_string(), Value::Object(prop));
            if def.required {
                required.push(name);
            }
        }

        // Deterministic `required` order for stable error messages
        required.sort_unstable();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Names of fields that must never appear in a response
    pub fn hidden_fields(&self) -> Vec<&'static str> {
        let mut hidden: Vec<&'static str> = self
            .fields
            .iter()
            .filter(|(_, def)| def.hidden)
            .map(|(name, _)| *name)
            .collect();
        hidden.sort_unstable();
        hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> CollectionSchema {
        let mut fields = HashMap::new();
        fields.insert(
            "name",
            FieldDefinition::new(FieldType::String)
                .required()
                .min(10.0)
                .max(40.0),
        );
        fields.insert(
            "rating",
            FieldDefinition::new(FieldType::Integer).min(1.0).max(5.0),
        );
        fields.insert(
            "difficulty",
            FieldDefinition::new(FieldType::String)
                .required()
                .allowed(vec![json!("easy"), json!("medium"), json!("difficult")]),
        );
        fields.insert("secret", FieldDefinition::new(FieldType::Boolean).hidden());

        CollectionSchema {
            name: "samples",
            singular: "sample",
            fields,
            indexes: vec![IndexDefinition {
                fields: vec!["name"],
                unique: true,
            }],
        }
    }

    #[test]
    fn test_validation_schema_required_and_bounds() {
        let schema = sample_schema().validation_schema();

        assert_eq!(schema["required"], json!(["difficulty", "name"]));
        assert_eq!(schema["properties"]["name"]["minLength"], json!(10));
        assert_eq!(schema["properties"]["name"]["maxLength"], json!(40));
        assert_eq!(schema["properties"]["rating"]["minimum"], json!(1.0));
        assert_eq!(schema["properties"]["rating"]["maximum"], json!(5.0));
        assert_eq!(
            schema["properties"]["difficulty"]["enum"],
            json!(["easy", "medium", "difficult"])
        );
    }

    #[test]
    fn test_validation_schema_accepts_valid_document() {
        let schema = sample_schema().validation_schema();
        let validator = jsonschema::validator_for(&schema).unwrap();

        assert!(validator.is_valid(&json!({
            "name": "The Forest Hiker",
            "difficulty": "easy",
            "rating": 4,
        })));
        assert!(!validator.is_valid(&json!({
            "name": "short",
            "difficulty": "easy",
        })));
        assert!(!validator.is_valid(&json!({
            "name": "The Forest Hiker",
            "difficulty": "extreme",
        })));
    }

    #[test]
    fn test_hidden_fields() {
        assert_eq!(sample_schema().hidden_fields(), vec!["secret"]);
    }
}
