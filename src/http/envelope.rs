use axum::Json;
use serde_json::{Value, json};

/// JSend-style success envelope for a list of documents:
/// `{"status": "success", "results": n, "data": {<plural>: [...]}}`
pub fn list(plural: &str, documents: Vec<Value>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "results": documents.len(),
        "data": { plural: documents },
    }))
}

/// Success envelope for a single document:
/// `{"status": "success", "data": {<singular>: {...}}}`
pub fn one(singular: &str, document: Value) -> Json<Value> {
    Json(json!({
        "status": "success",
        "data": { singular: document },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_envelope() {
        let Json(body) = list("tours", vec![json!({"name": "a"}), json!({"name": "b"})]);
        assert_eq!(body["status"], json!("success"));
        assert_eq!(body["results"], json!(2));
        assert_eq!(body["data"]["tours"][1]["name"], json!("b"));
    }

    #[test]
    fn test_one_envelope() {
        let Json(body) = one("tour", json!({"name": "a"}));
        assert_eq!(body["status"], json!("success"));
        assert_eq!(body["data"]["tour"]["name"], json!("a"));
        assert!(body.get("results").is_none());
    }
}
