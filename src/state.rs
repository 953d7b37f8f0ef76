/// Shared application state
///
/// One in-memory store plus the three configured resources. Handlers
/// receive this behind an `Arc` via axum's `State` extractor.

use serde_json::Value;
use std::sync::Arc;

use crate::models::{self, ModelError, Resource, review, tour, user};
use crate::store::MemoryStore;

pub struct AppState {
    pub store: MemoryStore,
    pub tours: Resource,
    pub users: Resource,
    pub reviews: Resource,
}

impl AppState {
    pub fn new() -> Arc<Self> {
        Arc::new(AppState {
            store: MemoryStore::new(&models::catalog()),
            tours: tour::resource(),
            users: user::resource(),
            reviews: review::resource(),
        })
    }

    /// Load documents from a seed file shaped as
    /// `{"tours": [...], "users": [...], "reviews": [...]}`.
    ///
    /// Documents run through the normal create pipeline, so defaults,
    /// hashing, and the review aggregate rule all apply. Tours and users
    /// load before reviews because reviews reference them.
    pub fn seed(&self, root: &Value) -> Result<usize, ModelError> {
        let mut loaded = 0;
        for (key, resource) in [
            ("tours", &self.tours),
            ("users", &self.users),
            ("reviews", &self.reviews),
        ] {
            let Some(documents) = root.get(key).and_then(Value::as_array) else {
                continue;
            };
            for document in documents {
                let Some(body) = document.as_object() else {
                    return Err(ModelError::validation(format!(
                        "seed entry under '{key}' is not an object"
                    )));
                };
                resource.create(&self.store, body.clone())?;
                loaded += 1;
            }
            tracing::info!(collection = key, count = documents.len(), "seeded");
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::query::{Filter, QueryRequest};

    #[test]
    fn test_seed_loads_all_sections() {
        let state = AppState::new();
        let tour_doc = json!({
            "name": "The Forest Hiker",
            "duration": 5,
            "maxGroupSize": 12,
            "difficulty": "easy",
            "price": 397,
            "summary": "A lovely walk",
        });

        let loaded = state
            .seed(&json!({
                "tours": [tour_doc],
                "users": [{
                    "name": "Alice",
                    "email": "alice@example.com",
                    "password": "pass12345",
                    "passwordConfirm": "pass12345",
                }],
            }))
            .unwrap();
        assert_eq!(loaded, 2);

        let tours = state
            .tours
            .list(&state.store, &QueryRequest::new(), &Filter::new())
            .unwrap();
        assert_eq!(tours.len(), 1);
    }

    #[test]
    fn test_seed_rejects_non_object_entry() {
        let state = AppState::new();
        let err = state.seed(&json!({"tours": ["oops"]})).unwrap_err();
        assert!(matches!(err, ModelError::Validation { .. }));
    }
}
