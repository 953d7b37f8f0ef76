use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use validator::Validate;

use super::envelope;
use super::error::AppError;
use crate::models::{tour, user::CreateUser};
use crate::query::{Filter, QueryRequest};
use crate::state::AppState;

type ListResponse = Result<Json<Value>, AppError>;
type OneResponse = Result<Json<Value>, AppError>;
type CreatedResponse = Result<(StatusCode, Json<Value>), AppError>;
type DeletedResponse = Result<StatusCode, AppError>;

fn object_body(body: Value) -> Result<Map<String, Value>, AppError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Validation {
            message: "Request body must be a JSON object".to_string(),
            errors: Vec::new(),
        }),
    }
}

// Tours

pub async fn list_tours(
    State(state): State<Arc<AppState>>,
    Query(request): Query<QueryRequest>,
) -> ListResponse {
    let tours = state.tours.list(&state.store, &request, &Filter::new())?;
    Ok(envelope::list(state.tours.name(), tours))
}

/// Alias route: same pipeline, preset query
pub async fn top_five_tours(State(state): State<Arc<AppState>>) -> ListResponse {
    let request = tour::top_five_request();
    let tours = state.tours.list(&state.store, &request, &Filter::new())?;
    Ok(envelope::list(state.tours.name(), tours))
}

pub async fn tour_stats(State(state): State<Arc<AppState>>) -> ListResponse {
    let stats = tour::stats(&state.store)?;
    Ok(envelope::list("stats", stats))
}

pub async fn get_tour(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> OneResponse {
    let tour = state.tours.get(&state.store, &id)?;
    Ok(envelope::one(state.tours.singular(), tour))
}

pub async fn create_tour(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> CreatedResponse {
    let tour = state.tours.create(&state.store, object_body(body)?)?;
    Ok((StatusCode::CREATED, envelope::one(state.tours.singular(), tour)))
}

pub async fn update_tour(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> OneResponse {
    let tour = state.tours.update(&state.store, &id, object_body(body)?)?;
    Ok(envelope::one(state.tours.singular(), tour))
}

pub async fn delete_tour(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> DeletedResponse {
    state.tours.delete(&state.store, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// Reviews

pub async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Query(request): Query<QueryRequest>,
) -> ListResponse {
    let reviews = state.reviews.list(&state.store, &request, &Filter::new())?;
    Ok(envelope::list(state.reviews.name(), reviews))
}

/// Nested route: only the reviews of one tour
pub async fn list_tour_reviews(
    State(state): State<Arc<AppState>>,
    Path(tour_id): Path<String>,
    Query(request): Query<QueryRequest>,
) -> ListResponse {
    let extra = Filter::equals("tour", json!(tour_id));
    let reviews = state.reviews.list(&state.store, &request, &extra)?;
    Ok(envelope::list(state.reviews.name(), reviews))
}

pub async fn get_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> OneResponse {
    let review = state.reviews.get(&state.store, &id)?;
    Ok(envelope::one(state.reviews.singular(), review))
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> CreatedResponse {
    let review = state.reviews.create(&state.store, object_body(body)?)?;
    Ok((StatusCode::CREATED, envelope::one(state.reviews.singular(), review)))
}

/// Nested route: the tour reference defaults from the path
pub async fn create_tour_review(
    State(state): State<Arc<AppState>>,
    Path(tour_id): Path<String>,
    Json(body): Json<Value>,
) -> CreatedResponse {
    let mut body = object_body(body)?;
    body.entry("tour".to_string())
        .or_insert_with(|| json!(tour_id));

    let review = state.reviews.create(&state.store, body)?;
    Ok((StatusCode::CREATED, envelope::one(state.reviews.singular(), review)))
}

pub async fn update_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> OneResponse {
    let review = state.reviews.update(&state.store, &id, object_body(body)?)?;
    Ok(envelope::one(state.reviews.singular(), review))
}

pub async fn delete_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> DeletedResponse {
    state.reviews.delete(&state.store, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

// Users

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(request): Query<QueryRequest>,
) -> ListResponse {
    let users = state.users.list(&state.store, &request, &Filter::new())?;
    Ok(envelope::list(state.users.name(), users))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> OneResponse {
    let user = state.users.get(&state.store, &id)?;
    Ok(envelope::one(state.users.singular(), user))
}

/// User creation goes through the typed payload so the format checks
/// (email, lengths, confirm match) run before any document is built
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUser>,
) -> CreatedResponse {
    payload.validate().map_err(AppError::from)?;
    let user = state.users.create(&state.store, payload.into_document()?)?;
    Ok((StatusCode::CREATED, envelope::one(state.users.singular(), user)))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> OneResponse {
    let user = state.users.update(&state.store, &id, object_body(body)?)?;
    Ok(envelope::one(state.users.singular(), user))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> DeletedResponse {
    state.users.delete(&state.store, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
