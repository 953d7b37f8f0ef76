use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::models::ModelError;
use crate::store::StoreError;

/// Errors surfaced to HTTP clients.
///
/// Operational errors carry a message safe to show; anything else is logged
/// and masked as a generic 500 so programming errors never leak details.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("No {resource} found with that ID")]
    NotFound { resource: String },

    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<String>,
    },

    #[error("Duplicate value for unique field(s) {fields}")]
    Duplicate { fields: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Validation { .. } | AppError::Duplicate { .. } => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NotFound { resource } => AppError::NotFound { resource },
            ModelError::Validation { message, errors } => AppError::Validation { message, errors },
            ModelError::Store(StoreError::DuplicateKey { fields, .. }) => {
                AppError::Duplicate { fields }
            }
            ModelError::Store(StoreError::UnknownCollection(name)) => {
                AppError::Internal(format!("unknown collection: {name}"))
            }
            ModelError::Internal(message) => AppError::Internal(message),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("Invalid value for field '{field}'"),
                })
            })
            .collect();
        AppError::Validation {
            message: "Invalid input data".to_string(),
            errors: messages,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // 4xx = "fail", 5xx = "error" (JSend-style envelope)
        let body = match &self {
            AppError::Validation { message, errors } => json!({
                "status": "fail",
                "message": message,
                "errors": errors,
            }),
            AppError::Internal(detail) => {
                // Programming or unknown error: log it, do not leak it
                tracing::error!(error = %detail, "unhandled internal error");
                json!({
                    "status": "error",
                    "message": "Something went very wrong!",
                })
            }
            other => json!({
                "status": "fail",
                "message": other.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::NotFound {
                resource: "tour".to_string()
            }
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Duplicate {
                fields: "name".to_string()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("boom".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_model_error_conversion() {
        let err: AppError = ModelError::not_found("tour").into();
        assert_eq!(err.to_string(), "No tour found with that ID");

        let err: AppError = ModelError::Store(StoreError::DuplicateKey {
            collection: "reviews".to_string(),
            fields: "tour, user".to_string(),
        })
        .into();
        assert!(matches!(err, AppError::Duplicate { .. }));
    }
}
