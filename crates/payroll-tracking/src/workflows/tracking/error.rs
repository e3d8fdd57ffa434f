use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use super::access::AccessError;
use super::domain::TransitionError;
use super::intake::ValidationErrors;
use super::repository::RepositoryError;

/// Error raised by the tracking services and surfaced to HTTP callers.
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl TrackingError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            TrackingError::Access(AccessError::MissingIdentity) => StatusCode::UNAUTHORIZED,
            TrackingError::Access(_) => StatusCode::FORBIDDEN,
            TrackingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            TrackingError::NotFound { .. } => StatusCode::NOT_FOUND,
            TrackingError::Transition(_) | TrackingError::Repository(RepositoryError::Conflict) => {
                StatusCode::CONFLICT
            }
            TrackingError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for TrackingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            TrackingError::Validation(errors) => json!({
                "error": self.to_string(),
                "fields": errors.errors,
            }),
            TrackingError::Repository(RepositoryError::Unavailable(detail)) => {
                error!(%detail, "tracking store failure");
                json!({ "error": "internal server error" })
            }
            _ => json!({ "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
