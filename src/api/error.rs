//! HTTP error surface.
//!
//! Every handler failure renders as `{"error":{"code":...,"message":...}}`
//! with a status code the channel adapters can branch on.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;
use crate::triage::TriageError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Internal(_)) {
            tracing::error!(error = %self, "Request failed");
        }
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));
        (self.status(), body).into_response()
    }
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        match err {
            TriageError::Validation(msg) => Self::BadRequest(msg),
            TriageError::NotFound(id) => Self::NotFound(format!("Encounter {id} not found")),
            TriageError::AlreadyTriaged(id) => {
                Self::Conflict(format!("Encounter {id} already has a triage result"))
            }
            TriageError::Persistence(err) => Self::Internal(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} {id} not found"))
            }
            StoreError::AlreadyExists(id) => {
                Self::Conflict(format!("Encounter {id} already has a triage result"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn triage_errors_map_to_expected_statuses() {
        let id = Uuid::new_v4();
        let cases = [
            (
                ApiError::from(TriageError::Validation("bad age".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(TriageError::NotFound(id)),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(TriageError::AlreadyTriaged(id)),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status);
        }
    }

    #[test]
    fn store_not_found_maps_to_404() {
        let err = ApiError::from(StoreError::NotFound {
            entity: "encounter".into(),
            id: "abc".into(),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "not_found");
    }
}
