use std::collections::BTreeMap;

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde_json::json;
use tracing::error;

pub type Error = anyhow::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Dal(#[from] bookclub_dal::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use bookclub_dal::Error as DalError;
        let (status, body) = match self {
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({"detail": format!("{what} not found")}),
            ),
            ApiError::InvalidQuery(message) => {
                (StatusCode::BAD_REQUEST, json!({"detail": message}))
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({"detail": "Authentication required"}),
            ),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, json!({"detail": "Forbidden"})),
            ApiError::Dal(DalError::RecordNotFound(entity)) => (
                StatusCode::NOT_FOUND,
                json!({"detail": format!("{entity} not found")}),
            ),
            ApiError::Dal(DalError::UsernameTaken) => (
                StatusCode::BAD_REQUEST,
                json!({"errors": {"username": ["A user with that username already exists."]}}),
            ),
            ApiError::Dal(DalError::InvalidCredentials) => (
                StatusCode::UNAUTHORIZED,
                json!({"detail": "Invalid credentials"}),
            ),
            ApiError::Dal(DalError::InvalidOrderByField(field)) => (
                StatusCode::BAD_REQUEST,
                json!({"detail": format!("Cannot order by {field}")}),
            ),
            ApiError::Dal(e) => {
                error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"detail": "Internal server error"}),
                )
            }
            ApiError::Other(e) => {
                error!("Internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"detail": "Internal server error"}),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Flattens a validation report into per-field message lists, the shape both
/// surfaces present to the caller.
pub fn field_errors(report: &garde::Report) -> BTreeMap<String, Vec<String>> {
    let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (path, error) in report.iter() {
        errors
            .entry(path.to_string())
            .or_default()
            .push(error.to_string());
    }
    errors
}

#[cfg(test)]
mod tests {
    use garde::Validate as _;

    use super::*;

    #[test]
    fn test_field_errors() {
        let payload = bookclub_dal::review::CreateReview {
            stars_given: 8,
            comment: "".to_string(),
            user_id: 1,
            book_id: 1,
        };
        let report = payload.validate().unwrap_err();
        let errors = field_errors(&report);
        assert!(errors.contains_key("stars_given"));
        assert!(errors.contains_key("comment"));
        assert!(!errors.contains_key("user_id"));
    }
}
