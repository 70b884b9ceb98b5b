//! Error types for the blog site

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::validation::ValidationError;

pub type BlogResult<T> = Result<T, BlogError>;

#[derive(Error, Debug)]
pub enum BlogError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("not found: {resource} '{key}'")]
    NotFound { resource: &'static str, key: String },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("conflict: {resource} '{key}' already exists")]
    Conflict { resource: &'static str, key: String },

    #[error("post '{0}' has no tags")]
    MissingTags(String),
}

impl BlogError {
    pub fn not_found(resource: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            key: key.into(),
        }
    }

    pub fn conflict(resource: &'static str, key: impl Into<String>) -> Self {
        Self::Conflict {
            resource,
            key: key.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BlogError::NotFound { .. } => StatusCode::NOT_FOUND,
            BlogError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BlogError::Conflict { .. } => StatusCode::CONFLICT,
            BlogError::Database(_) | BlogError::MissingTags(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BlogError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the logs.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = BlogError::not_found("post", "missing-post");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "not found: post 'missing-post'");
    }

    #[test]
    fn test_missing_tags_is_server_error() {
        let err = BlogError::MissingTags("untagged".to_string());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_server_error_body_hides_details() {
        let res = BlogError::MissingTags("untagged".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Internal server error");
        assert_eq!(value["status"], 500);
    }
}
