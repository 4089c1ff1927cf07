//! JSON HTTP surface over the item repository.

pub mod app;
pub mod handlers;
pub mod models;
pub mod state;

pub use app::build_router;
pub use state::AppState;

use crate::core::{InitializationError, RepositoryError, StoreError};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum WebError {
    /// Store bootstrap failed; the next request tries again
    Initialization(InitializationError),
    Query(StoreError),
    Input(String),
    NotFound(String),
    Internal(String),
}

impl From<RepositoryError> for WebError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Initialization(err) => WebError::Initialization(err),
            RepositoryError::Query(err) => WebError::Query(err),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            WebError::Initialization(err) => {
                error!(stage = %err.stage, error = %err, "document store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "document store is unavailable".to_string(),
                    "store_unavailable",
                )
            }
            WebError::Query(err) => {
                error!(status = ?err.status(), error = %err, "query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "query failed".to_string(),
                    "query_error",
                )
            }
            WebError::Input(msg) => (StatusCode::BAD_REQUEST, msg, "input_error"),
            WebError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "not_found"),
            WebError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, "internal_error"),
        };

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;
