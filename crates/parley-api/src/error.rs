use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use parley_store::error::StoreError;

/// API-level error taxonomy. Every variant renders as `{"error": ...}` with
/// a fixed status code; internal detail goes to the log, never the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("a user with that name already exists")]
    DuplicateUser,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("not authenticated")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The inference backend refused the connection: it is not running.
    #[error("{0}")]
    UpstreamUnavailable(String),

    #[error("language model backend did not answer in time")]
    UpstreamTimeout,

    /// Any other upstream failure, relayed with the backend's status where
    /// one exists.
    #[error("{1}")]
    Upstream(StatusCode, String),

    #[error("internal storage failure")]
    Persistence(#[source] StoreError),

    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::DuplicateUser => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(status, _) => *status,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Persistence(source) => error!("persistence failure: {source}"),
            Self::Internal(detail) => error!("internal error: {detail}"),
            _ => {}
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(msg) => Self::Validation(msg),
            StoreError::DuplicateUser => Self::DuplicateUser,
            StoreError::InvalidCredentials => Self::InvalidCredentials,
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Forbidden => Self::Forbidden("you can only delete your own messages".into()),
            e => Self::Persistence(e),
        }
    }
}
