use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::stats::StatsError;

/// API error payloads: every failure becomes `{"error": kind, "message": …}`.
///
/// Validation problems are the caller's fault (400); store failures are ours
/// (422); lookups that find nothing are 404.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("{0:#}")]
    Store(#[from] anyhow::Error),
}

impl From<StatsError> for ApiError {
    fn from(e: StatsError) -> Self {
        match e {
            StatsError::Validation(message) => Self::Validation(message),
            StatsError::Store(e) => Self::Store(e.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            Self::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            Self::Store(e) => {
                tracing::error!("Store error serving request: {e:#}");
                (StatusCode::UNPROCESSABLE_ENTITY, "store")
            }
        };

        let message = self.to_string();
        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}
