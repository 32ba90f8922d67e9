use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Conflict(String),

    #[error("Failed to fetch tracked products")]
    BatchFetch { details: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Config(e) => {
                tracing::error!(error = %e, "Configuration error");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None)
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".into(), None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone(), None),
            AppError::BatchFetch { details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                self.to_string(),
                Some(details.clone()),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into(), None)
            }
        };

        (status, Json(ErrorBody { error, details })).into_response()
    }
}
