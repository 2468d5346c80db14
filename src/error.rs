use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::engine::EngineError;

/// Failure to turn a startup artifact into an in-memory structure
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("failed to read {artifact}: {error}")]
    Io {
        artifact: String,
        #[source]
        error: std::io::Error,
    },

    #[error("malformed artifact {artifact}: {error}")]
    Malformed {
        artifact: String,
        #[source]
        error: serde_json::Error,
    },

    #[error("artifact {artifact} is missing the `{field}` field")]
    MissingField { artifact: String, field: String },

    #[error("invalid artifact {artifact}: {reason}")]
    Invalid { artifact: String, reason: String },
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Failed to load artifacts: {0}")]
    Load(#[from] LoadError),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<EngineError> for AppError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::DataIntegrity(msg) => AppError::DataIntegrity(msg),
            EngineError::InvalidQuery { .. } => AppError::Internal(error.to_string()),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

/// Returned in place of load failure details, which name server paths
pub const DATA_UNAVAILABLE_MESSAGE: &str = "Recommendation data is unavailable";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Load(ref error) => {
                tracing::error!(error = %error, "Artifact load failed");
                (StatusCode::SERVICE_UNAVAILABLE, DATA_UNAVAILABLE_MESSAGE.to_string())
            }
            AppError::DataIntegrity(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
