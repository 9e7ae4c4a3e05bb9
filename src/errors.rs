use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// Domain-specific error types for the journal service.
/// Client mistakes map to 4xx with their message; store and internal
/// failures are logged and surface as a generic 5xx.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("config error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for JournalError {
    fn from(e: rusqlite::Error) -> Self {
        JournalError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(e: serde_json::Error) -> Self {
        JournalError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for JournalError {
    fn from(e: std::io::Error) -> Self {
        JournalError::Io(e.to_string())
    }
}

impl JournalError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Serialization(_) | Self::Io(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for JournalError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Validation(msg) | Self::Unauthorized(msg) | Self::NotFound(msg) => msg.clone(),
            Self::Database(_) => {
                tracing::error!("{self}");
                "database unavailable".to_string()
            }
            _ => {
                tracing::error!("{self}");
                "server error".to_string()
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type JournalResult<T> = Result<T, JournalError>;
