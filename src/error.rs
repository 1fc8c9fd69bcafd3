use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

/// Message shown to callers for every failure that is not their fault
pub const LOAD_FAILURE_MESSAGE: &str = "Could not load data.";

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Failure classes reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Catalog API unreachable or answered with a non-2xx status
    Network,
    /// Persistent store operation failed
    Storage,
    /// Input rejected before any write was attempted
    Validation,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Network => StatusCode::BAD_GATEWAY,
            ErrorKind::Storage | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::HttpClient(_) | AppError::ExternalApi(_) => ErrorKind::Network,
            AppError::Database(_) | AppError::Cache(_) | AppError::Storage(_) => {
                ErrorKind::Storage
            }
            AppError::InvalidInput(_) => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Serialization(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// User-safe message for this error. Only validation messages are passed
    /// through verbatim; everything else collapses to a static string.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::NotFound(_) => "Not found.".to_string(),
            _ => LOAD_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        if kind != ErrorKind::Validation {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "status": "error",
            "kind": kind,
            "message": self.user_message(),
        }));

        (kind.status_code(), body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_hide_detail() {
        let err = AppError::Storage("permission denied on users/abc".to_string());
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(err.user_message(), LOAD_FAILURE_MESSAGE);
    }

    #[test]
    fn test_external_api_is_network_failure() {
        let err = AppError::ExternalApi("status 503".to_string());
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(err.kind().status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.user_message(), LOAD_FAILURE_MESSAGE);
    }

    #[test]
    fn test_validation_message_passes_through() {
        let err = AppError::InvalidInput("Username already exists.".to_string());
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.user_message(), "Username already exists.");
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound("users/bob".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
