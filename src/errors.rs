use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// One or more submitted fields failed validation.
    Validation(Vec<String>),
    /// Database-related errors (Postgres ledger backend).
    DatabaseError(sqlx::Error),
    /// The ledger rejected or could not complete an operation.
    LedgerError(String),
    /// Resource not found error.
    NotFound(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Request body exceeded the configured limit.
    PayloadTooLarge(String),
    /// Error interacting with an external API.
    ExternalApiError(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(errors) => write!(f, "Validation failed: {}", errors.join("; ")),
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::LedgerError(msg) => write!(f, "Ledger error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// HTTP status the error maps to, following the context chain.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ExternalApiError(_) | AppError::LedgerError(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::WithContext { source, .. } => source.status_code(),
        }
    }
}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Client errors echo their message; server-side faults are logged and
    /// reported with a generic message so internals don't leak to callers.
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            AppError::Validation(errors) => json!({
                "success": false,
                "error": "Validation failed",
                "errors": errors,
            }),
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::PayloadTooLarge(msg) => json!({
                "success": false,
                "error": msg,
            }),
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                json!({ "success": false, "error": "Database error" })
            }
            AppError::LedgerError(msg) => {
                tracing::error!("Ledger error: {}", msg);
                json!({ "success": false, "error": "Ledger unavailable" })
            }
            AppError::ExternalApiError(msg) => {
                tracing::error!("External API error: {}", msg);
                json!({ "success": false, "error": "External service error" })
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                json!({ "success": false, "error": "Internal server error" })
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return source.into_response_ref();
            }
        };

        (status, Json(body)).into_response()
    }
}

impl AppError {
    // `sqlx::Error` is not `Clone`, so context unwrapping re-dispatches by reference.
    fn into_response_ref(&self) -> Response {
        match self {
            AppError::DatabaseError(e) => {
                AppError::InternalError(format!("database: {}", e)).into_response()
            }
            AppError::Validation(errors) => AppError::Validation(errors.clone()).into_response(),
            AppError::LedgerError(msg) => AppError::LedgerError(msg.clone()).into_response(),
            AppError::NotFound(msg) => AppError::NotFound(msg.clone()).into_response(),
            AppError::BadRequest(msg) => AppError::BadRequest(msg.clone()).into_response(),
            AppError::PayloadTooLarge(msg) => {
                AppError::PayloadTooLarge(msg.clone()).into_response()
            }
            AppError::ExternalApiError(msg) => {
                AppError::ExternalApiError(msg.clone()).into_response()
            }
            AppError::InternalError(msg) => AppError::InternalError(msg.clone()).into_response(),
            AppError::WithContext { source, .. } => source.into_response_ref(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(rejection.body_text())
        } else {
            AppError::BadRequest(rejection.body_text())
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApiError(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for sqlx::Error to add context
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::DatabaseError(e)),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_inner_status() {
        let err: Result<(), AppError> = Err(AppError::NotFound("lead abc".to_string()));
        let err = err.context("Loading lead").unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Loading lead: Not found: lead abc");
    }

    #[test]
    fn test_collaborator_errors_map_to_bad_gateway() {
        assert_eq!(
            AppError::ExternalApiError("boom".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::LedgerError("sheet locked".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_oversized_body_keeps_413() {
        let err = AppError::PayloadTooLarge("length limit exceeded".into());
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
