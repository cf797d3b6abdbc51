//! Maps ledger and application errors to JSON responses.
//!
//! Every error body has the shape `{ "error": <CODE>, "message": <text> }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use ledgerly_core::accounts::AccountsError;
use ledgerly_shared::AppError;

/// Error returned by handlers and middleware.
#[derive(Debug)]
pub enum ApiError {
    /// A ledger engine or store failure.
    Ledger(AccountsError),
    /// An application-level failure (authentication, configuration).
    App(AppError),
}

impl From<AccountsError> for ApiError {
    fn from(err: AccountsError) -> Self {
        Self::Ledger(err)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl ApiError {
    /// Shorthand for a request that failed validation before reaching the engine.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Ledger(AccountsError::validation(message))
    }

    fn parts(&self) -> (u16, &'static str, String) {
        match self {
            // Store failures are already logged with detail; keep them out of the body.
            Self::Ledger(AccountsError::Persistence(_)) => (
                500,
                "PERSISTENCE_FAILURE",
                "Internal server error".to_string(),
            ),
            Self::Ledger(err) => (err.status_code(), err.error_code(), err.to_string()),
            Self::App(
                AppError::Database(_) | AppError::Config(_) | AppError::Internal(_),
            ) => (500, "INTERNAL_ERROR", "Internal server error".to_string()),
            Self::App(err) => (err.status_code(), err.error_code(), err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

/// Result type for ledger handlers.
pub type ApiResult<T> = Result<T, ApiError>;
