//! Error responses.
//!
//! Every failure is rendered as `{"error": <code>, "message": <text>}` with
//! the status its error kind maps to.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use potluck_core::LedgerError;
use potluck_shared::AppError;
use serde_json::json;
use tracing::error;

/// Handler result: both arms are finished responses.
pub type ApiResult = Result<Response, Response>;

/// Builds an error response.
pub fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into()
        })),
    )
        .into_response()
}

/// Maps ledger errors to HTTP responses.
pub fn map_ledger_error(e: &LedgerError) -> Response {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if let LedgerError::Database(details) = e {
        error!(error = %details, "Storage failure while handling request");
        return error_response(status, e.error_code(), "An error occurred");
    }
    error_response(status, e.error_code(), e.to_string())
}

/// Maps application errors to HTTP responses.
pub fn map_app_error(e: &AppError) -> Response {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if e.is_internal() {
        error!(error = %e, "Internal failure while handling request");
        return error_response(status, e.error_code(), "An error occurred");
    }
    error_response(status, e.error_code(), e.to_string())
}

/// 400 for a malformed request field.
pub fn validation_error(message: impl Into<String>) -> Response {
    error_response(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
}

/// 403 for an actor acting on someone else's behalf.
pub fn forbidden(message: impl Into<String>) -> Response {
    error_response(StatusCode::FORBIDDEN, "AUTHORIZATION_ERROR", message)
}
