//! Errors at the request boundary.
//!
//! Ledger errors fold into these five kinds plus `Unauthorized` for
//! requests that never got past authentication.

use thiserror::Error;

use crate::jwt::JwtError;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Boundary error, one variant per response class.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, expired or malformed credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to do this.
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Malformed request.
    #[error("{0}")]
    Validation(String),

    /// Duplicate vote, closed action, insufficient funds, taken username.
    #[error("{0}")]
    Conflict(String),

    /// Storage failure.
    #[error("storage failure: {0}")]
    Database(String),

    /// Anything else that is the server's fault.
    #[error("internal failure: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "AUTHORIZATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for failures whose details stay in the log, not the response.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Internal(_))
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Encoding(_) => Self::Internal(err.to_string()),
            JwtError::Expired | JwtError::Invalid(_) | JwtError::WrongKind { .. } => {
                Self::Unauthorized(err.to_string())
            }
        }
    }
}
