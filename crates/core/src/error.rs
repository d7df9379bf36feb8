//! Ledger error types shared by the debt calculator, the voting engine
//! and the wallet subsystem.
//!
//! Every variant maps to one of five stable kinds (validation,
//! authorization, not-found, conflict, internal) which in turn map to an
//! HTTP status and a machine-readable code.

use potluck_shared::AppError;
use potluck_shared::types::Money;
use thiserror::Error;
use uuid::Uuid;

/// Result type alias using `LedgerError`.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Coarse error taxonomy exposed at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request, fixable by the client.
    Validation,
    /// Actor is not allowed to perform the operation.
    Authorization,
    /// Referenced entity does not exist.
    NotFound,
    /// Operation would violate a ledger invariant.
    Conflict,
    /// Storage or other server-side failure.
    Internal,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Request failed validation.
    #[error("{0}")]
    Validation(String),

    // ========== Authorization Errors ==========
    /// Actor lacks the membership, ownership or role the operation needs.
    #[error("{0}")]
    Forbidden(String),

    // ========== Lookup Errors ==========
    /// Entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity name, e.g. `group`.
        entity: &'static str,
        /// The identifier that was looked up.
        id: Uuid,
    },

    // ========== Conflict Errors ==========
    /// The voter already cast a ballot on this action.
    #[error("user {voter} has already voted on action {action}")]
    DuplicateVote {
        /// The action voted on.
        action: Uuid,
        /// The voter.
        voter: Uuid,
    },

    /// The action already reached a terminal state.
    #[error("action {0} is no longer pending")]
    ActionClosed(Uuid),

    /// The wallet balance does not cover the requested amount.
    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Balance available to the debtor.
        available: Money,
        /// Amount requested.
        requested: Money,
    },

    /// A payment would exceed the debt's remaining amount.
    #[error("payment of {requested} exceeds remaining debt {remaining}")]
    Overpayment {
        /// Remaining amount on the debt.
        remaining: Money,
        /// Attempted payment.
        requested: Money,
    },

    /// Any other invariant violation (duplicate username, already a member).
    #[error("{0}")]
    Conflict(String),

    // ========== Internal Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Shorthand for a [`LedgerError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Forbidden(_) => ErrorKind::Authorization,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateVote { .. }
            | Self::ActionClosed(_)
            | Self::InsufficientFunds { .. }
            | Self::Overpayment { .. }
            | Self::Conflict(_) => ErrorKind::Conflict,
            Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Forbidden(_) => "AUTHORIZATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::DuplicateVote { .. } => "DUPLICATE_VOTE",
            Self::ActionClosed(_) => "ACTION_CLOSED",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::Overpayment { .. } => "OVERPAYMENT",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Authorization => Self::Forbidden(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::Internal => Self::Database(message),
        }
    }
}
