//! Shared types, errors, and configuration for Potluck.
//!
//! This crate provides common types used across all other crates:
//! - Money in integer minor currency units
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management
//! - JWT claims and token handling

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::{Claims, TokenKind, TokenPair};
pub use config::{AppConfig, LogFormat};
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
