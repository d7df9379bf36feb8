//! Common types used across the application.

pub mod id;
pub mod money;
pub mod pagination;

pub use id::*;
pub use money::{MAX_AMOUNT_MINOR, Money, MoneyError};
pub use pagination::PageRequest;
