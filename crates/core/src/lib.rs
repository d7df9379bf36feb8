//! Core business logic for Potluck.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `auth` - Password hashing and system roles
//! - `split` - Equal expense splitting into per-participant shares and debts
//! - `debt` - Payment application against a single debt
//! - `balance` - Pairwise netting and minimal-transfer settlement plans
//! - `voting` - Pending-action types and the quorum state machine
//! - `wallet` - Group wallet balances, withdrawals and settlement planning
//! - `membership` - Guards on member removal and account deletion
//! - `notify` - Notification dispatch seam for proposals and resolutions

pub mod auth;
pub mod balance;
pub mod debt;
pub mod error;
pub mod membership;
pub mod notify;
pub mod split;
pub mod voting;
pub mod wallet;

#[cfg(test)]
mod ledger_props;

pub use error::{ErrorKind, LedgerError, LedgerResult};
