//! Pending actions and their quorum vote.
//!
//! # Modules
//!
//! - `types` - Action types, statuses and the typed payloads
//! - `tally` - Vote counting and the majority threshold
//! - `state` - Per-action ballot state machine

pub mod state;
pub mod tally;
pub mod types;

#[cfg(test)]
mod state_props;

pub use state::{ActionState, Ballot};
pub use tally::{Tally, required_votes};
pub use types::{ActionDetails, ActionStatus, ActionType, DepositDetails, ExpenseDetails, ExpensePayer};
