//! Pending-action domain types.
//!
//! A pending action is a proposal that mutates the ledger only after the
//! group votes it through. Its payload is a tagged union keyed by the action
//! type, validated when it is built.

use potluck_shared::types::{Money, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LedgerError, LedgerResult};

/// Kind of proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Shared expense, materialized into an expense and its debts.
    Expense,
    /// Deposit into the group wallet.
    WalletDeposit,
    /// Adding a user to the group.
    MemberAdd,
    /// Removing a member from the group.
    MemberRemove,
}

impl ActionType {
    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "EXPENSE",
            Self::WalletDeposit => "WALLET_DEPOSIT",
            Self::MemberAdd => "MEMBER_ADD",
            Self::MemberRemove => "MEMBER_REMOVE",
        }
    }

    /// Parses the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "EXPENSE" => Some(Self::Expense),
            "WALLET_DEPOSIT" => Some(Self::WalletDeposit),
            "MEMBER_ADD" => Some(Self::MemberAdd),
            "MEMBER_REMOVE" => Some(Self::MemberRemove),
            _ => None,
        }
    }

    /// Returns true if confirming this action reads or writes the group wallet.
    ///
    /// Member removal only reads it, but the balance it checks must not move
    /// while the removal is applied.
    #[must_use]
    pub fn touches_wallet(&self) -> bool {
        !matches!(self, Self::MemberAdd)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a pending action.
///
/// `Pending` moves to exactly one of the terminal states and never leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionStatus {
    /// Waiting for votes.
    #[default]
    Pending,
    /// Approved by quorum; its effects have been applied.
    Confirmed,
    /// Approval became unreachable or the effects could not be applied.
    Rejected,
}

impl ActionStatus {
    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parses the wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "CONFIRMED" => Some(Self::Confirmed),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true for `Confirmed` and `Rejected`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who pays for an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ExpensePayer {
    /// A member paid out of pocket; every other participant owes them.
    Member {
        /// The paying member.
        user_id: UserId,
    },
    /// Paid from the group wallet; each participant's wallet balance is debited.
    Wallet,
}

/// Payload of an `EXPENSE` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseDetails {
    /// What the money was spent on.
    pub description: String,
    /// Amount spent.
    pub total_amount: Money,
    /// Users sharing the expense, sorted and de-duplicated.
    pub participant_ids: Vec<UserId>,
    /// Category name; created on confirmation if unknown.
    pub category_name: String,
    /// Who pays.
    pub payer: ExpensePayer,
}

/// Payload of a `WALLET_DEPOSIT` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositDetails {
    /// Member credited with the deposit.
    pub user_id: UserId,
    /// Deposited amount.
    pub amount: Money,
    /// Free-form note.
    pub description: Option<String>,
}

/// Typed action payload, tagged by action type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionDetails {
    /// Shared expense.
    Expense(ExpenseDetails),
    /// Wallet deposit.
    WalletDeposit(DepositDetails),
    /// Add a user to the group.
    MemberAdd {
        /// User to add.
        user_id: UserId,
    },
    /// Remove a member from the group.
    MemberRemove {
        /// Member to remove.
        user_id: UserId,
    },
}

impl ActionDetails {
    /// Builds a validated expense payload.
    ///
    /// Text fields are trimmed and participants sorted and de-duplicated.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` for a blank description or category,
    /// a non-positive amount or an empty participant list.
    pub fn expense(
        description: &str,
        total_amount: Money,
        participant_ids: &[UserId],
        category_name: &str,
        payer: ExpensePayer,
    ) -> LedgerResult<Self> {
        let mut participants = participant_ids.to_vec();
        participants.sort_unstable();
        participants.dedup();

        let details = Self::Expense(ExpenseDetails {
            description: description.trim().to_string(),
            total_amount,
            participant_ids: participants,
            category_name: category_name.trim().to_string(),
            payer,
        });
        details.validate()?;
        Ok(details)
    }

    /// Builds a validated deposit payload.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` if the amount is not positive.
    pub fn wallet_deposit(
        user_id: UserId,
        amount: Money,
        description: Option<&str>,
    ) -> LedgerResult<Self> {
        let details = Self::WalletDeposit(DepositDetails {
            user_id,
            amount,
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        });
        details.validate()?;
        Ok(details)
    }

    /// Builds a member-add payload.
    #[must_use]
    pub const fn member_add(user_id: UserId) -> Self {
        Self::MemberAdd { user_id }
    }

    /// Builds a member-remove payload.
    #[must_use]
    pub const fn member_remove(user_id: UserId) -> Self {
        Self::MemberRemove { user_id }
    }

    /// Checks the payload invariants.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` describing the first violation.
    pub fn validate(&self) -> LedgerResult<()> {
        match self {
            Self::Expense(expense) => {
                if expense.description.trim().is_empty() {
                    return Err(LedgerError::Validation(
                        "expense description is required".to_string(),
                    ));
                }
                if expense.category_name.trim().is_empty() {
                    return Err(LedgerError::Validation(
                        "expense category is required".to_string(),
                    ));
                }
                if !expense.total_amount.is_positive() {
                    return Err(LedgerError::Validation(
                        "expense amount must be positive".to_string(),
                    ));
                }
                if !expense.total_amount.is_within_limit() {
                    return Err(LedgerError::Validation(
                        "expense amount is too large".to_string(),
                    ));
                }
                if expense.participant_ids.is_empty() {
                    return Err(LedgerError::Validation(
                        "at least one participant is required".to_string(),
                    ));
                }
                Ok(())
            }
            Self::WalletDeposit(deposit) => {
                if !deposit.amount.is_positive() {
                    return Err(LedgerError::Validation(
                        "deposit amount must be positive".to_string(),
                    ));
                }
                if !deposit.amount.is_within_limit() {
                    return Err(LedgerError::Validation(
                        "deposit amount is too large".to_string(),
                    ));
                }
                Ok(())
            }
            Self::MemberAdd { .. } | Self::MemberRemove { .. } => Ok(()),
        }
    }

    /// Returns the action type this payload belongs to.
    #[must_use]
    pub const fn action_type(&self) -> ActionType {
        match self {
            Self::Expense(_) => ActionType::Expense,
            Self::WalletDeposit(_) => ActionType::WalletDeposit,
            Self::MemberAdd { .. } => ActionType::MemberAdd,
            Self::MemberRemove { .. } => ActionType::MemberRemove,
        }
    }

    /// Returns a one-line human description of the proposal.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Expense(expense) => format!(
                "Expense '{}' of {} ({})",
                expense.description, expense.total_amount, expense.category_name
            ),
            Self::WalletDeposit(deposit) => format!("Wallet deposit of {}", deposit.amount),
            Self::MemberAdd { user_id } => format!("Add member {user_id}"),
            Self::MemberRemove { user_id } => format!("Remove member {user_id}"),
        }
    }
}
