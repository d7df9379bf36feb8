//! JSON response bodies.
//!
//! Amounts leave the API as decimal numbers in major units; everything
//! inside the ledger stays in integer minor units.

use chrono::{DateTime, Utc};
use potluck_core::auth::SystemRole;
use potluck_core::voting::{ActionDetails, ActionStatus, ActionType, ExpensePayer};
use potluck_core::wallet::{SettlementStatus, WalletTransactionType};
use potluck_db::entities::{categories, groups, users, wallet_transactions};
use potluck_db::repositories::{
    ActionView, BalanceLine, DebtView, ExpenseView, GroupWithMembers, SettlementOutcome,
    WalletBalance,
};
use potluck_shared::types::Money;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

fn decimal(minor: i64) -> Decimal {
    Money::from_minor(minor).to_decimal()
}

/// A user as seen by other users.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User id.
    pub id: Uuid,
    /// Login name.
    pub username: String,
    /// Display name.
    pub name: String,
    /// System role.
    pub role: SystemRole,
    /// False once the account is deleted.
    pub is_active: bool,
    /// Banned by an administrator.
    pub is_banned: bool,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            role: user.role.into(),
            is_active: user.is_active,
            is_banned: user.is_banned,
            created_at: user.created_at,
        }
    }
}

/// A group, with members when loaded.
#[derive(Debug, Serialize)]
pub struct GroupResponse {
    /// Group id.
    pub id: Uuid,
    /// Name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Owner.
    pub owner_id: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Current members.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<UserResponse>>,
}

impl From<groups::Model> for GroupResponse {
    fn from(group: groups::Model) -> Self {
        Self {
            id: group.id,
            name: group.name,
            description: group.description,
            owner_id: group.owner_id,
            created_at: group.created_at,
            members: None,
        }
    }
}

impl From<GroupWithMembers> for GroupResponse {
    fn from(loaded: GroupWithMembers) -> Self {
        let members = loaded.members.into_iter().map(UserResponse::from).collect();
        Self {
            members: Some(members),
            ..Self::from(loaded.group)
        }
    }
}

/// An expense category.
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    /// Category id.
    pub id: Uuid,
    /// Canonical name.
    pub name: String,
}

impl From<categories::Model> for CategoryResponse {
    fn from(category: categories::Model) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

/// Action payload with decimal amounts.
#[derive(Debug, Serialize)]
#[serde(tag = "action_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionDetailsResponse {
    /// Shared expense.
    Expense {
        /// What was bought.
        description: String,
        /// Amount spent.
        #[serde(with = "rust_decimal::serde::float")]
        total_amount: Decimal,
        /// Users sharing it.
        participant_ids: Vec<Uuid>,
        /// Category name.
        category_name: String,
        /// Paying member, absent when paid from the wallet.
        paid_by_user_id: Option<Uuid>,
        /// Paid from the group wallet.
        paid_from_wallet: bool,
    },
    /// Wallet deposit.
    WalletDeposit {
        /// Member credited.
        user_id: Uuid,
        /// Amount deposited.
        #[serde(with = "rust_decimal::serde::float")]
        amount: Decimal,
        /// Note.
        description: Option<String>,
    },
    /// Member addition.
    MemberAdd {
        /// User to add.
        user_id: Uuid,
    },
    /// Member removal.
    MemberRemove {
        /// Member to remove.
        user_id: Uuid,
    },
}

impl From<ActionDetails> for ActionDetailsResponse {
    fn from(details: ActionDetails) -> Self {
        match details {
            ActionDetails::Expense(expense) => {
                let paid_by_user_id = match expense.payer {
                    ExpensePayer::Member { user_id } => Some(user_id.into_inner()),
                    ExpensePayer::Wallet => None,
                };
                Self::Expense {
                    description: expense.description,
                    total_amount: expense.total_amount.to_decimal(),
                    participant_ids: expense
                        .participant_ids
                        .into_iter()
                        .map(|id| id.into_inner())
                        .collect(),
                    category_name: expense.category_name,
                    paid_from_wallet: paid_by_user_id.is_none(),
                    paid_by_user_id,
                }
            }
            ActionDetails::WalletDeposit(deposit) => Self::WalletDeposit {
                user_id: deposit.user_id.into_inner(),
                amount: deposit.amount.to_decimal(),
                description: deposit.description,
            },
            ActionDetails::MemberAdd { user_id } => Self::MemberAdd {
                user_id: user_id.into_inner(),
            },
            ActionDetails::MemberRemove { user_id } => Self::MemberRemove {
                user_id: user_id.into_inner(),
            },
        }
    }
}

/// One ballot.
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    /// Ballot holder.
    pub voter: UserResponse,
    /// `true` approve, `false` reject, absent if not cast.
    pub vote: Option<bool>,
    /// When it was cast.
    pub cast_at: Option<DateTime<Utc>>,
}

/// A pending action.
#[derive(Debug, Serialize)]
pub struct PendingActionResponse {
    /// Action id.
    pub id: Uuid,
    /// Owning group.
    pub group_id: Uuid,
    /// Kind of proposal.
    pub action_type: ActionType,
    /// Current status.
    pub status: ActionStatus,
    /// Typed payload.
    pub details: ActionDetailsResponse,
    /// Human-readable summary.
    pub description: String,
    /// Proposer.
    pub initiator: UserResponse,
    /// Ballots in member order.
    pub votes: Vec<VoteResponse>,
    /// Approvals cast.
    pub votes_for: u32,
    /// Rejections cast.
    pub votes_against: u32,
    /// Approvals needed.
    pub required_votes: u32,
    /// Ballots issued.
    pub total_eligible_voters: u32,
    /// Why a confirmed action could not be applied.
    pub resolution_note: Option<String>,
    /// Proposal time.
    pub created_at: DateTime<Utc>,
    /// Resolution time.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<ActionView> for PendingActionResponse {
    fn from(view: ActionView) -> Self {
        Self {
            id: view.action.id,
            group_id: view.action.group_id,
            action_type: view.action.action_type.into(),
            status: view.action.status.into(),
            details: view.details.into(),
            description: view.action.description,
            initiator: view.initiator.into(),
            votes: view
                .ballots
                .into_iter()
                .map(|b| VoteResponse {
                    voter: b.voter.into(),
                    vote: b.vote,
                    cast_at: b.cast_at,
                })
                .collect(),
            votes_for: view.tally.votes_for,
            votes_against: view.tally.votes_against,
            required_votes: view.tally.required,
            total_eligible_voters: view.tally.eligible,
            resolution_note: view.action.resolution_note,
            created_at: view.action.created_at,
            resolved_at: view.action.resolved_at,
        }
    }
}

/// A participant's share of an expense.
#[derive(Debug, Serialize)]
pub struct ParticipantResponse {
    /// Participant.
    pub user: UserResponse,
    /// Share of the total.
    #[serde(with = "rust_decimal::serde::float")]
    pub share_amount: Decimal,
}

/// A confirmed expense.
#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    /// Expense id.
    pub id: Uuid,
    /// Owning group.
    pub group_id: Uuid,
    /// Action that created it.
    pub action_id: Uuid,
    /// What was bought.
    pub description: String,
    /// Amount spent.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    /// Category.
    pub category: CategoryResponse,
    /// Paying member, absent when paid from the wallet.
    pub paid_by: Option<UserResponse>,
    /// Paid from the group wallet.
    pub paid_from_wallet: bool,
    /// Participants with their shares.
    pub participants: Vec<ParticipantResponse>,
    /// Status of the originating action.
    pub status: ActionStatus,
    /// Confirmation time.
    pub created_at: DateTime<Utc>,
}

impl From<ExpenseView> for ExpenseResponse {
    fn from(view: ExpenseView) -> Self {
        Self {
            id: view.expense.id,
            group_id: view.expense.group_id,
            action_id: view.expense.action_id,
            description: view.expense.description,
            total_amount: decimal(view.expense.total_amount),
            category: view.category.into(),
            paid_by: view.payer.map(UserResponse::from),
            paid_from_wallet: view.expense.paid_from_wallet,
            participants: view
                .participants
                .into_iter()
                .map(|p| ParticipantResponse {
                    user: p.user.into(),
                    share_amount: decimal(p.share_amount),
                })
                .collect(),
            status: view.status.into(),
            created_at: view.expense.created_at,
        }
    }
}

/// A payment applied to a debt.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    /// Payment id.
    pub id: Uuid,
    /// Amount paid.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Payment time.
    pub created_at: DateTime<Utc>,
}

/// A debt with its parties and payments.
#[derive(Debug, Serialize)]
pub struct DebtResponse {
    /// Debt id.
    pub id: Uuid,
    /// Expense behind the debt.
    pub expense_id: Uuid,
    /// Owning group.
    pub group_id: Uuid,
    /// Expense description.
    pub description: String,
    /// Who owes.
    pub debtor: UserResponse,
    /// Who is owed.
    pub creditor: UserResponse,
    /// Original amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    /// Amount still owed.
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining_amount: Decimal,
    /// Fully paid.
    pub is_settled: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Payments, oldest first.
    pub payments: Vec<PaymentResponse>,
}

impl From<DebtView> for DebtResponse {
    fn from(view: DebtView) -> Self {
        Self {
            id: view.debt.id,
            expense_id: view.debt.expense_id,
            group_id: view.expense.group_id,
            description: view.expense.description,
            debtor: view.debtor.into(),
            creditor: view.creditor.into(),
            total_amount: decimal(view.debt.total_amount),
            remaining_amount: decimal(view.debt.remaining_amount),
            is_settled: view.debt.is_settled,
            created_at: view.debt.created_at,
            payments: view
                .payments
                .into_iter()
                .map(|p| PaymentResponse {
                    id: p.id,
                    amount: decimal(p.amount),
                    created_at: p.created_at,
                })
                .collect(),
        }
    }
}

/// A netted amount between two users.
#[derive(Debug, Serialize)]
pub struct BalanceSummaryResponse {
    /// Who owes.
    pub debtor: UserResponse,
    /// Who is owed.
    pub creditor: UserResponse,
    /// Net amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

impl From<BalanceLine> for BalanceSummaryResponse {
    fn from(line: BalanceLine) -> Self {
        Self {
            debtor: line.debtor.into(),
            creditor: line.creditor.into(),
            amount: line.amount.to_decimal(),
        }
    }
}

/// One member's wallet balance.
#[derive(Debug, Serialize)]
pub struct MemberBalanceResponse {
    /// Member.
    pub user: UserResponse,
    /// Balance.
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

/// A group's wallet.
#[derive(Debug, Serialize)]
pub struct WalletBalanceResponse {
    /// Group.
    pub group_id: Uuid,
    /// Pooled balance.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_wallet_balance: Decimal,
    /// Per-member balances.
    pub member_balances: Vec<MemberBalanceResponse>,
}

impl From<WalletBalance> for WalletBalanceResponse {
    fn from(balance: WalletBalance) -> Self {
        Self {
            group_id: balance.group_id.into_inner(),
            total_wallet_balance: balance.total.to_decimal(),
            member_balances: balance
                .members
                .into_iter()
                .map(|(user, amount)| MemberBalanceResponse {
                    user: user.into(),
                    balance: amount.to_decimal(),
                })
                .collect(),
        }
    }
}

/// Per-debt settlement result.
#[derive(Debug, Serialize)]
pub struct SettlementLogResponse {
    /// Debt considered.
    pub debt_id: Uuid,
    /// Amount paid against it.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_settled: Decimal,
    /// Outcome.
    pub status: SettlementStatus,
}

/// Result of a settlement request.
#[derive(Debug, Serialize)]
pub struct SettlementSummary {
    /// Total moved between members.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_settled: Decimal,
    /// One entry per debt considered.
    pub settlement_logs: Vec<SettlementLogResponse>,
}

impl From<SettlementOutcome> for SettlementSummary {
    fn from(outcome: SettlementOutcome) -> Self {
        Self {
            total_settled: outcome.total_settled.to_decimal(),
            settlement_logs: outcome
                .logs
                .into_iter()
                .map(|log| SettlementLogResponse {
                    debt_id: log.debt_id.into_inner(),
                    amount_settled: log.amount_settled.to_decimal(),
                    status: log.status,
                })
                .collect(),
        }
    }
}

/// A wallet log row.
#[derive(Debug, Serialize)]
pub struct WalletTransactionResponse {
    /// Row id.
    pub id: Uuid,
    /// Group.
    pub group_id: Uuid,
    /// Member whose balance moved.
    pub user_id: Uuid,
    /// Kind of movement.
    #[serde(rename = "type")]
    pub tx_type: WalletTransactionType,
    /// Signed amount.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// Description.
    pub description: String,
    /// Status.
    pub status: ActionStatus,
    /// Originating action, if any.
    pub action_id: Option<Uuid>,
    /// Time.
    pub created_at: DateTime<Utc>,
}

impl From<wallet_transactions::Model> for WalletTransactionResponse {
    fn from(row: wallet_transactions::Model) -> Self {
        Self {
            id: row.id,
            group_id: row.group_id,
            user_id: row.user_id,
            tx_type: row.tx_type.into(),
            amount: decimal(row.amount),
            description: row.description,
            status: row.status.into(),
            action_id: row.action_id,
            created_at: row.created_at,
        }
    }
}
