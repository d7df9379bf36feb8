//! `SeaORM` active enums, stored as short strings.

use potluck_core::auth::SystemRole;
use potluck_core::voting::{ActionStatus as CoreActionStatus, ActionType as CoreActionType};
use potluck_core::wallet::WalletTransactionType as CoreWalletTransactionType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum UserRole {
    #[sea_orm(string_value = "USER")]
    User,
    #[sea_orm(string_value = "ADMIN")]
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ActionType {
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
    #[sea_orm(string_value = "WALLET_DEPOSIT")]
    WalletDeposit,
    #[sea_orm(string_value = "MEMBER_ADD")]
    MemberAdd,
    #[sea_orm(string_value = "MEMBER_REMOVE")]
    MemberRemove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ActionStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum WalletTransactionType {
    #[sea_orm(string_value = "DEPOSIT")]
    Deposit,
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
    #[sea_orm(string_value = "WITHDRAWAL")]
    Withdrawal,
    #[sea_orm(string_value = "SETTLEMENT")]
    Settlement,
}

impl From<UserRole> for SystemRole {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::User => Self::User,
            UserRole::Admin => Self::Admin,
        }
    }
}

impl From<SystemRole> for UserRole {
    fn from(role: SystemRole) -> Self {
        match role {
            SystemRole::User => Self::User,
            SystemRole::Admin => Self::Admin,
        }
    }
}

impl From<ActionType> for CoreActionType {
    fn from(action_type: ActionType) -> Self {
        match action_type {
            ActionType::Expense => Self::Expense,
            ActionType::WalletDeposit => Self::WalletDeposit,
            ActionType::MemberAdd => Self::MemberAdd,
            ActionType::MemberRemove => Self::MemberRemove,
        }
    }
}

impl From<CoreActionType> for ActionType {
    fn from(action_type: CoreActionType) -> Self {
        match action_type {
            CoreActionType::Expense => Self::Expense,
            CoreActionType::WalletDeposit => Self::WalletDeposit,
            CoreActionType::MemberAdd => Self::MemberAdd,
            CoreActionType::MemberRemove => Self::MemberRemove,
        }
    }
}

impl From<ActionStatus> for CoreActionStatus {
    fn from(status: ActionStatus) -> Self {
        match status {
            ActionStatus::Pending => Self::Pending,
            ActionStatus::Confirmed => Self::Confirmed,
            ActionStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<CoreActionStatus> for ActionStatus {
    fn from(status: CoreActionStatus) -> Self {
        match status {
            CoreActionStatus::Pending => Self::Pending,
            CoreActionStatus::Confirmed => Self::Confirmed,
            CoreActionStatus::Rejected => Self::Rejected,
        }
    }
}

impl From<WalletTransactionType> for CoreWalletTransactionType {
    fn from(tx_type: WalletTransactionType) -> Self {
        match tx_type {
            WalletTransactionType::Deposit => Self::Deposit,
            WalletTransactionType::Expense => Self::Expense,
            WalletTransactionType::Withdrawal => Self::Withdrawal,
            WalletTransactionType::Settlement => Self::Settlement,
        }
    }
}
