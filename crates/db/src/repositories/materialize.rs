//! Applying a confirmed action to the ledger.
//!
//! Everything here runs inside the transaction that confirmed the action,
//! so a failure leaves no partial writes behind. Each action type writes
//! at most once per action id; applying it again is a no-op.

use chrono::{DateTime, Utc};
use potluck_core::membership::MembershipRules;
use potluck_core::split::{Share, SplitCalculator};
use potluck_core::voting::{ActionDetails, DepositDetails, ExpenseDetails, ExpensePayer};
use potluck_core::wallet::WalletService;
use potluck_core::{LedgerError, LedgerResult};
use potluck_shared::types::{DebtId, ExpenseId, GroupId, UserId, WalletTransactionId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, Set,
};
use tracing::info;

use super::category::find_or_create;
use super::{db_err, find_user, group_exposure, is_member, wallet_balances};
use crate::entities::sea_orm_active_enums::{ActionStatus, WalletTransactionType};
use crate::entities::{
    debts, expense_participants, expenses, group_members, groups, pending_actions,
    wallet_transactions,
};

/// Checks that `user_id` may join the group.
///
/// # Errors
///
/// `NotFound` for an unknown user, `Validation` for a banned or deleted
/// account, `Conflict` if already a member.
pub(crate) async fn check_member_add<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    user_id: UserId,
) -> LedgerResult<()> {
    let user = find_user(conn, user_id).await?;
    if !user.is_active || user.is_banned {
        return Err(LedgerError::Validation(format!(
            "user {user_id} cannot join groups"
        )));
    }
    if is_member(conn, group_id, user_id).await? {
        return Err(LedgerError::Conflict(format!(
            "user {user_id} is already a member of group {group_id}"
        )));
    }
    Ok(())
}

/// Checks that `user_id` may leave the group.
///
/// # Errors
///
/// `NotFound` if not a member, otherwise the membership rules' verdict.
pub(crate) async fn check_member_remove<C: ConnectionTrait>(
    conn: &C,
    group: &groups::Model,
    user_id: UserId,
) -> LedgerResult<()> {
    let group_id = GroupId::from_uuid(group.id);
    if !is_member(conn, group_id, user_id).await? {
        return Err(LedgerError::not_found("group member", user_id));
    }
    let exposure = group_exposure(conn, group_id, user_id).await?;
    MembershipRules::check_removal(group.owner_id == user_id.into_inner(), exposure)
}

/// Writes the ledger effects of a confirmed action.
pub(crate) async fn materialize<C: ConnectionTrait>(
    conn: &C,
    action: &pending_actions::Model,
    details: &ActionDetails,
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    let group_id = GroupId::from_uuid(action.group_id);
    match details {
        ActionDetails::Expense(expense) => record_expense(conn, action, expense, now).await,
        ActionDetails::WalletDeposit(deposit) => {
            record_deposit(conn, action, deposit, now).await
        }
        ActionDetails::MemberAdd { user_id } => {
            let existing =
                group_members::Entity::find_by_id((action.group_id, user_id.into_inner()))
                    .one(conn)
                    .await
                    .map_err(db_err)?;
            if existing.is_some_and(|m| m.action_id == Some(action.id)) {
                return Ok(());
            }
            check_member_add(conn, group_id, *user_id).await?;
            group_members::ActiveModel {
                group_id: Set(action.group_id),
                user_id: Set(user_id.into_inner()),
                joined_at: Set(now),
                action_id: Set(Some(action.id)),
            }
            .insert(conn)
            .await
            .map_err(db_err)?;
            info!(group_id = %group_id, user_id = %user_id, "Member added");
            Ok(())
        }
        ActionDetails::MemberRemove { user_id } => {
            let Some(membership) =
                group_members::Entity::find_by_id((action.group_id, user_id.into_inner()))
                    .one(conn)
                    .await
                    .map_err(db_err)?
            else {
                // Already gone.
                return Ok(());
            };
            let group = super::find_group(conn, group_id).await?;
            check_member_remove(conn, &group, *user_id).await?;
            membership.delete(conn).await.map_err(db_err)?;
            info!(group_id = %group_id, user_id = %user_id, "Member removed");
            Ok(())
        }
    }
}

async fn record_expense<C: ConnectionTrait>(
    conn: &C,
    action: &pending_actions::Model,
    expense: &ExpenseDetails,
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    let already = expenses::Entity::find()
        .filter(expenses::Column::ActionId.eq(action.id))
        .count(conn)
        .await
        .map_err(db_err)?;
    if already > 0 {
        return Ok(());
    }

    let group_id = GroupId::from_uuid(action.group_id);
    for participant in &expense.participant_ids {
        if !is_member(conn, group_id, *participant).await? {
            return Err(LedgerError::Conflict(format!(
                "participant {participant} is no longer a member of the group"
            )));
        }
    }
    if let ExpensePayer::Member { user_id } = expense.payer {
        if !is_member(conn, group_id, user_id).await? {
            return Err(LedgerError::Conflict(format!(
                "payer {user_id} is no longer a member of the group"
            )));
        }
    }

    let shares = SplitCalculator::split_equally(expense.total_amount, &expense.participant_ids)?;
    if expense.payer == ExpensePayer::Wallet {
        let balances = wallet_balances(conn, group_id).await?;
        WalletService::check_wallet_expense(&balances, &shares)?;
    }

    let category = find_or_create(conn, &expense.category_name).await?;
    let payer_id = match expense.payer {
        ExpensePayer::Member { user_id } => Some(user_id.into_inner()),
        ExpensePayer::Wallet => None,
    };

    let expense_row = expenses::ActiveModel {
        id: Set(ExpenseId::new().into_inner()),
        group_id: Set(action.group_id),
        action_id: Set(action.id),
        description: Set(expense.description.clone()),
        total_amount: Set(expense.total_amount.minor()),
        category_id: Set(category.id),
        payer_id: Set(payer_id),
        paid_from_wallet: Set(payer_id.is_none()),
        created_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(db_err)?;

    let participants: Vec<expense_participants::ActiveModel> = shares
        .iter()
        .map(|share| expense_participants::ActiveModel {
            expense_id: Set(expense_row.id),
            user_id: Set(share.user_id.into_inner()),
            share_amount: Set(share.amount.minor()),
        })
        .collect();
    expense_participants::Entity::insert_many(participants)
        .exec_without_returning(conn)
        .await
        .map_err(db_err)?;

    match expense.payer {
        ExpensePayer::Member { user_id } => {
            write_debts(conn, &expense_row, user_id, &shares, now).await?;
        }
        ExpensePayer::Wallet => {
            write_wallet_debits(conn, action, &expense_row, &shares, now).await?;
        }
    }

    info!(
        expense_id = %expense_row.id,
        group_id = %group_id,
        total = %expense.total_amount,
        participants = shares.len(),
        "Expense recorded"
    );
    Ok(())
}

async fn write_debts<C: ConnectionTrait>(
    conn: &C,
    expense: &expenses::Model,
    payer: UserId,
    shares: &[Share],
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    let drafts = SplitCalculator::debts_for_expense(payer, shares);
    if drafts.is_empty() {
        return Ok(());
    }
    let rows: Vec<debts::ActiveModel> = drafts
        .iter()
        .map(|draft| debts::ActiveModel {
            id: Set(DebtId::new().into_inner()),
            expense_id: Set(expense.id),
            debtor_id: Set(draft.debtor.into_inner()),
            creditor_id: Set(draft.creditor.into_inner()),
            total_amount: Set(draft.amount.minor()),
            remaining_amount: Set(draft.amount.minor()),
            is_settled: Set(false),
            created_at: Set(now),
        })
        .collect();
    debts::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

async fn write_wallet_debits<C: ConnectionTrait>(
    conn: &C,
    action: &pending_actions::Model,
    expense: &expenses::Model,
    shares: &[Share],
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    let rows: Vec<wallet_transactions::ActiveModel> = shares
        .iter()
        .filter(|share| share.amount.is_positive())
        .map(|share| wallet_transactions::ActiveModel {
            id: Set(WalletTransactionId::new().into_inner()),
            group_id: Set(action.group_id),
            user_id: Set(share.user_id.into_inner()),
            tx_type: Set(WalletTransactionType::Expense),
            amount: Set(-share.amount.minor()),
            description: Set(expense.description.clone()),
            status: Set(ActionStatus::Confirmed),
            action_id: Set(Some(action.id)),
            created_at: Set(now),
        })
        .collect();
    if rows.is_empty() {
        return Ok(());
    }
    wallet_transactions::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

async fn record_deposit<C: ConnectionTrait>(
    conn: &C,
    action: &pending_actions::Model,
    deposit: &DepositDetails,
    now: DateTime<Utc>,
) -> LedgerResult<()> {
    let already = wallet_transactions::Entity::find()
        .filter(wallet_transactions::Column::ActionId.eq(action.id))
        .count(conn)
        .await
        .map_err(db_err)?;
    if already > 0 {
        return Ok(());
    }

    let group_id = GroupId::from_uuid(action.group_id);
    if !is_member(conn, group_id, deposit.user_id).await? {
        return Err(LedgerError::Conflict(format!(
            "user {} is no longer a member of the group",
            deposit.user_id
        )));
    }

    wallet_transactions::ActiveModel {
        id: Set(WalletTransactionId::new().into_inner()),
        group_id: Set(action.group_id),
        user_id: Set(deposit.user_id.into_inner()),
        tx_type: Set(WalletTransactionType::Deposit),
        amount: Set(deposit.amount.minor()),
        description: Set(deposit
            .description
            .clone()
            .unwrap_or_else(|| "Wallet deposit".to_string())),
        status: Set(ActionStatus::Confirmed),
        action_id: Set(Some(action.id)),
        created_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(db_err)?;

    info!(group_id = %group_id, user_id = %deposit.user_id, amount = %deposit.amount, "Deposit recorded");
    Ok(())
}
