//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every repository returns [`LedgerError`]; storage failures surface as
//! `LedgerError::Database` after being logged.

pub mod action;
pub mod category;
pub mod debt;
pub mod expense;
pub mod group;
mod materialize;
pub mod user;
pub mod wallet;

pub use action::{ActionRepository, ActionView, BallotView};
pub use category::{CategoryRepository, canonical_category_name};
pub use debt::{BalanceLine, DebtRepository, DebtView};
pub use expense::{ExpenseRepository, ExpenseView, ParticipantShare};
pub use group::{GroupRepository, GroupWithMembers};
pub use user::{NewUser, UserRepository};
pub use wallet::{SettlementOutcome, WalletBalance, WalletRepository};

use std::collections::BTreeMap;

use potluck_core::membership::Exposure;
use potluck_core::wallet::WalletService;
use potluck_core::{LedgerError, LedgerResult};
use potluck_shared::types::{GroupId, Money, UserId};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, RelationTrait,
};
use sea_orm::sea_query::JoinType;

use crate::entities::{debts, expenses, group_members, groups, users, wallet_transactions};

/// Maps a storage failure into the ledger taxonomy.
pub(crate) fn db_err(err: DbErr) -> LedgerError {
    tracing::error!(error = %err, "database operation failed");
    LedgerError::Database(err.to_string())
}

/// Loads a group or fails with `NotFound`.
pub(crate) async fn find_group<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
) -> LedgerResult<groups::Model> {
    groups::Entity::find_by_id(group_id.into_inner())
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| LedgerError::not_found("group", group_id))
}

/// Loads a user or fails with `NotFound`.
pub(crate) async fn find_user<C: ConnectionTrait>(
    conn: &C,
    user_id: UserId,
) -> LedgerResult<users::Model> {
    users::Entity::find_by_id(user_id.into_inner())
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| LedgerError::not_found("user", user_id))
}

/// Current member ids of a group, sorted.
pub(crate) async fn member_ids<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
) -> LedgerResult<Vec<UserId>> {
    let mut ids: Vec<UserId> = group_members::Entity::find()
        .filter(group_members::Column::GroupId.eq(group_id.into_inner()))
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(|m| UserId::from_uuid(m.user_id))
        .collect();
    ids.sort_unstable();
    Ok(ids)
}

/// Returns true if `user_id` currently belongs to the group.
pub(crate) async fn is_member<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    user_id: UserId,
) -> LedgerResult<bool> {
    let found = group_members::Entity::find_by_id((group_id.into_inner(), user_id.into_inner()))
        .one(conn)
        .await
        .map_err(db_err)?;
    Ok(found.is_some())
}

/// Loads a group and checks that `user_id` is one of its members.
pub(crate) async fn require_member<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    user_id: UserId,
) -> LedgerResult<groups::Model> {
    let group = find_group(conn, group_id).await?;
    if is_member(conn, group_id, user_id).await? {
        Ok(group)
    } else {
        Err(LedgerError::Forbidden(format!(
            "user {user_id} is not a member of group {group_id}"
        )))
    }
}

/// Per-member wallet balances of a group.
pub(crate) async fn wallet_balances<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
) -> LedgerResult<BTreeMap<UserId, Money>> {
    let rows = wallet_transactions::Entity::find()
        .filter(wallet_transactions::Column::GroupId.eq(group_id.into_inner()))
        .all(conn)
        .await
        .map_err(db_err)?;

    Ok(WalletService::member_balances(rows.into_iter().map(|row| {
        (UserId::from_uuid(row.user_id), Money::from_minor(row.amount))
    })))
}

/// Unsettled debts and wallet balance a member holds in one group.
pub(crate) async fn group_exposure<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    user_id: UserId,
) -> LedgerResult<Exposure> {
    let user = user_id.into_inner();
    let open_debts = debts::Entity::find()
        .join(JoinType::InnerJoin, debts::Relation::Expenses.def())
        .filter(expenses::Column::GroupId.eq(group_id.into_inner()))
        .filter(debts::Column::IsSettled.eq(false))
        .filter(
            Condition::any()
                .add(debts::Column::DebtorId.eq(user))
                .add(debts::Column::CreditorId.eq(user)),
        )
        .count(conn)
        .await
        .map_err(db_err)?;

    let wallet_balance = wallet_balances(conn, group_id)
        .await?
        .get(&user_id)
        .copied()
        .unwrap_or_default();

    Ok(Exposure {
        open_debts,
        wallet_balance,
    })
}
