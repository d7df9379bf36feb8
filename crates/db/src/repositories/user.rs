//! User repository for database operations.

use std::collections::HashMap;

use chrono::Utc;
use potluck_core::membership::{Exposure, MembershipRules};
use potluck_core::wallet::WalletService;
use potluck_core::{LedgerError, LedgerResult};
use potluck_shared::types::{GroupId, Money, PageRequest, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use super::action::{pending_action_ids, reject_unreachable};
use super::{db_err, find_user};
use crate::entities::{
    debts, group_members, groups, sea_orm_active_enums::UserRole, users, wallet_transactions,
};
use crate::locks::{LockKey, LockRegistry};

/// Input for registering a user. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login name; stored lower-cased.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// System role.
    pub role: UserRole,
}

/// User repository for CRUD and moderation.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers a user.
    ///
    /// # Errors
    ///
    /// `Validation` for blank names, `Conflict` if the username is taken.
    pub async fn create(&self, input: NewUser) -> LedgerResult<users::Model> {
        let username = input.username.trim().to_lowercase();
        let name = input.name.trim().to_string();
        if username.is_empty() || name.is_empty() {
            return Err(LedgerError::Validation(
                "username and name are required".to_string(),
            ));
        }
        if self.find_by_username(&username).await?.is_some() {
            return Err(LedgerError::Conflict(format!(
                "username '{username}' is already taken"
            )));
        }

        let user = users::ActiveModel {
            id: Set(UserId::new().into_inner()),
            username: Set(username),
            name: Set(name),
            password_hash: Set(input.password_hash),
            role: Set(input.role),
            is_active: Set(true),
            is_banned: Set(false),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn find_by_id(&self, id: UserId) -> LedgerResult<users::Model> {
        find_user(&self.db, id).await
    }

    /// Finds a user by login name, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_username(&self, username: &str) -> LedgerResult<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username.trim().to_lowercase()))
            .one(&self.db)
            .await
            .map_err(db_err)
    }

    /// Loads several users keyed by id; unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_many(&self, ids: &[UserId]) -> LedgerResult<HashMap<Uuid, users::Model>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let users = users::Entity::find()
            .filter(users::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    /// Lists users ordered by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, page: PageRequest) -> LedgerResult<Vec<users::Model>> {
        users::Entity::find()
            .order_by_asc(users::Column::Username)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Bans or unbans a user.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn set_banned(&self, id: UserId, banned: bool) -> LedgerResult<users::Model> {
        let user = find_user(&self.db, id).await?;
        let mut active: users::ActiveModel = user.into();
        active.is_banned = Set(banned);
        let user = active.update(&self.db).await.map_err(db_err)?;

        info!(user_id = %user.id, banned, "User moderation updated");
        Ok(user)
    }

    /// Deletes an account.
    ///
    /// The account is deactivated and drops out of every group; rows that
    /// reference it (expenses, settled debts, the wallet log, ballots) stay
    /// for audit. Open actions in those groups that can no longer reach
    /// approval without the user are rejected. Refused while the user owns a
    /// group, holds any unsettled debt or has a non-zero wallet balance.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Conflict` if any guard fails.
    pub async fn delete(&self, id: UserId, locks: &LockRegistry) -> LedgerResult<()> {
        let user = find_user(&self.db, id).await?;

        let mut group_ids: Vec<GroupId> = group_members::Entity::find()
            .filter(group_members::Column::UserId.eq(user.id))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|m| GroupId::from_uuid(m.group_id))
            .collect();
        group_ids.sort_unstable();

        // Open actions may lose their majority once the user leaves.
        let open = pending_action_ids(&self.db, &group_ids).await?;
        let guard = locks
            .lock_all(
                open.into_iter()
                    .map(LockKey::Action)
                    .chain(group_ids.iter().copied().map(LockKey::GroupWallet)),
            )
            .await;

        let txn = self.db.begin().await.map_err(db_err)?;

        let owned = groups::Entity::find()
            .filter(groups::Column::OwnerId.eq(user.id))
            .count(&txn)
            .await
            .map_err(db_err)?;
        if owned > 0 {
            return Err(LedgerError::Conflict(format!(
                "cannot delete user: they own {owned} group(s)"
            )));
        }

        let open_debts = debts::Entity::find()
            .filter(debts::Column::IsSettled.eq(false))
            .filter(
                Condition::any()
                    .add(debts::Column::DebtorId.eq(user.id))
                    .add(debts::Column::CreditorId.eq(user.id)),
            )
            .count(&txn)
            .await
            .map_err(db_err)?;

        let rows = wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::UserId.eq(user.id))
            .all(&txn)
            .await
            .map_err(db_err)?;
        let wallet_balance: Money = WalletService::member_balances(
            rows.into_iter()
                .map(|row| (id, Money::from_minor(row.amount))),
        )
        .into_values()
        .sum();

        MembershipRules::check_deletion(Exposure {
            open_debts,
            wallet_balance,
        })?;

        group_members::Entity::delete_many()
            .filter(group_members::Column::UserId.eq(user.id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(false);
        active.update(&txn).await.map_err(db_err)?;

        let now = Utc::now();
        for group_id in &group_ids {
            let rejected = reject_unreachable(&txn, *group_id, now).await?;
            if !rejected.is_empty() {
                info!(
                    group_id = %group_id,
                    count = rejected.len(),
                    "Open actions rejected after account deletion"
                );
            }
        }

        txn.commit().await.map_err(db_err)?;
        drop(guard);

        info!(user_id = %id, "User deleted");
        Ok(())
    }
}
