//! Group repository.

use chrono::Utc;
use potluck_core::{LedgerError, LedgerResult};
use potluck_shared::types::{GroupId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::info;

use super::{db_err, find_group, find_user, member_ids};
use crate::entities::{group_members, groups, users};

/// A group and its current members.
#[derive(Debug, Clone, Serialize)]
pub struct GroupWithMembers {
    /// The group.
    pub group: groups::Model,
    /// Members ordered by id.
    pub members: Vec<users::Model>,
}

/// Group repository.
#[derive(Debug, Clone)]
pub struct GroupRepository {
    db: DatabaseConnection,
}

impl GroupRepository {
    /// Creates a new group repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a group owned by `owner`, who becomes its first member.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank name, `NotFound` for an unknown owner,
    /// `Forbidden` for a banned or deleted owner.
    pub async fn create(
        &self,
        owner: UserId,
        name: &str,
        description: Option<&str>,
    ) -> LedgerResult<GroupWithMembers> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Validation("group name is required".to_string()));
        }

        let txn = self.db.begin().await.map_err(db_err)?;

        let owner_model = find_user(&txn, owner).await?;
        if !owner_model.is_active || owner_model.is_banned {
            return Err(LedgerError::Forbidden(format!(
                "user {owner} cannot create groups"
            )));
        }

        let now = Utc::now();
        let group = groups::ActiveModel {
            id: Set(GroupId::new().into_inner()),
            name: Set(name.to_string()),
            description: Set(description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)),
            owner_id: Set(owner.into_inner()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        group_members::ActiveModel {
            group_id: Set(group.id),
            user_id: Set(owner.into_inner()),
            joined_at: Set(now),
            action_id: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        info!(group_id = %group.id, owner_id = %owner, "Group created");
        Ok(GroupWithMembers {
            group,
            members: vec![owner_model],
        })
    }

    /// Loads a group with its members.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown group.
    pub async fn find(&self, group_id: GroupId) -> LedgerResult<GroupWithMembers> {
        let group = find_group(&self.db, group_id).await?;
        let ids = member_ids(&self.db, group_id).await?;
        let members = users::Entity::find()
            .filter(users::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .order_by_asc(users::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(GroupWithMembers { group, members })
    }

    /// Loads a group after checking that `user` belongs to it.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown group, `Forbidden` for a non-member.
    pub async fn find_for_member(
        &self,
        group_id: GroupId,
        user: UserId,
    ) -> LedgerResult<GroupWithMembers> {
        super::require_member(&self.db, group_id, user).await?;
        self.find(group_id).await
    }

    /// Checks that `user` belongs to the group.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown group, `Forbidden` for a non-member.
    pub async fn require_member(&self, group_id: GroupId, user: UserId) -> LedgerResult<()> {
        super::require_member(&self.db, group_id, user).await.map(|_| ())
    }

    /// Ids of every group `user` belongs to, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn group_ids_for(&self, user: UserId) -> LedgerResult<Vec<GroupId>> {
        let mut ids: Vec<GroupId> = group_members::Entity::find()
            .filter(group_members::Column::UserId.eq(user.into_inner()))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|m| GroupId::from_uuid(m.group_id))
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Groups `user` belongs to, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for(&self, user: UserId) -> LedgerResult<Vec<groups::Model>> {
        let ids = self.group_ids_for(user).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        groups::Entity::find()
            .filter(groups::Column::Id.is_in(ids.into_iter().map(GroupId::into_inner)))
            .order_by_asc(groups::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Resolves which groups a query covers.
    ///
    /// With a group given, that group alone after a membership check;
    /// otherwise every group the caller belongs to.
    ///
    /// # Errors
    ///
    /// `NotFound` / `Forbidden` from the membership check.
    pub async fn scope(&self, user: UserId, group: Option<GroupId>) -> LedgerResult<Vec<GroupId>> {
        match group {
            Some(group_id) => {
                self.require_member(group_id, user).await?;
                Ok(vec![group_id])
            }
            None => self.group_ids_for(user).await,
        }
    }
}
