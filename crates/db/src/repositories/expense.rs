//! Expense repository (read side; expenses are written by confirmed actions).

use std::collections::HashMap;

use potluck_core::LedgerResult;
use potluck_shared::types::GroupId;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use super::db_err;
use crate::entities::sea_orm_active_enums::ActionStatus;
use crate::entities::{categories, expense_participants, expenses, pending_actions, users};

/// A participant and their share.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantShare {
    /// The participant.
    pub user: users::Model,
    /// Share in minor units.
    pub share_amount: i64,
}

/// A confirmed expense with its category, payer and participants.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseView {
    /// Stored row.
    pub expense: expenses::Model,
    /// Category.
    pub category: categories::Model,
    /// Paying member; `None` when paid from the wallet.
    pub payer: Option<users::Model>,
    /// Participants ordered by user id.
    pub participants: Vec<ParticipantShare>,
    /// Status of the originating action.
    pub status: ActionStatus,
}

/// Expense repository.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Confirmed expenses of the given groups, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, group_ids: &[GroupId]) -> LedgerResult<Vec<ExpenseView>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = expenses::Entity::find()
            .find_also_related(pending_actions::Entity)
            .filter(expenses::Column::GroupId.is_in(group_ids.iter().map(|g| g.into_inner())))
            .filter(pending_actions::Column::Status.eq(ActionStatus::Confirmed))
            .order_by_desc(expenses::Column::CreatedAt)
            .order_by_desc(expenses::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let expense_ids: Vec<uuid::Uuid> = rows.iter().map(|(e, _)| e.id).collect();
        let category_ids: Vec<uuid::Uuid> = rows.iter().map(|(e, _)| e.category_id).collect();

        let categories: HashMap<uuid::Uuid, categories::Model> = categories::Entity::find()
            .filter(categories::Column::Id.is_in(category_ids))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let shares = expense_participants::Entity::find()
            .filter(expense_participants::Column::ExpenseId.is_in(expense_ids))
            .order_by_asc(expense_participants::Column::UserId)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut user_ids: Vec<uuid::Uuid> = shares
            .iter()
            .map(|s| s.user_id)
            .chain(rows.iter().filter_map(|(e, _)| e.payer_id))
            .collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let people: HashMap<uuid::Uuid, users::Model> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut by_expense: HashMap<uuid::Uuid, Vec<ParticipantShare>> = HashMap::new();
        for share in shares {
            if let Some(user) = people.get(&share.user_id) {
                by_expense
                    .entry(share.expense_id)
                    .or_default()
                    .push(ParticipantShare {
                        user: user.clone(),
                        share_amount: share.share_amount,
                    });
            }
        }

        Ok(rows
            .into_iter()
            .filter_map(|(expense, action)| {
                let category = categories.get(&expense.category_id)?.clone();
                let payer = expense.payer_id.and_then(|id| people.get(&id).cloned());
                let participants = by_expense.remove(&expense.id).unwrap_or_default();
                Some(ExpenseView {
                    status: action.map_or(ActionStatus::Confirmed, |a| a.status),
                    expense,
                    category,
                    payer,
                    participants,
                })
            })
            .collect())
    }
}
