//! Debt repository: history, netted balances and settlement plans.

use std::collections::HashMap;

use potluck_core::balance::{BalanceCalculator, BalanceSummary, OpenDebt};
use potluck_core::LedgerResult;
use potluck_shared::types::{GroupId, Money, UserId};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use super::{db_err, find_group};
use crate::entities::{debts, expenses, payments, users};

/// A debt with both parties and its payments.
#[derive(Debug, Clone, Serialize)]
pub struct DebtView {
    /// Stored row.
    pub debt: debts::Model,
    /// Expense the debt comes from.
    pub expense: expenses::Model,
    /// Who owes.
    pub debtor: users::Model,
    /// Who is owed.
    pub creditor: users::Model,
    /// Payments, oldest first.
    pub payments: Vec<payments::Model>,
}

/// A netted amount between two users.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceLine {
    /// Who owes.
    pub debtor: users::Model,
    /// Who is owed.
    pub creditor: users::Model,
    /// Net amount owed.
    pub amount: Money,
}

/// Debt repository.
#[derive(Debug, Clone)]
pub struct DebtRepository {
    db: DatabaseConnection,
}

impl DebtRepository {
    /// Creates a new debt repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Every debt in the given groups, settled or not, newest expense first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn history(&self, group_ids: &[GroupId]) -> LedgerResult<Vec<DebtView>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = debts::Entity::find()
            .find_also_related(expenses::Entity)
            .filter(expenses::Column::GroupId.is_in(group_ids.iter().map(|g| g.into_inner())))
            .order_by_desc(expenses::Column::CreatedAt)
            .order_by_asc(debts::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let debt_ids: Vec<uuid::Uuid> = rows.iter().map(|(d, _)| d.id).collect();
        let mut paid: HashMap<uuid::Uuid, Vec<payments::Model>> = HashMap::new();
        for payment in payments::Entity::find()
            .filter(payments::Column::DebtId.is_in(debt_ids))
            .order_by_asc(payments::Column::CreatedAt)
            .order_by_asc(payments::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
        {
            paid.entry(payment.debt_id).or_default().push(payment);
        }

        let people = self
            .users(rows.iter().flat_map(|(d, _)| [d.debtor_id, d.creditor_id]))
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(debt, expense)| {
                let expense = expense?;
                let debtor = people.get(&debt.debtor_id)?.clone();
                let creditor = people.get(&debt.creditor_id)?.clone();
                let payments = paid.remove(&debt.id).unwrap_or_default();
                Some(DebtView {
                    debt,
                    expense,
                    debtor,
                    creditor,
                    payments,
                })
            })
            .collect())
    }

    /// Unsettled debts of the given groups as calculator input.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn open_debts(&self, group_ids: &[GroupId]) -> LedgerResult<Vec<OpenDebt>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = debts::Entity::find()
            .filter(debts::Column::IsSettled.eq(false))
            .find_also_related(expenses::Entity)
            .filter(expenses::Column::GroupId.is_in(group_ids.iter().map(|g| g.into_inner())))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|(debt, _)| OpenDebt {
                debtor: UserId::from_uuid(debt.debtor_id),
                creditor: UserId::from_uuid(debt.creditor_id),
                remaining: Money::from_minor(debt.remaining_amount),
            })
            .collect())
    }

    /// Pairwise netted balances over the given groups.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn balance_summary(&self, group_ids: &[GroupId]) -> LedgerResult<Vec<BalanceLine>> {
        let open = self.open_debts(group_ids).await?;
        self.lines(BalanceCalculator::balance_summary(&open)).await
    }

    /// Minimal-transfer plan that clears a group's net positions.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown group.
    pub async fn settlement_plan(&self, group_id: GroupId) -> LedgerResult<Vec<BalanceLine>> {
        find_group(&self.db, group_id).await?;
        let open = self.open_debts(&[group_id]).await?;
        self.lines(BalanceCalculator::settlement_plan(&open)).await
    }

    async fn lines(&self, summary: Vec<BalanceSummary>) -> LedgerResult<Vec<BalanceLine>> {
        let people = self
            .users(
                summary
                    .iter()
                    .flat_map(|s| [s.debtor.into_inner(), s.creditor.into_inner()]),
            )
            .await?;

        Ok(summary
            .into_iter()
            .filter_map(|line| {
                Some(BalanceLine {
                    debtor: people.get(&line.debtor.into_inner())?.clone(),
                    creditor: people.get(&line.creditor.into_inner())?.clone(),
                    amount: line.amount,
                })
            })
            .collect())
    }

    async fn users<I>(&self, ids: I) -> LedgerResult<HashMap<uuid::Uuid, users::Model>>
    where
        I: IntoIterator<Item = uuid::Uuid>,
    {
        let mut ids: Vec<uuid::Uuid> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect())
    }
}
