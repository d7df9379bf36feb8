//! Group wallet repository: balances, withdrawals and settlement.
//!
//! The wallet is an append-only log of signed rows per member. Balances are
//! always derived from the log; every write runs under the group's wallet
//! lock so a balance check and the row it guards commit together.

use std::collections::HashMap;

use chrono::Utc;
use potluck_core::auth::verify_password;
use potluck_core::debt::DebtState;
use potluck_core::wallet::{
    SettlementCandidate, SettlementLog, SettlementScope, SettlementStatus, WalletService,
};
use potluck_core::{LedgerError, LedgerResult};
use potluck_shared::types::{DebtId, GroupId, Money, PaymentId, UserId, WalletTransactionId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, warn};

use super::{db_err, find_user, is_member, member_ids, require_member, wallet_balances};
use crate::entities::sea_orm_active_enums::{ActionStatus, WalletTransactionType};
use crate::entities::{debts, expenses, payments, users, wallet_transactions};
use crate::locks::{LockKey, LockRegistry};

/// Wallet totals of a group.
#[derive(Debug, Clone, Serialize)]
pub struct WalletBalance {
    /// The group.
    pub group_id: GroupId,
    /// Sum over every member.
    pub total: Money,
    /// Each current member with their balance, ordered by member id.
    pub members: Vec<(users::Model, Money)>,
}

/// Result of a settlement run.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementOutcome {
    /// One entry per debt considered.
    pub logs: Vec<SettlementLog>,
    /// Total moved between members.
    pub total_settled: Money,
}

/// Group wallet repository.
#[derive(Debug, Clone)]
pub struct WalletRepository {
    db: DatabaseConnection,
    locks: LockRegistry,
}

impl WalletRepository {
    /// Creates a new wallet repository sharing `locks` with the action repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, locks: LockRegistry) -> Self {
        Self { db, locks }
    }

    /// Current balances of a group's wallet.
    ///
    /// Former members drop out of the per-member list; the total still
    /// counts every row.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown group.
    pub async fn balance(&self, group_id: GroupId) -> LedgerResult<WalletBalance> {
        super::find_group(&self.db, group_id).await?;
        let balances = wallet_balances(&self.db, group_id).await?;
        let ids = member_ids(&self.db, group_id).await?;

        let users: HashMap<uuid::Uuid, users::Model> = users::Entity::find()
            .filter(users::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let members = ids
            .iter()
            .filter_map(|id| {
                users.get(&id.into_inner()).map(|user| {
                    (user.clone(), balances.get(id).copied().unwrap_or_default())
                })
            })
            .collect();

        Ok(WalletBalance {
            group_id,
            total: balances.values().copied().sum(),
            members,
        })
    }

    /// Wallet log of a group, newest first.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown group.
    pub async fn transactions(
        &self,
        group_id: GroupId,
    ) -> LedgerResult<Vec<wallet_transactions::Model>> {
        super::find_group(&self.db, group_id).await?;
        wallet_transactions::Entity::find()
            .filter(wallet_transactions::Column::GroupId.eq(group_id.into_inner()))
            .order_by_desc(wallet_transactions::Column::CreatedAt)
            .order_by_desc(wallet_transactions::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)
    }

    /// Withdraws from `user`'s own balance. Takes effect immediately, without a vote.
    ///
    /// # Errors
    ///
    /// - `Forbidden` for a wrong password or a non-member
    /// - `Validation` for a non-positive amount
    /// - `InsufficientFunds` if the balance is below `amount`
    pub async fn withdraw(
        &self,
        group_id: GroupId,
        user_id: UserId,
        amount: Money,
        password: &str,
    ) -> LedgerResult<wallet_transactions::Model> {
        let user = find_user(&self.db, user_id).await?;
        match verify_password(password, &user.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(LedgerError::Forbidden("invalid password".to_string())),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "Password verification failed");
                return Err(LedgerError::Forbidden("invalid password".to_string()));
            }
        }

        let guard = self.locks.lock(LockKey::GroupWallet(group_id)).await;
        let txn = self.db.begin().await.map_err(db_err)?;

        require_member(&txn, group_id, user_id).await?;
        let balance = wallet_balances(&txn, group_id)
            .await?
            .get(&user_id)
            .copied()
            .unwrap_or_default();
        WalletService::check_withdrawal(balance, amount)?;

        let row = wallet_transactions::ActiveModel {
            id: Set(WalletTransactionId::new().into_inner()),
            group_id: Set(group_id.into_inner()),
            user_id: Set(user_id.into_inner()),
            tx_type: Set(WalletTransactionType::Withdrawal),
            amount: Set(-amount.minor()),
            description: Set("Wallet withdrawal".to_string()),
            status: Set(ActionStatus::Confirmed),
            action_id: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        drop(guard);

        info!(group_id = %group_id, user_id = %user_id, amount = %amount, "Wallet withdrawal");
        Ok(row)
    }

    /// Settles debts from wallet balances.
    ///
    /// Each payment debits the debtor, credits the creditor and is recorded
    /// against the debt. Targeted scopes either pay the full requested
    /// amount or nothing; the group sweep pays what it can and reports the
    /// rest as insufficient.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if `actor` is not a member
    /// - `NotFound` for a debt outside the group or a debtor who is not a member
    /// - `Conflict` for a debt that is already settled
    /// - `Validation`, `Overpayment`, `InsufficientFunds` from the plan
    pub async fn settle(
        &self,
        group_id: GroupId,
        actor: UserId,
        scope: SettlementScope,
    ) -> LedgerResult<SettlementOutcome> {
        let guard = self.locks.lock(LockKey::GroupWallet(group_id)).await;
        let txn = self.db.begin().await.map_err(db_err)?;

        require_member(&txn, group_id, actor).await?;
        match scope {
            SettlementScope::Debtor { user_id, .. } => {
                if !is_member(&txn, group_id, user_id).await? {
                    return Err(LedgerError::not_found("group member", user_id));
                }
            }
            SettlementScope::Debt { debt_id, .. } => {
                check_debt_in_group(&txn, group_id, debt_id).await?;
            }
            SettlementScope::Group => {}
        }

        let open = unsettled_debts(&txn, group_id).await?;
        let candidates: Vec<SettlementCandidate> = open
            .iter()
            .map(|(debt, incurred_at)| SettlementCandidate {
                debt_id: DebtId::from_uuid(debt.id),
                debtor: UserId::from_uuid(debt.debtor_id),
                creditor: UserId::from_uuid(debt.creditor_id),
                remaining: Money::from_minor(debt.remaining_amount),
                incurred_at: *incurred_at,
            })
            .collect();
        let balances = wallet_balances(&txn, group_id).await?;
        let plan = WalletService::plan_settlement(scope, &candidates, &balances)?;

        let mut rows: HashMap<uuid::Uuid, debts::Model> =
            open.into_iter().map(|(debt, _)| (debt.id, debt)).collect();
        let names = user_names(&txn, &plan.payments).await?;
        let now = Utc::now();

        for payment in &plan.payments {
            let debt = rows
                .remove(&payment.debt_id.into_inner())
                .ok_or_else(|| LedgerError::not_found("debt", payment.debt_id))?;
            let state = DebtState {
                id: payment.debt_id,
                total_amount: Money::from_minor(debt.total_amount),
                remaining_amount: Money::from_minor(debt.remaining_amount),
            }
            .apply_payment(payment.amount)?;

            let mut active: debts::ActiveModel = debt.into();
            active.remaining_amount = Set(state.remaining_amount.minor());
            active.is_settled = Set(state.is_settled());
            active.update(&txn).await.map_err(db_err)?;

            payments::ActiveModel {
                id: Set(PaymentId::new().into_inner()),
                debt_id: Set(payment.debt_id.into_inner()),
                amount: Set(payment.amount.minor()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;

            let creditor_name = names.get(&payment.creditor).cloned().unwrap_or_default();
            let debtor_name = names.get(&payment.debtor).cloned().unwrap_or_default();
            let legs = [
                (
                    payment.debtor,
                    -payment.amount.minor(),
                    format!("Paid debt to {creditor_name}"),
                ),
                (
                    payment.creditor,
                    payment.amount.minor(),
                    format!("Received settlement from {debtor_name}"),
                ),
            ];
            for (user, amount, description) in legs {
                wallet_transactions::ActiveModel {
                    id: Set(WalletTransactionId::new().into_inner()),
                    group_id: Set(group_id.into_inner()),
                    user_id: Set(user.into_inner()),
                    tx_type: Set(WalletTransactionType::Settlement),
                    amount: Set(amount),
                    description: Set(description),
                    status: Set(ActionStatus::Confirmed),
                    action_id: Set(None),
                    created_at: Set(now),
                }
                .insert(&txn)
                .await
                .map_err(db_err)?;
            }
        }

        txn.commit().await.map_err(db_err)?;
        drop(guard);

        for log in &plan.logs {
            if log.status == SettlementStatus::InsufficientFunds {
                warn!(group_id = %group_id, debt_id = %log.debt_id, "Insufficient Funds");
            }
        }
        let total_settled = plan.total_settled();
        info!(
            group_id = %group_id,
            actor = %actor,
            payments = plan.payments.len(),
            total = %total_settled,
            "Settlement applied"
        );

        Ok(SettlementOutcome {
            logs: plan.logs,
            total_settled,
        })
    }
}

/// Checks that a debt belongs to the group and is still open.
async fn check_debt_in_group<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    debt_id: DebtId,
) -> LedgerResult<()> {
    let (debt, expense) = debts::Entity::find_by_id(debt_id.into_inner())
        .find_also_related(expenses::Entity)
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or_else(|| LedgerError::not_found("debt", debt_id))?;

    if expense.map(|e| e.group_id) != Some(group_id.into_inner()) {
        return Err(LedgerError::not_found("debt", debt_id));
    }
    if debt.is_settled {
        return Err(LedgerError::Conflict(format!("debt {debt_id} is already settled")));
    }
    Ok(())
}

/// Unsettled debts of a group with the creation time of their expense.
async fn unsettled_debts<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
) -> LedgerResult<Vec<(debts::Model, chrono::DateTime<Utc>)>> {
    let rows = debts::Entity::find()
        .filter(debts::Column::IsSettled.eq(false))
        .find_also_related(expenses::Entity)
        .filter(expenses::Column::GroupId.eq(group_id.into_inner()))
        .all(conn)
        .await
        .map_err(db_err)?;

    Ok(rows
        .into_iter()
        .filter_map(|(debt, expense)| expense.map(|e| (debt, e.created_at)))
        .collect())
}

async fn user_names<C: ConnectionTrait>(
    conn: &C,
    payments: &[potluck_core::wallet::PlannedPayment],
) -> LedgerResult<HashMap<UserId, String>> {
    let mut ids: Vec<uuid::Uuid> = payments
        .iter()
        .flat_map(|p| [p.debtor.into_inner(), p.creditor.into_inner()])
        .collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    Ok(users::Entity::find()
        .filter(users::Column::Id.is_in(ids))
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(|u| (UserId::from_uuid(u.id), u.name))
        .collect())
}
