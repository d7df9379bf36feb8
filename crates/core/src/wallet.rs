//! Group wallet rules.
//!
//! The wallet is a log of signed transactions per group; a member's balance
//! is the sum of their rows and the pooled balance the sum over members.
//! Settlements move money between two members' balances and never change
//! the pooled total.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use potluck_shared::types::{DebtId, Money, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::split::Share;

/// Kind of wallet movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WalletTransactionType {
    /// Money paid into the wallet (credit).
    Deposit,
    /// A participant's share of a wallet-paid expense (debit).
    Expense,
    /// Money taken out by its owner (debit).
    Withdrawal,
    /// Debt settlement between two members (debit and matching credit).
    Settlement,
}

impl WalletTransactionType {
    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Expense => "EXPENSE",
            Self::Withdrawal => "WITHDRAWAL",
            Self::Settlement => "SETTLEMENT",
        }
    }
}

impl fmt::Display for WalletTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An unsettled debt considered for settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementCandidate {
    /// Debt identifier.
    pub debt_id: DebtId,
    /// Who owes.
    pub debtor: UserId,
    /// Who is owed.
    pub creditor: UserId,
    /// Amount still owed.
    pub remaining: Money,
    /// Creation time of the expense behind the debt.
    pub incurred_at: DateTime<Utc>,
}

/// Which debts a settlement request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementScope {
    /// One debt, for `amount` or everything that remains.
    Debt {
        /// Debt to settle.
        debt_id: DebtId,
        /// Amount to pay; defaults to the remaining amount.
        amount: Option<Money>,
    },
    /// One debtor's debts oldest-first, for `amount` or all of them.
    Debtor {
        /// The debtor.
        user_id: UserId,
        /// Amount to pay; defaults to the debtor's total remaining.
        amount: Option<Money>,
    },
    /// Every member's debts, each settled in full where affordable.
    Group,
}

/// A payment the settlement will write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedPayment {
    /// Debt paid.
    pub debt_id: DebtId,
    /// Debited member.
    pub debtor: UserId,
    /// Credited member.
    pub creditor: UserId,
    /// Amount moved.
    pub amount: Money,
}

/// Per-debt result reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementStatus {
    /// The debt is now settled.
    #[serde(rename = "Fully Settled")]
    FullySettled,
    /// Part of the debt was paid.
    #[serde(rename = "Partially Settled")]
    PartiallySettled,
    /// The debtor's balance could not cover the debt.
    #[serde(rename = "Insufficient Funds")]
    InsufficientFunds,
}

impl SettlementStatus {
    /// Returns the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullySettled => "Fully Settled",
            Self::PartiallySettled => "Partially Settled",
            Self::InsufficientFunds => "Insufficient Funds",
        }
    }
}

/// Outcome for one debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementLog {
    /// Debt considered.
    pub debt_id: DebtId,
    /// Amount paid against it.
    pub amount_settled: Money,
    /// What happened.
    pub status: SettlementStatus,
}

/// Payments to write plus the per-debt report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettlementPlan {
    /// Payments in application order.
    pub payments: Vec<PlannedPayment>,
    /// One entry per debt considered.
    pub logs: Vec<SettlementLog>,
}

impl SettlementPlan {
    /// Total amount moved.
    #[must_use]
    pub fn total_settled(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    fn pay(&mut self, debt: &SettlementCandidate, amount: Money) {
        self.payments.push(PlannedPayment {
            debt_id: debt.debt_id,
            debtor: debt.debtor,
            creditor: debt.creditor,
            amount,
        });
        self.logs.push(SettlementLog {
            debt_id: debt.debt_id,
            amount_settled: amount,
            status: if amount == debt.remaining {
                SettlementStatus::FullySettled
            } else {
                SettlementStatus::PartiallySettled
            },
        });
    }
}

/// Stateless wallet rules.
pub struct WalletService;

impl WalletService {
    /// Sums signed wallet rows into per-member balances.
    #[must_use]
    pub fn member_balances<I>(rows: I) -> BTreeMap<UserId, Money>
    where
        I: IntoIterator<Item = (UserId, Money)>,
    {
        let mut balances = BTreeMap::new();
        for (user_id, amount) in rows {
            *balances.entry(user_id).or_insert(Money::ZERO) += amount;
        }
        balances
    }

    /// Checks that `balance` covers a withdrawal of `amount`.
    ///
    /// # Errors
    ///
    /// `Validation` for a non-positive amount, `InsufficientFunds` if the
    /// balance is too small.
    pub fn check_withdrawal(balance: Money, amount: Money) -> LedgerResult<()> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(
                "withdrawal amount must be positive".to_string(),
            ));
        }
        if amount > balance {
            return Err(LedgerError::InsufficientFunds {
                available: balance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Checks that every participant can cover their share of a wallet-paid expense.
    ///
    /// # Errors
    ///
    /// `InsufficientFunds` naming the first participant that falls short.
    pub fn check_wallet_expense(
        balances: &BTreeMap<UserId, Money>,
        shares: &[Share],
    ) -> LedgerResult<()> {
        for share in shares {
            let available = balances.get(&share.user_id).copied().unwrap_or_default();
            if available < share.amount {
                return Err(LedgerError::InsufficientFunds {
                    available,
                    requested: share.amount,
                });
            }
        }
        Ok(())
    }

    /// Orders debts oldest first: expense time, then debt id.
    pub fn sort_oldest_first(debts: &mut [SettlementCandidate]) {
        debts.sort_by(|a, b| {
            a.incurred_at
                .cmp(&b.incurred_at)
                .then(a.debt_id.cmp(&b.debt_id))
        });
    }

    /// Plans a settlement over the group's unsettled debts.
    ///
    /// Targeted scopes are all-or-nothing: they fail unless the debtor's
    /// balance covers the whole requested amount. The group sweep settles
    /// each debt in full when the debtor can afford it and reports the rest
    /// as insufficient; credits earlier in the sweep count toward later debts.
    ///
    /// # Errors
    ///
    /// - `NotFound` if a targeted debt is not among `debts`
    /// - `Validation` for a non-positive amount or a debtor with nothing owed
    /// - `Overpayment` if the amount exceeds what is owed
    /// - `InsufficientFunds` if the debtor's balance is below the amount
    pub fn plan_settlement(
        scope: SettlementScope,
        debts: &[SettlementCandidate],
        balances: &BTreeMap<UserId, Money>,
    ) -> LedgerResult<SettlementPlan> {
        let mut ordered: Vec<SettlementCandidate> = debts
            .iter()
            .filter(|d| d.remaining.is_positive())
            .copied()
            .collect();
        Self::sort_oldest_first(&mut ordered);

        let balance_of =
            |user: UserId| balances.get(&user).copied().unwrap_or_default();

        match scope {
            SettlementScope::Debt { debt_id, amount } => {
                let debt = ordered
                    .iter()
                    .find(|d| d.debt_id == debt_id)
                    .ok_or_else(|| LedgerError::not_found("debt", debt_id))?;
                let amount = amount.unwrap_or(debt.remaining);
                Self::check_requested(amount, debt.remaining, balance_of(debt.debtor))?;

                let mut plan = SettlementPlan::default();
                plan.pay(debt, amount);
                Ok(plan)
            }
            SettlementScope::Debtor { user_id, amount } => {
                let owed: Vec<&SettlementCandidate> =
                    ordered.iter().filter(|d| d.debtor == user_id).collect();
                let total: Money = owed.iter().map(|d| d.remaining).sum();
                if total.is_zero() {
                    return Err(LedgerError::Validation(format!(
                        "user {user_id} has no outstanding debts in this group"
                    )));
                }
                let amount = amount.unwrap_or(total);
                Self::check_requested(amount, total, balance_of(user_id))?;

                let mut plan = SettlementPlan::default();
                let mut left = amount;
                for debt in owed {
                    if left.is_zero() {
                        break;
                    }
                    let pay = left.min(debt.remaining);
                    plan.pay(debt, pay);
                    left -= pay;
                }
                Ok(plan)
            }
            SettlementScope::Group => {
                let mut running = balances.clone();
                let mut plan = SettlementPlan::default();
                for debt in &ordered {
                    let available = running.get(&debt.debtor).copied().unwrap_or_default();
                    if available >= debt.remaining {
                        *running.entry(debt.debtor).or_default() -= debt.remaining;
                        *running.entry(debt.creditor).or_default() += debt.remaining;
                        plan.pay(debt, debt.remaining);
                    } else {
                        plan.logs.push(SettlementLog {
                            debt_id: debt.debt_id,
                            amount_settled: Money::ZERO,
                            status: SettlementStatus::InsufficientFunds,
                        });
                    }
                }
                Ok(plan)
            }
        }
    }

    fn check_requested(amount: Money, owed: Money, available: Money) -> LedgerResult<()> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(
                "settlement amount must be positive".to_string(),
            ));
        }
        if amount > owed {
            return Err(LedgerError::Overpayment {
                remaining: owed,
                requested: amount,
            });
        }
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                available,
                requested: amount,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn user(n: u128) -> UserId {
        UserId::from_uuid(Uuid::from_u128(n))
    }

    fn debt(id: u128, debtor: u128, creditor: u128, remaining: i64, age_days: i64) -> SettlementCandidate {
        SettlementCandidate {
            debt_id: DebtId::from_uuid(Uuid::from_u128(id)),
            debtor: user(debtor),
            creditor: user(creditor),
            remaining: Money::from_minor(remaining),
            incurred_at: Utc::now() - Duration::days(age_days),
        }
    }

    fn balances(entries: &[(u128, i64)]) -> BTreeMap<UserId, Money> {
        WalletService::member_balances(
            entries
                .iter()
                .map(|&(u, amount)| (user(u), Money::from_minor(amount))),
        )
    }

    #[test]
    fn test_member_balances_sum_signed_rows() {
        let result = balances(&[(1, 5000), (2, 1000), (1, -1500)]);
        assert_eq!(result[&user(1)], Money::from_minor(3500));
        assert_eq!(result[&user(2)], Money::from_minor(1000));
    }

    #[test]
    fn test_withdrawal_limits() {
        assert!(WalletService::check_withdrawal(Money::from_minor(100), Money::from_minor(100)).is_ok());
        assert!(matches!(
            WalletService::check_withdrawal(Money::from_minor(100), Money::from_minor(101)),
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            WalletService::check_withdrawal(Money::from_minor(100), Money::ZERO),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_wallet_expense_needs_every_share_covered() {
        let shares = [
            Share { user_id: user(1), amount: Money::from_minor(500) },
            Share { user_id: user(2), amount: Money::from_minor(500) },
        ];
        assert!(WalletService::check_wallet_expense(&balances(&[(1, 500), (2, 800)]), &shares).is_ok());

        let err = WalletService::check_wallet_expense(&balances(&[(1, 500)]), &shares).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds { available, .. } if available == Money::ZERO
        ));
    }

    #[test]
    fn test_debt_settlement_short_of_funds() {
        // A 50.00 debt against a 30.00 balance.
        let debts = [debt(1, 1, 2, 5000, 1)];
        let err = WalletService::plan_settlement(
            SettlementScope::Debt { debt_id: debts[0].debt_id, amount: None },
            &debts,
            &balances(&[(1, 3000)]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds { available, requested }
                if available == Money::from_minor(3000) && requested == Money::from_minor(5000)
        ));
    }

    #[test]
    fn test_partial_debt_settlement() {
        let debts = [debt(1, 1, 2, 5000, 1)];
        let plan = WalletService::plan_settlement(
            SettlementScope::Debt { debt_id: debts[0].debt_id, amount: Some(Money::from_minor(2000)) },
            &debts,
            &balances(&[(1, 3000)]),
        )
        .unwrap();
        assert_eq!(plan.total_settled(), Money::from_minor(2000));
        assert_eq!(plan.logs[0].status, SettlementStatus::PartiallySettled);
    }

    #[test]
    fn test_unknown_debt_not_found() {
        let err = WalletService::plan_settlement(
            SettlementScope::Debt { debt_id: DebtId::new(), amount: None },
            &[debt(1, 1, 2, 100, 0)],
            &balances(&[(1, 3000)]),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { entity: "debt", .. }));
    }

    #[test]
    fn test_overpayment_rejected() {
        let debts = [debt(1, 1, 2, 500, 0)];
        let err = WalletService::plan_settlement(
            SettlementScope::Debt { debt_id: debts[0].debt_id, amount: Some(Money::from_minor(600)) },
            &debts,
            &balances(&[(1, 3000)]),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Overpayment { .. }));
    }

    #[test]
    fn test_debtor_scope_pays_oldest_first() {
        let debts = [
            debt(1, 1, 2, 1000, 1),
            debt(2, 1, 3, 1000, 5),
            debt(3, 1, 2, 1000, 3),
        ];
        let plan = WalletService::plan_settlement(
            SettlementScope::Debtor { user_id: user(1), amount: Some(Money::from_minor(1500)) },
            &debts,
            &balances(&[(1, 2000)]),
        )
        .unwrap();

        assert_eq!(plan.payments.len(), 2);
        assert_eq!(plan.payments[0].debt_id, debts[1].debt_id);
        assert_eq!(plan.payments[0].amount, Money::from_minor(1000));
        assert_eq!(plan.payments[1].debt_id, debts[2].debt_id);
        assert_eq!(plan.payments[1].amount, Money::from_minor(500));
        assert_eq!(plan.logs[1].status, SettlementStatus::PartiallySettled);
    }

    #[test]
    fn test_debtor_without_debts_rejected() {
        let err = WalletService::plan_settlement(
            SettlementScope::Debtor { user_id: user(9), amount: None },
            &[debt(1, 1, 2, 1000, 1)],
            &balances(&[(9, 2000)]),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_group_sweep_skips_unaffordable_debts() {
        let debts = [
            debt(1, 1, 2, 1000, 3),
            debt(2, 3, 1, 4000, 2),
            debt(3, 2, 3, 1500, 1),
        ];
        let plan = WalletService::plan_settlement(
            SettlementScope::Group,
            &debts,
            &balances(&[(1, 1000), (2, 600), (3, 0)]),
        )
        .unwrap();

        // Debt 1 is paid, debt 2 cannot be, debt 3 is covered by the credit from debt 1.
        let statuses: Vec<_> = plan.logs.iter().map(|l| l.status).collect();
        assert_eq!(
            statuses,
            vec![
                SettlementStatus::FullySettled,
                SettlementStatus::InsufficientFunds,
                SettlementStatus::FullySettled,
            ]
        );
        assert_eq!(plan.total_settled(), Money::from_minor(2500));
    }

    #[test]
    fn test_settlement_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&SettlementStatus::InsufficientFunds).unwrap(),
            "\"Insufficient Funds\""
        );
        assert_eq!(SettlementStatus::FullySettled.as_str(), "Fully Settled");
    }
}
