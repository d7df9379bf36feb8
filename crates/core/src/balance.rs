//! Balance reduction over a group's unsettled debts.
//!
//! Two views are derived from the same input:
//!
//! - [`BalanceCalculator::balance_summary`] nets each pair of users into a
//!   single directional amount.
//! - [`BalanceCalculator::settlement_plan`] collapses everybody's net position
//!   and matches largest debtors against largest creditors, which usually
//!   needs fewer transfers than paying pair by pair.
//!
//! Both are pure integer arithmetic over minor units and produce the same
//! output for any permutation of the input.

use std::collections::BTreeMap;

use potluck_shared::types::{Money, UserId};
use serde::{Deserialize, Serialize};

/// What one user still owes another on a single debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDebt {
    /// Who owes.
    pub debtor: UserId,
    /// Who is owed.
    pub creditor: UserId,
    /// Remaining amount on the debt.
    pub remaining: Money,
}

/// A netted `debtor` owes `creditor` `amount` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BalanceSummary {
    /// Who owes.
    pub debtor: UserId,
    /// Who is owed.
    pub creditor: UserId,
    /// Net amount, always positive.
    pub amount: Money,
}

/// Stateless calculator for netted balances.
pub struct BalanceCalculator;

impl BalanceCalculator {
    /// Nets all open debts per unordered pair of users.
    ///
    /// Pairs that cancel out are dropped, as are self-debts and zero
    /// remainders. The result is sorted by `(debtor, creditor)`.
    #[must_use]
    pub fn balance_summary(debts: &[OpenDebt]) -> Vec<BalanceSummary> {
        // Positive: the lower id owes the higher id.
        let mut pairs: BTreeMap<(UserId, UserId), Money> = BTreeMap::new();

        for debt in debts {
            if debt.debtor == debt.creditor || !debt.remaining.is_positive() {
                continue;
            }
            if debt.debtor < debt.creditor {
                *pairs.entry((debt.debtor, debt.creditor)).or_default() += debt.remaining;
            } else {
                *pairs.entry((debt.creditor, debt.debtor)).or_default() -= debt.remaining;
            }
        }

        let mut summary: Vec<BalanceSummary> = pairs
            .into_iter()
            .filter(|(_, net)| !net.is_zero())
            .map(|((low, high), net)| {
                if net.is_positive() {
                    BalanceSummary {
                        debtor: low,
                        creditor: high,
                        amount: net,
                    }
                } else {
                    BalanceSummary {
                        debtor: high,
                        creditor: low,
                        amount: -net,
                    }
                }
            })
            .collect();

        summary.sort_unstable();
        summary
    }

    /// Returns each user's net position: positive when owed, negative when owing.
    #[must_use]
    pub fn net_positions(debts: &[OpenDebt]) -> BTreeMap<UserId, Money> {
        let mut net: BTreeMap<UserId, Money> = BTreeMap::new();
        for debt in debts {
            if debt.debtor == debt.creditor || !debt.remaining.is_positive() {
                continue;
            }
            *net.entry(debt.creditor).or_default() += debt.remaining;
            *net.entry(debt.debtor).or_default() -= debt.remaining;
        }
        net
    }

    /// Builds a greedy settlement plan from net positions.
    ///
    /// Debtors are taken largest first and matched against creditors,
    /// largest first; ties break on user id. Every transfer amount is
    /// positive and the plan clears every net position exactly.
    #[must_use]
    pub fn settlement_plan(debts: &[OpenDebt]) -> Vec<BalanceSummary> {
        let net = Self::net_positions(debts);

        let mut debtors: Vec<(UserId, Money)> = net
            .iter()
            .filter(|(_, amount)| amount.is_negative())
            .map(|(user, amount)| (*user, amount.abs()))
            .collect();
        let mut creditors: Vec<(UserId, Money)> = net
            .iter()
            .filter(|(_, amount)| amount.is_positive())
            .map(|(user, amount)| (*user, *amount))
            .collect();

        debtors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        creditors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut plan = Vec::new();
        let (mut d, mut c) = (0, 0);
        while d < debtors.len() && c < creditors.len() {
            let transfer = debtors[d].1.min(creditors[c].1);
            plan.push(BalanceSummary {
                debtor: debtors[d].0,
                creditor: creditors[c].0,
                amount: transfer,
            });

            debtors[d].1 -= transfer;
            creditors[c].1 -= transfer;
            if debtors[d].1.is_zero() {
                d += 1;
            }
            if creditors[c].1.is_zero() {
                c += 1;
            }
        }

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(n: u128) -> UserId {
        UserId::from_uuid(Uuid::from_u128(n))
    }

    fn open(debtor: u128, creditor: u128, remaining: i64) -> OpenDebt {
        OpenDebt {
            debtor: user(debtor),
            creditor: user(creditor),
            remaining: Money::from_minor(remaining),
        }
    }

    #[test]
    fn test_opposite_debts_net_out() {
        let summary = BalanceCalculator::balance_summary(&[open(1, 2, 5000), open(2, 1, 2000)]);
        assert_eq!(
            summary,
            vec![BalanceSummary {
                debtor: user(1),
                creditor: user(2),
                amount: Money::from_minor(3000),
            }]
        );
    }

    #[test]
    fn test_reverse_direction_wins() {
        let summary = BalanceCalculator::balance_summary(&[open(1, 2, 1000), open(2, 1, 2500)]);
        assert_eq!(summary[0].debtor, user(2));
        assert_eq!(summary[0].creditor, user(1));
        assert_eq!(summary[0].amount, Money::from_minor(1500));
    }

    #[test]
    fn test_equal_debts_drop_pair() {
        let summary = BalanceCalculator::balance_summary(&[open(1, 2, 700), open(2, 1, 700)]);
        assert!(summary.is_empty());
    }

    #[test]
    fn test_zero_remaining_ignored() {
        let summary = BalanceCalculator::balance_summary(&[open(1, 2, 0), open(3, 3, 100)]);
        assert!(summary.is_empty());
    }

    #[test]
    fn test_summary_sorted_by_debtor_then_creditor() {
        let summary = BalanceCalculator::balance_summary(&[
            open(3, 1, 100),
            open(1, 2, 100),
            open(1, 4, 100),
        ]);
        let keys: Vec<_> = summary.iter().map(|s| (s.debtor, s.creditor)).collect();
        assert_eq!(keys, vec![(user(1), user(2)), (user(1), user(4)), (user(3), user(1))]);
    }

    #[test]
    fn test_settlement_plan_collapses_chain() {
        // 1 owes 2, 2 owes 3: a single transfer from 1 to 3 clears everything.
        let plan = BalanceCalculator::settlement_plan(&[open(1, 2, 1000), open(2, 3, 1000)]);
        assert_eq!(
            plan,
            vec![BalanceSummary {
                debtor: user(1),
                creditor: user(3),
                amount: Money::from_minor(1000),
            }]
        );
    }

    #[test]
    fn test_settlement_plan_clears_net_positions() {
        let debts = [
            open(1, 4, 3000),
            open(2, 4, 1500),
            open(3, 1, 500),
            open(4, 3, 200),
        ];
        let plan = BalanceCalculator::settlement_plan(&debts);

        let mut net = BalanceCalculator::net_positions(&debts);
        for transfer in &plan {
            assert!(transfer.amount.is_positive());
            *net.entry(transfer.debtor).or_default() += transfer.amount;
            *net.entry(transfer.creditor).or_default() -= transfer.amount;
        }
        assert!(net.values().all(|amount| amount.is_zero()));
    }
}
