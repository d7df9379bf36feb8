//! Property-based tests for splitting, payments and balance netting.

use proptest::prelude::*;
use uuid::Uuid;

use crate::balance::{BalanceCalculator, OpenDebt};
use crate::debt::DebtState;
use crate::split::SplitCalculator;
use potluck_shared::types::{DebtId, Money, UserId};

fn arb_user() -> impl Strategy<Value = UserId> {
    (1u128..=12).prop_map(|n| UserId::from_uuid(Uuid::from_u128(n)))
}

fn arb_open_debts() -> impl Strategy<Value = Vec<OpenDebt>> {
    prop::collection::vec(
        (arb_user(), arb_user(), 0i64..100_000).prop_map(|(debtor, creditor, remaining)| OpenDebt {
            debtor,
            creditor,
            remaining: Money::from_minor(remaining),
        }),
        0..30,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Shares sum exactly to the total and differ by at most one cent.
    #[test]
    fn prop_shares_sum_to_total(
        total in 1i64..10_000_000,
        participants in prop::collection::vec(arb_user(), 1..12),
    ) {
        let shares = SplitCalculator::split_equally(Money::from_minor(total), &participants).unwrap();

        let sum: Money = shares.iter().map(|s| s.amount).sum();
        prop_assert_eq!(sum, Money::from_minor(total));

        let max = shares.iter().map(|s| s.amount).max().unwrap();
        let min = shares.iter().map(|s| s.amount).min().unwrap();
        prop_assert!((max - min).minor() <= 1);
    }

    /// The split does not depend on the order participants were given in.
    #[test]
    fn prop_split_order_independent(
        total in 1i64..1_000_000,
        participants in prop::collection::vec(arb_user(), 1..12),
    ) {
        let mut reversed = participants.clone();
        reversed.reverse();
        prop_assert_eq!(
            SplitCalculator::split_equally(Money::from_minor(total), &participants).unwrap(),
            SplitCalculator::split_equally(Money::from_minor(total), &reversed).unwrap()
        );
    }

    /// Debts add up to the total minus the payer's own share.
    #[test]
    fn prop_debts_exclude_payer_share(
        total in 1i64..1_000_000,
        participants in prop::collection::vec(arb_user(), 1..12),
        payer in arb_user(),
    ) {
        let shares = SplitCalculator::split_equally(Money::from_minor(total), &participants).unwrap();
        let payer_share: Money = shares.iter().filter(|s| s.user_id == payer).map(|s| s.amount).sum();
        let debts = SplitCalculator::debts_for_expense(payer, &shares);

        let owed: Money = debts.iter().map(|d| d.amount).sum();
        prop_assert_eq!(owed + payer_share, Money::from_minor(total));
        prop_assert!(debts.iter().all(|d| d.debtor != payer && d.amount.is_positive()));
    }

    /// Remaining never increases and never drops below zero.
    #[test]
    fn prop_payments_keep_remaining_in_bounds(
        total in 1i64..100_000,
        payments in prop::collection::vec(1i64..50_000, 0..20),
    ) {
        let mut state = DebtState::new(DebtId::new(), Money::from_minor(total));
        for amount in payments {
            let before = state.remaining_amount;
            if let Ok(next) = state.apply_payment(Money::from_minor(amount)) {
                state = next;
            }
            prop_assert!(state.remaining_amount <= before);
            prop_assert!(!state.remaining_amount.is_negative());
            prop_assert!(state.remaining_amount <= state.total_amount);
        }
        prop_assert_eq!(state.is_settled(), state.remaining_amount.is_zero());
    }

    /// Netting is independent of input order and preserves every net position.
    #[test]
    fn prop_balance_summary_order_independent(debts in arb_open_debts()) {
        let mut reversed = debts.clone();
        reversed.reverse();

        let summary = BalanceCalculator::balance_summary(&debts);
        prop_assert_eq!(&summary, &BalanceCalculator::balance_summary(&reversed));

        let as_debts: Vec<OpenDebt> = summary
            .iter()
            .map(|s| OpenDebt { debtor: s.debtor, creditor: s.creditor, remaining: s.amount })
            .collect();
        prop_assert_eq!(
            BalanceCalculator::net_positions(&as_debts)
                .into_iter()
                .filter(|(_, m)| !m.is_zero())
                .collect::<Vec<_>>(),
            BalanceCalculator::net_positions(&debts)
                .into_iter()
                .filter(|(_, m)| !m.is_zero())
                .collect::<Vec<_>>()
        );
        prop_assert!(summary.iter().all(|s| s.amount.is_positive() && s.debtor != s.creditor));
    }

    /// The settlement plan never needs more transfers than there are participants.
    #[test]
    fn prop_settlement_plan_is_small(debts in arb_open_debts()) {
        let plan = BalanceCalculator::settlement_plan(&debts);
        let people = BalanceCalculator::net_positions(&debts)
            .values()
            .filter(|m| !m.is_zero())
            .count();
        prop_assert!(plan.len() <= people.saturating_sub(1));
    }
}
