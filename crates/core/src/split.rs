//! Equal expense splitting.
//!
//! An expense of `total` shared by `n` participants gives every participant
//! `total / n` minor units; the `total % n` leftover cents go one each to the
//! first participants in id order, so the shares always sum to the total and
//! the assignment never depends on request ordering.

use potluck_shared::types::{Money, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// One participant's part of an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// The participant.
    pub user_id: UserId,
    /// Amount this participant is responsible for.
    pub amount: Money,
}

/// A debt to be written when an expense paid by a member is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtDraft {
    /// Participant who owes.
    pub debtor: UserId,
    /// Member who paid.
    pub creditor: UserId,
    /// Debt amount (the debtor's share).
    pub amount: Money,
}

/// Stateless calculator for splitting expenses into shares and debts.
pub struct SplitCalculator;

impl SplitCalculator {
    /// Splits `total` equally across `participants`.
    ///
    /// Duplicate participant ids are collapsed. The result is ordered by
    /// participant id.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` if the total is not positive or no
    /// participant is given.
    pub fn split_equally(total: Money, participants: &[UserId]) -> LedgerResult<Vec<Share>> {
        if !total.is_positive() {
            return Err(LedgerError::Validation(
                "expense amount must be positive".to_string(),
            ));
        }

        let mut ids = participants.to_vec();
        ids.sort_unstable();
        ids.dedup();

        if ids.is_empty() {
            return Err(LedgerError::Validation(
                "at least one participant is required".to_string(),
            ));
        }

        let count = i64::try_from(ids.len())
            .map_err(|_| LedgerError::Validation("too many participants".to_string()))?;
        let base = total.minor() / count;
        let remainder = total.minor() % count;

        Ok(ids
            .into_iter()
            .zip(0_i64..)
            .map(|(user_id, index)| Share {
                user_id,
                amount: Money::from_minor(base + i64::from(index < remainder)),
            })
            .collect())
    }

    /// Derives the debts for an expense paid by `payer`.
    ///
    /// Every participant other than the payer owes the payer their share.
    /// Zero shares (total smaller than the participant count) produce no debt.
    #[must_use]
    pub fn debts_for_expense(payer: UserId, shares: &[Share]) -> Vec<DebtDraft> {
        shares
            .iter()
            .filter(|share| share.user_id != payer && share.amount.is_positive())
            .map(|share| DebtDraft {
                debtor: share.user_id,
                creditor: payer,
                amount: share.amount,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(n: u128) -> UserId {
        UserId::from_uuid(Uuid::from_u128(n))
    }

    #[test]
    fn test_even_split() {
        let shares =
            SplitCalculator::split_equally(Money::from_minor(9000), &[user(1), user(2), user(3)])
                .unwrap();
        assert!(shares.iter().all(|s| s.amount == Money::from_minor(3000)));
    }

    #[test]
    fn test_remainder_goes_to_lowest_ids() {
        // 100.00 / 3 = [33.34, 33.33, 33.33]
        let shares =
            SplitCalculator::split_equally(Money::from_minor(10_000), &[user(3), user(1), user(2)])
                .unwrap();
        assert_eq!(shares[0], Share { user_id: user(1), amount: Money::from_minor(3334) });
        assert_eq!(shares[1], Share { user_id: user(2), amount: Money::from_minor(3333) });
        assert_eq!(shares[2], Share { user_id: user(3), amount: Money::from_minor(3333) });
        assert_eq!(shares.iter().map(|s| s.amount).sum::<Money>(), Money::from_minor(10_000));
    }

    #[test]
    fn test_duplicate_participants_collapse() {
        let shares =
            SplitCalculator::split_equally(Money::from_minor(1000), &[user(1), user(1), user(2)])
                .unwrap();
        assert_eq!(shares.len(), 2);
    }

    #[test]
    fn test_rejects_empty_and_non_positive() {
        assert!(matches!(
            SplitCalculator::split_equally(Money::from_minor(1000), &[]),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            SplitCalculator::split_equally(Money::ZERO, &[user(1)]),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            SplitCalculator::split_equally(Money::from_minor(-5), &[user(1)]),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_payer_does_not_owe_themselves() {
        let shares =
            SplitCalculator::split_equally(Money::from_minor(9000), &[user(1), user(2), user(3)])
                .unwrap();
        let debts = SplitCalculator::debts_for_expense(user(2), &shares);

        assert_eq!(debts.len(), 2);
        assert!(debts.iter().all(|d| d.creditor == user(2) && d.debtor != user(2)));
        assert_eq!(debts.iter().map(|d| d.amount).sum::<Money>(), Money::from_minor(6000));
    }

    #[test]
    fn test_payer_outside_participants_is_owed_everything() {
        let shares =
            SplitCalculator::split_equally(Money::from_minor(1001), &[user(1), user(2)]).unwrap();
        let debts = SplitCalculator::debts_for_expense(user(9), &shares);
        assert_eq!(debts.iter().map(|d| d.amount).sum::<Money>(), Money::from_minor(1001));
    }

    #[test]
    fn test_zero_shares_produce_no_debt() {
        let shares = SplitCalculator::split_equally(
            Money::from_minor(2),
            &[user(1), user(2), user(3), user(4)],
        )
        .unwrap();
        let debts = SplitCalculator::debts_for_expense(user(1), &shares);
        assert_eq!(debts.len(), 1);
        assert_eq!(debts[0].debtor, user(2));
    }
}
