//! Payment application against a single debt.
//!
//! A debt's remaining amount only ever decreases, and the sum of payments
//! never exceeds the original total.

use potluck_shared::types::{DebtId, Money};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// The mutable part of a debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtState {
    /// Debt identifier.
    pub id: DebtId,
    /// Amount originally owed.
    pub total_amount: Money,
    /// Amount still owed.
    pub remaining_amount: Money,
}

impl DebtState {
    /// Creates the state of a freshly written debt.
    #[must_use]
    pub const fn new(id: DebtId, total_amount: Money) -> Self {
        Self {
            id,
            total_amount,
            remaining_amount: total_amount,
        }
    }

    /// Returns true once nothing remains to be paid.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.remaining_amount.is_zero()
    }

    /// Returns the total already paid.
    #[must_use]
    pub fn paid(&self) -> Money {
        self.total_amount - self.remaining_amount
    }

    /// Applies a payment and returns the new state.
    ///
    /// # Errors
    ///
    /// - `Validation` if the amount is not positive
    /// - `Conflict` if the debt is already settled
    /// - `Overpayment` if the amount exceeds what remains
    pub fn apply_payment(&self, amount: Money) -> LedgerResult<Self> {
        if !amount.is_positive() {
            return Err(LedgerError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }
        if self.is_settled() {
            return Err(LedgerError::Conflict(format!(
                "debt {} is already settled",
                self.id
            )));
        }
        if amount > self.remaining_amount {
            return Err(LedgerError::Overpayment {
                remaining: self.remaining_amount,
                requested: amount,
            });
        }

        Ok(Self {
            remaining_amount: self.remaining_amount - amount,
            ..*self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debt(total: i64) -> DebtState {
        DebtState::new(DebtId::new(), Money::from_minor(total))
    }

    #[test]
    fn test_partial_then_full_payment() {
        let state = debt(5000);

        let state = state.apply_payment(Money::from_minor(2000)).unwrap();
        assert_eq!(state.remaining_amount, Money::from_minor(3000));
        assert_eq!(state.paid(), Money::from_minor(2000));
        assert!(!state.is_settled());

        let state = state.apply_payment(Money::from_minor(3000)).unwrap();
        assert!(state.is_settled());
        assert_eq!(state.paid(), state.total_amount);
    }

    #[test]
    fn test_overpayment_rejected() {
        let state = debt(1000);
        let err = state.apply_payment(Money::from_minor(1001)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Overpayment { remaining, requested }
                if remaining == Money::from_minor(1000) && requested == Money::from_minor(1001)
        ));
    }

    #[test]
    fn test_settled_debt_rejects_payment() {
        let state = debt(1000).apply_payment(Money::from_minor(1000)).unwrap();
        assert!(matches!(
            state.apply_payment(Money::from_minor(1)),
            Err(LedgerError::Conflict(_))
        ));
    }

    #[test]
    fn test_non_positive_payment_rejected() {
        let state = debt(1000);
        assert!(matches!(
            state.apply_payment(Money::ZERO),
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            state.apply_payment(Money::from_minor(-10)),
            Err(LedgerError::Validation(_))
        ));
    }
}
