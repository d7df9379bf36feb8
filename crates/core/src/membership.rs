//! Guards on leaving a group and on deleting an account.

use potluck_shared::types::Money;

use crate::error::{LedgerError, LedgerResult};

/// What the ledger still holds against a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Exposure {
    /// Unsettled debts the user owes or is owed.
    pub open_debts: u64,
    /// Wallet balance (one group, or summed over all groups).
    pub wallet_balance: Money,
}

/// Stateless membership rules.
pub struct MembershipRules;

impl MembershipRules {
    /// Checks that a member may be removed from a group.
    ///
    /// # Errors
    ///
    /// - `Forbidden` for the group owner
    /// - `Conflict` while the member has unsettled debts or a non-zero balance
    pub fn check_removal(is_owner: bool, exposure: Exposure) -> LedgerResult<()> {
        if is_owner {
            return Err(LedgerError::Forbidden(
                "the group owner cannot be removed".to_string(),
            ));
        }
        Self::check_clear(exposure, "remove member")
    }

    /// Checks that an account may be deleted.
    ///
    /// # Errors
    ///
    /// `Conflict` while the user has unsettled debts or a non-zero balance.
    pub fn check_deletion(exposure: Exposure) -> LedgerResult<()> {
        Self::check_clear(exposure, "delete user")
    }

    fn check_clear(exposure: Exposure, operation: &str) -> LedgerResult<()> {
        if exposure.open_debts > 0 {
            return Err(LedgerError::Conflict(format!(
                "cannot {operation}: {} unsettled debt(s)",
                exposure.open_debts
            )));
        }
        if !exposure.wallet_balance.is_zero() {
            return Err(LedgerError::Conflict(format!(
                "cannot {operation}: non-zero wallet balance of {}",
                exposure.wallet_balance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(false, 0, 0, true)]
    #[case(true, 0, 0, false)]
    #[case(false, 1, 0, false)]
    #[case(false, 0, 250, false)]
    #[case(false, 0, -250, false)]
    fn test_removal_guard(
        #[case] is_owner: bool,
        #[case] open_debts: u64,
        #[case] balance: i64,
        #[case] allowed: bool,
    ) {
        let exposure = Exposure {
            open_debts,
            wallet_balance: Money::from_minor(balance),
        };
        assert_eq!(MembershipRules::check_removal(is_owner, exposure).is_ok(), allowed);
    }

    #[test]
    fn test_deletion_message_names_balance() {
        let err = MembershipRules::check_deletion(Exposure {
            open_debts: 0,
            wallet_balance: Money::from_minor(1234),
        })
        .unwrap_err();
        assert!(err.to_string().contains("12.34"));
    }
}
