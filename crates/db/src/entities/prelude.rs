//! Entity re-exports.

pub use super::action_votes::Entity as ActionVotes;
pub use super::categories::Entity as Categories;
pub use super::debts::Entity as Debts;
pub use super::expense_participants::Entity as ExpenseParticipants;
pub use super::expenses::Entity as Expenses;
pub use super::group_members::Entity as GroupMembers;
pub use super::groups::Entity as Groups;
pub use super::payments::Entity as Payments;
pub use super::pending_actions::Entity as PendingActions;
pub use super::users::Entity as Users;
pub use super::wallet_transactions::Entity as WalletTransactions;
