//! `SeaORM` entity definitions for the ledger schema.

pub mod prelude;

pub mod action_votes;
pub mod categories;
pub mod debts;
pub mod expense_participants;
pub mod expenses;
pub mod group_members;
pub mod groups;
pub mod payments;
pub mod pending_actions;
pub mod sea_orm_active_enums;
pub mod users;
pub mod wallet_transactions;
