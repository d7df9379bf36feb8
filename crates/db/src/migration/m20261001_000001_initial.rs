//! Initial database migration.
//!
//! Creates the ledger tables: users, groups and membership, categories,
//! expenses with their participants and debts, payments, the wallet log,
//! pending actions and their ballots.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // PART 1: IDENTITY
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Users::Username)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Role).string_len(16).not_null())
                    .col(ColumnDef::new(Users::IsActive).boolean().not_null())
                    .col(ColumnDef::new(Users::IsBanned).boolean().not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 2: GROUPS & MEMBERSHIP
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Groups::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Groups::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Groups::Description).text())
                    .col(ColumnDef::new(Groups::OwnerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Groups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_groups_owner")
                            .from(Groups::Table, Groups::OwnerId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupMembers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GroupMembers::GroupId).uuid().not_null())
                    .col(ColumnDef::new(GroupMembers::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(GroupMembers::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GroupMembers::ActionId).uuid().null())
                    .primary_key(
                        Index::create()
                            .col(GroupMembers::GroupId)
                            .col(GroupMembers::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_members_group")
                            .from(GroupMembers::Table, GroupMembers::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_members_user")
                            .from(GroupMembers::Table, GroupMembers::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_members_user")
                    .table(GroupMembers::Table)
                    .col(GroupMembers::UserId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 3: CATEGORIES
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Categories::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Categories::Name)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 4: PENDING ACTIONS & BALLOTS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(PendingActions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PendingActions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PendingActions::GroupId).uuid().not_null())
                    .col(
                        ColumnDef::new(PendingActions::ActionType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PendingActions::Status).string_len(16).not_null())
                    .col(ColumnDef::new(PendingActions::Details).json().not_null())
                    .col(ColumnDef::new(PendingActions::Description).text().not_null())
                    .col(ColumnDef::new(PendingActions::InitiatorId).uuid().not_null())
                    .col(
                        ColumnDef::new(PendingActions::RequiredVotes)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PendingActions::ResolutionNote).text())
                    .col(
                        ColumnDef::new(PendingActions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PendingActions::ResolvedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pending_actions_group")
                            .from(PendingActions::Table, PendingActions::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pending_actions_initiator")
                            .from(PendingActions::Table, PendingActions::InitiatorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pending_actions_group_status")
                    .table(PendingActions::Table)
                    .col(PendingActions::GroupId)
                    .col(PendingActions::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ActionVotes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ActionVotes::ActionId).uuid().not_null())
                    .col(ColumnDef::new(ActionVotes::VoterId).uuid().not_null())
                    .col(ColumnDef::new(ActionVotes::Position).integer().not_null())
                    .col(ColumnDef::new(ActionVotes::Vote).boolean())
                    .col(ColumnDef::new(ActionVotes::CastAt).timestamp_with_time_zone())
                    // One ballot per (action, voter).
                    .primary_key(
                        Index::create()
                            .col(ActionVotes::ActionId)
                            .col(ActionVotes::VoterId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_action_votes_action")
                            .from(ActionVotes::Table, ActionVotes::ActionId)
                            .to(PendingActions::Table, PendingActions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_action_votes_voter")
                            .from(ActionVotes::Table, ActionVotes::VoterId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_action_votes_voter")
                    .table(ActionVotes::Table)
                    .col(ActionVotes::VoterId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 5: EXPENSES, DEBTS & PAYMENTS
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Expenses::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Expenses::GroupId).uuid().not_null())
                    .col(ColumnDef::new(Expenses::ActionId).uuid().not_null().unique_key())
                    .col(ColumnDef::new(Expenses::Description).text().not_null())
                    .col(ColumnDef::new(Expenses::TotalAmount).big_integer().not_null())
                    .col(ColumnDef::new(Expenses::CategoryId).uuid().not_null())
                    .col(ColumnDef::new(Expenses::PayerId).uuid())
                    .col(ColumnDef::new(Expenses::PaidFromWallet).boolean().not_null())
                    .col(
                        ColumnDef::new(Expenses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_group")
                            .from(Expenses::Table, Expenses::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_action")
                            .from(Expenses::Table, Expenses::ActionId)
                            .to(PendingActions::Table, PendingActions::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_category")
                            .from(Expenses::Table, Expenses::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_payer")
                            .from(Expenses::Table, Expenses::PayerId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExpenseParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseParticipants::ExpenseId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExpenseParticipants::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ExpenseParticipants::ShareAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ExpenseParticipants::ExpenseId)
                            .col(ExpenseParticipants::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expense_participants_expense")
                            .from(ExpenseParticipants::Table, ExpenseParticipants::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expense_participants_user")
                            .from(ExpenseParticipants::Table, ExpenseParticipants::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Debts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Debts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Debts::ExpenseId).uuid().not_null())
                    .col(ColumnDef::new(Debts::DebtorId).uuid().not_null())
                    .col(ColumnDef::new(Debts::CreditorId).uuid().not_null())
                    .col(ColumnDef::new(Debts::TotalAmount).big_integer().not_null())
                    .col(ColumnDef::new(Debts::RemainingAmount).big_integer().not_null())
                    .col(ColumnDef::new(Debts::IsSettled).boolean().not_null())
                    .col(
                        ColumnDef::new(Debts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(Debts::RemainingAmount).gte(0))
                    .check(
                        Expr::col(Debts::RemainingAmount).lte(Expr::col(Debts::TotalAmount)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_debts_expense")
                            .from(Debts::Table, Debts::ExpenseId)
                            .to(Expenses::Table, Expenses::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_debts_debtor")
                            .from(Debts::Table, Debts::DebtorId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_debts_creditor")
                            .from(Debts::Table, Debts::CreditorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One debt per (debtor, creditor, expense).
        manager
            .create_index(
                Index::create()
                    .name("uq_debts_debtor_creditor_expense")
                    .table(Debts::Table)
                    .col(Debts::DebtorId)
                    .col(Debts::CreditorId)
                    .col(Debts::ExpenseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payments::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Payments::DebtId).uuid().not_null())
                    .col(ColumnDef::new(Payments::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Payments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(Payments::Amount).gt(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_debt")
                            .from(Payments::Table, Payments::DebtId)
                            .to(Debts::Table, Debts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payments_debt")
                    .table(Payments::Table)
                    .col(Payments::DebtId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // PART 6: WALLET
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(WalletTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WalletTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WalletTransactions::GroupId).uuid().not_null())
                    .col(ColumnDef::new(WalletTransactions::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(WalletTransactions::TxType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::Description)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(WalletTransactions::ActionId).uuid())
                    .col(
                        ColumnDef::new(WalletTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wallet_transactions_group")
                            .from(WalletTransactions::Table, WalletTransactions::GroupId)
                            .to(Groups::Table, Groups::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wallet_transactions_user")
                            .from(WalletTransactions::Table, WalletTransactions::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wallet_transactions_action")
                            .from(WalletTransactions::Table, WalletTransactions::ActionId)
                            .to(PendingActions::Table, PendingActions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wallet_transactions_group_user")
                    .table(WalletTransactions::Table)
                    .col(WalletTransactions::GroupId)
                    .col(WalletTransactions::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wallet_transactions_action")
                    .table(WalletTransactions::Table)
                    .col(WalletTransactions::ActionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Children before parents.
        manager
            .drop_table(Table::drop().table(WalletTransactions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Debts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseParticipants::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ActionVotes::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PendingActions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupMembers::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Name,
    PasswordHash,
    Role,
    IsActive,
    IsBanned,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Groups {
    Table,
    Id,
    Name,
    Description,
    OwnerId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum GroupMembers {
    Table,
    GroupId,
    UserId,
    JoinedAt,
    ActionId,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum PendingActions {
    Table,
    Id,
    GroupId,
    ActionType,
    Status,
    Details,
    Description,
    InitiatorId,
    RequiredVotes,
    ResolutionNote,
    CreatedAt,
    ResolvedAt,
}

#[derive(DeriveIden)]
enum ActionVotes {
    Table,
    ActionId,
    VoterId,
    Position,
    Vote,
    CastAt,
}

#[derive(DeriveIden)]
enum Expenses {
    Table,
    Id,
    GroupId,
    ActionId,
    Description,
    TotalAmount,
    CategoryId,
    PayerId,
    PaidFromWallet,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ExpenseParticipants {
    Table,
    ExpenseId,
    UserId,
    ShareAmount,
}

#[derive(DeriveIden)]
enum Debts {
    Table,
    Id,
    ExpenseId,
    DebtorId,
    CreditorId,
    TotalAmount,
    RemainingAmount,
    IsSettled,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Payments {
    Table,
    Id,
    DebtId,
    Amount,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WalletTransactions {
    Table,
    Id,
    GroupId,
    UserId,
    TxType,
    Amount,
    Description,
    Status,
    ActionId,
    CreatedAt,
}
