//! Shared fixtures for repository integration tests.

#![allow(dead_code)]

use potluck_core::auth::hash_password;
use potluck_core::voting::{ActionDetails, ActionStatus};
use potluck_db::entities::{sea_orm_active_enums::UserRole, users};
use potluck_db::migration::{Migrator, MigratorTrait};
use potluck_db::repositories::NewUser;
use potluck_db::{
    ActionRepository, DebtRepository, ExpenseRepository, GroupRepository, LockRegistry,
    UserRepository, WalletRepository,
};
use potluck_shared::types::{ActionId, GroupId, Money, UserId};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse battery";

/// Repositories over one in-memory database, sharing one lock registry.
pub struct Ledger {
    pub db: DatabaseConnection,
    pub users: UserRepository,
    pub groups: GroupRepository,
    pub actions: ActionRepository,
    pub wallet: WalletRepository,
    pub debts: DebtRepository,
    pub expenses: ExpenseRepository,
    pub locks: LockRegistry,
}

pub async fn setup() -> Ledger {
    // A single connection keeps every query on the same in-memory database.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None).await.expect("Failed to migrate");

    let locks = LockRegistry::new();
    Ledger {
        users: UserRepository::new(db.clone()),
        groups: GroupRepository::new(db.clone()),
        actions: ActionRepository::new(db.clone(), locks.clone()),
        wallet: WalletRepository::new(db.clone(), locks.clone()),
        debts: DebtRepository::new(db.clone()),
        expenses: ExpenseRepository::new(db.clone()),
        locks,
        db,
    }
}

impl Ledger {
    pub async fn user(&self, name: &str) -> users::Model {
        self.users
            .create(NewUser {
                username: format!("{name}-{}", &Uuid::new_v4().simple().to_string()[..8]),
                name: name.to_string(),
                password_hash: hash_password(PASSWORD).expect("Failed to hash"),
                role: UserRole::User,
            })
            .await
            .expect("Failed to create user")
    }

    /// Creates a group owned by the first user with every other user joined.
    pub async fn group_of(&self, members: &[&users::Model]) -> GroupId {
        let owner = UserId::from_uuid(members[0].id);
        let group = self
            .groups
            .create(owner, "Flat 4B", None)
            .await
            .expect("Failed to create group");
        let group_id = GroupId::from_uuid(group.group.id);

        for (joined, member) in members.iter().enumerate().skip(1) {
            let action = self
                .actions
                .propose(
                    group_id,
                    owner,
                    ActionDetails::member_add(UserId::from_uuid(member.id)),
                )
                .await
                .expect("Failed to propose member");
            // Everyone already in the group approves until the majority is reached.
            let mut voters = members[1..joined].iter();
            while action_pending(self, action.action.id).await {
                let voter = voters.next().expect("Ran out of voters");
                self.actions
                    .vote(
                        ActionId::from_uuid(action.action.id),
                        UserId::from_uuid(voter.id),
                        true,
                    )
                    .await
                    .expect("Failed to vote");
            }
        }
        group_id
    }

    /// Deposits into a member's wallet balance by proposing and approving unanimously.
    pub async fn deposit(
        &self,
        group_id: GroupId,
        members: &[&users::Model],
        who: &users::Model,
        amount: i64,
    ) {
        let action = self
            .actions
            .propose(
                group_id,
                UserId::from_uuid(who.id),
                ActionDetails::wallet_deposit(
                    UserId::from_uuid(who.id),
                    Money::from_minor(amount),
                    None,
                )
                .expect("Invalid deposit"),
            )
            .await
            .expect("Failed to propose deposit");
        for voter in members.iter().filter(|m| m.id != who.id) {
            if !action_pending(self, action.action.id).await {
                break;
            }
            self.actions
                .vote(
                    ActionId::from_uuid(action.action.id),
                    UserId::from_uuid(voter.id),
                    true,
                )
                .await
                .expect("Failed to vote");
        }
    }
}

pub async fn action_pending(ledger: &Ledger, action_id: Uuid) -> bool {
    ledger
        .actions
        .find(ActionId::from_uuid(action_id))
        .await
        .expect("Failed to load action")
        .status()
        == ActionStatus::Pending
}

pub fn uid(user: &users::Model) -> UserId {
    UserId::from_uuid(user.id)
}
