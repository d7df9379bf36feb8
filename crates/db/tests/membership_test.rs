//! Integration tests for membership changes and account deletion.

mod common;

use common::{setup, uid};
use potluck_core::LedgerError;
use potluck_core::voting::{ActionDetails, ActionStatus, ExpensePayer};
use potluck_shared::types::{ActionId, Money};

#[tokio::test]
async fn test_member_with_open_debt_cannot_be_removed() {
    let ledger = setup().await;
    let alice = ledger.user("alice").await;
    let bob = ledger.user("bob").await;
    let group = ledger.group_of(&[&alice, &bob]).await;

    let details = ActionDetails::expense(
        "Rent",
        Money::from_minor(80_000),
        &[uid(&alice), uid(&bob)],
        "Rent",
        ExpensePayer::Member { user_id: uid(&alice) },
    )
    .unwrap();
    let view = ledger.actions.propose(group, uid(&alice), details).await.unwrap();
    ledger
        .actions
        .vote(ActionId::from_uuid(view.action.id), uid(&bob), true)
        .await
        .unwrap();

    let err = ledger
        .actions
        .propose(group, uid(&alice), ActionDetails::member_remove(uid(&bob)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
}

#[tokio::test]
async fn test_owner_cannot_be_removed() {
    let ledger = setup().await;
    let alice = ledger.user("alice").await;
    let bob = ledger.user("bob").await;
    let group = ledger.group_of(&[&alice, &bob]).await;

    let err = ledger
        .actions
        .propose(group, uid(&bob), ActionDetails::member_remove(uid(&alice)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));
}

#[tokio::test]
async fn test_member_removal_after_vote() {
    let ledger = setup().await;
    let alice = ledger.user("alice").await;
    let bob = ledger.user("bob").await;
    let carol = ledger.user("carol").await;
    let group = ledger.group_of(&[&alice, &bob, &carol]).await;

    let view = ledger
        .actions
        .propose(group, uid(&alice), ActionDetails::member_remove(uid(&carol)))
        .await
        .unwrap();
    let view = ledger
        .actions
        .vote(ActionId::from_uuid(view.action.id), uid(&bob), true)
        .await
        .unwrap();
    assert_eq!(view.status(), ActionStatus::Confirmed);

    let members = ledger.groups.find(group).await.unwrap().members;
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m.id != carol.id));
    assert!(ledger.groups.group_ids_for(uid(&carol)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_banned_user_cannot_be_added() {
    let ledger = setup().await;
    let alice = ledger.user("alice").await;
    let bob = ledger.user("bob").await;
    let group = ledger.group_of(&[&alice]).await;

    ledger.users.set_banned(uid(&bob), true).await.unwrap();
    let err = ledger
        .actions
        .propose(group, uid(&alice), ActionDetails::member_add(uid(&bob)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));

    ledger.users.set_banned(uid(&bob), false).await.unwrap();
    let view = ledger
        .actions
        .propose(group, uid(&alice), ActionDetails::member_add(uid(&bob)))
        .await
        .unwrap();
    assert_eq!(view.status(), ActionStatus::Confirmed);
}

#[tokio::test]
async fn test_user_deletion_guards() {
    let ledger = setup().await;
    let alice = ledger.user("alice").await;
    let bob = ledger.user("bob").await;
    let group = ledger.group_of(&[&alice, &bob]).await;

    // Owners cannot be deleted.
    let err = ledger.users.delete(uid(&alice), &ledger.locks).await.unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    // Neither can members holding money.
    ledger.deposit(group, &[&alice, &bob], &bob, 100).await;
    let err = ledger.users.delete(uid(&bob), &ledger.locks).await.unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));

    ledger
        .wallet
        .withdraw(group, uid(&bob), Money::from_minor(100), common::PASSWORD)
        .await
        .unwrap();
    ledger.users.delete(uid(&bob), &ledger.locks).await.unwrap();

    let deleted = ledger.users.find_by_id(uid(&bob)).await.unwrap();
    assert!(!deleted.is_active);
    assert_eq!(ledger.groups.find(group).await.unwrap().members.len(), 1);
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let ledger = setup().await;
    let alice = ledger.user("alice").await;

    let err = ledger
        .users
        .create(potluck_db::repositories::NewUser {
            username: alice.username.to_uppercase(),
            name: "Other Alice".to_string(),
            password_hash: alice.password_hash.clone(),
            role: alice.role,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Conflict(_)));
}

#[tokio::test]
async fn test_deleting_the_other_voter_rejects_open_action() {
    let ledger = setup().await;
    let alice = ledger.user("alice").await;
    let bob = ledger.user("bob").await;
    let group = ledger.group_of(&[&alice, &bob]).await;

    let deposit = ActionDetails::wallet_deposit(uid(&alice), Money::from_minor(500), None).unwrap();
    let view = ledger.actions.propose(group, uid(&alice), deposit).await.unwrap();
    let action_id = ActionId::from_uuid(view.action.id);
    assert_eq!(view.status(), ActionStatus::Pending);
    assert_eq!(view.tally.required, 2);

    ledger.users.delete(uid(&bob), &ledger.locks).await.unwrap();

    let view = ledger.actions.find(action_id).await.unwrap();
    assert_eq!(view.status(), ActionStatus::Rejected);
    assert!(view.action.resolution_note.is_some());
    assert!(view.action.resolved_at.is_some());

    let err = ledger.actions.vote(action_id, uid(&bob), true).await.unwrap_err();
    assert!(matches!(err, LedgerError::ActionClosed(_)));
    assert!(ledger.wallet.transactions(group).await.unwrap().is_empty());
    assert!(ledger.locks.is_empty());
}

#[tokio::test]
async fn test_removals_reject_action_that_lost_its_majority() {
    let ledger = setup().await;
    let alice = ledger.user("alice").await;
    let bob = ledger.user("bob").await;
    let carol = ledger.user("carol").await;
    let dave = ledger.user("dave").await;
    let group = ledger.group_of(&[&alice, &bob, &carol, &dave]).await;

    let deposit = ActionDetails::wallet_deposit(uid(&alice), Money::from_minor(500), None).unwrap();
    let open = ledger.actions.propose(group, uid(&alice), deposit).await.unwrap();
    let open_id = ActionId::from_uuid(open.action.id);
    assert_eq!(open.tally.required, 3);

    // Bob leaves: three ballots remain castable, so three approvals are still possible.
    let remove_bob = ledger
        .actions
        .propose(group, uid(&alice), ActionDetails::member_remove(uid(&bob)))
        .await
        .unwrap();
    let remove_bob = ActionId::from_uuid(remove_bob.action.id);
    ledger.actions.vote(remove_bob, uid(&carol), true).await.unwrap();
    let view = ledger.actions.vote(remove_bob, uid(&dave), true).await.unwrap();
    assert_eq!(view.status(), ActionStatus::Confirmed);
    assert!(common::action_pending(&ledger, open.action.id).await);

    // Carol leaves too: only alice and dave can approve, short of three.
    let remove_carol = ledger
        .actions
        .propose(group, uid(&alice), ActionDetails::member_remove(uid(&carol)))
        .await
        .unwrap();
    let view = ledger
        .actions
        .vote(ActionId::from_uuid(remove_carol.action.id), uid(&dave), true)
        .await
        .unwrap();
    assert_eq!(view.status(), ActionStatus::Confirmed);

    let open = ledger.actions.find(open_id).await.unwrap();
    assert_eq!(open.status(), ActionStatus::Rejected);
    assert!(open.action.resolution_note.is_some());

    let err = ledger.actions.vote(open_id, uid(&dave), true).await.unwrap_err();
    assert!(matches!(err, LedgerError::ActionClosed(_)));
}
