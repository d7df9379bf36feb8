//! Concurrent access tests for votes and wallet writes.
//!
//! These tests verify that:
//! - Concurrent votes on one action flip it exactly once
//! - A confirmed action is materialized exactly once
//! - Concurrent withdrawals never overdraw a member's balance

mod common;

use std::sync::Arc;

use common::{PASSWORD, setup, uid};
use futures::future::join_all;
use potluck_core::LedgerError;
use potluck_core::voting::{ActionDetails, ActionStatus, ExpensePayer};
use potluck_shared::types::{ActionId, Money};
use tokio::sync::Barrier;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_flip_action_once() {
    let ledger = setup().await;
    let mut members = Vec::new();
    for name in ["a", "b", "c", "d", "e"] {
        members.push(ledger.user(name).await);
    }
    let refs: Vec<_> = members.iter().collect();
    let group = ledger.group_of(&refs).await;

    let participants: Vec<_> = members.iter().map(uid).collect();
    let details = ActionDetails::expense(
        "Weekend trip",
        Money::from_minor(50_000),
        &participants,
        "Transport",
        ExpensePayer::Member {
            user_id: uid(&members[0]),
        },
    )
    .unwrap();
    let view = ledger
        .actions
        .propose(group, uid(&members[0]), details)
        .await
        .unwrap();
    let action_id = ActionId::from_uuid(view.action.id);

    let barrier = Arc::new(Barrier::new(4));
    let tasks = members[1..].iter().map(|voter| {
        let actions = ledger.actions.clone();
        let barrier = Arc::clone(&barrier);
        let voter = uid(voter);
        tokio::spawn(async move {
            barrier.wait().await;
            actions.vote(action_id, voter, true).await
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("vote task panicked"))
        .collect();

    let confirmed = results
        .iter()
        .filter(|r| matches!(r, Ok(v) if v.status() == ActionStatus::Confirmed))
        .count();
    let closed = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::ActionClosed(_))))
        .count();
    // Votes two and three are accepted; the third confirms, the rest arrive too late.
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 2);
    assert_eq!(confirmed, 1);
    assert_eq!(closed, 2);

    let view = ledger.actions.find(action_id).await.unwrap();
    assert_eq!(view.status(), ActionStatus::Confirmed);
    assert_eq!(view.tally.votes_for, 3);

    assert_eq!(ledger.expenses.list(&[group]).await.unwrap().len(), 1);
    assert_eq!(ledger.debts.history(&[group]).await.unwrap().len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() {
    let ledger = setup().await;
    let alice = ledger.user("alice").await;
    let group = ledger.group_of(&[&alice]).await;
    ledger.deposit(group, &[&alice], &alice, 1_000).await;

    let barrier = Arc::new(Barrier::new(5));
    let tasks = (0..5).map(|_| {
        let wallet = ledger.wallet.clone();
        let barrier = Arc::clone(&barrier);
        let user = uid(&alice);
        tokio::spawn(async move {
            barrier.wait().await;
            wallet
                .withdraw(group, user, Money::from_minor(300), PASSWORD)
                .await
        })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("withdraw task panicked"))
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, LedgerError::InsufficientFunds { .. }))
    );
    let balance = ledger.wallet.balance(group).await.unwrap();
    assert_eq!(balance.total, Money::from_minor(100));
}
