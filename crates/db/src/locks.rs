//! In-process locks serializing work on one aggregate.
//!
//! Votes on the same pending action, and wallet writes in the same group,
//! must run one at a time so the check-then-write inside each database
//! transaction sees the previous writer's commit. Locks are taken before a
//! transaction begins and always in the order action, then wallet. An entry
//! lives only while its lock is held or awaited.

use std::sync::Arc;

use dashmap::DashMap;
use potluck_shared::types::{ActionId, GroupId};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Aggregate a lock protects.
///
/// The derived order puts every action before every wallet; locks taken
/// together are always acquired in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    /// A pending action's tally and status.
    Action(ActionId),
    /// A group's wallet log and the debts settled from it.
    GroupWallet(GroupId),
}

type LockMap = Arc<DashMap<LockKey, Arc<Mutex<()>>>>;

/// Held locks, released on drop.
///
/// Releasing a lock nobody else is waiting for also drops its map entry.
#[derive(Debug)]
pub struct LockGuard {
    locks: LockMap,
    held: Vec<(LockKey, OwnedMutexGuard<()>)>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        for (key, guard) in self.held.drain(..).rev() {
            drop(guard);
            // Waiters hold a clone of the mutex, so the entry survives them.
            self.locks
                .remove_if(&key, |_, mutex| Arc::strong_count(mutex) == 1);
        }
    }
}

/// Registry of per-aggregate async mutexes, shared by every repository
/// instance in the process.
#[derive(Debug, Clone, Default)]
pub struct LockRegistry {
    locks: LockMap,
}

impl LockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn mutex(&self, key: LockKey) -> Arc<Mutex<()>> {
        // The map shard guard is dropped before awaiting the mutex.
        Arc::clone(self.locks.entry(key).or_default().value())
    }

    /// Locks one aggregate.
    pub async fn lock(&self, key: LockKey) -> LockGuard {
        self.lock_all([key]).await
    }

    /// Locks an action and, when `wallet` is set, its group wallet after it.
    pub async fn lock_action(&self, action: ActionId, wallet: Option<GroupId>) -> LockGuard {
        self.lock_all(
            std::iter::once(LockKey::Action(action)).chain(wallet.map(LockKey::GroupWallet)),
        )
        .await
    }

    /// Locks every key, actions first and each kind in id order.
    pub async fn lock_all(&self, keys: impl IntoIterator<Item = LockKey>) -> LockGuard {
        let mut keys: Vec<LockKey> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();

        let mut held = Vec::with_capacity(keys.len());
        for key in keys {
            let guard = self.mutex(key).lock_owned().await;
            held.push((key, guard));
        }
        LockGuard {
            locks: Arc::clone(&self.locks),
            held,
        }
    }

    /// Number of aggregates currently locked or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no aggregate is locked or awaited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
