//! Notification dispatch for pending actions.
//!
//! The ledger announces proposals and resolutions after they commit; how
//! members are actually reached (chat bot, e-mail, push) lives behind
//! [`Notifier`].

use async_trait::async_trait;
use potluck_shared::types::{ActionId, GroupId, UserId};
use serde::{Deserialize, Serialize};

use crate::voting::{ActionStatus, ActionType};

/// A committed change to a pending action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEvent {
    /// The action.
    pub action_id: ActionId,
    /// Owning group.
    pub group_id: GroupId,
    /// Kind of proposal.
    pub action_type: ActionType,
    /// Status after the change.
    pub status: ActionStatus,
    /// Proposer.
    pub initiator: UserId,
    /// Human-readable description.
    pub description: String,
    /// Members who should hear about it.
    pub recipients: Vec<UserId>,
}

/// Sink for action notifications.
///
/// Delivery is best effort: implementations log their own failures and
/// never fail the operation that triggered them.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A new action awaits votes.
    async fn action_proposed(&self, event: &ActionEvent);

    /// An action reached a terminal status.
    async fn action_resolved(&self, event: &ActionEvent);
}

/// Notifier that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn action_proposed(&self, _event: &ActionEvent) {}

    async fn action_resolved(&self, _event: &ActionEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<(&'static str, ActionStatus)>>);

    #[async_trait]
    impl Notifier for Recording {
        async fn action_proposed(&self, event: &ActionEvent) {
            self.0.lock().unwrap().push(("proposed", event.status));
        }

        async fn action_resolved(&self, event: &ActionEvent) {
            self.0.lock().unwrap().push(("resolved", event.status));
        }
    }

    fn event(status: ActionStatus) -> ActionEvent {
        ActionEvent {
            action_id: ActionId::new(),
            group_id: GroupId::new(),
            action_type: ActionType::Expense,
            status,
            initiator: UserId::new(),
            description: "Dinner".to_string(),
            recipients: vec![],
        }
    }

    #[tokio::test]
    async fn test_notifier_is_object_safe() {
        let recording = std::sync::Arc::new(Recording::default());
        let notifier: std::sync::Arc<dyn Notifier> = recording.clone();

        notifier.action_proposed(&event(ActionStatus::Pending)).await;
        notifier.action_resolved(&event(ActionStatus::Confirmed)).await;
        NoopNotifier.action_resolved(&event(ActionStatus::Rejected)).await;

        let seen = recording.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("proposed", ActionStatus::Pending),
                ("resolved", ActionStatus::Confirmed)
            ]
        );
    }
}
