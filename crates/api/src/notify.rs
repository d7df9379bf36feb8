//! Notifier that writes action events to the log.

use async_trait::async_trait;
use potluck_core::notify::{ActionEvent, Notifier};
use tracing::info;

/// Announces action events as structured log lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn action_proposed(&self, event: &ActionEvent) {
        info!(
            action_id = %event.action_id,
            group_id = %event.group_id,
            action_type = %event.action_type,
            recipients = event.recipients.len(),
            description = %event.description,
            "Action awaiting votes"
        );
    }

    async fn action_resolved(&self, event: &ActionEvent) {
        info!(
            action_id = %event.action_id,
            group_id = %event.group_id,
            action_type = %event.action_type,
            status = %event.status,
            recipients = event.recipients.len(),
            "Action resolved"
        );
    }
}
