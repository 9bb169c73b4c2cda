use std::sync::Arc;

use crate::{
    application::services::delivery::{DeliveryClient, DeliveryOutcome},
    domain::{
        models::{DispatchRecord, ScheduledMessage},
        repositories::ScheduledMessageRepository,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    Sent,
    Failed,
    /// The message was deleted or left `Pending` while it was being sent.
    Discarded,
}

pub struct MessageDispatchHandler {
    repo: Arc<dyn ScheduledMessageRepository>,
    delivery: Arc<DeliveryClient>,
}

impl MessageDispatchHandler {
    pub fn new(repo: Arc<dyn ScheduledMessageRepository>, delivery: Arc<DeliveryClient>) -> Self {
        Self { repo, delivery }
    }

    pub async fn handle(&self, message: &ScheduledMessage) -> anyhow::Result<DispatchResult> {
        let (record, result, attempts) =
            match self.delivery.send(&message.recipient, &message.body).await {
                DeliveryOutcome::Delivered {
                    provider_ref,
                    attempts,
                } => (
                    DispatchRecord::Sent { provider_ref },
                    DispatchResult::Sent,
                    attempts,
                ),
                DeliveryOutcome::Failed { reason, attempts } => (
                    DispatchRecord::Failed { reason },
                    DispatchResult::Failed,
                    attempts,
                ),
            };

        match self.repo.record_dispatch(message.id, record).await? {
            Some(updated) => {
                tracing::info!(
                    message_id = %message.id,
                    status = %updated.status,
                    attempts,
                    "dispatch recorded"
                );
                Ok(result)
            }
            None => {
                tracing::warn!(
                    message_id = %message.id,
                    "message removed or no longer pending, dispatch result dropped"
                );
                Ok(DispatchResult::Discarded)
            }
        }
    }
}
