use std::sync::Arc;

use crate::domain::{
    errors::DomainError,
    models::{CorrelationKey, MessageStatus},
    repositories::ScheduledMessageRepository,
};

/// Delivery status report pushed by the provider.
#[derive(Debug, Clone, Default)]
pub struct DeliveryStatusUpdate {
    pub provider_ref: Option<String>,
    pub recipient: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelatedBy {
    ProviderRef,
    Recipient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub matched: u64,
    /// `None` when the callback carried neither a reference nor a recipient.
    pub correlated_by: Option<CorrelatedBy>,
}

/// Applies provider callbacks to stored messages. Last write wins and
/// replaying a callback leaves the same final status.
pub struct StatusReconciler {
    repo: Arc<dyn ScheduledMessageRepository>,
}

impl StatusReconciler {
    pub fn new(repo: Arc<dyn ScheduledMessageRepository>) -> Self {
        Self { repo }
    }

    /// A provider reference is authoritative: when present, only messages
    /// carrying it are touched. The recipient is used only when no
    /// reference was supplied.
    pub async fn apply(
        &self,
        update: DeliveryStatusUpdate,
    ) -> Result<ReconcileSummary, DomainError> {
        let status = MessageStatus::parse(&update.status)
            .ok_or_else(|| DomainError::Validation("status must not be empty".to_string()))?;
        if status.is_pending() {
            return Err(DomainError::Validation(
                "'pending' is not a delivery status".to_string(),
            ));
        }

        let provider_ref = non_blank(update.provider_ref);
        let recipient = non_blank(update.recipient);
        let (key, correlated_by) = match (provider_ref, recipient) {
            (Some(reference), _) => (
                CorrelationKey::ProviderRef(reference),
                CorrelatedBy::ProviderRef,
            ),
            (None, Some(recipient)) => (
                CorrelationKey::Recipient(recipient),
                CorrelatedBy::Recipient,
            ),
            (None, None) => {
                tracing::debug!(%status, "delivery status without reference or recipient ignored");
                return Ok(ReconcileSummary {
                    matched: 0,
                    correlated_by: None,
                });
            }
        };

        let matched = self.repo.apply_status(&key, status.clone()).await?;
        match matched {
            0 => tracing::debug!(?key, %status, "delivery status matched no message"),
            1 => tracing::info!(?key, %status, "delivery status applied"),
            _ => tracing::warn!(
                ?key,
                %status,
                matched,
                "delivery status applied to several messages"
            ),
        }
        Ok(ReconcileSummary {
            matched,
            correlated_by: Some(correlated_by),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
