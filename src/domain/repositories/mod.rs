use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::models::{
    CorrelationKey, DispatchRecord, MessageStatus, NewScheduledMessage, ScheduledMessage,
    UpdateOutcome,
};

/// Durable storage for scheduled messages. Every method is atomic for a
/// single record and refreshes `updated_at` when it mutates one.
#[async_trait]
pub trait ScheduledMessageRepository: Send + Sync {
    async fn insert(&self, message: NewScheduledMessage) -> anyhow::Result<ScheduledMessage>;

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<ScheduledMessage>>;

    /// All messages, latest `scheduled_at` first.
    async fn list(&self) -> anyhow::Result<Vec<ScheduledMessage>>;

    /// Replaces recipient, body and schedule only while the stored message is
    /// still pending.
    async fn update(&self, message: &ScheduledMessage) -> anyhow::Result<UpdateOutcome>;

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;

    /// Pending messages with `scheduled_at <= now`, oldest first.
    async fn find_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<ScheduledMessage>>;

    /// Stores the outcome of a dispatch. Returns `None` when the message was
    /// deleted or is no longer pending.
    async fn record_dispatch(
        &self,
        id: Uuid,
        record: DispatchRecord,
    ) -> anyhow::Result<Option<ScheduledMessage>>;

    /// Sets `status` on every message matching `key`, returning how many
    /// were touched.
    async fn apply_status(
        &self,
        key: &CorrelationKey,
        status: MessageStatus,
    ) -> anyhow::Result<u64>;
}
