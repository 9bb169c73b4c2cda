use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    application::services::clock::Clock,
    domain::{
        models::{
            CorrelationKey, DispatchRecord, MessageStatus, NewScheduledMessage, ScheduledMessage,
            UpdateOutcome,
        },
        repositories::ScheduledMessageRepository,
    },
};

pub struct InMemoryScheduledMessageRepository {
    messages: Arc<RwLock<HashMap<Uuid, ScheduledMessage>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryScheduledMessageRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            messages: Arc::default(),
            clock,
        }
    }
}

#[async_trait]
impl ScheduledMessageRepository for InMemoryScheduledMessageRepository {
    async fn insert(&self, message: NewScheduledMessage) -> anyhow::Result<ScheduledMessage> {
        let now = self.clock.now();
        let entry = ScheduledMessage {
            id: Uuid::new_v4(),
            recipient: message.recipient,
            body: message.body,
            scheduled_at: message.scheduled_at,
            status: MessageStatus::Pending,
            provider_ref: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        let mut messages = self.messages.write().await;
        messages.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<ScheduledMessage>> {
        let messages = self.messages.read().await;
        Ok(messages.get(&id).cloned())
    }

    async fn list(&self) -> anyhow::Result<Vec<ScheduledMessage>> {
        let messages = self.messages.read().await;
        let mut entries: Vec<_> = messages.values().cloned().collect();
        entries.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        Ok(entries)
    }

    async fn update(&self, message: &ScheduledMessage) -> anyhow::Result<UpdateOutcome> {
        let mut messages = self.messages.write().await;
        let Some(entry) = messages.get_mut(&message.id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if !entry.status.is_pending() {
            return Ok(UpdateOutcome::NotPending(entry.status.clone()));
        }
        entry.recipient = message.recipient.clone();
        entry.body = message.body.clone();
        entry.scheduled_at = message.scheduled_at;
        entry.updated_at = self.clock.now();
        Ok(UpdateOutcome::Updated(entry.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut messages = self.messages.write().await;
        Ok(messages.remove(&id).is_some())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<ScheduledMessage>> {
        let messages = self.messages.read().await;
        let mut due: Vec<_> = messages
            .values()
            .filter(|m| m.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|m| m.scheduled_at);
        Ok(due)
    }

    async fn record_dispatch(
        &self,
        id: Uuid,
        record: DispatchRecord,
    ) -> anyhow::Result<Option<ScheduledMessage>> {
        let mut messages = self.messages.write().await;
        let Some(entry) = messages.get_mut(&id) else {
            return Ok(None);
        };
        if !entry.status.is_pending() {
            return Ok(None);
        }
        entry.status = record.status();
        match record {
            DispatchRecord::Sent { provider_ref } => {
                entry.provider_ref = Some(provider_ref);
                entry.last_error = None;
            }
            DispatchRecord::Failed { reason } => entry.last_error = Some(reason),
        }
        entry.updated_at = self.clock.now();
        Ok(Some(entry.clone()))
    }

    async fn apply_status(
        &self,
        key: &CorrelationKey,
        status: MessageStatus,
    ) -> anyhow::Result<u64> {
        let now = self.clock.now();
        let mut messages = self.messages.write().await;
        let mut touched = 0;
        for entry in messages.values_mut() {
            let matches = match key {
                CorrelationKey::ProviderRef(reference) => {
                    entry.provider_ref.as_deref() == Some(reference.as_str())
                }
                CorrelationKey::Recipient(recipient) => entry.recipient == *recipient,
            };
            if matches {
                entry.status = status.clone();
                entry.updated_at = now;
                touched += 1;
            }
        }
        Ok(touched)
    }
}
