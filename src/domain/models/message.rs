use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const MAX_BODY_LENGTH: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageStatus {
    Pending,
    Sent,
    Failed,
    /// Status reported by the provider through a delivery callback
    /// (`delivered`, `undelivered`, `queued`, ...), stored verbatim.
    Provider(String),
}

impl MessageStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sent => "sent",
            MessageStatus::Failed => "failed",
            MessageStatus::Provider(value) => value.as_str(),
        }
    }

    /// Normalizes a stored or provider supplied status. Returns `None` for
    /// blank input.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Some(match value.as_str() {
            "" => return None,
            "pending" => MessageStatus::Pending,
            "sent" => MessageStatus::Sent,
            "failed" => MessageStatus::Failed,
            _ => MessageStatus::Provider(value),
        })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MessageStatus::Pending)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledMessage {
    pub id: Uuid,
    pub recipient: String,
    pub body: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: MessageStatus,
    pub provider_ref: Option<String>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledMessage {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status.is_pending() && self.scheduled_at <= now
    }
}

#[derive(Debug, Clone)]
pub struct NewScheduledMessage {
    pub recipient: String,
    pub body: String,
    pub scheduled_at: DateTime<Utc>,
}

/// Result of a dispatch attempt as written back by the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchRecord {
    Sent { provider_ref: String },
    Failed { reason: String },
}

impl DispatchRecord {
    pub fn status(&self) -> MessageStatus {
        match self {
            DispatchRecord::Sent { .. } => MessageStatus::Sent,
            DispatchRecord::Failed { .. } => MessageStatus::Failed,
        }
    }
}

/// How an inbound delivery callback is matched against stored messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationKey {
    ProviderRef(String),
    Recipient(String),
}

#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Updated(ScheduledMessage),
    NotFound,
    NotPending(MessageStatus),
}
