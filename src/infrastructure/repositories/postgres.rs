use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, postgres::PgPoolOptions};
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

pub type PgPool = Pool<Postgres>;

const COLUMNS: &str = "id, recipient, body, scheduled_at, status, provider_ref, last_error, created_at, updated_at";

pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

#[derive(Clone)]
pub struct PostgresScheduledMessageRepository {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PostgresScheduledMessageRepository {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self { pool, clock })
    }
}

#[async_trait]
impl ScheduledMessageRepository for PostgresScheduledMessageRepository {
    async fn insert(&self, message: NewScheduledMessage) -> anyhow::Result<ScheduledMessage> {
        let now = self.clock.now();
        let record = sqlx::query_as::<_, ScheduledMessageRecord>(&format!(
            r#"
            INSERT INTO scheduled_messages (
                id, recipient, body, scheduled_at, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&message.recipient)
        .bind(&message.body)
        .bind(message.scheduled_at)
        .bind(MessageStatus::Pending.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        record.try_into()
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<ScheduledMessage>> {
        let record = sqlx::query_as::<_, ScheduledMessageRecord>(&format!(
            "SELECT {COLUMNS} FROM scheduled_messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        record.map(|record| record.try_into()).transpose()
    }

    async fn list(&self) -> anyhow::Result<Vec<ScheduledMessage>> {
        let rows = sqlx::query_as::<_, ScheduledMessageRecord>(&format!(
            "SELECT {COLUMNS} FROM scheduled_messages ORDER BY scheduled_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|record| record.try_into()).collect()
    }

    async fn update(&self, message: &ScheduledMessage) -> anyhow::Result<UpdateOutcome> {
        let record = sqlx::query_as::<_, ScheduledMessageRecord>(&format!(
            r#"
            UPDATE scheduled_messages
            SET recipient = $2,
                body = $3,
                scheduled_at = $4,
                updated_at = $5
            WHERE id = $1
              AND status = 'pending'
            RETURNING {COLUMNS}
            "#
        ))
        .bind(message.id)
        .bind(&message.recipient)
        .bind(&message.body)
        .bind(message.scheduled_at)
        .bind(self.clock.now())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(record) = record {
            return Ok(UpdateOutcome::Updated(record.try_into()?));
        }

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM scheduled_messages WHERE id = $1")
                .bind(message.id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(match status {
            None => UpdateOutcome::NotFound,
            Some(status) => UpdateOutcome::NotPending(parse_status(&status)?),
        })
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM scheduled_messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_due(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<ScheduledMessage>> {
        let rows = sqlx::query_as::<_, ScheduledMessageRecord>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM scheduled_messages
            WHERE status = 'pending'
              AND scheduled_at <= $1
            ORDER BY scheduled_at ASC
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|record| record.try_into()).collect()
    }

    async fn record_dispatch(
        &self,
        id: Uuid,
        record: DispatchRecord,
    ) -> anyhow::Result<Option<ScheduledMessage>> {
        let status = record.status();
        let (provider_ref, last_error) = match record {
            DispatchRecord::Sent { provider_ref } => (Some(provider_ref), None),
            DispatchRecord::Failed { reason } => (None, Some(reason)),
        };

        let row = sqlx::query_as::<_, ScheduledMessageRecord>(&format!(
            r#"
            UPDATE scheduled_messages
            SET status = $2,
                provider_ref = COALESCE($3, provider_ref),
                last_error = $4,
                updated_at = $5
            WHERE id = $1
              AND status = 'pending'
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(provider_ref)
        .bind(last_error)
        .bind(self.clock.now())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|record| record.try_into()).transpose()
    }

    async fn apply_status(
        &self,
        key: &CorrelationKey,
        status: MessageStatus,
    ) -> anyhow::Result<u64> {
        let (column, value) = match key {
            CorrelationKey::ProviderRef(reference) => ("provider_ref", reference),
            CorrelationKey::Recipient(recipient) => ("recipient", recipient),
        };
        let result = sqlx::query(&format!(
            r#"
            UPDATE scheduled_messages
            SET status = $2,
                updated_at = $3
            WHERE {column} = $1
            "#
        ))
        .bind(value)
        .bind(status.as_str())
        .bind(self.clock.now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(FromRow)]
struct ScheduledMessageRecord {
    id: Uuid,
    recipient: String,
    body: String,
    scheduled_at: DateTime<Utc>,
    status: String,
    provider_ref: Option<String>,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ScheduledMessageRecord> for ScheduledMessage {
    type Error = anyhow::Error;

    fn try_from(value: ScheduledMessageRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            recipient: value.recipient,
            body: value.body,
            scheduled_at: value.scheduled_at,
            status: parse_status(&value.status)?,
            provider_ref: value.provider_ref,
            last_error: value.last_error,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

fn parse_status(value: &str) -> anyhow::Result<MessageStatus> {
    MessageStatus::parse(value).ok_or_else(|| anyhow::anyhow!("empty message status"))
}
