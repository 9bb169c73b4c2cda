use std::sync::Arc;

use crate::{
    application::{
        services::clock::Clock,
        usecases::validation::{parse_scheduled_at, validate_content},
    },
    domain::{
        errors::DomainError,
        models::{NewScheduledMessage, ScheduledMessage},
        repositories::ScheduledMessageRepository,
    },
};

pub struct ScheduleMessageUseCase {
    repo: Arc<dyn ScheduledMessageRepository>,
    clock: Arc<dyn Clock>,
}

pub struct ScheduleMessageRequest {
    pub recipient: String,
    pub body: String,
    pub scheduled_at: String,
}

impl ScheduleMessageUseCase {
    pub fn new(repo: Arc<dyn ScheduledMessageRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn execute(
        &self,
        request: ScheduleMessageRequest,
    ) -> Result<ScheduledMessage, DomainError> {
        validate_content(&request.recipient, &request.body)?;
        let scheduled_at = parse_scheduled_at(&request.scheduled_at)?;
        if scheduled_at <= self.clock.now() {
            return Err(DomainError::Validation(
                "scheduled time must be in the future".to_string(),
            ));
        }

        let message = self
            .repo
            .insert(NewScheduledMessage {
                recipient: request.recipient,
                body: request.body,
                scheduled_at,
            })
            .await?;

        tracing::info!(
            message_id = %message.id,
            scheduled_at = %message.scheduled_at,
            "message scheduled"
        );
        Ok(message)
    }
}
