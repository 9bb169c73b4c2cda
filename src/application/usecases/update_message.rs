use std::sync::Arc;

use uuid::Uuid;

use crate::{
    application::usecases::validation::{parse_scheduled_at, validate_content},
    domain::{
        errors::DomainError,
        models::{ScheduledMessage, UpdateOutcome},
        repositories::ScheduledMessageRepository,
    },
};

pub struct UpdateMessageUseCase {
    repo: Arc<dyn ScheduledMessageRepository>,
}

pub struct UpdateMessageRequest {
    pub id: Uuid,
    pub recipient: String,
    pub body: String,
    pub scheduled_at: String,
}

impl UpdateMessageUseCase {
    pub fn new(repo: Arc<dyn ScheduledMessageRepository>) -> Self {
        Self { repo }
    }

    /// Replaces recipient, body and schedule of a pending message. The new
    /// schedule only has to parse; it may already be due.
    pub async fn execute(
        &self,
        request: UpdateMessageRequest,
    ) -> Result<ScheduledMessage, DomainError> {
        validate_content(&request.recipient, &request.body)?;
        let scheduled_at = parse_scheduled_at(&request.scheduled_at)?;

        let mut message = self
            .repo
            .get(request.id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("message {}", request.id)))?;
        message.recipient = request.recipient;
        message.body = request.body;
        message.scheduled_at = scheduled_at;

        match self.repo.update(&message).await? {
            UpdateOutcome::Updated(updated) => {
                tracing::info!(message_id = %updated.id, "message updated");
                Ok(updated)
            }
            UpdateOutcome::NotFound => {
                Err(DomainError::NotFound(format!("message {}", request.id)))
            }
            UpdateOutcome::NotPending(status) => Err(DomainError::InvalidState(format!(
                "message {} is {status}, only pending messages can be changed",
                request.id
            ))),
        }
    }
}
