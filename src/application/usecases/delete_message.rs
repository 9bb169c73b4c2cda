use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{errors::DomainError, repositories::ScheduledMessageRepository};

pub struct DeleteMessageUseCase {
    repo: Arc<dyn ScheduledMessageRepository>,
}

impl DeleteMessageUseCase {
    pub fn new(repo: Arc<dyn ScheduledMessageRepository>) -> Self {
        Self { repo }
    }

    /// Hard delete, whatever the message status.
    pub async fn execute(&self, id: Uuid) -> Result<(), DomainError> {
        if !self.repo.delete(id).await? {
            return Err(DomainError::NotFound(format!("message {id}")));
        }
        tracing::info!(message_id = %id, "message deleted");
        Ok(())
    }
}
