use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{
    errors::DomainError, models::ScheduledMessage, repositories::ScheduledMessageRepository,
};

pub struct GetMessageUseCase {
    repo: Arc<dyn ScheduledMessageRepository>,
}

impl GetMessageUseCase {
    pub fn new(repo: Arc<dyn ScheduledMessageRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, id: Uuid) -> Result<ScheduledMessage, DomainError> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("message {id}")))
    }
}
