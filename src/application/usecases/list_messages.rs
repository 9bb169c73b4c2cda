use std::sync::Arc;

use crate::domain::{
    errors::DomainError, models::ScheduledMessage, repositories::ScheduledMessageRepository,
};

pub struct ListMessagesUseCase {
    repo: Arc<dyn ScheduledMessageRepository>,
}

impl ListMessagesUseCase {
    pub fn new(repo: Arc<dyn ScheduledMessageRepository>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self) -> Result<Vec<ScheduledMessage>, DomainError> {
        Ok(self.repo.list().await?)
    }
}
