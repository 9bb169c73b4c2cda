use std::sync::Arc;

use poem_openapi::Tags;

use crate::{
    application::{
        handlers::status_reconciler::StatusReconciler,
        services::clock::Clock,
        usecases::{
            delete_message::DeleteMessageUseCase, get_message::GetMessageUseCase,
            list_messages::ListMessagesUseCase, schedule_message::ScheduleMessageUseCase,
            update_message::UpdateMessageUseCase,
        },
    },
    domain::repositories::ScheduledMessageRepository,
};

#[derive(Clone)]
pub struct ApiState {
    pub schedule_message_usecase: Arc<ScheduleMessageUseCase>,
    pub list_messages_usecase: Arc<ListMessagesUseCase>,
    pub get_message_usecase: Arc<GetMessageUseCase>,
    pub update_message_usecase: Arc<UpdateMessageUseCase>,
    pub delete_message_usecase: Arc<DeleteMessageUseCase>,
    pub status_reconciler: Arc<StatusReconciler>,
}

impl ApiState {
    pub fn new(repo: Arc<dyn ScheduledMessageRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            schedule_message_usecase: Arc::new(ScheduleMessageUseCase::new(repo.clone(), clock)),
            list_messages_usecase: Arc::new(ListMessagesUseCase::new(repo.clone())),
            get_message_usecase: Arc::new(GetMessageUseCase::new(repo.clone())),
            update_message_usecase: Arc::new(UpdateMessageUseCase::new(repo.clone())),
            delete_message_usecase: Arc::new(DeleteMessageUseCase::new(repo.clone())),
            status_reconciler: Arc::new(StatusReconciler::new(repo)),
        }
    }
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Messages,
    Callbacks,
}
