use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, param::Path, payload::Json};
use uuid::Uuid;

use crate::{
    application::usecases::{
        schedule_message::ScheduleMessageRequest, update_message::UpdateMessageRequest,
    },
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        errors::map_domain_error,
        mappers::map_message,
        requests::ScheduleMessageRequestDto,
        responses::{
            AcknowledgementDto, MessageEnvelopeDto, MessagesDto, ScheduleMessageResponse,
            ScheduledMessageDto,
        },
    },
};

#[derive(Clone)]
pub struct MessagesEndpoints {
    state: Arc<ApiState>,
}

impl MessagesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl MessagesEndpoints {
    #[oai(path = "/schedule", method = "post", tag = EndpointsTags::Messages)]
    pub async fn schedule_message(
        &self,
        request: Json<ScheduleMessageRequestDto>,
    ) -> PoemResult<ScheduleMessageResponse> {
        let Json(request) = request;
        let message = self
            .state
            .schedule_message_usecase
            .execute(ScheduleMessageRequest {
                recipient: request.phone_number,
                body: request.content,
                scheduled_at: request.scheduled_at,
            })
            .await
            .map_err(map_domain_error)?;

        Ok(ScheduleMessageResponse::Created(Json(MessageEnvelopeDto {
            message: "Message scheduled successfully".to_string(),
            data: map_message(&message),
        })))
    }

    #[oai(path = "/messages", method = "get", tag = EndpointsTags::Messages)]
    pub async fn list_messages(&self) -> PoemResult<Json<MessagesDto>> {
        let messages = self
            .state
            .list_messages_usecase
            .execute()
            .await
            .map_err(map_domain_error)?;

        Ok(Json(MessagesDto {
            messages: messages.iter().map(map_message).collect(),
        }))
    }

    #[oai(path = "/messages/:id", method = "get", tag = EndpointsTags::Messages)]
    pub async fn get_message(&self, id: Path<Uuid>) -> PoemResult<Json<ScheduledMessageDto>> {
        let message = self
            .state
            .get_message_usecase
            .execute(id.0)
            .await
            .map_err(map_domain_error)?;

        Ok(Json(map_message(&message)))
    }

    #[oai(path = "/messages/:id", method = "put", tag = EndpointsTags::Messages)]
    pub async fn update_message(
        &self,
        id: Path<Uuid>,
        request: Json<ScheduleMessageRequestDto>,
    ) -> PoemResult<Json<MessageEnvelopeDto>> {
        let Json(request) = request;
        let message = self
            .state
            .update_message_usecase
            .execute(UpdateMessageRequest {
                id: id.0,
                recipient: request.phone_number,
                body: request.content,
                scheduled_at: request.scheduled_at,
            })
            .await
            .map_err(map_domain_error)?;

        Ok(Json(MessageEnvelopeDto {
            message: "Message updated successfully".to_string(),
            data: map_message(&message),
        }))
    }

    #[oai(path = "/messages/:id", method = "delete", tag = EndpointsTags::Messages)]
    pub async fn delete_message(&self, id: Path<Uuid>) -> PoemResult<Json<AcknowledgementDto>> {
        self.state
            .delete_message_usecase
            .execute(id.0)
            .await
            .map_err(map_domain_error)?;

        Ok(Json(AcknowledgementDto {
            message: "Message deleted successfully".to_string(),
        }))
    }
}
