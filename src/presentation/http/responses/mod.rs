use poem_openapi::{ApiResponse, Object, payload::Json};
use uuid::Uuid;

#[derive(Object)]
pub struct ScheduledMessageDto {
    pub id: Uuid,
    pub phone_number: String,
    pub content: String,
    pub scheduled_at: String,
    /// `pending`, `sent`, `failed` or a provider status such as `delivered`.
    pub status: String,
    pub provider_ref: Option<String>,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Object)]
pub struct MessageEnvelopeDto {
    pub message: String,
    pub data: ScheduledMessageDto,
}

#[derive(Object)]
pub struct MessagesDto {
    pub messages: Vec<ScheduledMessageDto>,
}

#[derive(Object)]
pub struct AcknowledgementDto {
    pub message: String,
}

#[derive(ApiResponse)]
pub enum ScheduleMessageResponse {
    #[oai(status = 201)]
    Created(Json<MessageEnvelopeDto>),
}
