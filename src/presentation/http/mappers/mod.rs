use crate::{
    domain::models::ScheduledMessage, presentation::http::responses::ScheduledMessageDto,
};

pub fn map_message(message: &ScheduledMessage) -> ScheduledMessageDto {
    ScheduledMessageDto {
        id: message.id,
        phone_number: message.recipient.clone(),
        content: message.body.clone(),
        scheduled_at: message.scheduled_at.to_rfc3339(),
        status: message.status.to_string(),
        provider_ref: message.provider_ref.clone(),
        last_error: message.last_error.clone(),
        created_at: message.created_at.to_rfc3339(),
        updated_at: message.updated_at.to_rfc3339(),
    }
}
