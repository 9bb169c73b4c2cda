use poem_openapi::{ApiRequest, Object, payload::Form, payload::Json};
use serde::Deserialize;

#[derive(Object, Debug)]
pub struct ScheduleMessageRequestDto {
    #[oai(validator(pattern = r"^\+?[0-9]{6,15}$"))]
    pub phone_number: String,
    #[oai(validator(min_length = 1, max_length = 1000))]
    pub content: String,
    /// RFC 3339 timestamp, e.g. `2030-01-02T15:04:05Z`.
    pub scheduled_at: String,
}

/// Delivery report as posted by the provider. Field names follow Twilio's
/// status callback parameters.
#[derive(Object, Deserialize, Debug, Clone)]
#[oai(rename_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
pub struct DeliveryStatusCallbackDto {
    pub message_sid: Option<String>,
    pub message_status: String,
    pub to: Option<String>,
}

#[derive(ApiRequest)]
pub enum DeliveryStatusPayload {
    Form(Form<DeliveryStatusCallbackDto>),
    Json(Json<DeliveryStatusCallbackDto>),
}

impl DeliveryStatusPayload {
    pub fn into_inner(self) -> DeliveryStatusCallbackDto {
        match self {
            DeliveryStatusPayload::Form(Form(dto)) => dto,
            DeliveryStatusPayload::Json(Json(dto)) => dto,
        }
    }
}
