use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, payload::Json};

use crate::{
    application::handlers::status_reconciler::DeliveryStatusUpdate,
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        errors::map_domain_error,
        requests::DeliveryStatusPayload,
        responses::AcknowledgementDto,
    },
};

#[derive(Clone)]
pub struct CallbacksEndpoints {
    state: Arc<ApiState>,
}

impl CallbacksEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl CallbacksEndpoints {
    /// Delivery status callback. Answers 200 even when no message matched so
    /// the provider does not keep retrying.
    #[oai(path = "/message-status", method = "post", tag = EndpointsTags::Callbacks)]
    pub async fn message_status(
        &self,
        payload: DeliveryStatusPayload,
    ) -> PoemResult<Json<AcknowledgementDto>> {
        let callback = payload.into_inner();
        let summary = self
            .state
            .status_reconciler
            .apply(DeliveryStatusUpdate {
                provider_ref: callback.message_sid,
                recipient: callback.to,
                status: callback.message_status,
            })
            .await
            .map_err(map_domain_error)?;
        tracing::debug!(
            matched = summary.matched,
            correlated_by = ?summary.correlated_by,
            "status callback handled"
        );

        Ok(Json(AcknowledgementDto {
            message: format!("Status applied to {} message(s)", summary.matched),
        }))
    }
}
