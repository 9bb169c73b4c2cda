use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use uuid::Uuid;

use crate::application::services::delivery::{DeliveryBackend, ProviderReceipt};

/// Logs messages instead of sending them and fails at random.
pub struct StubBackend {
    success_rate: f64,
}

impl StubBackend {
    pub fn new(success_rate: f64) -> Arc<dyn DeliveryBackend> {
        Arc::new(Self {
            success_rate: success_rate.clamp(0.0, 1.0),
        }) as Arc<dyn DeliveryBackend>
    }
}

#[async_trait]
impl DeliveryBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn send(&self, recipient: &str, body: &str) -> anyhow::Result<ProviderReceipt> {
        if !rand::thread_rng().gen_bool(self.success_rate) {
            anyhow::bail!("simulated provider failure");
        }
        tracing::info!(recipient, body, "[stub] pretending to send message");
        Ok(ProviderReceipt {
            provider_ref: format!("SM{}", Uuid::new_v4().simple()),
            status: Some("queued".to_string()),
        })
    }
}
