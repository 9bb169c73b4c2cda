use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// What the provider hands back for an accepted message.
#[derive(Debug, Clone)]
pub struct ProviderReceipt {
    pub provider_ref: String,
    pub status: Option<String>,
}

/// A single send attempt against an SMS provider.
#[async_trait]
pub trait DeliveryBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, recipient: &str, body: &str) -> anyhow::Result<ProviderReceipt>;
}

#[derive(Debug, Clone, Copy)]
pub struct DeliveryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { provider_ref: String, attempts: u32 },
    Failed { reason: String, attempts: u32 },
}

/// Wraps a backend with a fixed-delay retry policy. A message that fails
/// every attempt is reported as failed and never retried again.
pub struct DeliveryClient {
    backend: Arc<dyn DeliveryBackend>,
    policy: DeliveryPolicy,
}

impl DeliveryClient {
    pub fn new(backend: Arc<dyn DeliveryBackend>, policy: DeliveryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub async fn send(&self, recipient: &str, body: &str) -> DeliveryOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(recipient, body).await {
                Ok(receipt) => {
                    tracing::info!(
                        backend = self.backend.name(),
                        recipient,
                        attempt,
                        provider_ref = %receipt.provider_ref,
                        provider_status = receipt.status.as_deref().unwrap_or("unknown"),
                        "message handed to provider"
                    );
                    return DeliveryOutcome::Delivered {
                        provider_ref: receipt.provider_ref,
                        attempts: attempt,
                    };
                }
                Err(err) => {
                    last_error = err.to_string();
                    if attempt < max_attempts {
                        tracing::warn!(
                            backend = self.backend.name(),
                            recipient,
                            attempt,
                            error = %last_error,
                            "delivery attempt failed, retrying"
                        );
                        tokio::time::sleep(self.policy.retry_delay).await;
                    }
                }
            }
        }

        tracing::error!(
            backend = self.backend.name(),
            recipient,
            attempts = max_attempts,
            error = %last_error,
            "giving up on message"
        );
        DeliveryOutcome::Failed {
            reason: last_error,
            attempts: max_attempts,
        }
    }

    async fn attempt(&self, recipient: &str, body: &str) -> anyhow::Result<ProviderReceipt> {
        let receipt = tokio::time::timeout(
            self.policy.attempt_timeout,
            self.backend.send(recipient, body),
        )
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "provider did not answer within {:?}",
                self.policy.attempt_timeout
            )
        })??;

        if receipt.provider_ref.trim().is_empty() {
            anyhow::bail!("provider returned an empty message reference");
        }
        Ok(receipt)
    }
}
