use std::time::Duration;

use tokio::{sync::Mutex, time::Instant};

/// Fixed-spacing gate in front of outbound sends. Each `wait` returns no
/// sooner than `min_interval` after the previous one returned; there is no
/// burst allowance.
pub struct RateGate {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub async fn wait(&self) {
        // Held across the sleep so concurrent callers queue up behind each other.
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.min_interval).await;
        }
        *last = Some(Instant::now());
    }
}
