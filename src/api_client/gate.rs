//! Per-service minimum interval between outbound calls.
//!
//! One gate is shared by every caller of a given service. The lock is held
//! while waiting, so concurrent callers are admitted one at a time and their
//! start times are never closer than the configured interval.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::ServiceKind;

pub struct RateLimitGate {
    service: ServiceKind,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimitGate {
    pub fn new(service: ServiceKind, min_interval: Duration) -> Self {
        Self {
            service,
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn service(&self) -> ServiceKind {
        self.service
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a call to this service may start, then record it as started.
    pub async fn admit(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                debug!(
                    service = %self.service,
                    wait_ms = (ready_at - now).as_millis() as u64,
                    "Waiting for rate limit gate"
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
