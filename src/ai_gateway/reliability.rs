use std::time::Duration;

use crate::ai_gateway::{error::GatewayError, types::ReliabilityConfig};

/// Retry and timeout policy for a single completion call.
#[derive(Debug, Clone)]
pub struct ReliabilityLayer {
    config: ReliabilityConfig,
}

impl ReliabilityLayer {
    pub fn new(config: ReliabilityConfig) -> Self {
        Self { config }
    }

    /// Per-attempt timeout. A request-level override wins over the config.
    pub fn attempt_timeout(&self, override_ms: Option<u64>) -> Duration {
        Duration::from_millis(override_ms.unwrap_or(self.config.request_timeout_ms).max(1))
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.backoff_base_ms.max(1) as f64;
        let max = self.config.backoff_max_ms.max(1) as f64;
        let exp = (attempt as i32).max(0);
        let without_jitter = (base * 2f64.powi(exp)).min(max);
        let jitter_factor = 0.9 + (attempt as f64 % 3.0) * 0.05;
        Duration::from_millis((without_jitter * jitter_factor) as u64)
    }

    /// `attempt` is zero-based: the first call is attempt 0.
    pub fn can_retry(&self, err: &GatewayError, attempt: u32) -> bool {
        err.retryable && attempt < self.config.max_retries
    }
}
