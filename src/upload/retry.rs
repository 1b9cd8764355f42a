use std::time::Duration;

/// Exponential backoff schedule for failed part requests.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay_ms: u64,
    pub factor: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(
        retries: u32,
        base_delay_ms: u64,
        factor: u64,
        max_delay_ms: u64,
    ) -> Self {
        Self {
            retries,
            base_delay_ms,
            factor,
            max_delay_ms,
        }
    }

    /// Deterministic backoff for `attempt` (0-based), capped at the maximum.
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let multiplier = self.factor.saturating_pow(attempt.min(20));
        self.base_delay_ms
            .saturating_mul(multiplier)
            .min(self.max_delay_ms)
    }

    /// Backoff plus up to 25% jitter, still capped at the maximum.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.backoff_ms(attempt);
        let jitter = fastrand::u64(0..=base / 4);
        Duration::from_millis(
            base.saturating_add(jitter).min(self.max_delay_ms),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, 250, 2, 15_000)
    }
}

/// Statuses worth retrying: timeouts, throttling and server-side failures.
pub fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}
