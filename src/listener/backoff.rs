use std::time::Duration;

// ============================================================================
// Redelivery Backoff
// ============================================================================
//
// Backoff schedule for records whose handler signalled a retryable failure.
// A multiplier of 1.0 gives a fixed backoff; anything above grows the delay
// exponentially up to `max_delay`.
//
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct BackOffConfig {
    /// Total delivery attempts, first attempt included
    pub max_attempts: u32,
    /// Delay before the first redelivery
    pub initial_delay: Duration,
    /// Maximum delay between redeliveries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl BackOffConfig {
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: interval,
            max_delay: interval,
            multiplier: 1.0,
        }
    }

    pub fn exponential(initial_delay: Duration, max_delay: Duration, multiplier: f64, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            multiplier,
        }
    }

    /// True once `attempt` (1-based) used up the attempt budget.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        Duration::from_millis(millis as u64).min(self.max_delay)
    }

    /// Sum of every backoff delay a record can sit through before it is
    /// dead-lettered.
    pub fn total_delay(&self) -> Duration {
        (1..self.max_attempts).map(|attempt| self.delay_after(attempt)).sum()
    }
}
