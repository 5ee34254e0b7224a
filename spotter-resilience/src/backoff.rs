//! Exponential backoff between attempts

use std::time::Duration;

/// Default base for [`calculate_retry_delay`]
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default cap for [`calculate_retry_delay`]
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Backoff delay calculator: `base_delay * multiplier^(attempt-1)`, optionally capped
#[derive(Debug, Clone)]
pub struct BackoffCalculator {
    base_delay: Duration,
    multiplier: f64,
    max_delay: Option<Duration>,
}

impl BackoffCalculator {
    /// Create a new backoff calculator. Multipliers below 1 (or not finite)
    /// are treated as 1.
    pub fn new(base_delay: Duration, multiplier: f64, max_delay: Option<Duration>) -> Self {
        let multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            1.0
        };
        Self {
            base_delay,
            multiplier,
            max_delay,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let factor = self.multiplier.powi(exponent);

        // Float-to-int casts saturate, so overflow lands on u64::MAX nanos
        let delay = Duration::from_nanos((self.base_delay.as_nanos() as f64 * factor) as u64);

        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

/// Doubling backoff for a 0-indexed retry: `base * 2^retry_index`, capped at `max`
pub fn calculate_retry_delay(retry_index: u32, base: Duration, max: Duration) -> Duration {
    BackoffCalculator::new(base, 2.0, Some(max)).delay_for_attempt(retry_index.saturating_add(1))
}
