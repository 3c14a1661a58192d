use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A single failed retry attempt, kept on the dead-letter item for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RetryAttempt {
    /// 1-based attempt number.
    #[schema(example = 1)]
    pub attempt: i32,
    /// Error message from the failed attempt.
    #[schema(example = "connection reset by peer")]
    pub error: String,
    /// When this attempt occurred.
    pub timestamp: DateTime<Utc>,
}

impl RetryAttempt {
    pub fn new(attempt: i32, error: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            attempt,
            error: error.into(),
            timestamp,
        }
    }
}

/// Exponential backoff with a ceiling on the delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub base: Duration,
    /// No delay ever exceeds this.
    pub max: Duration,
    /// Add 0-25% jitter on top of the exponential delay.
    pub jitter: bool,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            jitter: false,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after the `attempt`-th consecutive failure (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base.as_secs(), self.max.as_secs(), self.jitter)
    }

    /// When an item that just failed its `attempt`-th time becomes due again.
    pub fn next_retry_at(&self, attempt: u32, failed_at: DateTime<Utc>) -> DateTime<Utc> {
        let secs = i64::try_from(self.delay(attempt).as_secs()).unwrap_or(i64::MAX);
        let delta = TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX);
        failed_at
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Calculate exponential backoff delay in whole seconds.
///
/// Formula: `min(base * 2^(attempt-1) + jitter, max)` with 0-25% jitter when enabled.
/// Jitter only ever lengthens the delay, and a doubled delay always exceeds the
/// previous one plus its jitter, so the result never decreases as `attempt` grows.
pub fn calculate_backoff(attempt: u32, base_secs: u64, max_secs: u64, jitter: bool) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exp_factor = 2u64.saturating_pow(attempt - 1);
    let delay_secs = base_secs.saturating_mul(exp_factor);

    let jitter = if jitter && delay_secs > 0 {
        rand::rng().random_range(0..=delay_secs / 4)
    } else {
        0
    };

    Duration::from_secs(delay_secs.saturating_add(jitter).min(max_secs))
}
