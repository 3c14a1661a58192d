use std::time::Duration;

use serde::Deserialize;

use crate::retry::BackoffPolicy;

/// Retry engine configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Failed attempts after which an item stops retrying automatically. Default: 5.
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
    /// Delay after the first failure, in seconds. Default: 60.
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
    /// Upper bound for any single delay, in seconds. Default: 21600 (6h).
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    /// Add 0-25% jitter on top of each delay. Default: true.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
    /// Wall-clock budget for one retry run, in seconds. Default: 240.
    #[serde(default = "default_run_budget_secs")]
    pub run_budget_secs: u64,
    /// When set, the server also runs the retry loop in-process on this interval.
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

fn default_max_retries() -> i32 {
    5
}
fn default_base_delay_secs() -> u64 {
    60
}
fn default_max_delay_secs() -> u64 {
    6 * 60 * 60
}
fn default_jitter() -> bool {
    true
}
fn default_run_budget_secs() -> u64 {
    240
}

impl RetryConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_secs(self.base_delay_secs),
            Duration::from_secs(self.max_delay_secs),
        )
        .with_jitter(self.jitter)
    }

    pub fn run_budget(&self) -> Duration {
        Duration::from_secs(self.run_budget_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            jitter: default_jitter(),
            run_budget_secs: default_run_budget_secs(),
            interval_secs: None,
        }
    }
}
