use std::time::Duration;

use common::RetryConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    #[serde(default)]
    pub allow_origins: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Shared secret the periodic trigger presents.
    pub cron_secret: String,
    /// Bearer token for the admin endpoints.
    pub admin_token: String,
}

/// Backlog alerting.
#[derive(Debug, Deserialize, Clone)]
pub struct AlertConfig {
    /// Alert when the queue holds more than this many items. Default: 50.
    #[serde(default = "default_alert_threshold")]
    pub threshold: u64,
    /// Notification webhook. Alerts only go to the log when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Default: 10.
    #[serde(default = "default_alert_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_alert_threshold() -> u64 {
    50
}
fn default_alert_timeout_secs() -> u64 {
    10
}

impl AlertConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold: default_alert_threshold(),
            webhook_url: None,
            timeout_secs: default_alert_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub alert: AlertConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("DRAYAGE_CONFIG").unwrap_or_else(|_| "config/config".into());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .add_source(File::with_name(&path).required(false))
            // Override from environment (e.g., DRAYAGE__AUTH__CRON_SECRET)
            .add_source(Environment::with_prefix("DRAYAGE").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.cron_secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.cron_secret must not be empty".into()));
        }
        if self.auth.admin_token.trim().is_empty() {
            return Err(ConfigError::Message("auth.admin_token must not be empty".into()));
        }
        if self.retry.max_retries < 1 {
            return Err(ConfigError::Message("retry.max_retries must be at least 1".into()));
        }
        if self.retry.base_delay_secs < 1 {
            return Err(ConfigError::Message("retry.base_delay_secs must be at least 1".into()));
        }
        if self.retry.base_delay_secs > self.retry.max_delay_secs {
            return Err(ConfigError::Message(
                "retry.base_delay_secs must not exceed retry.max_delay_secs".into(),
            ));
        }
        if self.retry.run_budget_secs < 1 {
            return Err(ConfigError::Message("retry.run_budget_secs must be at least 1".into()));
        }
        if self.retry.interval_secs == Some(0) {
            return Err(ConfigError::Message("retry.interval_secs must be positive".into()));
        }
        Ok(())
    }
}
