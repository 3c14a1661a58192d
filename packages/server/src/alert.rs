use std::time::Duration;

use async_trait::async_trait;
use common::DlqAlert;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert delivery failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("alert endpoint responded with {0}")]
    Status(StatusCode),
}

/// Destination for operational alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: &DlqAlert) -> Result<(), AlertError>;
}

/// Posts alerts as JSON to an external notification webhook.
pub struct WebhookAlertSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookAlertSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn send(&self, alert: &DlqAlert) -> Result<(), AlertError> {
        let response = self.client.post(&self.url).json(alert).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, status = %status, "Alert endpoint rejected alert");
            return Err(AlertError::Status(status));
        }

        info!(count = alert.count, "Delivered dead-letter overflow alert");
        Ok(())
    }
}

/// Writes alerts to the log. Used when no webhook is configured.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, alert: &DlqAlert) -> Result<(), AlertError> {
        warn!(
            count = alert.count,
            max_retries_reached = alert.max_retries_reached,
            timestamp = %alert.timestamp,
            "{}",
            alert.summary()
        );
        Ok(())
    }
}
