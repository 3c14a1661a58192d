use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::DlqAlert;
use tracing::{error, warn};

use super::store::{DeadLetterStore, StoreError};
use crate::alert::AlertSink;

/// Watches the backlog size and raises an alert once it passes `limit`.
pub struct ThresholdMonitor {
    store: Arc<dyn DeadLetterStore>,
    sink: Arc<dyn AlertSink>,
    limit: u64,
}

impl ThresholdMonitor {
    pub fn new(store: Arc<dyn DeadLetterStore>, sink: Arc<dyn AlertSink>, limit: u64) -> Self {
        Self { store, sink, limit }
    }

    pub async fn is_over_threshold(&self) -> Result<bool, StoreError> {
        self.store.over_threshold(self.limit).await
    }

    /// Send at most one alert if the backlog is over the limit.
    ///
    /// Returns whether an alert was sent to the sink. Nothing here fails the caller:
    /// stats and delivery errors are logged and reported as "not fired" or "fired"
    /// respectively.
    pub async fn check(&self, now: DateTime<Utc>) -> bool {
        let stats = match self.store.stats().await {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "Failed to read dead-letter stats for threshold check");
                return false;
            }
        };

        if stats.count <= self.limit {
            return false;
        }

        let alert = DlqAlert::overflow(
            stats.count,
            stats.by_event_type,
            stats.max_retries_reached,
            now,
        );

        if let Err(e) = self.sink.send(&alert).await {
            warn!(
                count = alert.count,
                limit = self.limit,
                error = %e,
                "Failed to deliver dead-letter overflow alert"
            );
        }

        true
    }
}
