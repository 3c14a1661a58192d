use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::alert::{AlertError, AlertSink, LogAlertSink, WebhookAlertSink};
use crate::config::AppConfig;
use crate::dlq::{DeadLetterStore, DlqService, ThresholdMonitor};
use crate::reconcile::{EventReconciler, ShipmentRepository};
use crate::scheduler::RetryScheduler;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DeadLetterStore>,
    pub scheduler: Arc<RetryScheduler>,
}

impl AppState {
    /// Wire every component onto one shared database connection.
    pub fn new(config: AppConfig, db: DatabaseConnection) -> Result<Self, AlertError> {
        let store: Arc<dyn DeadLetterStore> = Arc::new(DlqService::new(
            db.clone(),
            config.retry.backoff(),
            config.retry.max_retries,
        ));

        let sink: Arc<dyn AlertSink> = match &config.alert.webhook_url {
            Some(url) => Arc::new(WebhookAlertSink::new(url.clone(), config.alert.timeout())?),
            None => Arc::new(LogAlertSink),
        };

        let scheduler = RetryScheduler::new(
            store.clone(),
            EventReconciler::new(Arc::new(ShipmentRepository::new(db))),
            ThresholdMonitor::new(store.clone(), sink, config.alert.threshold),
            config.retry.run_budget(),
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            scheduler: Arc::new(scheduler),
        })
    }
}
