use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;

use server::alert::LogAlertSink;
use server::config::{
    AlertConfig, AppConfig, AuthConfig, CorsConfig, DatabaseConfig, ServerConfig,
};
use server::dlq::{
    AttemptOutcome, DeadLetterItem, DeadLetterStore, DlqService, DlqStats, NewDeadLetter,
    RecordedAttempt, StoreError, ThresholdMonitor,
};
use server::reconcile::{EventReconciler, ShipmentRepository};
use server::scheduler::RetryScheduler;
use server::state::AppState;

pub const CRON_SECRET: &str = "cron-secret-for-integration-tests";
pub const ADMIN_TOKEN: &str = "admin-token-for-integration-tests";

pub mod routes {
    pub const DLQ: &str = "/api/v1/dlq";
    pub const DLQ_STATS: &str = "/api/v1/dlq/stats";
    pub const RETRY_RUN: &str = "/api/v1/dlq/retry-run";
    pub const HEALTH: &str = "/health";
    pub const OPENAPI: &str = "/api-docs/openapi.json";

    pub fn dlq_item(id: i32) -> String {
        format!("/api/v1/dlq/{id}")
    }

    pub fn dlq_requeue(id: i32) -> String {
        format!("/api/v1/dlq/{id}/requeue")
    }
}

/// Dead-letter store wrapper that counts every call.
pub struct CountingStore {
    inner: Arc<dyn DeadLetterStore>,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeadLetterStore for CountingStore {
    async fn enqueue(
        &self,
        item: NewDeadLetter,
        now: DateTime<Utc>,
    ) -> Result<DeadLetterItem, StoreError> {
        self.hit();
        self.inner.enqueue(item, now).await
    }

    async fn list_items(&self, limit: Option<u64>) -> Result<Vec<DeadLetterItem>, StoreError> {
        self.hit();
        self.inner.list_items(limit).await
    }

    async fn list_ready_for_retry(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeadLetterItem>, StoreError> {
        self.hit();
        self.inner.list_ready_for_retry(now).await
    }

    async fn get(&self, id: i32) -> Result<Option<DeadLetterItem>, StoreError> {
        self.hit();
        self.inner.get(id).await
    }

    async fn record_attempt(
        &self,
        item: &DeadLetterItem,
        outcome: &AttemptOutcome,
        now: DateTime<Utc>,
    ) -> Result<RecordedAttempt, StoreError> {
        self.hit();
        self.inner.record_attempt(item, outcome, now).await
    }

    async fn remove(&self, id: i32) -> Result<bool, StoreError> {
        self.hit();
        self.inner.remove(id).await
    }

    async fn requeue(&self, id: i32, now: DateTime<Utc>) -> Result<bool, StoreError> {
        self.hit();
        self.inner.requeue(id, now).await
    }

    async fn stats(&self) -> Result<DlqStats, StoreError> {
        self.hit();
        self.inner.stats().await
    }
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub store: Arc<CountingStore>,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        },
        auth: AuthConfig {
            cron_secret: CRON_SECRET.to_string(),
            admin_token: ADMIN_TOKEN.to_string(),
        },
        retry: Default::default(),
        alert: AlertConfig::default(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        // Every pooled connection would otherwise open its own empty database.
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("Failed to open in-memory database");
        server::database::sync_schema(&db)
            .await
            .expect("Failed to create schema");

        let config = test_config();
        let store = Arc::new(CountingStore {
            inner: Arc::new(DlqService::new(
                db.clone(),
                config.retry.backoff(),
                config.retry.max_retries,
            )),
            calls: AtomicUsize::new(0),
        });
        let shared: Arc<dyn DeadLetterStore> = store.clone();

        let scheduler = RetryScheduler::new(
            shared.clone(),
            EventReconciler::new(Arc::new(ShipmentRepository::new(db.clone()))),
            ThresholdMonitor::new(shared.clone(), Arc::new(LogAlertSink), config.alert.threshold),
            config.retry.run_budget(),
        );

        let state = AppState {
            config: Arc::new(config),
            store: shared,
            scheduler: Arc::new(scheduler),
        };

        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            store,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Put a webhook body on the queue the way the ingestion path does.
    pub async fn enqueue(&self, body: &Value) -> i32 {
        self.store
            .enqueue(NewDeadLetter::from_webhook_body(&body.to_string()), Utc::now())
            .await
            .expect("Failed to enqueue dead-letter item")
            .id
    }

    pub async fn post_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut req = self.client.post(self.url(path));
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let res = req.send().await.expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str) -> TestResponse {
        self.post_with_headers(path, &[]).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }
}
