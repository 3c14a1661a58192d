use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::RetryAttempt;
use serde::{Deserialize, Serialize};

use crate::dlq::{DeadLetterItem, DlqStats};

/// Default page size for listing.
pub const DEFAULT_LIST_LIMIT: u64 = 100;
/// Largest page size accepted.
pub const MAX_LIST_LIMIT: u64 = 500;

/// Query parameters for listing dead-letter items.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListDlqParams {
    /// Maximum items to return, newest first (1-500, default 100).
    #[param(example = 100)]
    pub limit: Option<u64>,
}

/// A queued webhook delivery.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterItemResponse {
    #[schema(example = 17)]
    pub id: i32,
    #[schema(example = "load#status_updated")]
    pub event_type: String,
    /// Webhook body exactly as received.
    #[schema(example = r#"{"event_type":"load#status_updated","reference_number":"REF-1"}"#)]
    pub payload: String,
    #[schema(example = "REF-1")]
    pub reference_number: Option<String>,
    #[schema(example = 2)]
    pub attempt_count: i32,
    #[schema(example = 5)]
    pub max_retries: i32,
    /// At the retry ceiling; only a requeue or delete moves it on.
    #[schema(example = false)]
    pub exhausted: bool,
    pub next_retry_at: DateTime<Utc>,
    #[schema(example = "shipment store error: connection reset")]
    pub last_error: Option<String>,
    /// Most recent failures, oldest first.
    pub retry_history: Vec<RetryAttempt>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DeadLetterItem> for DeadLetterItemResponse {
    fn from(m: DeadLetterItem) -> Self {
        let exhausted = m.is_exhausted();
        let retry_history = serde_json::from_value(m.retry_history).unwrap_or_else(|e| {
            tracing::warn!(id = m.id, error = %e, "Unreadable retry history");
            Vec::new()
        });

        Self {
            id: m.id,
            event_type: m.event_type,
            payload: m.payload,
            reference_number: m.reference_number,
            attempt_count: m.attempt_count,
            max_retries: m.max_retries,
            exhausted,
            next_retry_at: m.next_retry_at,
            last_error: m.last_error,
            retry_history,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// Backlog statistics, computed at request time.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DlqStatsResponse {
    #[schema(example = 12)]
    pub count: u64,
    /// Item count per webhook event type.
    pub by_event_type: BTreeMap<String, u64>,
    /// Items no longer retried automatically.
    #[schema(example = 1)]
    pub max_retries_reached: u64,
}

impl From<DlqStats> for DlqStatsResponse {
    fn from(s: DlqStats) -> Self {
        Self {
            count: s.count,
            by_event_type: s.by_event_type,
            max_retries_reached: s.max_retries_reached,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DlqListResponse {
    pub items: Vec<DeadLetterItemResponse>,
    pub stats: DlqStatsResponse,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteDlqResponse {
    /// Whether an item with that id existed.
    #[schema(example = true)]
    pub removed: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ClearDlqResponse {
    /// Number of items deleted.
    #[schema(example = 12)]
    pub removed: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RequeueDlqResponse {
    /// Whether an item with that id existed.
    #[schema(example = true)]
    pub requeued: bool,
}
