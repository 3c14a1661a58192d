use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::LoadUpdate;
use sea_orm::DbErr;
use thiserror::Error;
use tracing::warn;

use crate::entity::dead_letter_item;

/// A failed webhook delivery awaiting retry.
pub type DeadLetterItem = dead_letter_item::Model;

/// Errors surfaced by the dead-letter store. Never swallowed by the store itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("failed to encode retry history: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("dead-letter store did not answer within the run budget")]
    Timeout,
}

/// A delivery to put on the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeadLetter {
    pub event_type: String,
    /// Raw webhook body, stored verbatim.
    pub payload: String,
    pub reference_number: Option<String>,
    /// Per-item ceiling; the store's configured default applies when `None`.
    pub max_retries: Option<i32>,
}

impl NewDeadLetter {
    pub fn new(event_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: payload.into(),
            reference_number: None,
            max_retries: None,
        }
    }

    pub fn with_reference(mut self, reference_number: impl Into<String>) -> Self {
        self.reference_number = Some(reference_number.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Build an entry straight from a webhook body, pulling the event tag and the
    /// reference number out of it. Malformed bodies are still accepted: the tag
    /// becomes `unknown` and the reference stays empty, but the bytes are kept.
    pub fn from_webhook_body(body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let event_type = parsed
            .as_ref()
            .and_then(|v| v.get("event_type"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown")
            .to_string();
        let reference_number = parsed
            .as_ref()
            .and_then(|v| LoadUpdate::from_payload(v).reference_number);

        Self {
            event_type,
            payload: body.to_string(),
            reference_number,
            max_retries: None,
        }
    }
}

/// Result of one reconciliation attempt, as reported to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(String),
}

/// What the store did with a recorded attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedAttempt {
    /// The item succeeded and was deleted.
    Removed,
    /// The item failed and is due again at `next_retry_at`.
    Rescheduled {
        attempt_count: i32,
        next_retry_at: DateTime<Utc>,
    },
    /// The item failed and reached its ceiling; it stays queued for an operator.
    Exhausted { attempt_count: i32 },
    /// The item was deleted or advanced by someone else since it was read.
    Stale,
}

/// Aggregate view of the queue, computed fresh on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DlqStats {
    /// Total items in the queue.
    pub count: u64,
    /// Item count per event type.
    pub by_event_type: BTreeMap<String, u64>,
    /// Items at or above their retry ceiling.
    pub max_retries_reached: u64,
}

impl DlqStats {
    /// Fold per-event-type `(event_type, count, exhausted)` groups.
    pub fn from_groups(groups: impl IntoIterator<Item = (String, i64, i64)>) -> Self {
        let mut stats = Self::default();
        for (event_type, count, exhausted) in groups {
            let count = u64::try_from(count).unwrap_or(0);
            stats.count += count;
            stats.max_retries_reached += u64::try_from(exhausted).unwrap_or(0);
            *stats.by_event_type.entry(event_type).or_insert(0) += count;
        }
        stats
    }
}

/// Durable holding area for failed webhook deliveries.
///
/// Pure data access. Every mutation of an existing item is a single conditional
/// statement keyed by id, so concurrent workers cannot both apply an attempt.
#[async_trait]
pub trait DeadLetterStore: Send + Sync {
    /// Insert a new item with zero attempts, due immediately.
    async fn enqueue(
        &self,
        item: NewDeadLetter,
        now: DateTime<Utc>,
    ) -> Result<DeadLetterItem, StoreError>;

    /// Items newest first, optionally capped at `limit`.
    async fn list_items(&self, limit: Option<u64>) -> Result<Vec<DeadLetterItem>, StoreError>;

    /// Items due at `now` that are still below their retry ceiling, oldest due first.
    async fn list_ready_for_retry(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeadLetterItem>, StoreError>;

    async fn get(&self, id: i32) -> Result<Option<DeadLetterItem>, StoreError>;

    /// Apply the outcome of an attempt on `item` as it was read.
    ///
    /// Success deletes the item. Failure bumps the attempt count, stores the error,
    /// and pushes `next_retry_at` out by the backoff policy. Either way the write
    /// only lands if the item is unchanged since it was read.
    async fn record_attempt(
        &self,
        item: &DeadLetterItem,
        outcome: &AttemptOutcome,
        now: DateTime<Utc>,
    ) -> Result<RecordedAttempt, StoreError>;

    /// Delete an item. Returns whether a row existed.
    async fn remove(&self, id: i32) -> Result<bool, StoreError>;

    /// Reset an item's attempts and make it due at `now`. Returns whether a row existed.
    async fn requeue(&self, id: i32, now: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn stats(&self) -> Result<DlqStats, StoreError>;

    async fn over_threshold(&self, limit: u64) -> Result<bool, StoreError> {
        Ok(self.stats().await?.count > limit)
    }

    /// Delete every item one by one, tolerating individual failures.
    /// Returns how many were removed.
    async fn clear_all(&self) -> Result<u64, StoreError> {
        let items = self.list_items(None).await?;
        let mut removed = 0u64;

        for item in items {
            match self.remove(item.id).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(id = item.id, error = %e, "Failed to remove dead-letter item");
                }
            }
        }

        Ok(removed)
    }
}
