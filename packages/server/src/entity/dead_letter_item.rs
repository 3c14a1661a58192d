use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A webhook delivery that failed synchronous processing and awaits retry.
///
/// Rows exist only until reconciliation succeeds or an operator deletes them.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dead_letter_item")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Upstream event tag, e.g. `load#status_updated`.
    #[sea_orm(indexed)]
    pub event_type: String,

    /// Webhook body exactly as received, so a retry replays the same bytes.
    #[sea_orm(column_type = "Text")]
    pub payload: String,

    /// Correlation key extracted at ingestion; NULL for malformed payloads.
    #[sea_orm(indexed)]
    pub reference_number: Option<String>,

    /// Failed attempts so far.
    pub attempt_count: i32,

    /// Automatic retries stop once `attempt_count` reaches this.
    pub max_retries: i32,

    #[sea_orm(indexed)]
    pub next_retry_at: DateTimeUtc,

    #[sea_orm(column_type = "Text", nullable)]
    pub last_error: Option<String>,

    /// Recent failures as JSON array: [{attempt, error, timestamp}]
    #[sea_orm(column_type = "JsonBinary")]
    pub retry_history: serde_json::Value,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

impl Model {
    /// True once the item no longer retries automatically.
    pub fn is_exhausted(&self) -> bool {
        self.attempt_count >= self.max_retries
    }
}

impl ActiveModelBehavior for ActiveModel {}
