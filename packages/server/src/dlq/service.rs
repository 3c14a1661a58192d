use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BackoffPolicy, RetryAttempt};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::IntoCondition;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::{debug, warn};

use super::store::{
    AttemptOutcome, DeadLetterItem, DeadLetterStore, DlqStats, NewDeadLetter, RecordedAttempt,
    StoreError,
};
use crate::entity::dead_letter_item::{self, Column};

/// Failures kept on an item; older entries are dropped first.
pub const RETRY_HISTORY_LIMIT: usize = 20;

/// Dead-letter store backed by the application database.
#[derive(Clone)]
pub struct DlqService {
    db: DatabaseConnection,
    backoff: BackoffPolicy,
    max_retries: i32,
}

impl DlqService {
    pub fn new(db: DatabaseConnection, backoff: BackoffPolicy, max_retries: i32) -> Self {
        Self {
            db,
            backoff,
            max_retries,
        }
    }

    /// Retry history with the failure of `attempt` appended and trimmed to the limit.
    fn append_history(
        item: &DeadLetterItem,
        attempt: i32,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<serde_json::Value, StoreError> {
        let mut history: Vec<RetryAttempt> =
            match serde_json::from_value(item.retry_history.clone()) {
                Ok(history) => history,
                Err(e) => {
                    warn!(id = item.id, error = %e, "Discarding unreadable retry history");
                    Vec::new()
                }
            };

        history.push(RetryAttempt::new(attempt, error, now));
        if history.len() > RETRY_HISTORY_LIMIT {
            history.drain(..history.len() - RETRY_HISTORY_LIMIT);
        }

        Ok(serde_json::to_value(history)?)
    }
}

/// `attempt_count < max_retries`, compared per row.
fn below_ceiling() -> impl IntoCondition {
    use sea_orm::sea_query::ExprTrait;

    Expr::col(Column::AttemptCount).lt(Expr::col(Column::MaxRetries))
}

#[async_trait]
impl DeadLetterStore for DlqService {
    async fn enqueue(
        &self,
        item: NewDeadLetter,
        now: DateTime<Utc>,
    ) -> Result<DeadLetterItem, StoreError> {
        let model = dead_letter_item::ActiveModel {
            event_type: Set(item.event_type),
            payload: Set(item.payload),
            reference_number: Set(item.reference_number),
            attempt_count: Set(0),
            max_retries: Set(item.max_retries.unwrap_or(self.max_retries)),
            next_retry_at: Set(now),
            last_error: Set(None),
            retry_history: Set(serde_json::json!([])),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let inserted = model.insert(&self.db).await?;
        debug!(
            id = inserted.id,
            event_type = %inserted.event_type,
            reference_number = ?inserted.reference_number,
            "Enqueued dead-letter item"
        );
        Ok(inserted)
    }

    async fn list_items(&self, limit: Option<u64>) -> Result<Vec<DeadLetterItem>, StoreError> {
        let items = dead_letter_item::Entity::find()
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(items)
    }

    async fn list_ready_for_retry(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<DeadLetterItem>, StoreError> {
        let items = dead_letter_item::Entity::find()
            .filter(Column::NextRetryAt.lte(now))
            .filter(below_ceiling())
            .order_by_asc(Column::NextRetryAt)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await?;
        Ok(items)
    }

    async fn get(&self, id: i32) -> Result<Option<DeadLetterItem>, StoreError> {
        Ok(dead_letter_item::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn record_attempt(
        &self,
        item: &DeadLetterItem,
        outcome: &AttemptOutcome,
        now: DateTime<Utc>,
    ) -> Result<RecordedAttempt, StoreError> {
        let error = match outcome {
            AttemptOutcome::Succeeded => {
                let result = dead_letter_item::Entity::delete_by_id(item.id)
                    .exec(&self.db)
                    .await?;
                return Ok(if result.rows_affected > 0 {
                    RecordedAttempt::Removed
                } else {
                    RecordedAttempt::Stale
                });
            }
            AttemptOutcome::Failed(error) => error,
        };

        let attempt_count = item.attempt_count.saturating_add(1);
        let attempt = u32::try_from(attempt_count).unwrap_or(u32::MAX);
        let next_retry_at = self
            .backoff
            .next_retry_at(attempt, now)
            .max(item.next_retry_at);
        let history = Self::append_history(item, attempt_count, error, now)?;

        let result = dead_letter_item::Entity::update_many()
            .col_expr(Column::AttemptCount, Expr::value(attempt_count))
            .col_expr(Column::LastError, Expr::value(Some(error.clone())))
            .col_expr(Column::NextRetryAt, Expr::value(next_retry_at))
            .col_expr(Column::RetryHistory, Expr::value(history))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(item.id))
            .filter(Column::AttemptCount.eq(item.attempt_count))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Ok(RecordedAttempt::Stale);
        }

        if attempt_count >= item.max_retries {
            Ok(RecordedAttempt::Exhausted { attempt_count })
        } else {
            Ok(RecordedAttempt::Rescheduled {
                attempt_count,
                next_retry_at,
            })
        }
    }

    async fn remove(&self, id: i32) -> Result<bool, StoreError> {
        let result = dead_letter_item::Entity::delete_by_id(id)
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn requeue(&self, id: i32, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = dead_letter_item::Entity::update_many()
            .col_expr(Column::AttemptCount, Expr::value(0))
            .col_expr(Column::NextRetryAt, Expr::value(now))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn stats(&self) -> Result<DlqStats, StoreError> {
        let groups: Vec<(String, i64, i64)> = dead_letter_item::Entity::find()
            .select_only()
            .column(Column::EventType)
            .column_as(Expr::cust("COUNT(*)"), "count")
            .column_as(
                Expr::cust("SUM(CASE WHEN attempt_count >= max_retries THEN 1 ELSE 0 END)"),
                "exhausted",
            )
            .group_by(Column::EventType)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(DlqStats::from_groups(groups))
    }
}
