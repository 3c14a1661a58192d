use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind tag carried by every operational alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum AlertKind {
    /// The dead-letter backlog exceeded its configured ceiling.
    #[serde(rename = "dlq_overflow")]
    DlqOverflow,
}

/// Alert sent to the operations channel when the backlog grows past its limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DlqAlert {
    pub kind: AlertKind,
    /// Total items in the queue.
    #[schema(example = 73)]
    pub count: u64,
    /// Item count per webhook event type.
    pub by_event_type: BTreeMap<String, u64>,
    /// Items that stopped retrying automatically.
    #[schema(example = 4)]
    pub max_retries_reached: u64,
    pub timestamp: DateTime<Utc>,
}

impl DlqAlert {
    pub fn overflow(
        count: u64,
        by_event_type: BTreeMap<String, u64>,
        max_retries_reached: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: AlertKind::DlqOverflow,
            count,
            by_event_type,
            max_retries_reached,
            timestamp,
        }
    }

    /// One-line human summary, used for log output.
    pub fn summary(&self) -> String {
        let breakdown = self
            .by_event_type
            .iter()
            .map(|(event_type, n)| format!("{event_type}={n}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Dead-letter queue holds {} items ({} at max retries): {}",
            self.count, self.max_retries_reached, breakdown
        )
    }
}
