//! Normalization of upstream load webhooks.
//!
//! The upstream system sends the same event family in slightly different shapes:
//! the reference number may sit at the top level or under `data`, and a status
//! change may arrive as `data.status` or `data.changedValues.status`. Everything
//! is flattened into [`LoadUpdate`] once, so handlers never look at raw JSON.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Flat view of the fields the reconciler cares about.
///
/// Every field is optional: absent, empty, or wrongly typed values become `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadUpdate {
    pub reference_number: Option<String>,
    /// Upstream record id (`data._id`).
    pub upstream_id: Option<String>,
    pub container_no: Option<String>,
    /// Raw upstream status, not yet mapped.
    pub status: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub delivery_window_start: Option<DateTime<Utc>>,
    pub pickup_window_start: Option<DateTime<Utc>>,
    pub container_size: Option<String>,
    pub chassis_no: Option<String>,
    pub seal_no: Option<String>,
}

impl LoadUpdate {
    /// Parse a stored webhook body and normalize it.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::from_payload(&value))
    }

    /// Normalize an already-parsed webhook body. Total over all JSON values.
    pub fn from_payload(payload: &Value) -> Self {
        let data = payload.get("data");
        let field = |name: &str| data.and_then(|d| d.get(name));
        let caller = field("caller");

        Self {
            reference_number: text(payload.get("reference_number"))
                .or_else(|| text(field("reference_number"))),
            upstream_id: text(field("_id")),
            container_no: text(field("containerNo")),
            status: text(field("changedValues").and_then(|c| c.get("status")))
                .or_else(|| text(field("status"))),
            customer_name: text(caller.and_then(|c| c.get("company_name"))),
            customer_email: text(caller.and_then(|c| c.get("email"))),
            delivery_window_start: first_window(field("deliveryTimes"), "deliveryFromTime"),
            pickup_window_start: first_window(field("pickupTimes"), "pickupFromTime"),
            container_size: text(field("containerSize")),
            chassis_no: text(field("chassisNo")),
            seal_no: text(field("sealNo")),
        }
    }
}

/// Reads a JSON string or number as trimmed, non-empty text.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads an RFC 3339 string or epoch milliseconds.
fn timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn first_window(windows: Option<&Value>, key: &str) -> Option<DateTime<Utc>> {
    timestamp(windows?.as_array()?.first()?.get(key))
}
