//! Applies upstream load webhooks to the shipment datastore.
//!
//! Every handler is idempotent and writes only the fields present in the payload,
//! so a redelivered or reordered event converges to the same record. Business
//! gaps (no reference, nothing to change, record not created yet) are reported as
//! [`ReconcileOutcome::Skipped`]; only datastore and payload-decoding failures are
//! errors worth retrying.

pub mod shipments;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{EventType, LoadUpdate, map_upstream_status};
use sea_orm::DbErr;
use thiserror::Error;
use tracing::{debug, instrument};

pub use shipments::{
    InsertOutcome, NewShipment, ShipmentPatch, ShipmentRepository, ShipmentStore, new_tracking_id,
};

pub const PLACEHOLDER_CONTAINER_NO: &str = "TBD";
pub const PLACEHOLDER_CUSTOMER_NAME: &str = "Unknown customer";

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("shipment store error: {0}")]
    Store(#[from] DbErr),
}

/// Why an event was accepted without changing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnknownEventType,
    MissingReference,
    AlreadyExists,
    NoChanges,
    TargetMissing,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnknownEventType => "unknown_event_type",
            Self::MissingReference => "missing_reference",
            Self::AlreadyExists => "already_exists",
            Self::NoChanges => "no_changes",
            Self::TargetMissing => "target_missing",
        })
    }
}

/// Successful reconciliation. Both variants remove the item from the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied,
    Skipped(SkipReason),
}

pub struct EventReconciler {
    shipments: Arc<dyn ShipmentStore>,
}

impl EventReconciler {
    pub fn new(shipments: Arc<dyn ShipmentStore>) -> Self {
        Self { shipments }
    }

    /// Decode a stored webhook body and apply it.
    ///
    /// Unknown event types are drained without looking at the payload. The
    /// reference number recorded at enqueue time is used when the body has none.
    pub async fn reconcile_payload(
        &self,
        event_type: &str,
        payload: &str,
        stored_reference: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let event_type = EventType::parse(event_type);
        if !event_type.is_known() {
            return Ok(ReconcileOutcome::Skipped(SkipReason::UnknownEventType));
        }

        let mut update = LoadUpdate::parse(payload)?;
        if update.reference_number.is_none() {
            update.reference_number = stored_reference
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string);
        }
        self.reconcile(&event_type, &update, now).await
    }

    #[instrument(skip(self, update), fields(reference_number = ?update.reference_number))]
    pub async fn reconcile(
        &self,
        event_type: &EventType,
        update: &LoadUpdate,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let outcome = match event_type {
            EventType::LoadCreated => self.create(update, now).await?,
            EventType::LoadStatusUpdated => {
                let patch = ShipmentPatch {
                    status: update.status.as_deref().map(|s| map_upstream_status(Some(s))),
                    ..Default::default()
                };
                self.patch(update, patch, now).await?
            }
            EventType::LoadInfoUpdated | EventType::LoadDatesUpdated => {
                let patch = ShipmentPatch {
                    delivery_window_start: update.delivery_window_start,
                    pickup_window_start: update.pickup_window_start,
                    container_size: update.container_size.clone(),
                    ..Default::default()
                };
                self.patch(update, patch, now).await?
            }
            EventType::LoadEquipmentUpdated => {
                let patch = ShipmentPatch {
                    container_no: update.container_no.clone(),
                    chassis_no: update.chassis_no.clone(),
                    seal_no: update.seal_no.clone(),
                    ..Default::default()
                };
                self.patch(update, patch, now).await?
            }
            EventType::Unknown(_) => ReconcileOutcome::Skipped(SkipReason::UnknownEventType),
        };

        debug!(event_type = %event_type, outcome = ?outcome, "Reconciled event");
        Ok(outcome)
    }

    async fn create(
        &self,
        update: &LoadUpdate,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(reference) = update.reference_number.as_deref() else {
            return Ok(ReconcileOutcome::Skipped(SkipReason::MissingReference));
        };

        if self.shipments.find_by_reference(reference).await?.is_some() {
            return Ok(ReconcileOutcome::Skipped(SkipReason::AlreadyExists));
        }

        let new = NewShipment {
            tracking_id: new_tracking_id(),
            reference_number: reference.to_string(),
            upstream_id: update.upstream_id.clone(),
            container_no: update
                .container_no
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_CONTAINER_NO.to_string()),
            status: map_upstream_status(update.status.as_deref()),
            customer_name: update
                .customer_name
                .clone()
                .unwrap_or_else(|| PLACEHOLDER_CUSTOMER_NAME.to_string()),
            customer_email: update.customer_email.clone(),
            container_size: update.container_size.clone(),
            chassis_no: update.chassis_no.clone(),
            seal_no: update.seal_no.clone(),
            delivery_window_start: update.delivery_window_start,
            pickup_window_start: update.pickup_window_start,
        };

        // A concurrent delivery may win the insert between lookup and write.
        match self.shipments.insert(new, now).await? {
            InsertOutcome::Inserted => Ok(ReconcileOutcome::Applied),
            InsertOutcome::AlreadyExists => Ok(ReconcileOutcome::Skipped(SkipReason::AlreadyExists)),
        }
    }

    async fn patch(
        &self,
        update: &LoadUpdate,
        patch: ShipmentPatch,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(reference) = update.reference_number.as_deref() else {
            return Ok(ReconcileOutcome::Skipped(SkipReason::MissingReference));
        };
        if patch.is_empty() {
            return Ok(ReconcileOutcome::Skipped(SkipReason::NoChanges));
        }

        if self.shipments.apply_patch(reference, &patch, now).await? {
            Ok(ReconcileOutcome::Applied)
        } else {
            Ok(ReconcileOutcome::Skipped(SkipReason::TargetMissing))
        }
    }
}
