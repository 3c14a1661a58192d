use common::ShipmentStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Minimal shipment record the webhook reconciler keeps in sync with upstream loads.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Platform-issued tracking identifier shown to customers.
    #[sea_orm(unique)]
    pub tracking_id: String,

    /// Cross-system correlation key shared with the upstream TMS.
    #[sea_orm(unique)]
    pub reference_number: String,

    pub upstream_id: Option<String>,

    pub container_no: String,

    pub status: ShipmentStatus,

    pub customer_name: String,

    pub customer_email: Option<String>,

    pub container_size: Option<String>,

    pub chassis_no: Option<String>,

    pub seal_no: Option<String>,

    /// Earliest delivery appointment (ETA).
    pub delivery_window_start: Option<DateTimeUtc>,

    /// Earliest pickup appointment.
    pub pickup_window_start: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
