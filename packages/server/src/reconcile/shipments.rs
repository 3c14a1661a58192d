use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ShipmentStatus;
use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use uuid::Uuid;

use crate::entity::shipment::{self, Column};

/// Fields for a shipment created from a `load#created` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShipment {
    pub tracking_id: String,
    pub reference_number: String,
    pub upstream_id: Option<String>,
    pub container_no: String,
    pub status: ShipmentStatus,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub container_size: Option<String>,
    pub chassis_no: Option<String>,
    pub seal_no: Option<String>,
    pub delivery_window_start: Option<DateTime<Utc>>,
    pub pickup_window_start: Option<DateTime<Utc>>,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipmentPatch {
    pub status: Option<ShipmentStatus>,
    pub container_no: Option<String>,
    pub container_size: Option<String>,
    pub chassis_no: Option<String>,
    pub seal_no: Option<String>,
    pub delivery_window_start: Option<DateTime<Utc>>,
    pub pickup_window_start: Option<DateTime<Utc>>,
}

impl ShipmentPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A shipment with the same reference number already exists.
    AlreadyExists,
}

/// Business datastore the reconciler writes to.
#[async_trait]
pub trait ShipmentStore: Send + Sync {
    async fn find_by_reference(&self, reference: &str) -> Result<Option<shipment::Model>, DbErr>;

    async fn insert(&self, new: NewShipment, now: DateTime<Utc>) -> Result<InsertOutcome, DbErr>;

    /// Apply only the present fields of `patch` in one statement.
    /// Returns whether a shipment with that reference existed.
    async fn apply_patch(
        &self,
        reference: &str,
        patch: &ShipmentPatch,
        now: DateTime<Utc>,
    ) -> Result<bool, DbErr>;
}

/// `TRK-` followed by 12 uppercase hex characters.
pub fn new_tracking_id() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TRK-{}", &hex[..12])
}

pub struct ShipmentRepository {
    db: DatabaseConnection,
}

impl ShipmentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ShipmentStore for ShipmentRepository {
    async fn find_by_reference(&self, reference: &str) -> Result<Option<shipment::Model>, DbErr> {
        shipment::Entity::find()
            .filter(Column::ReferenceNumber.eq(reference))
            .one(&self.db)
            .await
    }

    async fn insert(&self, new: NewShipment, now: DateTime<Utc>) -> Result<InsertOutcome, DbErr> {
        let model = shipment::ActiveModel {
            tracking_id: Set(new.tracking_id),
            reference_number: Set(new.reference_number),
            upstream_id: Set(new.upstream_id),
            container_no: Set(new.container_no),
            status: Set(new.status),
            customer_name: Set(new.customer_name),
            customer_email: Set(new.customer_email),
            container_size: Set(new.container_size),
            chassis_no: Set(new.chassis_no),
            seal_no: Set(new.seal_no),
            delivery_window_start: Set(new.delivery_window_start),
            pickup_window_start: Set(new.pickup_window_start),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match model.insert(&self.db).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(InsertOutcome::AlreadyExists)
            }
            Err(e) => Err(e),
        }
    }

    async fn apply_patch(
        &self,
        reference: &str,
        patch: &ShipmentPatch,
        now: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let mut update = shipment::Entity::update_many()
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::ReferenceNumber.eq(reference));

        if let Some(status) = patch.status {
            update = update.col_expr(Column::Status, Expr::value(status.as_str()));
        }
        if let Some(container_no) = &patch.container_no {
            update = update.col_expr(Column::ContainerNo, Expr::value(container_no.clone()));
        }
        if let Some(size) = &patch.container_size {
            update = update.col_expr(Column::ContainerSize, Expr::value(size.clone()));
        }
        if let Some(chassis_no) = &patch.chassis_no {
            update = update.col_expr(Column::ChassisNo, Expr::value(chassis_no.clone()));
        }
        if let Some(seal_no) = &patch.seal_no {
            update = update.col_expr(Column::SealNo, Expr::value(seal_no.clone()));
        }
        if let Some(at) = patch.delivery_window_start {
            update = update.col_expr(Column::DeliveryWindowStart, Expr::value(at));
        }
        if let Some(at) = patch.pickup_window_start {
            update = update.col_expr(Column::PickupWindowStart, Expr::value(at));
        }

        let result = update.exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
