#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a shipment as the platform tracks it.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    /// Known to the platform but not yet booked with a carrier.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "pending"))]
    Pending,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "booked"))]
    Booked,
    /// Container is waiting at the terminal.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "at_port"))]
    AtPort,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "in_transit"))]
    InTransit,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "out_for_delivery"))]
    OutForDelivery,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "delivered"))]
    Delivered,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "cancelled"))]
    Cancelled,
}

impl ShipmentStatus {
    /// All possible status values.
    pub const ALL: &'static [ShipmentStatus] = &[
        Self::Pending,
        Self::Booked,
        Self::AtPort,
        Self::InTransit,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Booked => "booked",
            Self::AtPort => "at_port",
            Self::InTransit => "in_transit",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for ShipmentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            ShipmentStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for ShipmentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShipmentStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError {
                invalid: s.to_string(),
            })
    }
}

/// Translate an upstream load status into the platform's status.
///
/// Upstream vocabulary is not contractually stable, so matching ignores case,
/// surrounding whitespace, and `-`/space vs `_` separators. Anything missing or
/// unrecognized maps to [`ShipmentStatus::Pending`].
pub fn map_upstream_status(raw: Option<&str>) -> ShipmentStatus {
    let Some(raw) = raw else {
        return ShipmentStatus::Pending;
    };

    let normalized: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();

    match normalized.as_str() {
        "BOOKED" | "ACCEPTED" | "ASSIGNED" | "DISPATCHED" => ShipmentStatus::Booked,
        "AT_PORT" | "AVAILABLE" | "ARRIVED_AT_PORT" | "VESSEL_ARRIVED" | "DISCHARGED"
        | "ENROUTE_TO_PICK_CONTAINER" | "ARRIVED_PICKUP" => ShipmentStatus::AtPort,
        "IN_TRANSIT" | "ENROUTE" | "PICKED_UP" | "DEPARTED_PICKUP"
        | "ENROUTE_TO_DROP_CONTAINER" | "DROPCONTAINER_DEPARTED" | "DROPPED" => {
            ShipmentStatus::InTransit
        }
        "OUT_FOR_DELIVERY" | "ENROUTE_TO_DELIVER_LOAD" | "ARRIVED_DELIVER" => {
            ShipmentStatus::OutForDelivery
        }
        "DELIVERED" | "COMPLETED" | "ENROUTE_TO_RETURN_LOAD" | "ARRIVED_RETURN" | "RETURNED" => {
            ShipmentStatus::Delivered
        }
        "CANCELLED" | "CANCELED" | "VOID" => ShipmentStatus::Cancelled,
        _ => ShipmentStatus::Pending,
    }
}
