//! Append-only status events attached to a shipment.

use super::shipment::ShipmentId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A timestamped history entry.
///
/// Events are never updated or deleted. Insertion order is the only
/// ordering guarantee.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct HistoryEvent {
    /// Shipment this event belongs to.
    #[sqlx(rename = "package_id")]
    #[serde(skip_serializing)]
    pub shipment_id: ShipmentId,

    /// Free-form status text (e.g. "dropped off").
    pub info: String,

    /// Where the event happened.
    pub location: String,

    /// Assigned by the server at insert time.
    pub time: DateTime<Utc>,
}
