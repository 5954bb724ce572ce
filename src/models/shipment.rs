//! Shipment records and the inputs used to create or modify them.

use super::history::HistoryEvent;
use serde::Serialize;
use sqlx::FromRow;

/// Store-internal numeric key of a shipment. SQLite rowids are signed.
pub type ShipmentId = i64;

/// Largest id a nine-digit tracking number can carry. Stores refuse to
/// assign anything above it.
pub const MAX_SHIPMENT_ID: ShipmentId = 999_999_999;

/// One row of the `tracking` table.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Shipment {
    pub id: ShipmentId,

    /// Copied from the creating operator; immutable after creation.
    pub country_code: String,

    pub sender: String,
    pub receiver: String,
    pub express: bool,
    pub signature: bool,
    pub abandon: bool,

    /// Once true, the shipment is locked against further mutation.
    pub delivered: bool,

    /// Operator currently responsible for the shipment.
    pub handler: Option<String>,
}

impl Shipment {
    pub fn is_handled_by(&self, operator_name: &str) -> bool {
        self.handler.as_deref() == Some(operator_name)
    }
}

/// Fields persisted by the create operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShipment {
    pub country_code: String,
    pub sender: String,
    pub receiver: String,
    pub express: bool,
    pub signature: bool,
    pub abandon: bool,
    pub handler: String,
}

/// A partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipmentPatch {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub express: Option<bool>,
    pub signature: Option<bool>,
    pub abandon: Option<bool>,
    pub delivered: Option<bool>,
    pub handler: Option<String>,
}

impl ShipmentPatch {
    /// Empty strings mean "no change" for the text columns.
    pub fn without_empty_strings(mut self) -> Self {
        for field in [&mut self.sender, &mut self.receiver, &mut self.handler] {
            if field.as_deref() == Some("") {
                *field = None;
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_none()
            && self.receiver.is_none()
            && self.express.is_none()
            && self.signature.is_none()
            && self.abandon.is_none()
            && self.delivered.is_none()
            && self.handler.is_none()
    }

    /// Apply the patch to an in-memory copy of a row.
    pub fn apply_to(&self, shipment: &mut Shipment) {
        if let Some(sender) = &self.sender {
            shipment.sender = sender.clone();
        }
        if let Some(receiver) = &self.receiver {
            shipment.receiver = receiver.clone();
        }
        if let Some(express) = self.express {
            shipment.express = express;
        }
        if let Some(signature) = self.signature {
            shipment.signature = signature;
        }
        if let Some(abandon) = self.abandon {
            shipment.abandon = abandon;
        }
        if let Some(delivered) = self.delivered {
            shipment.delivered = delivered;
        }
        if let Some(handler) = &self.handler {
            shipment.handler = Some(handler.clone());
        }
    }
}

/// Consolidated read view: the record, its tracking number and its history.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ShipmentWithHistory {
    pub tracking_number: String,

    #[serde(flatten)]
    pub shipment: Shipment,

    pub history: Vec<HistoryEvent>,
}
