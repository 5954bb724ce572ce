//! Create, read and patch shipments.
//!
//! The delivered lock lives here: `ensure_open` is the single check used by
//! both patching and history appends.

use super::{
    ServiceError, ServiceResult,
    auth_service::AuthService,
    tracking_id,
};
use crate::{
    models::{
        api_key::Operator,
        shipment::{NewShipment, Shipment, ShipmentId, ShipmentPatch, ShipmentWithHistory},
    },
    store::{StoreError, TrackingStore},
};
use std::sync::Arc;
use tracing::{error, info};

/// Caller-supplied fields for a new shipment. Flags default to false.
#[derive(Debug, Clone, Default)]
pub struct CreateShipment {
    pub sender: String,
    pub receiver: String,
    pub express: Option<bool>,
    pub signature: Option<bool>,
    pub abandon: Option<bool>,
}

#[derive(Clone)]
pub struct ShipmentService {
    store: Arc<dyn TrackingStore>,
    auth: AuthService,
}

impl ShipmentService {
    pub fn new(store: Arc<dyn TrackingStore>, auth: AuthService) -> Self {
        Self { store, auth }
    }

    /// Create a shipment owned by `operator`.
    ///
    /// `country_code` and `handler` always come from the operator, never
    /// from the request.
    pub async fn create(
        &self,
        operator: &Operator,
        fields: CreateShipment,
    ) -> ServiceResult<Shipment> {
        let inserted = self
            .store
            .insert_shipment(NewShipment {
                country_code: operator.country_code.clone(),
                sender: fields.sender,
                receiver: fields.receiver,
                express: fields.express.unwrap_or(false),
                signature: fields.signature.unwrap_or(false),
                abandon: fields.abandon.unwrap_or(false),
                handler: operator.name.clone(),
            })
            .await;
        let shipment = match inserted {
            Ok(shipment) => shipment,
            Err(StoreError::IdSpaceExhausted(id)) => {
                error!(shipment_id = id, "shipment id exceeds tracking number width");
                return Err(ServiceError::SequenceExhausted(id));
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            shipment_id = shipment.id,
            handler = %operator.name,
            "created shipment"
        );
        Ok(shipment)
    }

    /// Resolve `key` and create on behalf of its operator.
    pub async fn create_with_key(
        &self,
        key: &str,
        fields: CreateShipment,
    ) -> ServiceResult<Shipment> {
        let operator = self.auth.require_operator(key).await?;
        self.create(&operator, fields).await
    }

    /// Public read: the record plus its full history.
    pub async fn get(&self, id: ShipmentId) -> ServiceResult<Option<ShipmentWithHistory>> {
        let Some(shipment) = self.store.shipment(id).await? else {
            return Ok(None);
        };
        let history = self.store.history(id).await?;
        Ok(Some(ShipmentWithHistory {
            tracking_number: tracking_id::format(&shipment.country_code, shipment.id),
            shipment,
            history,
        }))
    }

    /// Patch fields of a shipment the caller handles.
    pub async fn patch(
        &self,
        id: ShipmentId,
        key: &str,
        patch: ShipmentPatch,
    ) -> ServiceResult<Shipment> {
        let Some(snapshot) = self.auth.authorize_for_shipment(id, key).await? else {
            return Err(ServiceError::Unauthorized);
        };
        self.ensure_open(&snapshot)?;

        if let Some(handler) = patch.handler.as_deref().filter(|h| !h.is_empty()) {
            if !self.auth.is_handler_valid(handler).await? {
                return Err(ServiceError::InvalidHandler(handler.to_string()));
            }
        }

        let patch = patch.without_empty_strings();
        if patch.is_empty() {
            return Err(ServiceError::NothingToUpdate);
        }

        let operator = snapshot.handler.as_deref().unwrap_or_default();
        match self.store.update_shipment(id, operator, &patch).await? {
            Some(updated) => {
                if updated.delivered {
                    info!(shipment_id = id, "shipment marked delivered");
                }
                Ok(updated)
            }
            None => Err(self.diagnose_refused_write(id).await?),
        }
    }

    /// Fail with `AlreadyDelivered` once the lock is set.
    pub fn ensure_open(&self, shipment: &Shipment) -> ServiceResult<()> {
        if shipment.delivered {
            Err(ServiceError::AlreadyDelivered)
        } else {
            Ok(())
        }
    }

    /// Explain why a conditional write touched no row after authorization
    /// had succeeded: the row vanished, was delivered, or changed hands.
    pub(crate) async fn diagnose_refused_write(
        &self,
        id: ShipmentId,
    ) -> ServiceResult<ServiceError> {
        Ok(match self.store.shipment(id).await? {
            None => ServiceError::NotFound,
            Some(current) if current.delivered => ServiceError::AlreadyDelivered,
            Some(_) => ServiceError::Unauthorized,
        })
    }
}
