//! Business rules of the tracking service.
//!
//! Control flow for every request: tracking number codec, then
//! authorization, then the shipment or history rule, then the store.

use crate::store::{StoreError, TrackingStore};
use std::sync::Arc;
use thiserror::Error;

pub mod auth_service;
pub mod history_service;
pub mod shipment_service;
pub mod tracking_id;

use auth_service::AuthService;
use history_service::HistoryService;
use shipment_service::ShipmentService;
use tracking_id::TrackingIdError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    InvalidTrackingNumber(#[from] TrackingIdError),
    #[error("unauthorized")]
    Unauthorized,
    #[error("shipment not found")]
    NotFound,
    #[error("shipment has already been delivered")]
    AlreadyDelivered,
    #[error("handler `{0}` is not a registered operator")]
    InvalidHandler(String),
    #[error("nothing to update")]
    NothingToUpdate,
    #[error("country code `{0}` must be two ASCII letters")]
    InvalidCountryCode(String),
    #[error("operator name must not be empty")]
    InvalidOperatorName,
    #[error("shipment id {0} does not fit in a tracking number")]
    SequenceExhausted(i64),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TrackingStore>,
    pub auth: AuthService,
    pub shipments: ShipmentService,
    pub history: HistoryService,
}

impl AppState {
    pub fn new(store: Arc<dyn TrackingStore>) -> Self {
        let auth = AuthService::new(store.clone());
        let shipments = ShipmentService::new(store.clone(), auth.clone());
        let history = HistoryService::new(store.clone(), auth.clone(), shipments.clone());
        Self {
            store,
            auth,
            shipments,
            history,
        }
    }
}
