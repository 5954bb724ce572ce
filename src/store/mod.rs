//! Persistence seam for keys, shipments and history.
//!
//! Services hold an `Arc<dyn TrackingStore>` so the SQLite backend can be
//! swapped for the in-memory one in tests and local runs.

use crate::models::{
    api_key::ApiKey,
    history::HistoryEvent,
    shipment::{MAX_SHIPMENT_ID, NewShipment, Shipment, ShipmentId, ShipmentPatch},
};
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod sqlite;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("shipment id {0} exceeds {MAX_SHIPMENT_ID}")]
    IdSpaceExhausted(ShipmentId),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Look up a key record.
    async fn api_key(&self, key: &str) -> StoreResult<Option<ApiKey>>;

    /// True iff at least one key is registered to `operator_name`.
    async fn operator_exists(&self, operator_name: &str) -> StoreResult<bool>;

    async fn insert_api_key(&self, api_key: ApiKey) -> StoreResult<()>;

    /// Persist a new shipment; the store assigns the id.
    ///
    /// Fails with `IdSpaceExhausted`, writing nothing, once the next id
    /// would exceed `MAX_SHIPMENT_ID`.
    async fn insert_shipment(&self, shipment: NewShipment) -> StoreResult<Shipment>;

    async fn shipment(&self, id: ShipmentId) -> StoreResult<Option<Shipment>>;

    /// The shipment `id`, but only if its handler is the operator owning `key`.
    ///
    /// `None` covers an unknown key, an unknown shipment and a handler mismatch.
    async fn shipment_for_key(&self, id: ShipmentId, key: &str) -> StoreResult<Option<Shipment>>;

    /// Apply `patch` to the shipment only while its handler is still
    /// `handler` and it is not delivered. Returns the updated row, or `None`
    /// when no row satisfied the condition.
    async fn update_shipment(
        &self,
        id: ShipmentId,
        handler: &str,
        patch: &ShipmentPatch,
    ) -> StoreResult<Option<Shipment>>;

    /// All events of a shipment in insertion order.
    async fn history(&self, id: ShipmentId) -> StoreResult<Vec<HistoryEvent>>;

    /// Insert an event stamped with the current time, under the same
    /// condition as `update_shipment`.
    async fn append_history(
        &self,
        id: ShipmentId,
        handler: &str,
        info: &str,
        location: &str,
    ) -> StoreResult<Option<HistoryEvent>>;

    async fn health_check(&self) -> StoreResult<()>;

    fn backend_name(&self) -> &'static str;
}
