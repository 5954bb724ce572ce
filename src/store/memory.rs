//! In-memory implementation of `TrackingStore`.
//!
//! State lives in a single struct behind a `tokio::sync::RwLock`; each
//! conditional write checks and mutates under the same write guard, which
//! gives the same atomicity the SQLite backend gets from its `WHERE` clauses.
//! Nothing is durable.

use super::{StoreError, StoreResult, TrackingStore};
use crate::models::{
    api_key::ApiKey,
    history::HistoryEvent,
    shipment::{MAX_SHIPMENT_ID, NewShipment, Shipment, ShipmentId, ShipmentPatch},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct State {
    keys: HashMap<String, ApiKey>,
    shipments: BTreeMap<ShipmentId, Shipment>,
    history: Vec<HistoryEvent>,
    last_id: ShipmentId,
}

impl State {
    fn writable(&self, id: ShipmentId, handler: &str) -> bool {
        self.shipments
            .get(&id)
            .is_some_and(|s| s.is_handled_by(handler) && !s.delivered)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TrackingStore for MemoryStore {
    async fn api_key(&self, key: &str) -> StoreResult<Option<ApiKey>> {
        Ok(self.state.read().await.keys.get(key).cloned())
    }

    async fn operator_exists(&self, operator_name: &str) -> StoreResult<bool> {
        let state = self.state.read().await;
        Ok(state.keys.values().any(|k| k.operator_name == operator_name))
    }

    async fn insert_api_key(&self, api_key: ApiKey) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.keys.insert(api_key.key.clone(), api_key);
        Ok(())
    }

    async fn insert_shipment(&self, shipment: NewShipment) -> StoreResult<Shipment> {
        let mut state = self.state.write().await;
        let id = state.last_id + 1;
        if id > MAX_SHIPMENT_ID {
            return Err(StoreError::IdSpaceExhausted(id));
        }
        state.last_id = id;
        let row = Shipment {
            id,
            country_code: shipment.country_code,
            sender: shipment.sender,
            receiver: shipment.receiver,
            express: shipment.express,
            signature: shipment.signature,
            abandon: shipment.abandon,
            delivered: false,
            handler: Some(shipment.handler),
        };
        state.shipments.insert(row.id, row.clone());
        Ok(row)
    }

    async fn shipment(&self, id: ShipmentId) -> StoreResult<Option<Shipment>> {
        Ok(self.state.read().await.shipments.get(&id).cloned())
    }

    async fn shipment_for_key(&self, id: ShipmentId, key: &str) -> StoreResult<Option<Shipment>> {
        let state = self.state.read().await;
        let Some(api_key) = state.keys.get(key) else {
            return Ok(None);
        };
        Ok(state
            .shipments
            .get(&id)
            .filter(|s| s.is_handled_by(&api_key.operator_name))
            .cloned())
    }

    async fn update_shipment(
        &self,
        id: ShipmentId,
        handler: &str,
        patch: &ShipmentPatch,
    ) -> StoreResult<Option<Shipment>> {
        let mut state = self.state.write().await;
        if !state.writable(id, handler) {
            return Ok(None);
        }
        Ok(state.shipments.get_mut(&id).map(|row| {
            patch.apply_to(row);
            row.clone()
        }))
    }

    async fn history(&self, id: ShipmentId) -> StoreResult<Vec<HistoryEvent>> {
        let state = self.state.read().await;
        Ok(state
            .history
            .iter()
            .filter(|e| e.shipment_id == id)
            .cloned()
            .collect())
    }

    async fn append_history(
        &self,
        id: ShipmentId,
        handler: &str,
        info: &str,
        location: &str,
    ) -> StoreResult<Option<HistoryEvent>> {
        let mut state = self.state.write().await;
        if !state.writable(id, handler) {
            return Ok(None);
        }
        let event = HistoryEvent {
            shipment_id: id,
            info: info.to_string(),
            location: location.to_string(),
            time: Utc::now(),
        };
        state.history.push(event.clone());
        Ok(Some(event))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
