//! Append-only shipment history.

use super::{
    ServiceError, ServiceResult, auth_service::AuthService, shipment_service::ShipmentService,
};
use crate::{
    models::{history::HistoryEvent, shipment::ShipmentId},
    store::TrackingStore,
};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct HistoryService {
    store: Arc<dyn TrackingStore>,
    auth: AuthService,
    shipments: ShipmentService,
}

impl HistoryService {
    pub fn new(
        store: Arc<dyn TrackingStore>,
        auth: AuthService,
        shipments: ShipmentService,
    ) -> Self {
        Self {
            store,
            auth,
            shipments,
        }
    }

    /// Record an event for a shipment the caller handles.
    ///
    /// The timestamp is assigned by the store. Delivered shipments refuse
    /// new events and nothing is written.
    pub async fn append(
        &self,
        id: ShipmentId,
        key: &str,
        info: &str,
        location: &str,
    ) -> ServiceResult<HistoryEvent> {
        let Some(snapshot) = self.auth.authorize_for_shipment(id, key).await? else {
            return Err(ServiceError::Unauthorized);
        };
        self.shipments.ensure_open(&snapshot)?;

        let handler = snapshot.handler.as_deref().unwrap_or_default();
        match self.store.append_history(id, handler, info, location).await? {
            Some(event) => {
                debug!(shipment_id = id, "appended history event");
                Ok(event)
            }
            None => Err(self.shipments.diagnose_refused_write(id).await?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{api_key::ApiKey, shipment::ShipmentPatch},
        services::AppState,
        services::shipment_service::CreateShipment,
        store::memory::MemoryStore,
    };

    async fn state() -> AppState {
        let store: Arc<dyn TrackingStore> = Arc::new(MemoryStore::new());
        for (key, operator) in [("good", "SCUMBAG"), ("other", "MAILWIND")] {
            store
                .insert_api_key(ApiKey {
                    key: key.into(),
                    operator_name: operator.into(),
                    country_code: "US".into(),
                })
                .await
                .unwrap();
        }
        AppState::new(store)
    }

    async fn create(state: &AppState) -> ShipmentId {
        state
            .shipments
            .create_with_key(
                "good",
                CreateShipment {
                    sender: "A".into(),
                    receiver: "B".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn appended_events_show_up_in_order() {
        let state = state().await;
        let id = create(&state).await;

        let first = state.history.append(id, "good", "dropped off", "depot").await.unwrap();
        state.history.append(id, "good", "in transit", "hub").await.unwrap();
        assert_eq!(first.shipment_id, id);

        let view = state.shipments.get(id).await.unwrap().expect("shipment");
        let entries: Vec<_> = view
            .history
            .iter()
            .map(|e| (e.info.as_str(), e.location.as_str()))
            .collect();
        assert_eq!(entries, [("dropped off", "depot"), ("in transit", "hub")]);
        assert!(view.history[0].time <= view.history[1].time);
    }

    #[tokio::test]
    async fn non_handler_cannot_append() {
        let state = state().await;
        let id = create(&state).await;
        for key in ["other", "missing"] {
            let err = state.history.append(id, key, "x", "y").await.unwrap_err();
            assert!(matches!(err, ServiceError::Unauthorized));
        }
        assert!(state.store.history(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivered_shipment_rejects_events() {
        let state = state().await;
        let id = create(&state).await;
        state.history.append(id, "good", "dropped off", "depot").await.unwrap();
        state
            .shipments
            .patch(
                id,
                "good",
                ShipmentPatch {
                    delivered: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = state.history.append(id, "good", "late scan", "depot").await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyDelivered));
        assert_eq!(state.store.history(id).await.unwrap().len(), 1);
    }
}
