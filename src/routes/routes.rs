//! Routes for the tracking API.
//!
//! - `POST  /keys/validate` validate an API key
//! - `POST  /shipments` create a shipment
//! - `GET   /shipments/{tracking_number}` public read with history
//! - `PATCH /shipments/{tracking_number}` update mutable fields
//! - `POST  /shipments/{tracking_number}/history` append a history event

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        key_handlers::validate_key,
        shipment_handlers::{append_history, create_shipment, get_shipment, patch_shipment},
    },
    services::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build the router. Handlers share `AppState`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/keys/validate", post(validate_key))
        .route("/shipments", post(create_shipment))
        .route(
            "/shipments/{tracking_number}",
            get(get_shipment).patch(patch_shipment),
        )
        .route(
            "/shipments/{tracking_number}/history",
            post(append_history),
        )
}

/// Router with state attached, ready to serve.
pub fn app(state: AppState) -> Router {
    routes().with_state(state)
}
