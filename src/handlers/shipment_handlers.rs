//! HTTP handlers for shipments and their history.
//!
//! The tracking number in the path is parsed before the body is looked at,
//! and the body is checked before any store call.

use crate::{
    errors::AppError,
    models::shipment::{ShipmentPatch, ShipmentWithHistory},
    services::{
        AppState,
        shipment_service::CreateShipment,
        tracking_id::{self, TrackingNumber},
    },
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Optional body fields may be left out, but an explicit `null` is rejected.
fn non_null<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Body of `POST /shipments`. Country code and handler are server-derived.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateShipmentReq {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    pub sender: String,
    pub receiver: String,
    #[serde(default, deserialize_with = "non_null")]
    pub express: Option<bool>,
    #[serde(default, deserialize_with = "non_null")]
    pub signature: Option<bool>,
    #[serde(default, deserialize_with = "non_null")]
    pub abandon: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CreateShipmentResp {
    /// The tracking number of the new shipment.
    pub id: String,
}

/// Body of `PATCH /shipments/{trackingNumber}`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchShipmentReq {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(default, deserialize_with = "non_null")]
    pub sender: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub receiver: Option<String>,
    #[serde(default, deserialize_with = "non_null")]
    pub express: Option<bool>,
    #[serde(default, deserialize_with = "non_null")]
    pub signature: Option<bool>,
    #[serde(default, deserialize_with = "non_null")]
    pub abandon: Option<bool>,
    #[serde(default, deserialize_with = "non_null")]
    pub delivered: Option<bool>,
    #[serde(default, deserialize_with = "non_null")]
    pub handler: Option<String>,
}

impl PatchShipmentReq {
    fn into_parts(self) -> (String, ShipmentPatch) {
        let patch = ShipmentPatch {
            sender: self.sender,
            receiver: self.receiver,
            express: self.express,
            signature: self.signature,
            abandon: self.abandon,
            delivered: self.delivered,
            handler: self.handler,
        };
        (self.api_key, patch)
    }
}

/// Body of `POST /shipments/{trackingNumber}/history`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppendHistoryReq {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    pub info: String,
    pub location: String,
}

/// `POST /shipments`: create a shipment for the key's operator.
pub async fn create_shipment(
    State(state): State<AppState>,
    payload: Result<Json<CreateShipmentReq>, JsonRejection>,
) -> Result<Json<CreateShipmentResp>, AppError> {
    let Json(req) = payload?;
    let shipment = state
        .shipments
        .create_with_key(
            &req.api_key,
            CreateShipment {
                sender: req.sender,
                receiver: req.receiver,
                express: req.express,
                signature: req.signature,
                abandon: req.abandon,
            },
        )
        .await?;

    Ok(Json(CreateShipmentResp {
        id: tracking_id::format(&shipment.country_code, shipment.id),
    }))
}

/// `GET /shipments/{trackingNumber}`: public read of record and history.
pub async fn get_shipment(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
) -> Result<Json<ShipmentWithHistory>, AppError> {
    let tn = TrackingNumber::parse(&tracking_number)?;
    match state.shipments.get(tn.id).await? {
        Some(view) => Ok(Json(view)),
        None => Err(AppError::not_found(format!(
            "no shipment with tracking number {}",
            tracking_number
        ))),
    }
}

/// `PATCH /shipments/{trackingNumber}`: update mutable fields.
pub async fn patch_shipment(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
    payload: Result<Json<PatchShipmentReq>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let tn = TrackingNumber::parse(&tracking_number)?;
    let Json(req) = payload?;
    let (api_key, patch) = req.into_parts();

    state.shipments.patch(tn.id, &api_key, patch).await?;
    Ok(StatusCode::OK)
}

/// `POST /shipments/{trackingNumber}/history`: append an event.
pub async fn append_history(
    State(state): State<AppState>,
    Path(tracking_number): Path<String>,
    payload: Result<Json<AppendHistoryReq>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let tn = TrackingNumber::parse(&tracking_number)?;
    let Json(req) = payload?;

    state
        .history
        .append(tn.id, &req.api_key, &req.info, &req.location)
        .await?;
    Ok(StatusCode::OK)
}
