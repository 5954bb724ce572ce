//! `POST /keys/validate`: lets a client check a key before using it.

use crate::{errors::AppError, services::AppState};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidateKeyReq {
    pub key: String,
}

/// 200 with an empty body if the key is registered, 401 otherwise.
pub async fn validate_key(
    State(state): State<AppState>,
    payload: Result<Json<ValidateKeyReq>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(req) = payload?;
    if state.auth.is_key_present(&req.key).await? {
        Ok(StatusCode::OK)
    } else {
        Err(AppError::unauthorized())
    }
}
