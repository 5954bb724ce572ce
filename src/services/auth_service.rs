//! Resolves API keys to operators and gates access to shipments.
//!
//! All lookups are stateless; the identity data lives in the store.

use super::{ServiceError, ServiceResult, tracking_id};
use crate::{
    models::{
        api_key::{ApiKey, Operator},
        shipment::{Shipment, ShipmentId},
    },
    store::TrackingStore,
};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

pub const API_KEY_LEN: usize = 39;
const API_KEY_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn TrackingStore>,
}

impl AuthService {
    pub fn new(store: Arc<dyn TrackingStore>) -> Self {
        Self { store }
    }

    pub async fn is_key_present(&self, key: &str) -> ServiceResult<bool> {
        Ok(self.store.api_key(key).await?.is_some())
    }

    pub async fn resolve_operator(&self, key: &str) -> ServiceResult<Option<Operator>> {
        Ok(self.store.api_key(key).await?.map(|k| k.operator()))
    }

    /// Like `resolve_operator`, but a missing key is an error.
    pub async fn require_operator(&self, key: &str) -> ServiceResult<Operator> {
        match self.resolve_operator(key).await? {
            Some(operator) => Ok(operator),
            None => {
                warn!("rejected unknown API key");
                Err(ServiceError::Unauthorized)
            }
        }
    }

    /// Snapshot of shipment `id` if the operator owning `key` is its handler.
    ///
    /// `None` does not say whether the key, the shipment or the handler
    /// check failed; callers must answer all three the same way.
    pub async fn authorize_for_shipment(
        &self,
        id: ShipmentId,
        key: &str,
    ) -> ServiceResult<Option<Shipment>> {
        let snapshot = self.store.shipment_for_key(id, key).await?;
        if snapshot.is_none() {
            warn!(shipment_id = id, "key not authorized for shipment");
        }
        Ok(snapshot)
    }

    pub async fn is_handler_valid(&self, operator_name: &str) -> ServiceResult<bool> {
        if operator_name.is_empty() {
            return Ok(false);
        }
        Ok(self.store.operator_exists(operator_name).await?)
    }

    /// Register a fresh key for `operator_name` and return it.
    pub async fn issue_key(
        &self,
        operator_name: &str,
        country_code: &str,
    ) -> ServiceResult<String> {
        let country_code = country_code.trim().to_ascii_uppercase();
        if !tracking_id::is_country_code(&country_code) {
            return Err(ServiceError::InvalidCountryCode(country_code));
        }
        let operator_name = operator_name.trim();
        if operator_name.is_empty() {
            return Err(ServiceError::InvalidOperatorName);
        }

        let key = generate_api_key();
        self.store
            .insert_api_key(ApiKey {
                key: key.clone(),
                operator_name: operator_name.to_string(),
                country_code: country_code.clone(),
            })
            .await?;
        info!(operator = operator_name, country_code = %country_code, "issued API key");
        Ok(key)
    }
}

/// 39 characters drawn uniformly from `[A-Za-z0-9_-]`.
pub fn generate_api_key() -> String {
    let mut rng = rand::thread_rng();
    (0..API_KEY_LEN)
        .map(|_| API_KEY_CHARSET[rng.gen_range(0..API_KEY_CHARSET.len())] as char)
        .collect()
}
