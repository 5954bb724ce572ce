//! Operator identities and the shared-secret keys that authenticate them.

use sqlx::FromRow;
use std::fmt;

/// A registered API key and the operator it identifies.
///
/// Keys are immutable once issued.
#[derive(Clone, FromRow, PartialEq, Eq)]
pub struct ApiKey {
    /// The shared secret presented by callers.
    pub key: String,

    /// Registered operator name (e.g. a carrier or agent).
    #[sqlx(rename = "operator")]
    pub operator_name: String,

    /// Two-letter country code stamped on every shipment this operator creates.
    pub country_code: String,
}

impl ApiKey {
    pub fn operator(&self) -> Operator {
        Operator {
            name: self.operator_name.clone(),
            country_code: self.country_code.clone(),
        }
    }
}

// Hand-written so the secret never ends up in logs.
impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("key", &"<redacted>")
            .field("operator_name", &self.operator_name)
            .field("country_code", &self.country_code)
            .finish()
    }
}

/// The identity a valid key resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub name: String,
    pub country_code: String,
}
