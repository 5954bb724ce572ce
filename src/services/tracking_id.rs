//! Tracking number codec.
//!
//! The external identifier is two uppercase ASCII letters followed by a
//! nine-digit, zero-padded shipment id, e.g. `US000000001`. The prefix is
//! informational; lookups only use the numeric part.

use crate::models::shipment::{MAX_SHIPMENT_ID, ShipmentId};
use std::{fmt, str::FromStr};
use thiserror::Error;

pub const COUNTRY_CODE_LEN: usize = 2;
pub const SEQUENCE_DIGITS: usize = 9;
pub const TRACKING_NUMBER_LEN: usize = COUNTRY_CODE_LEN + SEQUENCE_DIGITS;

/// Largest id that fits in the nine-digit sequence.
pub const MAX_SEQUENCE: ShipmentId = MAX_SHIPMENT_ID;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tracking number `{0}` must be 2 uppercase letters followed by 9 digits")]
pub struct TrackingIdError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingNumber {
    pub country_code: String,
    pub id: ShipmentId,
}

impl TrackingNumber {
    pub fn new(country_code: impl Into<String>, id: ShipmentId) -> Self {
        Self {
            country_code: country_code.into(),
            id,
        }
    }

    /// Parse `^[A-Z]{2}\d{9}$`.
    pub fn parse(raw: &str) -> Result<Self, TrackingIdError> {
        let bytes = raw.as_bytes();
        if bytes.len() != TRACKING_NUMBER_LEN {
            return Err(TrackingIdError(raw.to_string()));
        }
        let (prefix, digits) = bytes.split_at(COUNTRY_CODE_LEN);
        if !prefix.iter().all(u8::is_ascii_uppercase) || !digits.iter().all(u8::is_ascii_digit) {
            return Err(TrackingIdError(raw.to_string()));
        }

        // Nine ASCII digits always fit in an i64.
        let id = digits
            .iter()
            .fold(0, |acc: ShipmentId, d| acc * 10 + ShipmentId::from(d - b'0'));

        Ok(Self {
            country_code: raw[..COUNTRY_CODE_LEN].to_string(),
            id,
        })
    }
}

impl FromStr for TrackingNumber {
    type Err = TrackingIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(&self.country_code, self.id))
    }
}

/// Concatenate a country code and a zero-padded id. Does not validate.
pub fn format(country_code: &str, id: ShipmentId) -> String {
    format!("{country_code}{id:0width$}", width = SEQUENCE_DIGITS)
}

/// True iff `code` is exactly two uppercase ASCII letters.
pub fn is_country_code(code: &str) -> bool {
    code.len() == COUNTRY_CODE_LEN && code.bytes().all(|b| b.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_numbers() {
        let parsed = TrackingNumber::parse("US000000001").unwrap();
        assert_eq!(parsed, TrackingNumber::new("US", 1));

        let parsed: TrackingNumber = "DE123456789".parse().unwrap();
        assert_eq!(parsed.country_code, "DE");
        assert_eq!(parsed.id, 123_456_789);
    }

    #[test]
    fn rejects_malformed_numbers() {
        for raw in [
            "",
            "US",
            "us000000001",
            "U5000000001",
            "US00000001",
            "US0000000001",
            "US00000000A",
            "USA00000001",
            " US00000001",
            "US000000001 ",
            "ÜS000000001",
            "US-00000001",
        ] {
            assert!(TrackingNumber::parse(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn formats_with_nine_digit_padding() {
        assert_eq!(format("US", 1), "US000000001");
        assert_eq!(format("JP", MAX_SEQUENCE), "JP999999999");
        assert_eq!(TrackingNumber::new("FR", 42).to_string(), "FR000000042");
    }

    #[test]
    fn format_then_parse_is_identity_within_range() {
        for id in [0, 1, 10, 123_456, MAX_SEQUENCE] {
            let formatted = format("NL", id);
            assert_eq!(TrackingNumber::parse(&formatted).unwrap(), TrackingNumber::new("NL", id));
        }
    }

    #[test]
    fn country_code_check() {
        assert!(is_country_code("US"));
        assert!(!is_country_code("us"));
        assert!(!is_country_code("USA"));
        assert!(!is_country_code("U1"));
    }
}
