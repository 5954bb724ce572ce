//! Core data models for the package-tracking service.
//!
//! These entities mirror the three tables of the schema (`apikeys`,
//! `tracking`, `history`). They map to rows via `sqlx::FromRow` and
//! serialize as JSON via `serde`.

pub mod api_key;
pub mod history;
pub mod shipment;
