//! Package tracking service: shipments, their history, and the operator
//! keys that gate writes to them.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
