//! # Sync Module
//!
//! Bulk reconciliation of the local user store with the identity provider:
//! mapping backfill by email, remote user import, and a status diff.

pub mod handlers;
pub mod models;
pub mod reconciler;
pub mod routes;


pub use models::SyncError;
pub use reconciler::{mapping_status, reconcile_mappings};
pub use routes::sync_routes;
