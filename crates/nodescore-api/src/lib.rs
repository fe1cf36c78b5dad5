//! nodescore-api: REST API server for nodescore
//!
//! This crate provides the HTTP query surface:
//! - Best node from the score ledger
//! - Ledger listing
//! - On-demand placement decisions
//! - System status

pub mod rest;

pub use rest::{create_router, AppState};
