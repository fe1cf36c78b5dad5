//! nodescore-core: Core types for the nodescore placement optimizer
//!
//! This crate provides the fundamental types used throughout nodescore:
//! - Metric samples, averaged and normalized metrics
//! - Scores, ledger records and placement decisions
//! - Configuration types
//! - Error handling

pub mod config;
pub mod error;
pub mod model;

pub use config::*;
pub use error::*;
pub use model::*;
