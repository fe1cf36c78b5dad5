//! nodescore-store: Persisted state
//!
//! This crate owns the two durable structures of nodescore, each in its own
//! redb database file:
//! - `ScoreLedger`: latest score per node, written by the optimization cycle
//!   and read by the query path
//! - `SampleLog`: append-only raw metric samples, written by the collection
//!   cycle and read by the historical averager

pub mod ledger;
pub mod sample_log;
mod tables;

pub use ledger::{ScoreLedger, ScoreStore};
pub use sample_log::SampleLog;

use nodescore_core::NodescoreError;

/// Convert any `Display` error into a storage error
pub(crate) fn storage_err(e: impl std::fmt::Display) -> NodescoreError {
    NodescoreError::Storage(e.to_string())
}
