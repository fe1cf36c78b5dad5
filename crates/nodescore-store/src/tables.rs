//! redb table definitions.
//!
//! Values are JSON-serialized domain types.

use redb::TableDefinition;

/// Ledger rows keyed by node name.
pub const SCORES: TableDefinition<&str, &[u8]> = TableDefinition::new("scores");

/// Raw samples keyed by `{node}/{timestamp_micros:020}/{seq:020}`.
pub const METRICS_LOG: TableDefinition<&str, &[u8]> = TableDefinition::new("metrics_log");
