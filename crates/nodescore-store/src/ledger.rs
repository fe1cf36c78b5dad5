//! Score ledger: latest score per node.
//!
//! Each `upsert` runs in its own redb write transaction, so a row is always
//! either the old or the new value. Readers use MVCC read transactions and
//! never wait on a writer.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use nodescore_core::{NodescoreResult, ScoreRecord};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata};
use tracing::debug;

use crate::storage_err;
use crate::tables::SCORES;

/// Write side of the ledger, as seen by the optimization cycle
pub trait ScoreStore: Send + Sync {
    /// Insert or overwrite the score of a node
    fn upsert(&self, node: &str, score: f64) -> NodescoreResult<ScoreRecord>;
}

/// Durable latest-score-per-node store
#[derive(Clone)]
pub struct ScoreLedger {
    db: Arc<Database>,
}

impl ScoreLedger {
    /// Open (or create) a ledger at the given path
    pub fn open(path: &Path) -> NodescoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path).map_err(storage_err)?;
        let ledger = Self { db: Arc::new(db) };
        ledger.ensure_table()?;
        debug!(?path, "score ledger opened");
        Ok(ledger)
    }

    /// Create an ephemeral in-memory ledger
    pub fn open_in_memory() -> NodescoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(storage_err)?;
        let ledger = Self { db: Arc::new(db) };
        ledger.ensure_table()?;
        Ok(ledger)
    }

    fn ensure_table(&self) -> NodescoreResult<()> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        txn.open_table(SCORES).map_err(storage_err)?;
        txn.commit().map_err(storage_err)?;
        Ok(())
    }

    /// Insert or overwrite the score of a node, stamped with the current time
    pub fn upsert(&self, node: &str, score: f64) -> NodescoreResult<ScoreRecord> {
        let record = ScoreRecord {
            node: node.to_string(),
            score,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_vec(&record)?;
        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = txn.open_table(SCORES).map_err(storage_err)?;
            table
                .insert(node, value.as_slice())
                .map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;
        debug!(%node, score, "score stored");
        Ok(record)
    }

    /// Latest score of one node
    pub fn get(&self, node: &str) -> NodescoreResult<Option<ScoreRecord>> {
        let txn = self.db.begin_read().map_err(storage_err)?;
        let table = txn.open_table(SCORES).map_err(storage_err)?;
        match table.get(node).map_err(storage_err)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// All rows, best score first
    pub fn list(&self) -> NodescoreResult<Vec<ScoreRecord>> {
        let txn = self.db.begin_read().map_err(storage_err)?;
        let table = txn.open_table(SCORES).map_err(storage_err)?;
        let mut records = Vec::new();
        for entry in table.iter().map_err(storage_err)? {
            let (_, value) = entry.map_err(storage_err)?;
            let record: ScoreRecord = serde_json::from_slice(value.value())?;
            records.push(record);
        }
        records.sort_by(rank);
        Ok(records)
    }

    /// Row with the highest score, or `None` when the ledger is empty.
    ///
    /// Equal scores resolve to the lexicographically smallest node.
    pub fn query_best(&self) -> NodescoreResult<Option<ScoreRecord>> {
        Ok(self.list()?.into_iter().next())
    }

    /// Number of rows
    pub fn len(&self) -> NodescoreResult<u64> {
        let txn = self.db.begin_read().map_err(storage_err)?;
        let table = txn.open_table(SCORES).map_err(storage_err)?;
        table.len().map_err(storage_err)
    }

    pub fn is_empty(&self) -> NodescoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl ScoreStore for ScoreLedger {
    fn upsert(&self, node: &str, score: f64) -> NodescoreResult<ScoreRecord> {
        ScoreLedger::upsert(self, node, score)
    }
}

/// Higher score first, then node name ascending
fn rank(a: &ScoreRecord, b: &ScoreRecord) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.node.cmp(&b.node))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_best_empty() {
        let ledger = ScoreLedger::open_in_memory().unwrap();
        assert!(ledger.query_best().unwrap().is_none());
        assert!(ledger.is_empty().unwrap());
    }

    #[test]
    fn test_upsert_overwrites() {
        let ledger = ScoreLedger::open_in_memory().unwrap();

        let first = ledger.upsert("nodeA", 0.7).unwrap();
        let second = ledger.upsert("nodeA", 0.9).unwrap();

        assert_eq!(ledger.len().unwrap(), 1);
        let row = ledger.get("nodeA").unwrap().unwrap();
        assert_eq!(row.score, 0.9);
        assert_eq!(row.timestamp, second.timestamp);
        assert!(second.timestamp >= first.timestamp);
    }

    #[test]
    fn test_query_best() {
        let ledger = ScoreLedger::open_in_memory().unwrap();
        ledger.upsert("node-a", 0.4).unwrap();
        ledger.upsert("node-b", 0.8).unwrap();
        ledger.upsert("node-c", 0.6).unwrap();

        let best = ledger.query_best().unwrap().unwrap();
        assert_eq!(best.node, "node-b");
        assert_eq!(best.score, 0.8);

        let nodes: Vec<String> = ledger.list().unwrap().into_iter().map(|r| r.node).collect();
        assert_eq!(nodes, vec!["node-b", "node-c", "node-a"]);
    }

    #[test]
    fn test_query_best_tie_breaks_by_node() {
        let ledger = ScoreLedger::open_in_memory().unwrap();
        ledger.upsert("node-z", 0.5).unwrap();
        ledger.upsert("node-m", 0.5).unwrap();

        let best = ledger.query_best().unwrap().unwrap();
        assert_eq!(best.node, "node-m");
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("ledger.redb");

        {
            let ledger = ScoreLedger::open(&path).unwrap();
            ledger.upsert("node-a", 0.42).unwrap();
        }

        let ledger = ScoreLedger::open(&path).unwrap();
        let best = ledger.query_best().unwrap().unwrap();
        assert_eq!(best.node, "node-a");
        assert_eq!(best.score, 0.42);
    }
}
