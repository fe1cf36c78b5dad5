//! Raw sample log.
//!
//! Append-only history of provider readings. Keys sort by node, then by
//! time, then by append order, so the most recent samples of a node are read
//! with a reverse range scan over that node's key prefix.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nodescore_core::{MetricSample, NodescoreResult};
use redb::{Database, ReadableDatabase};
use tracing::debug;

use crate::storage_err;
use crate::tables::METRICS_LOG;

/// Persistent log of raw metric samples
#[derive(Clone)]
pub struct SampleLog {
    db: Arc<Database>,
    /// Disambiguates samples of one node taken in the same microsecond
    seq: Arc<AtomicU64>,
}

impl SampleLog {
    /// Open (or create) a sample log at the given path
    pub fn open(path: &Path) -> NodescoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(path).map_err(storage_err)?;
        let log = Self {
            db: Arc::new(db),
            seq: Arc::new(AtomicU64::new(0)),
        };
        log.ensure_table()?;
        debug!(?path, "sample log opened");
        Ok(log)
    }

    /// Create an ephemeral in-memory sample log
    pub fn open_in_memory() -> NodescoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(storage_err)?;
        let log = Self {
            db: Arc::new(db),
            seq: Arc::new(AtomicU64::new(0)),
        };
        log.ensure_table()?;
        Ok(log)
    }

    fn ensure_table(&self) -> NodescoreResult<()> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        txn.open_table(METRICS_LOG).map_err(storage_err)?;
        txn.commit().map_err(storage_err)?;
        Ok(())
    }

    /// Append a sample
    pub fn append(&self, sample: &MetricSample) -> NodescoreResult<()> {
        let key = sample_key(sample, self.seq.fetch_add(1, Ordering::Relaxed));
        let value = serde_json::to_vec(sample)?;
        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = txn.open_table(METRICS_LOG).map_err(storage_err)?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;
        debug!(%key, "sample appended");
        Ok(())
    }

    /// Up to `limit` most recent samples of a node, newest first
    pub fn recent(&self, node: &str, limit: usize) -> NodescoreResult<Vec<MetricSample>> {
        let (start, end) = node_range(node);
        let txn = self.db.begin_read().map_err(storage_err)?;
        let table = txn.open_table(METRICS_LOG).map_err(storage_err)?;
        let mut samples = Vec::with_capacity(limit);
        for entry in table
            .range(start.as_str()..end.as_str())
            .map_err(storage_err)?
            .rev()
            .take(limit)
        {
            let (_, value) = entry.map_err(storage_err)?;
            samples.push(serde_json::from_slice(value.value())?);
        }
        Ok(samples)
    }

    /// Drop all but the `keep` most recent samples of a node. Returns the number removed.
    pub fn retain_recent(&self, node: &str, keep: usize) -> NodescoreResult<usize> {
        let (start, end) = node_range(node);
        let stale: Vec<String> = {
            let txn = self.db.begin_read().map_err(storage_err)?;
            let table = txn.open_table(METRICS_LOG).map_err(storage_err)?;
            let mut keys = Vec::new();
            for entry in table
                .range(start.as_str()..end.as_str())
                .map_err(storage_err)?
                .rev()
                .skip(keep)
            {
                let (key, _) = entry.map_err(storage_err)?;
                keys.push(key.value().to_string());
            }
            keys
        };

        if stale.is_empty() {
            return Ok(0);
        }

        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = txn.open_table(METRICS_LOG).map_err(storage_err)?;
            for key in &stale {
                table.remove(key.as_str()).map_err(storage_err)?;
            }
        }
        txn.commit().map_err(storage_err)?;
        debug!(%node, removed = stale.len(), "sample log trimmed");
        Ok(stale.len())
    }
}

fn sample_key(sample: &MetricSample, seq: u64) -> String {
    format!(
        "{}/{:020}/{:020}",
        sample.node,
        sample.timestamp.timestamp_micros().max(0),
        seq
    )
}

/// Half-open key range covering every sample of `node`; '0' is the byte after '/'
fn node_range(node: &str) -> (String, String) {
    (format!("{}/", node), format!("{}0", node))
}
