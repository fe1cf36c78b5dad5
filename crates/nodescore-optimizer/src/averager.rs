//! Metrics averaging
//!
//! An averager reduces the recent readings of one node to a single value per
//! criterion. Two strategies exist: averaging the persisted sample log, or
//! taking a fresh snapshot from the metrics provider.

use async_trait::async_trait;
use nodescore_core::{AveragedMetric, Criterion, MetricSample};
use nodescore_providers::MetricsProvider;
use nodescore_store::SampleLog;
use std::sync::Arc;
use tracing::{debug, warn};

/// Strategy producing one averaged metric per node
#[async_trait]
pub trait MetricsAverager: Send + Sync {
    /// Average the node's readings. `None` when any `required` criterion has
    /// no valid sample; source failures are logged and treated the same way.
    async fn average(&self, node: &str, required: &[Criterion]) -> Option<AveragedMetric>;

    /// Get the averager name
    fn name(&self) -> &'static str;
}

fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Per-criterion arithmetic mean over `samples`, ignoring missing and non-finite values
pub fn average_samples(
    node: &str,
    samples: &[MetricSample],
    required: &[Criterion],
) -> Option<AveragedMetric> {
    let metric = AveragedMetric {
        node: node.to_string(),
        latency: mean(samples.iter().map(|s| s.latency)),
        bandwidth: mean(samples.iter().map(|s| s.bandwidth)),
        energy: mean(samples.iter().map(|s| s.energy)),
    };

    if let Some(missing) = required.iter().find(|c| metric.get(**c).is_none()) {
        debug!(
            node = %node,
            criterion = %missing,
            samples = samples.len(),
            "No valid samples for required criterion"
        );
        return None;
    }

    Some(metric)
}

/// Averages the most recent samples from the persisted sample log
pub struct HistoricalAverager {
    log: SampleLog,
    window: usize,
}

impl HistoricalAverager {
    /// Create an averager over the `window` most recent samples per node
    pub fn new(log: SampleLog, window: usize) -> Self {
        Self { log, window }
    }
}

#[async_trait]
impl MetricsAverager for HistoricalAverager {
    async fn average(&self, node: &str, required: &[Criterion]) -> Option<AveragedMetric> {
        match self.log.recent(node, self.window) {
            Ok(samples) => average_samples(node, &samples, required),
            Err(e) => {
                warn!(node = %node, error = %e, "Failed to read sample log");
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "historical"
    }
}

/// Uses a single fresh reading from the metrics provider
pub struct SnapshotAverager {
    provider: Arc<dyn MetricsProvider>,
}

impl SnapshotAverager {
    pub fn new(provider: Arc<dyn MetricsProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl MetricsAverager for SnapshotAverager {
    async fn average(&self, node: &str, required: &[Criterion]) -> Option<AveragedMetric> {
        match self.provider.sample(node).await {
            Ok(reading) => {
                let sample = MetricSample::from_reading(node, reading);
                average_samples(node, std::slice::from_ref(&sample), required)
            }
            Err(e) => {
                warn!(
                    node = %node,
                    provider = self.provider.name(),
                    error = %e,
                    "Metrics provider failed"
                );
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "snapshot"
    }
}
