//! Collection cycle: refresh the raw sample log from the metrics provider

use nodescore_core::MetricSample;
use nodescore_providers::MetricsProvider;
use nodescore_store::SampleLog;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Samples every configured node and appends the readings to the sample log
pub struct Collector {
    provider: Arc<dyn MetricsProvider>,
    log: SampleLog,
    nodes: Vec<String>,
    /// Samples kept per node after each pass
    retention: usize,
}

impl Collector {
    /// Create a new collector
    pub fn new(
        provider: Arc<dyn MetricsProvider>,
        log: SampleLog,
        nodes: Vec<String>,
        retention: usize,
    ) -> Self {
        Self {
            provider,
            log,
            nodes,
            retention,
        }
    }

    /// Sample every node once. Returns the number of samples appended.
    pub async fn collect_once(&self) -> usize {
        let mut appended = 0;

        for node in &self.nodes {
            let reading = match self.provider.sample(node).await {
                Ok(reading) => reading,
                Err(e) => {
                    warn!(
                        node = %node,
                        provider = self.provider.name(),
                        error = %e,
                        "Failed to sample node"
                    );
                    continue;
                }
            };

            let sample = MetricSample::from_reading(node, reading);
            if let Err(e) = self.log.append(&sample) {
                warn!(node = %node, error = %e, "Failed to append sample");
                continue;
            }
            appended += 1;

            if self.retention > 0 {
                if let Err(e) = self.log.retain_recent(node, self.retention) {
                    warn!(node = %node, error = %e, "Failed to trim sample log");
                }
            }
        }

        debug!(appended = appended, nodes = self.nodes.len(), "Collection pass complete");
        appended
    }

    /// Collect every `period` for the lifetime of the process
    pub async fn run(&self, period: Duration) {
        info!(
            interval_secs = period.as_secs(),
            provider = self.provider.name(),
            "Collection cycle started"
        );

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.collect_once().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nodescore_core::{NodescoreError, NodescoreResult, RawReading};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingProvider {
        calls: AtomicU32,
    }

    #[async_trait]
    impl MetricsProvider for CountingProvider {
        async fn sample(&self, node: &str) -> NodescoreResult<RawReading> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if node == "down" {
                return Err(NodescoreError::Provider("unreachable".to_string()));
            }
            Ok(RawReading {
                latency: Some(f64::from(n)),
                bandwidth: None,
                energy: None,
            })
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_collect_skips_failed_nodes() {
        let log = SampleLog::open_in_memory().unwrap();
        let provider = Arc::new(CountingProvider {
            calls: AtomicU32::new(0),
        });
        let collector = Collector::new(
            provider.clone(),
            log.clone(),
            vec!["up".to_string(), "down".to_string()],
            0,
        );

        assert_eq!(collector.collect_once().await, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(log.recent("up", 10).unwrap().len(), 1);
        assert!(log.recent("down", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_collect_applies_retention() {
        let log = SampleLog::open_in_memory().unwrap();
        let collector = Collector::new(
            Arc::new(CountingProvider {
                calls: AtomicU32::new(0),
            }),
            log.clone(),
            vec!["up".to_string()],
            2,
        );

        for _ in 0..4 {
            collector.collect_once().await;
        }

        let recent = log.recent("up", 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].latency, Some(3.0));
    }
}
