//! Provider trait definitions

use async_trait::async_trait;
use nodescore_core::{NodescoreResult, PlacementMap, RawReading};

/// Source of live per-node telemetry
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Take one reading for a node. Missing criteria are `None`; a failed
    /// backend call is an error the caller is expected to absorb.
    async fn sample(&self, node: &str) -> NodescoreResult<RawReading>;

    /// Get the provider name
    fn name(&self) -> &'static str;
}

/// Source of workload-to-node placement facts
#[async_trait]
pub trait TopologyProvider: Send + Sync {
    /// Map each requested workload to the nodes hosting it and the instance
    /// count on each. Workloads with no instances may be absent.
    async fn placement(&self, workloads: &[String]) -> NodescoreResult<PlacementMap>;

    /// Get the provider name
    fn name(&self) -> &'static str;
}
