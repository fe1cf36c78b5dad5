//! On-demand placement decisions

use nodescore_core::{
    NodescoreError, NodescoreResult, OptimizerConfig, PlacementDecision, ScoringMode, Weights,
};
use nodescore_providers::TopologyProvider;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::averager::MetricsAverager;
use crate::cycle::evaluate;
use crate::scorer::select_best;
use crate::topology::{classify, TopologyClass};

/// Decides where traffic between two workloads should go
pub struct PlacementEngine {
    /// Workload pair the averager's metrics describe
    source_workload: String,
    destination_workload: String,
    /// Nodes the averager has metrics for
    nodes: BTreeSet<String>,
    topology: Arc<dyn TopologyProvider>,
    averager: Arc<dyn MetricsAverager>,
    mode: ScoringMode,
    weights: Weights,
}

impl PlacementEngine {
    /// Create a new placement engine
    pub fn new(
        config: &OptimizerConfig,
        topology: Arc<dyn TopologyProvider>,
        averager: Arc<dyn MetricsAverager>,
    ) -> Self {
        Self {
            source_workload: config.source_workload().to_string(),
            destination_workload: config.destination_workload().to_string(),
            nodes: config.nodes.iter().cloned().collect(),
            topology,
            averager,
            mode: config.mode,
            weights: config.weights,
        }
    }

    /// Pick the best node for a source/destination workload pair.
    ///
    /// Only the configured workload pair is accepted; the averager's metrics
    /// describe that pair's traffic and no other.
    /// A single-node to single-node placement is answered from topology alone;
    /// otherwise the spread side's nodes are averaged, normalized and scored.
    pub async fn decide(
        &self,
        source: &str,
        destination: &str,
    ) -> NodescoreResult<PlacementDecision> {
        if source != self.source_workload || destination != self.destination_workload {
            return Err(NodescoreError::UnsupportedWorkloadPair {
                source_workload: source.to_string(),
                destination_workload: destination.to_string(),
            });
        }

        let placement = self
            .topology
            .placement(&[source.to_string(), destination.to_string()])
            .await?;

        let empty = BTreeMap::new();
        let source_nodes = placement.get(source).unwrap_or(&empty);
        let destination_nodes = placement.get(destination).unwrap_or(&empty);

        let class = classify(source, source_nodes, destination, destination_nodes)?;
        debug!(source = %source, destination = %destination, ?class, "Classified topology");

        let candidates = match class {
            TopologyClass::Trivial { node } => {
                info!(node = %node, "Single source and destination node, no scoring needed");
                return Ok(PlacementDecision::trivial(node));
            }
            TopologyClass::ScoreDestinations(nodes) | TopologyClass::ScoreSources(nodes) => nodes,
        };

        let unmonitored: Vec<&String> =
            candidates.iter().filter(|n| !self.nodes.contains(*n)).collect();
        if !unmonitored.is_empty() {
            warn!(?unmonitored, "Candidate nodes outside the configured node set");
        }

        let evaluation = evaluate(
            self.averager.as_ref(),
            &candidates,
            self.mode,
            &self.weights,
        )
        .await;

        let best = select_best(&evaluation.scores)
            .cloned()
            .ok_or(NodescoreError::NoCandidates)?;

        info!(
            node = %best.node,
            score = best.score,
            candidates = candidates.len(),
            unavailable = evaluation.unavailable.len(),
            "Placement decided"
        );

        Ok(PlacementDecision::scored(best))
    }
}
