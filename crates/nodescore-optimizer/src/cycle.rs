//! Optimization cycle: average, normalize, score, persist

use futures::future::join_all;
use nodescore_core::{
    AveragedMetric, NodeScore, NodescoreError, NodescoreResult, OptimizerConfig,
    PlacementDecision, ScoringMode, Weights,
};
use nodescore_store::ScoreStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::averager::MetricsAverager;
use crate::normalizer::normalize;
use crate::scorer::{score_nodes, select_best};

/// Scores of one evaluation pass over a node set
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Nodes with a complete metric set and their scores
    pub scores: Vec<NodeScore>,
    /// Nodes left out for lack of valid samples
    pub unavailable: Vec<String>,
}

/// Average every node, then normalize and score the ones with complete metrics
pub async fn evaluate(
    averager: &dyn MetricsAverager,
    nodes: &[String],
    mode: ScoringMode,
    weights: &Weights,
) -> Evaluation {
    let required = mode.required_criteria();
    let results = join_all(nodes.iter().map(|node| averager.average(node, required))).await;

    let mut averaged: Vec<AveragedMetric> = Vec::with_capacity(nodes.len());
    let mut unavailable = Vec::new();
    for (node, result) in nodes.iter().zip(results) {
        match result {
            Some(metric) => averaged.push(metric),
            None => {
                debug!(node = %node, averager = averager.name(), "Node unavailable this cycle");
                unavailable.push(node.clone());
            }
        }
    }

    if averaged.is_empty() {
        return Evaluation {
            scores: Vec::new(),
            unavailable,
        };
    }

    let normalized = normalize(&averaged, mode);
    Evaluation {
        scores: score_nodes(&normalized, weights),
        unavailable,
    }
}

/// Outcome of one optimization cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    /// Scores computed this cycle
    pub scores: Vec<NodeScore>,
    /// Nodes without a complete metric set
    pub unavailable: Vec<String>,
    /// Number of ledger rows written
    pub persisted: usize,
    /// Nodes whose ledger write failed; retried next cycle
    pub failed_writes: Vec<String>,
    /// Best node of this cycle
    pub best: Option<PlacementDecision>,
}

/// Periodically scores the configured nodes and writes the results to the ledger
pub struct OptimizationCycle {
    nodes: Vec<String>,
    mode: ScoringMode,
    weights: Weights,
    averager: Arc<dyn MetricsAverager>,
    ledger: Arc<dyn ScoreStore>,
}

impl OptimizationCycle {
    /// Create a new optimization cycle
    pub fn new(
        config: &OptimizerConfig,
        averager: Arc<dyn MetricsAverager>,
        ledger: Arc<dyn ScoreStore>,
    ) -> Self {
        info!(
            nodes = config.nodes.len(),
            mode = %config.mode,
            averager = averager.name(),
            "Optimization cycle initialized"
        );

        Self {
            nodes: config.nodes.clone(),
            mode: config.mode,
            weights: config.weights,
            averager,
            ledger,
        }
    }

    /// Run a single cycle.
    ///
    /// Returns `NoCandidates` without touching the ledger when no node has a
    /// complete metric set. A failed write affects only that node's row.
    pub async fn run_once(&self) -> NodescoreResult<CycleReport> {
        let cycle_id = Uuid::new_v4();
        let evaluation =
            evaluate(self.averager.as_ref(), &self.nodes, self.mode, &self.weights).await;

        if evaluation.scores.is_empty() {
            warn!(
                cycle_id = %cycle_id,
                unavailable = evaluation.unavailable.len(),
                "No candidate nodes, skipping persistence"
            );
            return Err(NodescoreError::NoCandidates);
        }

        let mut persisted = 0;
        let mut failed_writes = Vec::new();
        for score in &evaluation.scores {
            match self.ledger.upsert(&score.node, score.score) {
                Ok(_) => persisted += 1,
                Err(e) => {
                    error!(
                        cycle_id = %cycle_id,
                        node = %score.node,
                        error = %e,
                        "Failed to persist score"
                    );
                    failed_writes.push(score.node.clone());
                }
            }
        }

        let best = select_best(&evaluation.scores)
            .cloned()
            .map(PlacementDecision::scored);

        info!(
            cycle_id = %cycle_id,
            scored = evaluation.scores.len(),
            persisted = persisted,
            unavailable = evaluation.unavailable.len(),
            best = ?best.as_ref().map(|b| b.node.as_str()),
            "Optimization cycle complete"
        );

        Ok(CycleReport {
            cycle_id,
            scores: evaluation.scores,
            unavailable: evaluation.unavailable,
            persisted,
            failed_writes,
            best,
        })
    }

    /// Run cycles every `period` for the lifetime of the process.
    ///
    /// Each cycle is awaited before the next tick is taken, and ticks missed
    /// while a cycle runs are skipped.
    pub async fn run(&self, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match self.run_once().await {
                Ok(_) | Err(NodescoreError::NoCandidates) => {}
                Err(e) => error!(error = %e, "Optimization cycle failed"),
            }
        }
    }
}
