//! Cost-based normalization across the candidate set

use nodescore_core::{AveragedMetric, Criterion, NormalizedMetric, ScoringMode};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: f64,
    max: f64,
}

impl Bounds {
    fn over<'a>(metrics: impl Iterator<Item = &'a AveragedMetric>, criterion: Criterion) -> Self {
        metrics.filter_map(|m| m.get(criterion)).fold(
            Bounds {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |b, v| Bounds {
                min: b.min.min(v),
                max: b.max.max(v),
            },
        )
    }

    /// `(max - v) / (max - min)`, or 1.0 when every node has the same value
    fn cost(&self, value: f64) -> f64 {
        if self.max == self.min {
            1.0
        } else {
            (self.max - value) / (self.max - self.min)
        }
    }
}

/// Rescale each criterion onto [0, 1] with 1.0 for the lowest raw cost.
///
/// Nodes missing any criterion required by `mode` are left out entirely and
/// do not influence the bounds. Returns an empty vector when no node remains.
pub fn normalize(metrics: &[AveragedMetric], mode: ScoringMode) -> Vec<NormalizedMetric> {
    let required = mode.required_criteria();
    let candidates: Vec<&AveragedMetric> =
        metrics.iter().filter(|m| m.is_complete(required)).collect();

    if candidates.is_empty() {
        return Vec::new();
    }

    let latency = Bounds::over(candidates.iter().copied(), Criterion::Latency);
    let bandwidth = Bounds::over(candidates.iter().copied(), Criterion::Bandwidth);
    let energy = Bounds::over(candidates.iter().copied(), Criterion::Energy);

    debug!(
        candidates = candidates.len(),
        excluded = metrics.len() - candidates.len(),
        ?latency,
        ?bandwidth,
        "Normalizing metrics"
    );

    candidates
        .into_iter()
        .map(|m| NormalizedMetric {
            node: m.node.clone(),
            latency: latency.cost(m.latency.unwrap_or(latency.max)),
            bandwidth: bandwidth.cost(m.bandwidth.unwrap_or(bandwidth.max)),
            energy: if mode.uses_energy() {
                m.energy.map(|v| energy.cost(v))
            } else {
                None
            },
        })
        .collect()
}
