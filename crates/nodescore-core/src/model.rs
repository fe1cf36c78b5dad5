//! Metric, score and placement type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Workload name -> (node name -> instance count), as reported by a topology provider
pub type PlacementMap = BTreeMap<String, BTreeMap<String, u32>>;

/// A cost criterion tracked per node. Lower raw values are better for all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// Request latency
    Latency,
    /// Per-request bandwidth
    Bandwidth,
    /// Estimated power draw
    Energy,
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Criterion::Latency => write!(f, "latency"),
            Criterion::Bandwidth => write!(f, "bandwidth"),
            Criterion::Energy => write!(f, "energy"),
        }
    }
}

/// Which criteria take part in scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoringMode {
    /// Latency and bandwidth only; gamma is ignored
    LatencyBandwidth,
    /// Latency, bandwidth and energy
    LatencyBandwidthEnergy,
}

impl ScoringMode {
    /// Criteria a node must have a valid average for to be scored
    pub fn required_criteria(&self) -> &'static [Criterion] {
        match self {
            ScoringMode::LatencyBandwidth => &[Criterion::Latency, Criterion::Bandwidth],
            ScoringMode::LatencyBandwidthEnergy => {
                &[Criterion::Latency, Criterion::Bandwidth, Criterion::Energy]
            }
        }
    }

    /// Whether the energy criterion is scored
    pub fn uses_energy(&self) -> bool {
        matches!(self, ScoringMode::LatencyBandwidthEnergy)
    }
}

impl std::fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringMode::LatencyBandwidth => write!(f, "latency-bandwidth"),
            ScoringMode::LatencyBandwidthEnergy => write!(f, "latency-bandwidth-energy"),
        }
    }
}

/// One reading from a metrics provider. `None` means the value was missing or NaN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub latency: Option<f64>,
    pub bandwidth: Option<f64>,
    pub energy: Option<f64>,
}

/// A raw sample as stored in the sample log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Node the sample was taken for
    pub node: String,
    pub latency: Option<f64>,
    pub bandwidth: Option<f64>,
    pub energy: Option<f64>,
    /// When the sample was taken
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    /// Stamp a provider reading with the node and the current time
    pub fn from_reading(node: &str, reading: RawReading) -> Self {
        Self::at(node, reading, Utc::now())
    }

    /// Build a sample with an explicit timestamp
    pub fn at(node: &str, reading: RawReading, timestamp: DateTime<Utc>) -> Self {
        Self {
            node: node.to_string(),
            latency: reading.latency,
            bandwidth: reading.bandwidth,
            energy: reading.energy,
            timestamp,
        }
    }

    /// Value recorded for a criterion
    pub fn get(&self, criterion: Criterion) -> Option<f64> {
        match criterion {
            Criterion::Latency => self.latency,
            Criterion::Bandwidth => self.bandwidth,
            Criterion::Energy => self.energy,
        }
    }
}

/// Per-criterion mean over the recent sample window of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragedMetric {
    pub node: String,
    pub latency: Option<f64>,
    pub bandwidth: Option<f64>,
    pub energy: Option<f64>,
}

impl AveragedMetric {
    pub fn get(&self, criterion: Criterion) -> Option<f64> {
        match criterion {
            Criterion::Latency => self.latency,
            Criterion::Bandwidth => self.bandwidth,
            Criterion::Energy => self.energy,
        }
    }

    /// True when every listed criterion has a finite value
    pub fn is_complete(&self, criteria: &[Criterion]) -> bool {
        criteria
            .iter()
            .all(|c| self.get(*c).is_some_and(f64::is_finite))
    }
}

/// Cost-normalized metrics of one node, each in [0, 1] with 1.0 = best.
///
/// Only meaningful relative to the candidate set it was computed over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedMetric {
    pub node: String,
    pub latency: f64,
    pub bandwidth: f64,
    /// Present only when energy is part of the scoring mode
    pub energy: Option<f64>,
}

/// Relative importance of each criterion. Not required to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    /// Latency weight
    pub alpha: f64,
    /// Bandwidth weight
    pub beta: f64,
    /// Energy weight
    pub gamma: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.3,
            gamma: 0.2,
        }
    }
}

/// Score computed for a node in the current cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeScore {
    pub node: String,
    pub score: f64,
}

/// Persisted ledger row: latest score of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub node: String,
    pub score: f64,
    /// Time of the last write for this node
    pub timestamp: DateTime<Utc>,
}

/// How a placement decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionBasis {
    /// Single source node and single destination node; no metrics consulted
    TopologyTrivial,
    /// Chosen by a full scoring pass
    Scored,
}

impl std::fmt::Display for DecisionBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionBasis::TopologyTrivial => write!(f, "topology-trivial"),
            DecisionBasis::Scored => write!(f, "scored"),
        }
    }
}

/// Result of one cycle or one on-demand placement call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementDecision {
    /// Chosen node
    pub node: String,
    pub basis: DecisionBasis,
    /// Score of the chosen node when the decision was scored
    pub score: Option<f64>,
}

impl PlacementDecision {
    pub fn trivial(node: String) -> Self {
        Self {
            node,
            basis: DecisionBasis::TopologyTrivial,
            score: None,
        }
    }

    pub fn scored(best: NodeScore) -> Self {
        Self {
            node: best.node,
            basis: DecisionBasis::Scored,
            score: Some(best.score),
        }
    }
}
