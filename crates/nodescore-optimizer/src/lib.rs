//! nodescore-optimizer: Placement decision engine
//!
//! This crate turns raw telemetry into placement decisions:
//! - Metrics averaging over a sample window (historical log or live snapshot)
//! - Cost-based normalization and weighted scoring
//! - Topology classification of source/destination workloads
//! - Collection and optimization cycles feeding the score ledger

pub mod averager;
pub mod collector;
pub mod cycle;
pub mod engine;
pub mod normalizer;
pub mod scorer;
pub mod topology;

pub use averager::{HistoricalAverager, MetricsAverager, SnapshotAverager};
pub use collector::Collector;
pub use cycle::{CycleReport, OptimizationCycle};
pub use engine::PlacementEngine;
pub use normalizer::normalize;
pub use scorer::{score_nodes, select_best};
pub use topology::{classify, TopologyClass};
