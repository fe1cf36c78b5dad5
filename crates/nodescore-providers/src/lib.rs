//! nodescore-providers: External collaborators
//!
//! This crate provides the data sources the optimizer consumes:
//! - Metrics providers (Prometheus) yielding latency, bandwidth and energy readings
//! - Topology providers (Kubernetes API, static configuration) mapping
//!   workloads to the nodes hosting them

pub mod kubernetes;
pub mod prometheus;
pub mod static_topology;
pub mod traits;

pub use kubernetes::KubernetesTopology;
pub use prometheus::{PrometheusClient, PrometheusProvider};
pub use static_topology::StaticTopology;
pub use traits::{MetricsProvider, TopologyProvider};
