//! Configuration types for nodescore

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::{PlacementMap, ScoringMode, Weights};
use crate::NodescoreError;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// API server configuration
    pub api: ApiConfig,
    /// Scoring and cycle configuration
    pub optimizer: OptimizerConfig,
    /// Prometheus metrics provider configuration
    pub prometheus: PrometheusConfig,
    /// Topology provider configuration
    pub topology: TopologyConfig,
    /// Storage configuration
    pub storage: StorageConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl DaemonConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, NodescoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            NodescoreError::Config(format!("Failed to read config file: {}", e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, NodescoreError> {
        let config: DaemonConfig = toml::from_str(content)
            .map_err(|e| NodescoreError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the optimizer cannot run with
    pub fn validate(&self) -> Result<(), NodescoreError> {
        self.optimizer.validate()
    }
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Address to bind the REST API server
    pub rest_address: String,
    /// Port for the REST API server
    pub rest_port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rest_address: "0.0.0.0".to_string(),
            rest_port: 9090,
        }
    }
}

/// Where the averager reads its samples from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AveragerMode {
    /// Average the most recent samples in the persisted sample log
    Historical,
    /// Query the metrics provider directly and use that single snapshot
    Snapshot,
}

impl std::fmt::Display for AveragerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AveragerMode::Historical => write!(f, "historical"),
            AveragerMode::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// Scoring and cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Candidate nodes scored by the optimization cycle
    pub nodes: Vec<String>,
    /// Source and destination workload, in that order
    pub workloads: Vec<String>,
    /// Number of most recent samples averaged per node
    pub window: usize,
    /// Seconds between collection cycles
    pub collection_interval_secs: u64,
    /// Seconds between optimization cycles
    pub optimization_interval_secs: u64,
    /// Sample source for the averager
    pub averager: AveragerMode,
    /// Criteria taking part in scoring
    pub mode: ScoringMode,
    /// Criterion weights
    pub weights: Weights,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            nodes: vec!["worker-1".to_string(), "worker-2".to_string()],
            workloads: vec!["frontend".to_string(), "backend".to_string()],
            window: 10,
            collection_interval_secs: 15,
            optimization_interval_secs: 60,
            averager: AveragerMode::Historical,
            mode: ScoringMode::LatencyBandwidthEnergy,
            weights: Weights::default(),
        }
    }
}

impl OptimizerConfig {
    /// Source workload name
    pub fn source_workload(&self) -> &str {
        self.workloads.first().map(String::as_str).unwrap_or_default()
    }

    /// Destination workload name
    pub fn destination_workload(&self) -> &str {
        self.workloads.get(1).map(String::as_str).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), NodescoreError> {
        if self.nodes.is_empty() {
            return Err(NodescoreError::Config("optimizer.nodes must not be empty".to_string()));
        }
        if self.workloads.len() != 2 {
            return Err(NodescoreError::Config(format!(
                "optimizer.workloads must name exactly a source and a destination, got {}",
                self.workloads.len()
            )));
        }
        if self.window == 0 {
            return Err(NodescoreError::Config("optimizer.window must be at least 1".to_string()));
        }
        if self.collection_interval_secs == 0 || self.optimization_interval_secs == 0 {
            return Err(NodescoreError::Config("cycle intervals must be non-zero".to_string()));
        }
        let w = &self.weights;
        for (name, value) in [("alpha", w.alpha), ("beta", w.beta), ("gamma", w.gamma)] {
            if !value.is_finite() || value < 0.0 {
                return Err(NodescoreError::Config(format!(
                    "weight {} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Prometheus connection and query templates.
///
/// Templates may use `{source}`, `{destination}`, `{node}` and `{app}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrometheusConfig {
    /// Base URL of the Prometheus server
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Mean request duration of the destination workload
    pub latency_query: String,
    /// Bytes per second sent from source to destination
    pub bytes_query: String,
    /// Requests per second from source to destination
    pub requests_query: String,
    /// CPU utilization of the destination workload on the candidate node
    pub cpu_query: String,
    /// CPU utilization of the source workload, wherever it runs
    pub source_cpu_query: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            url: "http://prometheus.monitoring:9090".to_string(),
            timeout_secs: 5,
            latency_query: concat!(
                r#"sum(rate(istio_request_duration_milliseconds_sum{destination_workload="{destination}",node="{node}"}[1m]))"#,
                r#" / sum(rate(istio_request_duration_milliseconds_count{destination_workload="{destination}",node="{node}"}[1m]))"#
            )
            .to_string(),
            bytes_query: r#"sum(rate(istio_request_bytes_sum{source_workload="{source}",destination_workload="{destination}",node="{node}"}[1m]))"#.to_string(),
            requests_query: r#"sum(rate(istio_requests_total{source_workload="{source}",destination_workload="{destination}",node="{node}"}[1m]))"#.to_string(),
            cpu_query: r#"sum(rate(container_cpu_usage_seconds_total{pod=~"{app}-.*",node="{node}"}[1m]))"#.to_string(),
            source_cpu_query: r#"sum(rate(container_cpu_usage_seconds_total{pod=~"{app}-.*"}[1m]))"#.to_string(),
        }
    }
}

/// Topology provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    /// Placement map taken from configuration
    Static,
    /// Pods listed from the Kubernetes API server
    Kubernetes,
}

/// Topology provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    pub kind: TopologyKind,
    /// Kubernetes API server URL
    pub api_server: String,
    /// Namespace the workloads run in
    pub namespace: String,
    /// Pod label holding the workload name
    pub label_key: String,
    /// Service account token file
    pub token_path: Option<PathBuf>,
    /// CA bundle used to verify the API server
    pub ca_path: Option<PathBuf>,
    /// Placement used by the static provider
    pub placement: PlacementMap,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            kind: TopologyKind::Static,
            api_server: "https://kubernetes.default.svc".to_string(),
            namespace: "default".to_string(),
            label_key: "app".to_string(),
            token_path: Some(PathBuf::from(
                "/var/run/secrets/kubernetes.io/serviceaccount/token",
            )),
            ca_path: Some(PathBuf::from(
                "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt",
            )),
            placement: PlacementMap::new(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Score ledger database file
    pub ledger_path: PathBuf,
    /// Raw sample log database file
    pub sample_log_path: PathBuf,
    /// Samples kept per node in the sample log
    pub sample_retention: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from("/var/lib/nodescore/ledger.redb"),
            sample_log_path: PathBuf::from("/var/lib/nodescore/samples.redb"),
            sample_retention: 1000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
