//! Error types for nodescore

use thiserror::Error;

/// Main error type for nodescore
#[derive(Error, Debug)]
pub enum NodescoreError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics or topology provider call failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// Persistence error (score ledger or sample log)
    #[error("Storage error: {0}")]
    Storage(String),

    /// API error
    #[error("API error: {0}")]
    Api(String),

    /// Both workloads span several nodes; per node-pair evaluation is not supported
    #[error("Unhandled topology: source '{source_workload}' and destination '{destination_workload}' both span multiple nodes")]
    UnhandledTopology {
        source_workload: String,
        destination_workload: String,
    },

    /// Placement asked for a workload pair other than the one being measured
    #[error("Unsupported workload pair: '{source_workload}' -> '{destination_workload}' is not the measured pair")]
    UnsupportedWorkloadPair {
        source_workload: String,
        destination_workload: String,
    },

    /// Workload has no instances on any node
    #[error("Workload not placed on any node: {0}")]
    WorkloadNotPlaced(String),

    /// No node has a complete set of averaged metrics
    #[error("No candidate node has complete metrics")]
    NoCandidates,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for nodescore operations
pub type NodescoreResult<T> = Result<T, NodescoreError>;

impl From<serde_json::Error> for NodescoreError {
    fn from(err: serde_json::Error) -> Self {
        NodescoreError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for NodescoreError {
    fn from(err: toml::de::Error) -> Self {
        NodescoreError::Config(err.to_string())
    }
}
