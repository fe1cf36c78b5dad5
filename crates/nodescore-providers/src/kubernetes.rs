//! Topology provider backed by the Kubernetes API server

use async_trait::async_trait;
use nodescore_core::{NodescoreError, NodescoreResult, PlacementMap, TopologyConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::traits::TopologyProvider;

#[derive(Debug, Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    #[serde(default)]
    spec: Option<PodSpec>,
    #[serde(default)]
    status: Option<PodStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodSpec {
    #[serde(default)]
    node_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PodStatus {
    #[serde(default)]
    phase: Option<String>,
}

/// Count running, scheduled pods per node
fn pods_per_node(list: PodList) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for pod in list.items {
        let running = pod
            .status
            .and_then(|s| s.phase)
            .is_some_and(|phase| phase == "Running");
        let node = pod.spec.and_then(|s| s.node_name);
        if let (true, Some(node)) = (running, node) {
            *counts.entry(node).or_insert(0) += 1;
        }
    }
    counts
}

/// Lists pods by workload label and reports the nodes they run on
pub struct KubernetesTopology {
    client: reqwest::Client,
    api_server: String,
    namespace: String,
    label_key: String,
    token: Option<String>,
}

impl KubernetesTopology {
    /// Create a provider from configuration, reading the token and CA bundle if present
    pub fn new(config: &TopologyConfig) -> NodescoreResult<Self> {
        let mut builder = reqwest::Client::builder();

        if let Some(ca_path) = config.ca_path.as_ref().filter(|p| p.exists()) {
            let pem = std::fs::read(ca_path)?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| NodescoreError::Config(format!("invalid CA bundle: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }

        let token = match config.token_path.as_ref().filter(|p| p.exists()) {
            Some(path) => Some(std::fs::read_to_string(path)?.trim().to_string()),
            None => None,
        };

        let client = builder
            .build()
            .map_err(|e| NodescoreError::Provider(format!("failed to create HTTP client: {}", e)))?;

        info!(
            api_server = %config.api_server,
            namespace = %config.namespace,
            authenticated = token.is_some(),
            "Kubernetes topology provider initialized"
        );

        Ok(Self {
            client,
            api_server: config.api_server.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
            label_key: config.label_key.clone(),
            token,
        })
    }

    async fn list_pods(&self, workload: &str) -> NodescoreResult<PodList> {
        let url = format!(
            "{}/api/v1/namespaces/{}/pods",
            self.api_server, self.namespace
        );
        let selector = format!("{}={}", self.label_key, workload);

        let mut request = self.client.get(&url).query(&[("labelSelector", selector)]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NodescoreError::Provider(format!("pod list request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(NodescoreError::Provider(format!(
                "pod list for '{}' returned {}",
                workload,
                response.status()
            )));
        }

        response
            .json::<PodList>()
            .await
            .map_err(|e| NodescoreError::Provider(format!("invalid pod list: {}", e)))
    }
}

#[async_trait]
impl TopologyProvider for KubernetesTopology {
    async fn placement(&self, workloads: &[String]) -> NodescoreResult<PlacementMap> {
        let mut map = PlacementMap::new();
        for workload in workloads {
            let pods = self.list_pods(workload).await?;
            let nodes = pods_per_node(pods);
            debug!(workload = %workload, nodes = nodes.len(), "Resolved workload placement");
            map.insert(workload.clone(), nodes);
        }
        Ok(map)
    }

    fn name(&self) -> &'static str {
        "kubernetes"
    }
}
