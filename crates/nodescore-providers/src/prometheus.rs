//! Prometheus-backed metrics provider

use async_trait::async_trait;
use nodescore_core::{NodescoreError, NodescoreResult, PrometheusConfig, RawReading};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::traits::MetricsProvider;

/// Linear power model: watts drawn for a given CPU utilization
pub fn estimate_power(cpu_util: f64) -> f64 {
    3.4842 * cpu_util + 2.2434
}

/// Kilobytes transferred per request.
///
/// `None` when the byte rate is unknown or there were no requests.
pub fn per_request_bandwidth(
    bytes_per_sec: Option<f64>,
    requests_per_sec: Option<f64>,
) -> Option<f64> {
    let bytes = bytes_per_sec?;
    match requests_per_sec {
        Some(rps) if rps > 0.0 => Some((bytes / 1024.0) / rps),
        _ => {
            debug!("request rate is zero or missing, per-request bandwidth unavailable");
            None
        }
    }
}

/// Combined power draw of source and destination workloads.
///
/// Missing CPU data for either side yields `None` rather than a partial sum.
pub fn combined_energy(source_cpu: Option<f64>, destination_cpu: Option<f64>) -> Option<f64> {
    Some(estimate_power(source_cpu?) + estimate_power(destination_cpu?))
}

/// Instant query response envelope
#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<VectorSample>,
}

#[derive(Debug, Deserialize)]
struct VectorSample {
    /// `[unix_time, "value"]`
    value: (serde_json::Value, String),
}

/// First value of an instant-vector response. Empty, NaN and infinite results are `None`.
fn first_value(body: &str) -> NodescoreResult<Option<f64>> {
    let response: QueryResponse = serde_json::from_str(body)?;
    if response.status != "success" {
        return Err(NodescoreError::Provider(format!(
            "prometheus query failed: {}",
            response.error.unwrap_or_else(|| response.status.clone())
        )));
    }

    let Some(sample) = response.data.and_then(|d| d.result.into_iter().next()) else {
        return Ok(None);
    };

    let value: f64 = sample.value.1.parse().map_err(|e| {
        NodescoreError::Provider(format!("invalid sample value '{}': {}", sample.value.1, e))
    })?;

    Ok(value.is_finite().then_some(value))
}

/// Minimal HTTP client for the Prometheus query API
pub struct PrometheusClient {
    client: reqwest::Client,
    base_url: String,
}

impl PrometheusClient {
    /// Create a new client
    pub fn new(base_url: &str, timeout_secs: u64) -> NodescoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| NodescoreError::Provider(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Run an instant query and return its first value
    pub async fn query(&self, promql: &str) -> NodescoreResult<Option<f64>> {
        let url = format!("{}/api/v1/query", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("query", promql)])
            .send()
            .await
            .map_err(|e| NodescoreError::Provider(format!("prometheus request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NodescoreError::Provider(format!("prometheus read failed: {}", e)))?;

        // Prometheus reports query errors as 4xx with a JSON body.
        if !status.is_success() && !status.is_client_error() {
            warn!(%status, "prometheus returned an error status");
            return Err(NodescoreError::Provider(format!(
                "prometheus returned {}",
                status
            )));
        }

        first_value(&body)
    }
}

/// Metrics provider reading service-mesh and container metrics from Prometheus
pub struct PrometheusProvider {
    client: PrometheusClient,
    config: PrometheusConfig,
    source_workload: String,
    destination_workload: String,
}

impl PrometheusProvider {
    /// Create a provider measuring traffic from `source_workload` to `destination_workload`
    pub fn new(
        config: PrometheusConfig,
        source_workload: &str,
        destination_workload: &str,
    ) -> NodescoreResult<Self> {
        let client = PrometheusClient::new(&config.url, config.timeout_secs)?;
        Ok(Self {
            client,
            config,
            source_workload: source_workload.to_string(),
            destination_workload: destination_workload.to_string(),
        })
    }

    /// Fill in the placeholders of a query template
    fn render(&self, template: &str, node: &str, app: &str) -> String {
        render_query(
            template,
            &self.source_workload,
            &self.destination_workload,
            node,
            app,
        )
    }
}

fn render_query(template: &str, source: &str, destination: &str, node: &str, app: &str) -> String {
    template
        .replace("{source}", source)
        .replace("{destination}", destination)
        .replace("{node}", node)
        .replace("{app}", app)
}

#[async_trait]
impl MetricsProvider for PrometheusProvider {
    /// Query every criterion for a node.
    ///
    /// A failed query leaves only its own criterion missing. The call fails
    /// only when every query failed, i.e. Prometheus itself is unreachable.
    async fn sample(&self, node: &str) -> NodescoreResult<RawReading> {
        let dest = self.destination_workload.as_str();
        let src = self.source_workload.as_str();

        let queries = [
            ("latency", self.render(&self.config.latency_query, node, dest)),
            ("bytes", self.render(&self.config.bytes_query, node, dest)),
            ("requests", self.render(&self.config.requests_query, node, dest)),
            ("source_cpu", self.render(&self.config.source_cpu_query, node, src)),
            ("destination_cpu", self.render(&self.config.cpu_query, node, dest)),
        ];

        let mut values = [None; 5];
        let mut failures = 0;
        let mut last_error = None;
        for (slot, (what, promql)) in values.iter_mut().zip(&queries) {
            match self.client.query(promql).await {
                Ok(value) => *slot = value,
                Err(e) => {
                    warn!(node = %node, query = *what, error = %e, "Prometheus query failed");
                    failures += 1;
                    last_error = Some(e);
                }
            }
        }

        if failures == queries.len() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        let [latency, bytes, requests, source_cpu, destination_cpu] = values;
        let reading = RawReading {
            latency,
            bandwidth: per_request_bandwidth(bytes, requests),
            energy: combined_energy(source_cpu, destination_cpu),
        };

        debug!(
            node = %node,
            latency = ?reading.latency,
            bandwidth = ?reading.bandwidth,
            energy = ?reading.energy,
            failed_queries = failures,
            "Sampled node"
        );

        Ok(reading)
    }

    fn name(&self) -> &'static str {
        "prometheus"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::collections::HashMap;

    #[derive(Clone, Copy)]
    enum Outage {
        Healthy,
        Cpu,
        All,
    }

    fn vector(value: Option<&str>) -> String {
        let result = match value {
            Some(v) => format!(r#"[{{"metric":{{}},"value":[1700000000,"{}"]}}]"#, v),
            None => "[]".to_string(),
        };
        format!(
            r#"{{"status":"success","data":{{"resultType":"vector","result":{}}}}}"#,
            result
        )
    }

    /// Source pods run on edge-1 only; destination pods everywhere
    fn answer(query: &str, outage: Outage) -> (StatusCode, String) {
        let is_cpu = query.contains("container_cpu_usage_seconds_total");
        match outage {
            Outage::All => return (StatusCode::INTERNAL_SERVER_ERROR, "down".to_string()),
            Outage::Cpu if is_cpu => {
                return (StatusCode::INTERNAL_SERVER_ERROR, "down".to_string())
            }
            _ => {}
        }

        let value = if is_cpu && query.contains("frontend-") {
            let elsewhere = query.contains("node=") && !query.contains(r#"node="edge-1""#);
            (!elsewhere).then_some("0.5")
        } else if is_cpu {
            Some("0.25")
        } else if query.contains("istio_request_duration") {
            Some("2")
        } else {
            Some("1")
        };
        (StatusCode::OK, vector(value))
    }

    async fn fake_prometheus(outage: Outage) -> PrometheusConfig {
        let app = Router::new().route(
            "/api/v1/query",
            get(move |Query(params): Query<HashMap<String, String>>| async move {
                answer(params.get("query").map(String::as_str).unwrap_or_default(), outage)
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        PrometheusConfig {
            url: format!("http://{}", addr),
            ..PrometheusConfig::default()
        }
    }

    #[tokio::test]
    async fn test_energy_when_source_runs_on_another_node() {
        let provider =
            PrometheusProvider::new(fake_prometheus(Outage::Healthy).await, "frontend", "backend")
                .unwrap();

        for node in ["edge-2", "edge-3"] {
            let reading = provider.sample(node).await.unwrap();
            assert_eq!(reading.latency, Some(2.0));
            assert_eq!(reading.bandwidth, Some(1.0 / 1024.0));
            let energy = reading.energy.unwrap();
            assert!((energy - (estimate_power(0.5) + estimate_power(0.25))).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_failed_cpu_query_only_drops_energy() {
        let provider =
            PrometheusProvider::new(fake_prometheus(Outage::Cpu).await, "frontend", "backend")
                .unwrap();

        let reading = provider.sample("edge-2").await.unwrap();
        assert_eq!(reading.latency, Some(2.0));
        assert_eq!(reading.bandwidth, Some(1.0 / 1024.0));
        assert_eq!(reading.energy, None);
    }

    #[tokio::test]
    async fn test_all_queries_failing_is_an_error() {
        let provider =
            PrometheusProvider::new(fake_prometheus(Outage::All).await, "frontend", "backend")
                .unwrap();

        let err = provider.sample("edge-2").await.unwrap_err();
        assert!(matches!(err, NodescoreError::Provider(_)));
    }

    #[test]
    fn test_power_model() {
        assert!((estimate_power(0.0) - 2.2434).abs() < 1e-9);
        assert!((estimate_power(1.0) - 5.7276).abs() < 1e-9);
    }

    #[test]
    fn test_per_request_bandwidth() {
        assert_eq!(per_request_bandwidth(Some(2048.0), Some(2.0)), Some(1.0));
        assert_eq!(per_request_bandwidth(Some(2048.0), Some(0.0)), None);
        assert_eq!(per_request_bandwidth(Some(2048.0), None), None);
        assert_eq!(per_request_bandwidth(None, Some(5.0)), None);
    }

    #[test]
    fn test_combined_energy_propagates_missing() {
        let both = combined_energy(Some(1.0), Some(0.0)).unwrap();
        assert!((both - (5.7276 + 2.2434)).abs() < 1e-9);
        assert_eq!(combined_energy(None, Some(0.5)), None);
        assert_eq!(combined_energy(Some(0.5), None), None);
    }

    #[test]
    fn test_first_value() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{},"value":[1700000000.123,"42.5"]}]}}"#;
        assert_eq!(first_value(body).unwrap(), Some(42.5));
    }

    #[test]
    fn test_first_value_empty_and_nan() {
        let empty = r#"{"status":"success","data":{"resultType":"vector","result":[]}}"#;
        assert_eq!(first_value(empty).unwrap(), None);

        let nan = r#"{"status":"success","data":{"resultType":"vector","result":[{"metric":{},"value":[1700000000,"NaN"]}]}}"#;
        assert_eq!(first_value(nan).unwrap(), None);
    }

    #[test]
    fn test_first_value_error_status() {
        let body = r#"{"status":"error","errorType":"bad_data","error":"parse error"}"#;
        let err = first_value(body).unwrap_err();
        assert!(matches!(err, NodescoreError::Provider(_)));
        assert!(err.to_string().contains("parse error"));
    }

    #[test]
    fn test_render_query() {
        let query = render_query(
            r#"rate(x{src="{source}",dst="{destination}",node="{node}",pod=~"{app}-.*"}[1m])"#,
            "autocar",
            "telemetry",
            "edge-1",
            "telemetry",
        );
        assert_eq!(
            query,
            r#"rate(x{src="autocar",dst="telemetry",node="edge-1",pod=~"telemetry-.*"}[1m])"#
        );
    }

    #[test]
    fn test_provider_creation() {
        let provider = PrometheusProvider::new(PrometheusConfig::default(), "frontend", "backend");
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().name(), "prometheus");
    }
}
