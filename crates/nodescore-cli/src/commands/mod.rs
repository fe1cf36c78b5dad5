//! CLI commands implementation

use anyhow::Result;
use chrono::{DateTime, Utc};
use nodescore_core::{DecisionBasis, PlacementDecision};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// API client for communicating with the daemon
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    json: bool,
}

impl ApiClient {
    pub fn new(base_url: &str, json: bool) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            json,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Ledger row from API
#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub node: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

/// Error body from API
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub nodes: usize,
    pub ledger_rows: u64,
    pub averager: String,
    pub mode: String,
}

/// Pull the message out of an error body, falling back to the raw text
async fn error_message(response: reqwest::Response) -> Result<String> {
    let text = response.text().await?;
    Ok(serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.error)
        .unwrap_or(text))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Show the current best node
pub async fn best(client: &ApiClient) -> Result<()> {
    let response = client
        .client
        .get(client.url("/api/v1/best-node"))
        .send()
        .await?;

    debug!(status = %response.status(), "best-node response");

    if response.status().is_success() {
        let best: ScoreResponse = response.json().await?;
        if client.json {
            return print_json(&best);
        }
        println!("Best node: {}", best.node);
        println!("  Score: {:.4}", best.score);
        println!("  Updated: {}", best.timestamp.to_rfc3339());
    } else if response.status() == reqwest::StatusCode::NOT_FOUND {
        println!("{}", error_message(response).await?);
    } else {
        let error = error_message(response).await?;
        eprintln!("Failed to get best node: {}", error);
    }

    Ok(())
}

/// List every node's latest score
pub async fn scores(client: &ApiClient) -> Result<()> {
    let response = client
        .client
        .get(client.url("/api/v1/scores"))
        .send()
        .await?;

    if response.status().is_success() {
        let scores: Vec<ScoreResponse> = response.json().await?;
        if client.json {
            return print_json(&scores);
        }

        if scores.is_empty() {
            println!("No scores recorded yet");
        } else {
            println!("{:<30} {:<10} {:<30}", "NODE", "SCORE", "UPDATED");
            println!("{}", "-".repeat(70));
            for row in scores {
                println!(
                    "{:<30} {:<10.4} {:<30}",
                    row.node,
                    row.score,
                    row.timestamp.to_rfc3339()
                );
            }
        }
    } else {
        let error = error_message(response).await?;
        eprintln!("Failed to list scores: {}", error);
    }

    Ok(())
}

/// Ask for a placement decision
pub async fn place(client: &ApiClient, source: String, destination: String) -> Result<()> {
    #[derive(Serialize)]
    struct PlacementRequest {
        source: String,
        destination: String,
    }

    let response = client
        .client
        .post(client.url("/api/v1/placements"))
        .json(&PlacementRequest {
            source: source.clone(),
            destination: destination.clone(),
        })
        .send()
        .await?;

    if response.status().is_success() {
        let decision: PlacementDecision = response.json().await?;
        if client.json {
            return print_json(&decision);
        }
        println!("{}", describe_decision(&source, &destination, &decision));
    } else {
        let error = error_message(response).await?;
        eprintln!("Failed to place {} -> {}: {}", source, destination, error);
    }

    Ok(())
}

/// Show daemon status
pub async fn status(client: &ApiClient) -> Result<()> {
    let response = client
        .client
        .get(client.url("/api/v1/status"))
        .send()
        .await?;

    if response.status().is_success() {
        let status: StatusResponse = response.json().await?;
        if client.json {
            return print_json(&status);
        }

        println!("nodescore v{}", status.version);
        println!();
        println!("Nodes: {}", status.nodes);
        println!("Ledger rows: {}", status.ledger_rows);
        println!("Averager: {}", status.averager);
        println!("Mode: {}", status.mode);
    } else {
        let error = error_message(response).await?;
        eprintln!("Failed to get status: {}", error);
    }

    Ok(())
}

fn describe_decision(source: &str, destination: &str, decision: &PlacementDecision) -> String {
    match (decision.basis, decision.score) {
        (DecisionBasis::Scored, Some(score)) => format!(
            "{} -> {}: place on {} (score {:.4})",
            source, destination, decision.node, score
        ),
        _ => format!(
            "{} -> {}: place on {} (single node on each side)",
            source, destination, decision.node
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_trivial_decision() {
        let decision = PlacementDecision::trivial("edge-2".to_string());
        let line = describe_decision("frontend", "backend", &decision);
        assert_eq!(
            line,
            "frontend -> backend: place on edge-2 (single node on each side)"
        );
    }

    #[test]
    fn test_client_url_strips_trailing_slash() {
        let client = ApiClient::new("http://localhost:9090/", false);
        assert_eq!(client.url("/api/v1/status"), "http://localhost:9090/api/v1/status");
    }
}
