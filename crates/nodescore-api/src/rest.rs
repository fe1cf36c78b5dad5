//! REST API handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use nodescore_core::{
    AveragerMode, NodescoreError, PlacementDecision, ScoreRecord, ScoringMode,
};
use nodescore_optimizer::PlacementEngine;
use nodescore_store::ScoreLedger;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Message returned while the ledger has never been written
pub const NO_DECISION_YET: &str = "no placement decision available yet";

/// Application state shared across handlers
pub struct AppState {
    pub ledger: ScoreLedger,
    pub engine: Arc<PlacementEngine>,
    /// Number of nodes scored by the optimization cycle
    pub node_count: usize,
    pub averager: AveragerMode,
    pub mode: ScoringMode,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/best-node", get(get_best_node))
        .route("/api/v1/scores", get(list_scores))
        .route("/api/v1/placements", post(create_placement))
        .route("/api/v1/status", get(get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn map_error(e: NodescoreError) -> ApiError {
    let status = match &e {
        NodescoreError::UnhandledTopology { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        NodescoreError::UnsupportedWorkloadPair { .. } => StatusCode::BAD_REQUEST,
        NodescoreError::WorkloadNotPlaced(_) | NodescoreError::NoCandidates => {
            StatusCode::NOT_FOUND
        }
        NodescoreError::Provider(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

/// Ledger row as returned by the API
#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub node: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<ScoreRecord> for ScoreResponse {
    fn from(record: ScoreRecord) -> Self {
        Self {
            node: record.node,
            score: record.score,
            timestamp: record.timestamp,
        }
    }
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// Best node according to the latest optimization cycles
async fn get_best_node(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ScoreResponse>, ApiError> {
    match state.ledger.query_best().map_err(map_error)? {
        Some(record) => Ok(Json(ScoreResponse::from(record))),
        None => Err(api_error(StatusCode::NOT_FOUND, NO_DECISION_YET)),
    }
}

/// All ledger rows, best first
async fn list_scores(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ScoreResponse>>, ApiError> {
    let records = state.ledger.list().map_err(map_error)?;
    Ok(Json(records.into_iter().map(ScoreResponse::from).collect()))
}

/// Request for an on-demand placement decision
#[derive(Debug, Deserialize)]
pub struct PlacementRequest {
    /// Workload originating the traffic
    pub source: String,
    /// Workload receiving the traffic
    pub destination: String,
}

/// Decide a placement for a workload pair now
async fn create_placement(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlacementRequest>,
) -> Result<Json<PlacementDecision>, ApiError> {
    info!(
        source = %req.source,
        destination = %req.destination,
        "Placement requested"
    );

    let decision = state
        .engine
        .decide(&req.source, &req.destination)
        .await
        .map_err(|e| {
            warn!(error = %e, "Placement request failed");
            map_error(e)
        })?;

    Ok(Json(decision))
}

/// System status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub nodes: usize,
    pub ledger_rows: u64,
    pub averager: String,
    pub mode: String,
}

/// Get system status
async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let ledger_rows = state.ledger.len().map_err(map_error)?;

    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        nodes: state.node_count,
        ledger_rows,
        averager: state.averager.to_string(),
        mode: state.mode.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use nodescore_core::{OptimizerConfig, PlacementMap};
    use nodescore_optimizer::HistoricalAverager;
    use nodescore_providers::StaticTopology;
    use nodescore_store::SampleLog;
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    fn test_state(ledger: ScoreLedger, placement: PlacementMap) -> AppState {
        let config = OptimizerConfig::default();
        let averager = Arc::new(HistoricalAverager::new(
            SampleLog::open_in_memory().unwrap(),
            config.window,
        ));
        let engine = PlacementEngine::new(
            &config,
            Arc::new(StaticTopology::new(placement)),
            averager,
        );
        AppState {
            ledger,
            engine: Arc::new(engine),
            node_count: config.nodes.len(),
            averager: config.averager,
            mode: config.mode,
        }
    }

    fn placement(source: &[&str], destination: &[&str]) -> PlacementMap {
        let mut map = PlacementMap::new();
        map.insert(
            "frontend".to_string(),
            source.iter().map(|n| (n.to_string(), 1)).collect::<BTreeMap<_, _>>(),
        );
        map.insert(
            "backend".to_string(),
            destination.iter().map(|n| (n.to_string(), 1)).collect::<BTreeMap<_, _>>(),
        );
        map
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn placement_request(source: &str, destination: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/placements")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"source": source, "destination": destination}).to_string(),
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn test_best_node_empty_ledger() {
        let router = create_router(test_state(
            ScoreLedger::open_in_memory().unwrap(),
            PlacementMap::new(),
        ));

        let response = router
            .oneshot(Request::get("/api/v1/best-node").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = body_json(response).await;
        assert_eq!(body.error, NO_DECISION_YET);
    }

    #[tokio::test]
    async fn test_best_node() {
        let ledger = ScoreLedger::open_in_memory().unwrap();
        ledger.upsert("edge-1", 0.3).unwrap();
        ledger.upsert("edge-2", 0.9).unwrap();
        let router = create_router(test_state(ledger, PlacementMap::new()));

        let response = router
            .oneshot(Request::get("/api/v1/best-node").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: ScoreResponse = body_json(response).await;
        assert_eq!(body.node, "edge-2");
        assert_eq!(body.score, 0.9);
    }

    #[tokio::test]
    async fn test_list_scores() {
        let ledger = ScoreLedger::open_in_memory().unwrap();
        ledger.upsert("edge-1", 0.3).unwrap();
        ledger.upsert("edge-2", 0.9).unwrap();
        let router = create_router(test_state(ledger, PlacementMap::new()));

        let response = router
            .oneshot(Request::get("/api/v1/scores").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body: Vec<ScoreResponse> = body_json(response).await;
        assert_eq!(body.len(), 2);
        assert_eq!(body[0].node, "edge-2");
    }

    #[tokio::test]
    async fn test_trivial_placement() {
        let router = create_router(test_state(
            ScoreLedger::open_in_memory().unwrap(),
            placement(&["edge-1"], &["edge-2"]),
        ));

        let response = router
            .oneshot(placement_request("frontend", "backend"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let decision: PlacementDecision = body_json(response).await;
        assert_eq!(decision.node, "edge-2");
        assert_eq!(decision.score, None);
    }

    #[tokio::test]
    async fn test_many_to_many_placement_is_422() {
        let router = create_router(test_state(
            ScoreLedger::open_in_memory().unwrap(),
            placement(&["edge-1", "edge-2"], &["edge-3", "edge-4"]),
        ));

        let response = router
            .oneshot(placement_request("frontend", "backend"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body: ErrorResponse = body_json(response).await;
        assert!(body.error.contains("Unhandled topology"));
    }

    #[tokio::test]
    async fn test_placement_for_other_pair_is_400() {
        let router = create_router(test_state(
            ScoreLedger::open_in_memory().unwrap(),
            placement(&["edge-1"], &["edge-2", "edge-3"]),
        ));

        let response = router
            .oneshot(placement_request("frontend", "payments"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = body_json(response).await;
        assert!(body.error.contains("'payments'"));
    }

    #[tokio::test]
    async fn test_placement_without_metrics_is_404() {
        let router = create_router(test_state(
            ScoreLedger::open_in_memory().unwrap(),
            placement(&["edge-1"], &["edge-2", "edge-3"]),
        ));

        let response = router
            .oneshot(placement_request("frontend", "backend"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_status() {
        let ledger = ScoreLedger::open_in_memory().unwrap();
        ledger.upsert("edge-1", 0.5).unwrap();
        let router = create_router(test_state(ledger, PlacementMap::new()));

        let response = router
            .oneshot(Request::get("/api/v1/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body: StatusResponse = body_json(response).await;
        assert_eq!(body.ledger_rows, 1);
        assert_eq!(body.averager, "historical");
        assert_eq!(body.mode, "latency-bandwidth-energy");
    }
}
