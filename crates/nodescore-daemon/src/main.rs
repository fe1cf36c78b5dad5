//! nodescore daemon
//!
//! Runs the collection and optimization cycles and serves the query API.

use anyhow::Context;
use clap::Parser;
use nodescore_api::{create_router, AppState};
use nodescore_core::{AveragerMode, DaemonConfig, TopologyKind};
use nodescore_optimizer::{
    Collector, HistoricalAverager, MetricsAverager, OptimizationCycle, PlacementEngine,
    SnapshotAverager,
};
use nodescore_providers::{
    KubernetesTopology, MetricsProvider, PrometheusProvider, StaticTopology, TopologyProvider,
};
use nodescore_store::{SampleLog, ScoreLedger};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// nodescore daemon - telemetry-driven node placement optimizer
#[derive(Parser, Debug)]
#[command(name = "nodescored")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind the API server
    #[arg(long)]
    address: Option<String>,

    /// Port for the REST API server
    #[arg(long)]
    port: Option<u16>,

    /// Log level or filter directive
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(args: &Args) -> anyhow::Result<DaemonConfig> {
    let mut config = match &args.config {
        Some(path) => DaemonConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DaemonConfig::default(),
    };

    if let Some(address) = &args.address {
        config.api.rest_address = address.clone();
    }
    if let Some(port) = args.port {
        config.api.rest_port = port;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // Initialize logging
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Starting nodescore daemon v{}", env!("CARGO_PKG_VERSION"));

    let optimizer = &config.optimizer;
    let ledger = ScoreLedger::open(&config.storage.ledger_path)?;

    let provider: Arc<dyn MetricsProvider> = Arc::new(PrometheusProvider::new(
        config.prometheus.clone(),
        optimizer.source_workload(),
        optimizer.destination_workload(),
    )?);

    let topology: Arc<dyn TopologyProvider> = match config.topology.kind {
        TopologyKind::Static => Arc::new(StaticTopology::new(config.topology.placement.clone())),
        TopologyKind::Kubernetes => Arc::new(KubernetesTopology::new(&config.topology)?),
    };

    let averager: Arc<dyn MetricsAverager> = match optimizer.averager {
        AveragerMode::Historical => {
            let log = SampleLog::open(&config.storage.sample_log_path)?;
            let collector = Collector::new(
                provider.clone(),
                log.clone(),
                optimizer.nodes.clone(),
                config.storage.sample_retention,
            );
            let period = Duration::from_secs(optimizer.collection_interval_secs);
            tokio::spawn(async move { collector.run(period).await });
            Arc::new(HistoricalAverager::new(log, optimizer.window))
        }
        AveragerMode::Snapshot => Arc::new(SnapshotAverager::new(provider.clone())),
    };

    let cycle = OptimizationCycle::new(optimizer, averager.clone(), Arc::new(ledger.clone()));
    let period = Duration::from_secs(optimizer.optimization_interval_secs);
    tokio::spawn(async move { cycle.run(period).await });

    let engine = Arc::new(PlacementEngine::new(optimizer, topology, averager));
    let router = create_router(AppState {
        ledger,
        engine,
        node_count: optimizer.nodes.len(),
        averager: optimizer.averager,
        mode: optimizer.mode,
    });

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.api.rest_address, config.api.rest_port)
        .parse()
        .context("invalid API address")?;

    info!(
        %addr,
        nodes = optimizer.nodes.len(),
        averager = %optimizer.averager,
        topology = ?config.topology.kind,
        "API server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
