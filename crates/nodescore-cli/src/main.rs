//! nodescore CLI
//!
//! Command-line interface for querying the nodescore daemon.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// nodescore - telemetry-driven node placement optimizer
#[derive(Parser, Debug)]
#[command(name = "nodescore")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Daemon API address
    #[arg(long, default_value = "http://localhost:9090", global = true)]
    api: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the current best node
    Best,

    /// List every node's latest score
    Scores,

    /// Ask for a placement decision for a workload pair
    Place {
        /// Workload originating the traffic
        source: String,

        /// Workload receiving the traffic
        destination: String,
    },

    /// Show daemon status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let client = commands::ApiClient::new(&cli.api, cli.json);

    match cli.command {
        Commands::Best => {
            commands::best(&client).await?;
        }
        Commands::Scores => {
            commands::scores(&client).await?;
        }
        Commands::Place {
            source,
            destination,
        } => {
            commands::place(&client, source, destination).await?;
        }
        Commands::Status => {
            commands::status(&client).await?;
        }
    }

    Ok(())
}
