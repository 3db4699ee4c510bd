//! Simrun CLI
//!
//! Command-line interface for starting and inspecting scenario runs.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "simrun")]
#[command(about = "Simulation scenario run CLI", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(
        long,
        env = "SIMRUN_ORCHESTRATOR_URL",
        default_value = "http://localhost:8080"
    )]
    orchestrator_url: String,

    /// Organization the commands apply to
    #[arg(long = "org", env = "SIMRUN_ORGANIZATION")]
    organization: String,

    /// Identity sent to the orchestrator
    #[arg(long, env = "SIMRUN_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.orchestrator_url,
        organization: cli.organization,
        user: cli.user,
    };

    handle_command(cli.command, &config).await
}
