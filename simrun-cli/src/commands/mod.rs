//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod entity;
mod run;

pub use entity::DeleteCommands;
pub use run::RunCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Scenario run management
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Delete scenarios, workspaces, organizations or connectors
    Delete {
        #[command(subcommand)]
        command: DeleteCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Run { command } => run::handle_run_command(command, config).await,
        Commands::Delete { command } => entity::handle_delete_command(command, config).await,
    }
}
