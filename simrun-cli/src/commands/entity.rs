//! Entity deletion commands
//!
//! The orchestrator accepts deletions immediately and removes the runs that
//! depend on the entity in the background.

use anyhow::Result;
use clap::Subcommand;
use colored::*;

use crate::config::Config;

/// Delete subcommands
#[derive(Subcommand)]
pub enum DeleteCommands {
    /// Delete a scenario you own, with all of its runs
    Scenario {
        /// Workspace ID
        workspace: String,
        /// Scenario ID
        scenario: String,
    },
    /// Delete a workspace with all of its runs
    Workspace {
        /// Workspace ID
        workspace: String,
    },
    /// Unregister the organization, deleting all of its runs
    Organization {
        /// Required to confirm the deletion
        #[arg(long)]
        yes: bool,
    },
    /// Remove a connector from the datasets using it
    Connector {
        /// Connector ID
        connector: String,
    },
}

/// Handle delete commands
pub async fn handle_delete_command(command: DeleteCommands, config: &Config) -> Result<()> {
    let client = config.client();
    let org = config.organization.as_str();

    match command {
        DeleteCommands::Scenario {
            workspace,
            scenario,
        } => {
            client.delete_scenario(org, &workspace, &scenario).await?;
            accepted(&format!("Scenario {}", scenario));
        }
        DeleteCommands::Workspace { workspace } => {
            client.delete_workspace(org, &workspace).await?;
            accepted(&format!("Workspace {}", workspace));
        }
        DeleteCommands::Organization { yes } => {
            if !yes {
                anyhow::bail!(
                    "Refusing to unregister organization {} without --yes",
                    org
                );
            }
            client.unregister_organization(org).await?;
            accepted(&format!("Organization {}", org));
        }
        DeleteCommands::Connector { connector } => {
            client.remove_connector(&connector).await?;
            accepted(&format!("Connector {}", connector));
        }
    }

    Ok(())
}

fn accepted(what: &str) {
    println!("{} {} deleted", "✓".green(), what.bold());
    println!("{}", "  Dependent runs are being removed in the background.".dimmed());
}
