//! Run command handlers
//!
//! Handles all run-related CLI commands: starting a scenario, inspecting
//! runs, their status and logs, and stopping or deleting them.

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use simrun_client::OrchestratorClient;
use simrun_core::domain::run::{RunState, ScenarioRun};
use simrun_core::dto::run::{RunSearch, ScenarioRunStatus};

use crate::config::Config;
use crate::id_resolver::resolve_run_id;
use crate::types::IdOrPrefix;

/// Run subcommands
#[derive(Subcommand)]
pub enum RunCommands {
    /// Start a run of a scenario
    Start {
        /// Workspace ID
        workspace: String,
        /// Scenario ID
        scenario: String,
    },
    /// Get run details
    Get {
        /// Run ID or unambiguous prefix
        id: String,
    },
    /// Get the current state of a run
    Status {
        /// Run ID or unambiguous prefix
        id: String,
    },
    /// Get the logs of every container of a run
    Logs {
        /// Run ID or unambiguous prefix
        id: String,
    },
    /// Stop a run
    Stop {
        /// Run ID or unambiguous prefix
        id: String,
    },
    /// Delete a run you own, with its ingested data
    Delete {
        /// Run ID or unambiguous prefix
        id: String,
    },
    /// List the runs of a workspace or scenario
    List {
        /// Workspace ID
        workspace: String,

        /// Only list runs of this scenario
        #[arg(long)]
        scenario: Option<String>,
    },
    /// Search runs of the organization
    Search {
        #[arg(long)]
        solution: Option<String>,
        #[arg(long)]
        run_template: Option<String>,
        #[arg(long)]
        workspace: Option<String>,
        #[arg(long)]
        scenario: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        /// One of Running, Successful, Failed, Unknown, DataIngestionInProgress
        #[arg(long)]
        state: Option<RunState>,
    },
}

/// Handle run commands
///
/// Routes run subcommands to their respective handlers.
///
/// # Arguments
/// * `command` - The run command to execute
/// * `config` - The CLI configuration
pub async fn handle_run_command(command: RunCommands, config: &Config) -> Result<()> {
    let client = config.client();
    let org = config.organization.as_str();

    match command {
        RunCommands::Start {
            workspace,
            scenario,
        } => start_run(&client, org, &workspace, &scenario).await,
        RunCommands::Get { id } => get_run(&client, org, &id).await,
        RunCommands::Status { id } => get_status(&client, org, &id).await,
        RunCommands::Logs { id } => get_logs(&client, org, &id).await,
        RunCommands::Stop { id } => stop_run(&client, org, &id).await,
        RunCommands::Delete { id } => delete_run(&client, org, &id).await,
        RunCommands::List {
            workspace,
            scenario,
        } => {
            let runs = match scenario {
                Some(scenario) => {
                    client
                        .list_runs_by_scenario(org, &workspace, &scenario)
                        .await?
                }
                None => client.list_runs_by_workspace(org, &workspace).await?,
            };
            print_runs(&runs);
            Ok(())
        }
        RunCommands::Search {
            solution,
            run_template,
            workspace,
            scenario,
            owner,
            state,
        } => {
            let filter = RunSearch {
                solution_id: solution,
                run_template_id: run_template,
                workspace_id: workspace,
                scenario_id: scenario,
                owner_id: owner,
                state,
            };
            let runs = client.search_runs(org, &filter).await?;
            print_runs(&runs);
            Ok(())
        }
    }
}

async fn start_run(
    client: &OrchestratorClient,
    org: &str,
    workspace: &str,
    scenario: &str,
) -> Result<()> {
    let run = client.start_run(org, workspace, scenario).await?;

    println!("{} Run started", "✓".green());
    println!("  ID:       {}", run.id.to_string().cyan());
    println!("  Workflow: {}", run.workflow_name);
    println!("  Steps:    {}", run.containers.len());

    Ok(())
}

async fn get_run(client: &OrchestratorClient, org: &str, id: &str) -> Result<()> {
    let uuid = resolve_run_id(client, org, &IdOrPrefix::parse(id)).await?;
    let run = client.get_run(org, uuid).await?;

    print_run_details(&run);

    Ok(())
}

async fn get_status(client: &OrchestratorClient, org: &str, id: &str) -> Result<()> {
    let uuid = resolve_run_id(client, org, &IdOrPrefix::parse(id)).await?;
    let status = client.get_run_status(org, uuid).await?;

    print_status(&status);

    Ok(())
}

async fn get_logs(client: &OrchestratorClient, org: &str, id: &str) -> Result<()> {
    let uuid = resolve_run_id(client, org, &IdOrPrefix::parse(id)).await?;
    let logs = client.get_run_logs(org, uuid).await?;

    if logs.containers.is_empty() {
        println!("{}", "No logs found for this run.".yellow());
        return Ok(());
    }

    for (container, text) in &logs.containers {
        println!("{}", format!("Logs for {}:", container).bold());
        println!("{}", "─".repeat(80).dimmed());
        println!("{}", text.trim_end());
        println!("{}", "─".repeat(80).dimmed());
        println!();
    }

    Ok(())
}

async fn stop_run(client: &OrchestratorClient, org: &str, id: &str) -> Result<()> {
    let uuid = resolve_run_id(client, org, &IdOrPrefix::parse(id)).await?;
    client.stop_run(org, uuid).await?;

    println!("{} Stop requested for run {}", "✓".green(), uuid);

    Ok(())
}

async fn delete_run(client: &OrchestratorClient, org: &str, id: &str) -> Result<()> {
    let uuid = resolve_run_id(client, org, &IdOrPrefix::parse(id)).await?;
    let outcome = client.delete_run(org, uuid).await?;

    println!("{} Run {} deleted", "✓".green(), uuid);
    if !outcome.ingestion_deleted {
        println!(
            "{}",
            "⚠ Ingested data could not be removed and may need manual cleanup".yellow()
        );
    }

    Ok(())
}

fn print_runs(runs: &[ScenarioRun]) {
    if runs.is_empty() {
        println!("{}", "No runs found.".yellow());
        return;
    }

    println!("{}", format!("Found {} run(s):", runs.len()).bold());
    println!();
    for run in runs {
        print_run_summary(run);
    }
}

/// Print a run summary
fn print_run_summary(run: &ScenarioRun) {
    println!("  {} Run {}", "▸".cyan(), run.id.to_string().dimmed());
    println!("    Scenario: {}", run.scenario_id);
    println!("    Owner:    {}", run.owner_id);
    println!("    State:    {}", colorize_state(run.state));
    println!(
        "    Created:  {}",
        run.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed run information
fn print_run_details(run: &ScenarioRun) {
    println!("{}", "Run Details:".bold());
    println!("  ID:           {}", run.id.to_string().cyan());
    println!("  Simulation:   {}", run.csm_simulation_run);
    println!("  Workspace:    {}", run.workspace_id);
    println!("  Scenario:     {}", run.scenario_id);
    println!("  Solution:     {}", run.solution_id);
    println!("  Run Template: {}", run.run_template_id);
    println!("  Owner:        {}", run.owner_id);
    println!("  Workflow:     {}", run.workflow_name);
    println!("  Node Pool:    {}", run.node_label);
    println!("  State:        {}", colorize_state(run.state));
    println!(
        "  Created:      {}",
        run.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    if !run.containers.is_empty() {
        println!("\n{}", "Containers:".bold());
        for container in &run.containers {
            println!("  {} {}", container.name.cyan(), container.image.dimmed());
        }
    }
}

fn print_status(status: &ScenarioRunStatus) {
    println!("{}", "Run Status:".bold());
    println!("  ID:       {}", status.id.to_string().cyan());
    println!("  State:    {}", colorize_state(Some(status.state)));
    if let Some(phase) = &status.phase {
        println!("  Phase:    {}", phase);
    }
    if let Some(end) = status.end_time {
        println!("  Finished: {}", end.format("%Y-%m-%d %H:%M:%S"));
    }
}

/// Colorize run state for display
fn colorize_state(state: Option<RunState>) -> colored::ColoredString {
    match state {
        None => "Pending".dimmed(),
        Some(state) => {
            let text = state.to_string();
            match state {
                RunState::Running => text.cyan(),
                RunState::DataIngestionInProgress => text.yellow(),
                RunState::Successful => text.green(),
                RunState::Failed => text.red(),
                RunState::Unknown => text.dimmed(),
            }
        }
    }
}
