//! Run Service
//!
//! Business logic of scenario runs: submission, queries, status
//! reconciliation, logs, stop and deletion.

use simrun_core::domain::dataset::{Connector, Dataset};
use simrun_core::domain::run::{RunState, ScenarioRun};
use simrun_core::domain::scenario::Scenario;
use simrun_core::domain::solution::Solution;
use simrun_core::domain::workspace::{Organization, Workspace};
use simrun_core::dto::run::{RunSearch, ScenarioRunLogs, ScenarioRunStatus};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::events::{DomainEvent, EventBus};
use super::pipeline::{self, PipelineBuilder, PipelineError, PipelineInputs};
use super::status::StatusReconciler;
use super::teardown::{RunTeardown, TeardownOutcome};
use crate::executor::WorkflowExecutor;
use crate::repository::{Catalog, Document, RepositoryError, RunRepository};

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("user '{user}' is not allowed to {action}")]
    Forbidden { user: String, action: String },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("workflow executor error: {0:#}")]
    Dispatch(anyhow::Error),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl RunError {
    fn not_found(entity: &'static str, id: impl ToString) -> Self {
        RunError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RunError>;

const DEFAULT_EXECUTOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Entities a run is started from
struct RunContext {
    organization: Organization,
    workspace: Workspace,
    scenario: Scenario,
    solution: Solution,
    datasets: Vec<Dataset>,
    connectors: Vec<Connector>,
}

pub struct RunService {
    catalog: Catalog,
    runs: Arc<dyn RunRepository>,
    executor: Arc<dyn WorkflowExecutor>,
    builder: PipelineBuilder,
    reconciler: StatusReconciler,
    teardown: RunTeardown,
    events: EventBus,
    executor_timeout: Duration,
}

impl RunService {
    pub fn new(
        catalog: Catalog,
        runs: Arc<dyn RunRepository>,
        executor: Arc<dyn WorkflowExecutor>,
        builder: PipelineBuilder,
        reconciler: StatusReconciler,
        teardown: RunTeardown,
        events: EventBus,
    ) -> Self {
        Self {
            catalog,
            runs,
            executor,
            builder,
            reconciler,
            teardown,
            events,
            executor_timeout: DEFAULT_EXECUTOR_TIMEOUT,
        }
    }

    /// Bounds every workflow status query sent to the executor
    pub fn with_executor_timeout(mut self, timeout: Duration) -> Self {
        self.executor_timeout = timeout;
        self
    }

    /// Builds the pipeline of a scenario, submits it and records the run
    pub async fn start_run(
        &self,
        organization_id: &str,
        workspace_id: &str,
        scenario_id: &str,
        caller: &str,
    ) -> Result<ScenarioRun> {
        let ctx = self
            .load_context(organization_id, workspace_id, scenario_id)
            .await?;
        let template =
            pipeline::resolve_run_template(&ctx.solution, &ctx.scenario.run_template_id)?;

        let csm_simulation_run = Uuid::new_v4();
        let inputs = PipelineInputs {
            organization: &ctx.organization,
            workspace: &ctx.workspace,
            solution: &ctx.solution,
            scenario: &ctx.scenario,
            datasets: &ctx.datasets,
            connectors: &ctx.connectors,
            csm_simulation_run,
        };
        let start = self.builder.build_start_containers(&inputs)?;

        let handle = self
            .executor
            .submit(&start)
            .await
            .map_err(RunError::Dispatch)?;

        let now = chrono::Utc::now();
        let run = ScenarioRun {
            id: Uuid::new_v4(),
            owner_id: caller.to_string(),
            csm_simulation_run,
            organization_id: ctx.organization.id.clone(),
            workspace_id: ctx.workspace.id.clone(),
            workspace_key: ctx.workspace.key.clone(),
            scenario_id: ctx.scenario.id.clone(),
            solution_id: ctx.solution.id.clone(),
            run_template_id: template.id.clone(),
            solution_sdk_version: ctx.solution.sdk_version.clone(),
            no_data_ingestion_state: template.no_data_ingestion_state.unwrap_or(false),
            workflow_id: handle.id,
            workflow_name: handle.name,
            node_label: start.node_label,
            containers: start.containers,
            state: None,
            created_at: now,
            updated_at: now,
        };

        self.runs.insert(&run).await?;

        tracing::info!(
            "Run {} started for scenario {} as workflow {}",
            run.id,
            run.scenario_id,
            run.workflow_name
        );

        self.events.publish(DomainEvent::ScenarioRunStartedForScenario {
            organization_id: run.organization_id.clone(),
            workspace_id: run.workspace_id.clone(),
            scenario_id: run.scenario_id.clone(),
            scenario_run_id: run.id,
            csm_simulation_run: run.csm_simulation_run,
            workflow_id: run.workflow_id.clone(),
            workflow_name: run.workflow_name.clone(),
        });

        Ok(run)
    }

    pub async fn get_run(&self, organization_id: &str, run_id: Uuid) -> Result<ScenarioRun> {
        self.runs
            .find_by_id(organization_id, run_id)
            .await?
            .ok_or_else(|| RunError::not_found("run", run_id))
    }

    pub async fn list_runs_by_scenario(
        &self,
        organization_id: &str,
        workspace_id: &str,
        scenario_id: &str,
    ) -> Result<Vec<ScenarioRun>> {
        let filter = RunSearch {
            workspace_id: Some(workspace_id.to_string()),
            scenario_id: Some(scenario_id.to_string()),
            ..Default::default()
        };
        self.search_runs(organization_id, &filter).await
    }

    pub async fn list_runs_by_workspace(
        &self,
        organization_id: &str,
        workspace_id: &str,
    ) -> Result<Vec<ScenarioRun>> {
        let filter = RunSearch {
            workspace_id: Some(workspace_id.to_string()),
            ..Default::default()
        };
        self.search_runs(organization_id, &filter).await
    }

    pub async fn search_runs(
        &self,
        organization_id: &str,
        filter: &RunSearch,
    ) -> Result<Vec<ScenarioRun>> {
        Ok(self.runs.search(organization_id, filter).await?)
    }

    /// Status of a run
    ///
    /// Cached terminal states are returned as is. Otherwise the executor phase
    /// is reconciled and a terminal result is cached.
    pub async fn get_run_status(
        &self,
        organization_id: &str,
        run_id: Uuid,
    ) -> Result<ScenarioRunStatus> {
        let run = self.get_run(organization_id, run_id).await?;

        if let Some(state) = run.terminal_state() {
            return Ok(status_of(&run, None, None, state));
        }

        let query = self.executor.status(&run.workflow_name);
        let status = match tokio::time::timeout(self.executor_timeout, query).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                tracing::warn!(
                    "Executor unavailable for workflow {}: {:#}",
                    run.workflow_name,
                    e
                );
                return Ok(status_of(&run, None, None, RunState::Unknown));
            }
            Err(_) => {
                tracing::warn!(
                    "Executor status of workflow {} timed out after {:?}",
                    run.workflow_name,
                    self.executor_timeout
                );
                return Ok(status_of(&run, None, None, RunState::Unknown));
            }
        };

        let state = self
            .reconciler
            .reconcile(&run, &status.workflow_phase(), status.finished_at)
            .await;

        if state.is_terminal() {
            if let Err(e) = self.runs.update_state(run.id, state).await {
                tracing::warn!("Failed to cache state of run {}: {}", run.id, e);
            }
        }

        Ok(status_of(&run, status.phase, status.finished_at, state))
    }

    pub async fn get_run_logs(&self, organization_id: &str, run_id: Uuid) -> Result<ScenarioRunLogs> {
        let run = self.get_run(organization_id, run_id).await?;
        let names: Vec<String> = run.containers.iter().map(|c| c.name.clone()).collect();

        let containers = self
            .executor
            .logs(&run.workflow_name, &names)
            .await
            .map_err(RunError::Dispatch)?;

        Ok(ScenarioRunLogs {
            scenario_run_id: run.id,
            containers,
        })
    }

    /// Asks the executor to stop a run without waiting for the outcome
    pub async fn stop_run(&self, organization_id: &str, run_id: Uuid) -> Result<()> {
        let run = self.get_run(organization_id, run_id).await?;
        let executor = self.executor.clone();

        tokio::spawn(async move {
            if let Err(e) = executor.stop(&run.workflow_name).await {
                tracing::warn!("Failed to stop workflow {}: {:#}", run.workflow_name, e);
            }
        });

        Ok(())
    }

    /// Deletes a run owned by the caller
    pub async fn delete_run(
        &self,
        organization_id: &str,
        run_id: Uuid,
        caller: &str,
    ) -> Result<TeardownOutcome> {
        let run = self.get_run(organization_id, run_id).await?;

        if run.owner_id != caller {
            return Err(RunError::Forbidden {
                user: caller.to_string(),
                action: format!("delete run {}", run.id),
            });
        }

        Ok(self.teardown.teardown(&run).await)
    }

    async fn load_context(
        &self,
        organization_id: &str,
        workspace_id: &str,
        scenario_id: &str,
    ) -> Result<RunContext> {
        let organization: Organization = self.require(organization_id).await?;

        let workspace: Workspace = self.require(workspace_id).await?;
        if workspace.organization_id != organization.id {
            return Err(RunError::not_found("workspace", workspace_id));
        }

        let scenario: Scenario = self.require(scenario_id).await?;
        if scenario.workspace_id != workspace.id {
            return Err(RunError::not_found("scenario", scenario_id));
        }

        let solution: Solution = self.require(&scenario.solution_id).await?;

        let mut dataset_ids: Vec<&str> = scenario.dataset_list.iter().map(String::as_str).collect();
        dataset_ids.extend(
            scenario
                .parameters_values
                .iter()
                .filter(|v| {
                    solution
                        .parameter(&v.parameter_id)
                        .is_some_and(|p| p.is_dataset_reference())
                })
                .map(|v| v.value.as_str())
                .filter(|v| !v.trim().is_empty()),
        );
        dataset_ids.sort_unstable();
        dataset_ids.dedup();

        let datasets: Vec<Dataset> = self.catalog.get_many(&dataset_ids).await?;

        let mut connector_ids: Vec<&str> = datasets
            .iter()
            .filter_map(|d| d.connector.as_ref().map(|c| c.id.as_str()))
            .collect();
        connector_ids.sort_unstable();
        connector_ids.dedup();

        let connectors: Vec<Connector> = self.catalog.get_many(&connector_ids).await?;

        Ok(RunContext {
            organization,
            workspace,
            scenario,
            solution,
            datasets,
            connectors,
        })
    }

    async fn require<T: Document>(&self, id: &str) -> Result<T> {
        self.catalog
            .get::<T>(id)
            .await?
            .ok_or_else(|| RunError::not_found(T::KIND.as_str(), id))
    }
}

fn status_of(
    run: &ScenarioRun,
    phase: Option<String>,
    end_time: Option<chrono::DateTime<chrono::Utc>>,
    state: RunState,
) -> ScenarioRunStatus {
    ScenarioRunStatus {
        id: run.id,
        organization_id: run.organization_id.clone(),
        workflow_id: run.workflow_id.clone(),
        workflow_name: run.workflow_name.clone(),
        phase,
        end_time,
        state,
    }
}
