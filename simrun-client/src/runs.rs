//! Run-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use reqwest::Method;
use simrun_core::domain::run::ScenarioRun;
use simrun_core::dto::run::{RunSearch, ScenarioRunLogs, ScenarioRunStatus, TeardownOutcome};
use uuid::Uuid;

impl OrchestratorClient {
    // =============================================================================
    // Run Lifecycle
    // =============================================================================

    /// Start a run of a scenario
    ///
    /// # Returns
    /// The submitted run
    pub async fn start_run(
        &self,
        organization_id: &str,
        workspace_id: &str,
        scenario_id: &str,
    ) -> Result<ScenarioRun> {
        let path = format!(
            "/organizations/{}/workspaces/{}/scenarios/{}/run",
            organization_id, workspace_id, scenario_id
        );
        let response = self.request(Method::POST, &path).send().await?;

        self.handle_response(response).await
    }

    /// Ask the executor to stop a run
    pub async fn stop_run(&self, organization_id: &str, run_id: Uuid) -> Result<()> {
        let path = format!("/organizations/{}/runs/{}/stop", organization_id, run_id);
        let response = self.request(Method::POST, &path).send().await?;

        self.handle_empty_response(response).await
    }

    /// Delete a run owned by the current user
    ///
    /// # Returns
    /// Which parts of the run were removed
    pub async fn delete_run(&self, organization_id: &str, run_id: Uuid) -> Result<TeardownOutcome> {
        let path = format!("/organizations/{}/runs/{}", organization_id, run_id);
        let response = self.request(Method::DELETE, &path).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Run Queries
    // =============================================================================

    pub async fn get_run(&self, organization_id: &str, run_id: Uuid) -> Result<ScenarioRun> {
        let path = format!("/organizations/{}/runs/{}", organization_id, run_id);
        let response = self.request(Method::GET, &path).send().await?;

        self.handle_response(response).await
    }

    /// Get the reconciled status of a run
    pub async fn get_run_status(
        &self,
        organization_id: &str,
        run_id: Uuid,
    ) -> Result<ScenarioRunStatus> {
        let path = format!("/organizations/{}/runs/{}/status", organization_id, run_id);
        let response = self.request(Method::GET, &path).send().await?;

        self.handle_response(response).await
    }

    /// Get the logs of every container of a run
    pub async fn get_run_logs(&self, organization_id: &str, run_id: Uuid) -> Result<ScenarioRunLogs> {
        let path = format!("/organizations/{}/runs/{}/logs", organization_id, run_id);
        let response = self.request(Method::GET, &path).send().await?;

        self.handle_response(response).await
    }

    pub async fn list_runs_by_scenario(
        &self,
        organization_id: &str,
        workspace_id: &str,
        scenario_id: &str,
    ) -> Result<Vec<ScenarioRun>> {
        let path = format!(
            "/organizations/{}/workspaces/{}/scenarios/{}/runs",
            organization_id, workspace_id, scenario_id
        );
        let response = self.request(Method::GET, &path).send().await?;

        self.handle_response(response).await
    }

    pub async fn list_runs_by_workspace(
        &self,
        organization_id: &str,
        workspace_id: &str,
    ) -> Result<Vec<ScenarioRun>> {
        let path = format!(
            "/organizations/{}/workspaces/{}/runs",
            organization_id, workspace_id
        );
        let response = self.request(Method::GET, &path).send().await?;

        self.handle_response(response).await
    }

    /// Search the runs of an organization
    ///
    /// Every populated field of `filter` narrows the result.
    pub async fn search_runs(
        &self,
        organization_id: &str,
        filter: &RunSearch,
    ) -> Result<Vec<ScenarioRun>> {
        let path = format!("/organizations/{}/runs/search", organization_id);
        let response = self.request(Method::POST, &path).json(filter).send().await?;

        self.handle_response(response).await
    }
}
