//! Run API Handlers
//!
//! HTTP endpoints for scenario run lifecycle and queries.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use simrun_core::domain::run::ScenarioRun;
use simrun_core::dto::run::{RunSearch, ScenarioRunLogs, ScenarioRunStatus};
use uuid::Uuid;

use crate::api::error::ApiResult;
use crate::api::{AppState, Caller};
use crate::service::teardown::TeardownOutcome;

/// POST /organizations/{organization_id}/workspaces/{workspace_id}/scenarios/{scenario_id}/run
pub async fn start_run(
    State(state): State<AppState>,
    Path((organization_id, workspace_id, scenario_id)): Path<(String, String, String)>,
    Caller(caller): Caller,
) -> ApiResult<(StatusCode, Json<ScenarioRun>)> {
    tracing::info!(
        "User {} starting run of scenario {} in workspace {}",
        caller,
        scenario_id,
        workspace_id
    );

    let run = state
        .runs
        .start_run(&organization_id, &workspace_id, &scenario_id, &caller)
        .await?;

    Ok((StatusCode::CREATED, Json(run)))
}

/// GET /organizations/{organization_id}/workspaces/{workspace_id}/scenarios/{scenario_id}/runs
pub async fn list_runs_by_scenario(
    State(state): State<AppState>,
    Path((organization_id, workspace_id, scenario_id)): Path<(String, String, String)>,
) -> ApiResult<Json<Vec<ScenarioRun>>> {
    tracing::debug!("Listing runs of scenario {}", scenario_id);

    let runs = state
        .runs
        .list_runs_by_scenario(&organization_id, &workspace_id, &scenario_id)
        .await?;

    Ok(Json(runs))
}

/// GET /organizations/{organization_id}/workspaces/{workspace_id}/runs
pub async fn list_runs_by_workspace(
    State(state): State<AppState>,
    Path((organization_id, workspace_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<ScenarioRun>>> {
    tracing::debug!("Listing runs of workspace {}", workspace_id);

    let runs = state
        .runs
        .list_runs_by_workspace(&organization_id, &workspace_id)
        .await?;

    Ok(Json(runs))
}

/// POST /organizations/{organization_id}/runs/search
pub async fn search_runs(
    State(state): State<AppState>,
    Path(organization_id): Path<String>,
    Json(filter): Json<RunSearch>,
) -> ApiResult<Json<Vec<ScenarioRun>>> {
    tracing::debug!("Searching runs of {} with {:?}", organization_id, filter);

    let runs = state.runs.search_runs(&organization_id, &filter).await?;

    Ok(Json(runs))
}

/// GET /organizations/{organization_id}/runs/{run_id}
pub async fn get_run(
    State(state): State<AppState>,
    Path((organization_id, run_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<ScenarioRun>> {
    tracing::debug!("Getting run: {}", run_id);

    let run = state.runs.get_run(&organization_id, run_id).await?;

    Ok(Json(run))
}

/// GET /organizations/{organization_id}/runs/{run_id}/status
pub async fn get_run_status(
    State(state): State<AppState>,
    Path((organization_id, run_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<ScenarioRunStatus>> {
    tracing::debug!("Getting status of run: {}", run_id);

    let status = state.runs.get_run_status(&organization_id, run_id).await?;

    Ok(Json(status))
}

/// GET /organizations/{organization_id}/runs/{run_id}/logs
pub async fn get_run_logs(
    State(state): State<AppState>,
    Path((organization_id, run_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<ScenarioRunLogs>> {
    tracing::debug!("Getting logs of run: {}", run_id);

    let logs = state.runs.get_run_logs(&organization_id, run_id).await?;

    Ok(Json(logs))
}

/// POST /organizations/{organization_id}/runs/{run_id}/stop
pub async fn stop_run(
    State(state): State<AppState>,
    Path((organization_id, run_id)): Path<(String, Uuid)>,
) -> ApiResult<StatusCode> {
    tracing::info!("Stopping run: {}", run_id);

    state.runs.stop_run(&organization_id, run_id).await?;

    Ok(StatusCode::ACCEPTED)
}

/// DELETE /organizations/{organization_id}/runs/{run_id}
pub async fn delete_run(
    State(state): State<AppState>,
    Path((organization_id, run_id)): Path<(String, Uuid)>,
    Caller(caller): Caller,
) -> ApiResult<Json<TeardownOutcome>> {
    tracing::info!("User {} deleting run: {}", caller, run_id);

    let outcome = state
        .runs
        .delete_run(&organization_id, run_id, &caller)
        .await?;

    Ok(Json(outcome))
}
