//! Entity API Handlers
//!
//! Deletion endpoints of catalog entities. Dependent cleanup runs in the
//! background, so these endpoints answer `202 Accepted`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use crate::api::error::ApiResult;
use crate::api::{AppState, Caller};

/// DELETE /organizations/{organization_id}/workspaces/{workspace_id}/scenarios/{scenario_id}
pub async fn delete_scenario(
    State(state): State<AppState>,
    Path((organization_id, workspace_id, scenario_id)): Path<(String, String, String)>,
    Caller(caller): Caller,
) -> ApiResult<StatusCode> {
    tracing::info!("User {} deleting scenario: {}", caller, scenario_id);

    state
        .entities
        .delete_scenario(&organization_id, &workspace_id, &scenario_id, &caller)
        .await?;

    Ok(StatusCode::ACCEPTED)
}

/// DELETE /organizations/{organization_id}/workspaces/{workspace_id}
pub async fn delete_workspace(
    State(state): State<AppState>,
    Path((organization_id, workspace_id)): Path<(String, String)>,
    Caller(caller): Caller,
) -> ApiResult<StatusCode> {
    tracing::info!("User {} deleting workspace: {}", caller, workspace_id);

    state
        .entities
        .delete_workspace(&organization_id, &workspace_id)
        .await?;

    Ok(StatusCode::ACCEPTED)
}

/// DELETE /organizations/{organization_id}
pub async fn unregister_organization(
    State(state): State<AppState>,
    Path(organization_id): Path<String>,
    Caller(caller): Caller,
) -> ApiResult<StatusCode> {
    tracing::info!("User {} unregistering organization: {}", caller, organization_id);

    state
        .entities
        .unregister_organization(&organization_id)
        .await?;

    Ok(StatusCode::ACCEPTED)
}

/// DELETE /connectors/{connector_id}
pub async fn remove_connector(
    State(state): State<AppState>,
    Path(connector_id): Path<String>,
    Caller(caller): Caller,
) -> ApiResult<StatusCode> {
    tracing::info!("User {} removing connector: {}", caller, connector_id);

    state.entities.remove_connector(&connector_id).await?;

    Ok(StatusCode::ACCEPTED)
}
