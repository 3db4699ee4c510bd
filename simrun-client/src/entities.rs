//! Entity deletion endpoints
//!
//! Deletions are accepted immediately; the orchestrator cleans up dependent
//! runs in the background.

use crate::OrchestratorClient;
use crate::error::Result;
use reqwest::Method;

impl OrchestratorClient {
    /// Delete a scenario owned by the current user, along with its runs
    pub async fn delete_scenario(
        &self,
        organization_id: &str,
        workspace_id: &str,
        scenario_id: &str,
    ) -> Result<()> {
        let path = format!(
            "/organizations/{}/workspaces/{}/scenarios/{}",
            organization_id, workspace_id, scenario_id
        );
        let response = self.request(Method::DELETE, &path).send().await?;

        self.handle_empty_response(response).await
    }

    pub async fn delete_workspace(&self, organization_id: &str, workspace_id: &str) -> Result<()> {
        let path = format!("/organizations/{}/workspaces/{}", organization_id, workspace_id);
        let response = self.request(Method::DELETE, &path).send().await?;

        self.handle_empty_response(response).await
    }

    pub async fn unregister_organization(&self, organization_id: &str) -> Result<()> {
        let path = format!("/organizations/{}", organization_id);
        let response = self.request(Method::DELETE, &path).send().await?;

        self.handle_empty_response(response).await
    }

    /// Remove a connector, unsetting it on every dataset using it
    pub async fn remove_connector(&self, connector_id: &str) -> Result<()> {
        let path = format!("/connectors/{}", connector_id);
        let response = self.request(Method::DELETE, &path).send().await?;

        self.handle_empty_response(response).await
    }
}
