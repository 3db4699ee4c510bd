//! Data ingestion backend
//!
//! Runs emitting telemetry push their results to an ingestion database
//! named after the workspace key. The backend reports per-run ingestion
//! progress and removes run data on teardown.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use simrun_core::domain::run::DataIngestionState;
use uuid::Uuid;

/// Ingestion backend keyed by organization, workspace key and correlation id
#[async_trait]
pub trait IngestionBackend: Send + Sync {
    /// Ingestion state of a run, `None` when the backend has no record of it
    async fn state(
        &self,
        organization_id: &str,
        workspace_key: &str,
        csm_simulation_run: Uuid,
    ) -> Result<Option<DataIngestionState>>;

    /// Deletes every ingested row of a run
    async fn delete_run_data(
        &self,
        organization_id: &str,
        workspace_key: &str,
        csm_simulation_run: Uuid,
    ) -> Result<()>;
}

/// HTTP implementation of IngestionBackend
pub struct HttpIngestionBackend {
    client: Client,
    base_url: String,
}

impl HttpIngestionBackend {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn run_url(&self, organization_id: &str, workspace_key: &str, run: Uuid) -> String {
        format!(
            "{}/organizations/{}/databases/{}/runs/{}",
            self.base_url.trim_end_matches('/'),
            organization_id,
            workspace_key,
            run
        )
    }
}

#[derive(Debug, Deserialize)]
struct StateResponse {
    state: DataIngestionState,
}

#[async_trait]
impl IngestionBackend for HttpIngestionBackend {
    async fn state(
        &self,
        organization_id: &str,
        workspace_key: &str,
        csm_simulation_run: Uuid,
    ) -> Result<Option<DataIngestionState>> {
        let url = format!(
            "{}/state",
            self.run_url(organization_id, workspace_key, csm_simulation_run)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to query ingestion state")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to query ingestion state: {} - {}", status, body);
        }

        let body = response
            .json::<StateResponse>()
            .await
            .context("Failed to parse ingestion state")?;

        Ok(Some(body.state))
    }

    async fn delete_run_data(
        &self,
        organization_id: &str,
        workspace_key: &str,
        csm_simulation_run: Uuid,
    ) -> Result<()> {
        let url = self.run_url(organization_id, workspace_key, csm_simulation_run);

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .context("Failed to delete run data")?;

        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to delete run data: {} - {}", status, body);
        }

        Ok(())
    }
}
