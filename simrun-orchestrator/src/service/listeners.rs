//! Event listeners reacting to catalog changes

use async_trait::async_trait;
use simrun_core::domain::dataset::Dataset;
use simrun_core::domain::scenario::{Scenario, ScenarioLastRun};
use simrun_core::dto::run::RunSearch;
use std::sync::Arc;

use super::events::{DomainEvent, EventBusBuilder, EventHandler, EventKind};
use super::teardown::RunTeardown;
use crate::repository::{Catalog, RunRepository};

/// Tears down the runs of deleted scenarios, workspaces and organizations
pub struct RunCascadeListener {
    runs: Arc<dyn RunRepository>,
    teardown: RunTeardown,
}

impl RunCascadeListener {
    pub fn new(runs: Arc<dyn RunRepository>, teardown: RunTeardown) -> Self {
        Self { runs, teardown }
    }
}

#[async_trait]
impl EventHandler for RunCascadeListener {
    fn name(&self) -> &'static str {
        "run-cascade"
    }

    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        let (organization_id, filter) = match event {
            DomainEvent::ScenarioDeleted {
                organization_id,
                workspace_id,
                scenario_id,
            } => (
                organization_id,
                RunSearch {
                    workspace_id: Some(workspace_id.clone()),
                    scenario_id: Some(scenario_id.clone()),
                    ..Default::default()
                },
            ),
            DomainEvent::WorkspaceDeleted {
                organization_id,
                workspace_id,
            } => (
                organization_id,
                RunSearch {
                    workspace_id: Some(workspace_id.clone()),
                    ..Default::default()
                },
            ),
            DomainEvent::OrganizationUnregistered { organization_id } => {
                (organization_id, RunSearch::default())
            }
            _ => return Ok(()),
        };

        let runs = self.runs.search(organization_id, &filter).await?;
        let outcomes = self.teardown.teardown_all(&runs).await;

        let incomplete = outcomes
            .iter()
            .filter(|o| !(o.ingestion_deleted && o.record_deleted))
            .count();
        tracing::info!(
            "Cascade on {:?} tore down {} run(s), {} incomplete",
            event.kind(),
            outcomes.len(),
            incomplete
        );

        Ok(())
    }
}

/// Unsets a removed connector on every dataset using it
pub struct ConnectorRemovedListener {
    catalog: Catalog,
}

impl ConnectorRemovedListener {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl EventHandler for ConnectorRemovedListener {
    fn name(&self) -> &'static str {
        "connector-removed"
    }

    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        let DomainEvent::ConnectorRemoved { connector_id } = event else {
            return Ok(());
        };

        let datasets = self.catalog.list::<Dataset>().await?;
        for mut dataset in datasets {
            if dataset.connector.as_ref().is_some_and(|c| c.id == *connector_id) {
                dataset.connector = None;
                if !self.catalog.update(&dataset).await? {
                    continue;
                }
                tracing::info!(
                    "Unset connector {} on dataset {}",
                    connector_id,
                    dataset.id
                );
            }
        }

        Ok(())
    }
}

/// Records the latest run on its scenario
pub struct LastRunListener {
    catalog: Catalog,
}

impl LastRunListener {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl EventHandler for LastRunListener {
    fn name(&self) -> &'static str {
        "scenario-last-run"
    }

    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()> {
        let DomainEvent::ScenarioRunStartedForScenario {
            scenario_id,
            scenario_run_id,
            csm_simulation_run,
            workflow_id,
            workflow_name,
            ..
        } = event
        else {
            return Ok(());
        };

        let Some(mut scenario) = self.catalog.get::<Scenario>(scenario_id).await? else {
            tracing::warn!(
                "Scenario {} vanished before its last run could be recorded",
                scenario_id
            );
            return Ok(());
        };

        scenario.last_run = Some(ScenarioLastRun {
            scenario_run_id: *scenario_run_id,
            csm_simulation_run: *csm_simulation_run,
            workflow_id: workflow_id.clone(),
            workflow_name: workflow_name.clone(),
        });
        if !self.catalog.update(&scenario).await? {
            tracing::warn!(
                "Scenario {} deleted while its last run was being recorded",
                scenario_id
            );
        }

        Ok(())
    }
}

/// Registers every listener on a bus builder
pub fn register(
    builder: EventBusBuilder,
    catalog: &Catalog,
    runs: Arc<dyn RunRepository>,
    teardown: RunTeardown,
) -> EventBusBuilder {
    let cascade: Arc<dyn EventHandler> = Arc::new(RunCascadeListener::new(runs, teardown));

    builder
        .subscribe(EventKind::ScenarioDeleted, cascade.clone())
        .subscribe(EventKind::WorkspaceDeleted, cascade.clone())
        .subscribe(EventKind::OrganizationUnregistered, cascade)
        .subscribe(
            EventKind::ConnectorRemoved,
            Arc::new(ConnectorRemovedListener::new(catalog.clone())),
        )
        .subscribe(
            EventKind::ScenarioRunStartedForScenario,
            Arc::new(LastRunListener::new(catalog.clone())),
        )
}
