//! Entity Service
//!
//! Deletion of catalog entities. Each deletion publishes the event driving
//! the dependent cleanup and returns the handle of the cascade.

use simrun_core::domain::dataset::Connector;
use simrun_core::domain::scenario::Scenario;
use simrun_core::domain::workspace::{Organization, Workspace};
use tokio::task::JoinHandle;

use super::events::{DomainEvent, EventBus};
use super::run::{Result, RunError};
use crate::repository::Catalog;

pub struct EntityService {
    catalog: Catalog,
    events: EventBus,
}

impl EntityService {
    pub fn new(catalog: Catalog, events: EventBus) -> Self {
        Self { catalog, events }
    }

    /// Deletes a scenario owned by the caller
    pub async fn delete_scenario(
        &self,
        organization_id: &str,
        workspace_id: &str,
        scenario_id: &str,
        caller: &str,
    ) -> Result<JoinHandle<()>> {
        let scenario = self
            .catalog
            .get::<Scenario>(scenario_id)
            .await?
            .filter(|s| s.organization_id == organization_id && s.workspace_id == workspace_id)
            .ok_or_else(|| RunError::NotFound {
                entity: "scenario",
                id: scenario_id.to_string(),
            })?;

        if scenario.owner_id != caller {
            return Err(RunError::Forbidden {
                user: caller.to_string(),
                action: format!("delete scenario {}", scenario.id),
            });
        }

        self.catalog.delete::<Scenario>(&scenario.id).await?;
        tracing::info!("Scenario {} deleted", scenario.id);

        Ok(self.events.publish(DomainEvent::ScenarioDeleted {
            organization_id: organization_id.to_string(),
            workspace_id: workspace_id.to_string(),
            scenario_id: scenario.id,
        }))
    }

    pub async fn delete_workspace(
        &self,
        organization_id: &str,
        workspace_id: &str,
    ) -> Result<JoinHandle<()>> {
        let workspace = self
            .catalog
            .get::<Workspace>(workspace_id)
            .await?
            .filter(|w| w.organization_id == organization_id)
            .ok_or_else(|| RunError::NotFound {
                entity: "workspace",
                id: workspace_id.to_string(),
            })?;

        self.catalog.delete::<Workspace>(&workspace.id).await?;
        tracing::info!("Workspace {} deleted", workspace.id);

        Ok(self.events.publish(DomainEvent::WorkspaceDeleted {
            organization_id: organization_id.to_string(),
            workspace_id: workspace.id,
        }))
    }

    pub async fn unregister_organization(&self, organization_id: &str) -> Result<JoinHandle<()>> {
        if !self.catalog.delete::<Organization>(organization_id).await? {
            return Err(RunError::NotFound {
                entity: "organization",
                id: organization_id.to_string(),
            });
        }
        tracing::info!("Organization {} unregistered", organization_id);

        Ok(self.events.publish(DomainEvent::OrganizationUnregistered {
            organization_id: organization_id.to_string(),
        }))
    }

    pub async fn remove_connector(&self, connector_id: &str) -> Result<JoinHandle<()>> {
        if !self.catalog.delete::<Connector>(connector_id).await? {
            return Err(RunError::NotFound {
                entity: "connector",
                id: connector_id.to_string(),
            });
        }
        tracing::info!("Connector {} removed", connector_id);

        Ok(self.events.publish(DomainEvent::ConnectorRemoved {
            connector_id: connector_id.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryDocumentStore, InMemoryRunRepository, RunRepository};
    use crate::service::listeners;
    use crate::service::teardown::RunTeardown;
    use crate::test_support::{FakeIngestion, Fixture, scenario_run};
    use simrun_core::dto::run::RunSearch;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    async fn setup() -> (EntityService, Catalog, Arc<InMemoryRunRepository>, Arc<FakeIngestion>) {
        let catalog = Catalog::new(Arc::new(InMemoryDocumentStore::new()));
        let runs = Arc::new(InMemoryRunRepository::new());
        let ingestion = Arc::new(FakeIngestion::default());
        let teardown = RunTeardown::new(runs.clone(), ingestion.clone());
        let events =
            listeners::register(EventBus::builder(), &catalog, runs.clone(), teardown).build();

        Fixture::new().store(&catalog).await;

        (
            EntityService::new(catalog.clone(), events),
            catalog,
            runs,
            ingestion,
        )
    }

    #[tokio::test]
    async fn test_scenario_deletion_cascades_to_runs() {
        let (service, catalog, runs, ingestion) = setup().await;
        for _ in 0..3 {
            runs.insert(&scenario_run("s-brewery", "alice")).await.unwrap();
        }

        service
            .delete_scenario("o-1", "w-1", "s-brewery", "alice")
            .await
            .unwrap()
            .await
            .unwrap();

        assert!(catalog.get::<Scenario>("s-brewery").await.unwrap().is_none());
        assert!(runs.search("o-1", &RunSearch::default()).await.unwrap().is_empty());
        assert_eq!(ingestion.delete_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_scenario_deletion_by_non_owner_is_forbidden() {
        let (service, catalog, runs, _) = setup().await;
        runs.insert(&scenario_run("s-brewery", "alice")).await.unwrap();

        let result = service
            .delete_scenario("o-1", "w-1", "s-brewery", "mallory")
            .await;

        assert!(matches!(result, Err(RunError::Forbidden { .. })));
        assert!(catalog.get::<Scenario>("s-brewery").await.unwrap().is_some());
        assert_eq!(runs.search("o-1", &RunSearch::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_entities_are_not_found() {
        let (service, _, _, _) = setup().await;

        assert!(matches!(
            service.delete_workspace("o-2", "w-1").await,
            Err(RunError::NotFound { entity: "workspace", .. })
        ));
        assert!(matches!(
            service.unregister_organization("o-404").await,
            Err(RunError::NotFound { .. })
        ));
        assert!(matches!(
            service.remove_connector("c-404").await,
            Err(RunError::NotFound { .. })
        ));
    }
}
