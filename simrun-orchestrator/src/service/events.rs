//! Domain event bus
//!
//! Handlers are registered per event kind before the bus is built. Publishing
//! spawns a task running the handlers of the event kind in registration
//! order; the returned handle may be awaited or dropped.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Cross-entity event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    ScenarioDeleted {
        organization_id: String,
        workspace_id: String,
        scenario_id: String,
    },
    WorkspaceDeleted {
        organization_id: String,
        workspace_id: String,
    },
    OrganizationUnregistered {
        organization_id: String,
    },
    ConnectorRemoved {
        connector_id: String,
    },
    ScenarioRunStartedForScenario {
        organization_id: String,
        workspace_id: String,
        scenario_id: String,
        scenario_run_id: Uuid,
        csm_simulation_run: Uuid,
        workflow_id: String,
        workflow_name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ScenarioDeleted,
    WorkspaceDeleted,
    OrganizationUnregistered,
    ConnectorRemoved,
    ScenarioRunStartedForScenario,
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::ScenarioDeleted { .. } => EventKind::ScenarioDeleted,
            DomainEvent::WorkspaceDeleted { .. } => EventKind::WorkspaceDeleted,
            DomainEvent::OrganizationUnregistered { .. } => EventKind::OrganizationUnregistered,
            DomainEvent::ConnectorRemoved { .. } => EventKind::ConnectorRemoved,
            DomainEvent::ScenarioRunStartedForScenario { .. } => {
                EventKind::ScenarioRunStartedForScenario
            }
        }
    }
}

/// Reaction to domain events
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &DomainEvent) -> anyhow::Result<()>;
}

/// Dispatcher table from event kind to handlers
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    /// Publishes an event off the caller's task
    pub fn publish(&self, event: DomainEvent) -> JoinHandle<()> {
        let handlers = self.handlers.get(&event.kind()).cloned().unwrap_or_default();

        tracing::debug!(
            "Publishing {:?} to {} handler(s)",
            event.kind(),
            handlers.len()
        );

        tokio::spawn(async move {
            for handler in handlers {
                if let Err(e) = handler.handle(&event).await {
                    tracing::error!(
                        "Handler {} failed on {:?}: {:#}",
                        handler.name(),
                        event.kind(),
                        e
                    );
                }
            }
        })
    }
}

#[derive(Default)]
pub struct EventBusBuilder {
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
}

impl EventBusBuilder {
    pub fn subscribe(mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.entry(kind).or_default().push(handler);
        self
    }

    pub fn build(self) -> EventBus {
        EventBus {
            handlers: Arc::new(self.handlers),
        }
    }
}
