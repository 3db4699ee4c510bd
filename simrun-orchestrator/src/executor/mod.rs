//! Workflow executor
//!
//! The executor runs a submitted pipeline and reports a coarse phase for it.
//! It is reached through the `WorkflowExecutor` trait; `ArgoExecutor` talks
//! to an Argo Workflows server.

mod argo;

pub use argo::ArgoExecutor;

use anyhow::Result;
use async_trait::async_trait;
use simrun_core::domain::run::ScenarioRunStartContainers;
use std::collections::BTreeMap;

/// Handle of a submitted workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowHandle {
    pub id: String,
    pub name: String,
}

/// Executor-side status of a workflow
#[derive(Debug, Clone, Default)]
pub struct WorkflowStatus {
    /// Raw phase string, absent while the executor has not assigned one
    pub phase: Option<String>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl WorkflowStatus {
    pub fn workflow_phase(&self) -> WorkflowPhase {
        self.phase
            .as_deref()
            .map(WorkflowPhase::parse)
            .unwrap_or(WorkflowPhase::Pending)
    }
}

/// Workflow phases the reconciler understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowPhase {
    Pending,
    Running,
    Succeeded,
    Skipped,
    Failed,
    Error,
    Omitted,
    Other(String),
}

impl WorkflowPhase {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Pending" => WorkflowPhase::Pending,
            "Running" => WorkflowPhase::Running,
            "Succeeded" => WorkflowPhase::Succeeded,
            "Skipped" => WorkflowPhase::Skipped,
            "Failed" => WorkflowPhase::Failed,
            "Error" => WorkflowPhase::Error,
            "Omitted" => WorkflowPhase::Omitted,
            other => WorkflowPhase::Other(other.to_string()),
        }
    }
}

/// Executor of run pipelines
#[async_trait]
pub trait WorkflowExecutor: Send + Sync {
    /// Submits a pipeline, returning the handle assigned by the executor
    async fn submit(&self, pipeline: &ScenarioRunStartContainers) -> Result<WorkflowHandle>;

    /// Current status of a workflow
    async fn status(&self, workflow_name: &str) -> Result<WorkflowStatus>;

    /// Logs of a workflow, keyed by container name
    ///
    /// `containers` lists the container names of the submitted pipeline and is
    /// used to attribute executor pods to containers.
    async fn logs(
        &self,
        workflow_name: &str,
        containers: &[String],
    ) -> Result<BTreeMap<String, String>>;

    /// Requests the workflow to stop
    async fn stop(&self, workflow_name: &str) -> Result<()>;
}
