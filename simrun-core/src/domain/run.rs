//! Scenario run domain types
//!
//! A scenario run records the container pipeline submitted to the workflow
//! executor for one scenario, plus the state last reported to clients.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Environment variable carrying the control-plane topic of a run.
/// Only runs emitting it report data ingestion telemetry.
pub const CONTROL_PLANE_TOPIC_VAR: &str = "CSM_CONTROL_PLANE_TOPIC";

/// Scenario run record
///
/// Created once per submission. Only the cached `state` (and `updated_at`)
/// changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRun {
    pub id: Uuid,
    pub owner_id: String,
    /// Correlation id shared with the ingestion backend
    pub csm_simulation_run: Uuid,
    pub organization_id: String,
    pub workspace_id: String,
    pub workspace_key: String,
    pub scenario_id: String,
    pub solution_id: String,
    pub run_template_id: String,
    pub solution_sdk_version: Option<String>,
    pub no_data_ingestion_state: bool,
    pub workflow_id: String,
    pub workflow_name: String,
    pub node_label: String,
    pub containers: Vec<ScenarioRunContainer>,
    pub state: Option<RunState>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ScenarioRun {
    /// Whether any submitted container publishes to the control plane
    pub fn emits_ingestion_telemetry(&self) -> bool {
        self.containers
            .iter()
            .any(|c| c.env_vars.contains_key(CONTROL_PLANE_TOPIC_VAR))
    }

    /// Cached state, if it is terminal
    pub fn terminal_state(&self) -> Option<RunState> {
        self.state.filter(|s| s.is_terminal())
    }
}

/// One container of a run pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioRunContainer {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub env_vars: BTreeMap<String, String>,
    #[serde(default)]
    pub run_args: Option<Vec<String>>,
    #[serde(default)]
    pub entrypoint: Option<String>,
}

/// Pipeline artifact handed to the workflow executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRunStartContainers {
    pub generate_name: String,
    pub node_label: String,
    pub csm_simulation_id: Uuid,
    pub containers: Vec<ScenarioRunContainer>,
}

/// Client facing run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Running,
    Successful,
    Failed,
    Unknown,
    DataIngestionInProgress,
}

impl RunState {
    /// Terminal states are never recomputed once cached
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Successful | RunState::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Running => write!(f, "Running"),
            RunState::Successful => write!(f, "Successful"),
            RunState::Failed => write!(f, "Failed"),
            RunState::Unknown => write!(f, "Unknown"),
            RunState::DataIngestionInProgress => write!(f, "DataIngestionInProgress"),
        }
    }
}

impl std::str::FromStr for RunState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Running" => Ok(RunState::Running),
            "Successful" => Ok(RunState::Successful),
            "Failed" => Ok(RunState::Failed),
            "Unknown" => Ok(RunState::Unknown),
            "DataIngestionInProgress" => Ok(RunState::DataIngestionInProgress),
            other => Err(format!("unknown run state '{}'", other)),
        }
    }
}

/// State reported by the ingestion backend for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataIngestionState {
    Unknown,
    InProgress,
    Successful,
    Failure,
}
