//! Run DTOs for the orchestrator API

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::run::{RunState, ScenarioRun};

/// Optional filters of a run search
///
/// Every populated field narrows the result; an empty search matches all
/// runs of the organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RunState>,
}

impl RunSearch {
    /// Populated filters as `(field, value)` pairs, in declaration order
    pub fn filters(&self) -> Vec<(&'static str, String)> {
        let mut filters = Vec::new();
        let fields = [
            ("solution_id", &self.solution_id),
            ("run_template_id", &self.run_template_id),
            ("workspace_id", &self.workspace_id),
            ("scenario_id", &self.scenario_id),
            ("owner_id", &self.owner_id),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                filters.push((field, value.clone()));
            }
        }
        if let Some(state) = self.state {
            filters.push(("state", state.to_string()));
        }
        filters
    }

    /// Whether a run satisfies every populated filter
    pub fn matches(&self, run: &ScenarioRun) -> bool {
        fn eq(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().is_none_or(|f| f == value)
        }

        eq(&self.solution_id, &run.solution_id)
            && eq(&self.run_template_id, &run.run_template_id)
            && eq(&self.workspace_id, &run.workspace_id)
            && eq(&self.scenario_id, &run.scenario_id)
            && eq(&self.owner_id, &run.owner_id)
            && self.state.is_none_or(|s| run.state == Some(s))
    }
}

/// Status of a run as exposed to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRunStatus {
    pub id: Uuid,
    pub organization_id: String,
    pub workflow_id: String,
    pub workflow_name: String,
    /// Raw executor phase, absent when served from the cached state
    pub phase: Option<String>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub state: RunState,
}

/// Logs of every container of a run, keyed by container name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioRunLogs {
    pub scenario_run_id: Uuid,
    pub containers: BTreeMap<String, String>,
}

/// What the deletion of a run managed to remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeardownOutcome {
    pub run_id: Uuid,
    pub ingestion_deleted: bool,
    pub record_deleted: bool,
}
