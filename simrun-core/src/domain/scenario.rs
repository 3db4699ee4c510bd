//! Scenario domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A parameterised instance of a solution run template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    pub organization_id: String,
    pub workspace_id: String,
    pub solution_id: String,
    pub run_template_id: String,
    pub owner_id: String,
    #[serde(default)]
    pub dataset_list: Vec<String>,
    #[serde(default)]
    pub parameters_values: Vec<ScenarioParameterValue>,
    /// Set once a run was submitted for this scenario
    #[serde(default)]
    pub last_run: Option<ScenarioLastRun>,
}

/// Value of a solution parameter for one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioParameterValue {
    pub parameter_id: String,
    #[serde(default)]
    pub var_type: Option<String>,
    pub value: String,
}

/// Reference to the most recent run of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioLastRun {
    pub scenario_run_id: Uuid,
    pub csm_simulation_run: Uuid,
    pub workflow_id: String,
    pub workflow_name: String,
}
