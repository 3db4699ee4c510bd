//! Solution domain types
//!
//! A solution packages a simulator image together with the run templates
//! that describe which pipeline stages run for a scenario.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameter type marking a scenario parameter whose value is a dataset id
pub const DATASET_PARAMETER_TYPE: &str = "%DATASETID%";

/// Simulator solution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    /// Image repository of the simulator, without registry
    pub repository: String,
    pub version: String,
    /// Version of the simulation SDK the image was built with
    #[serde(default)]
    pub sdk_version: Option<String>,
    #[serde(default)]
    pub run_templates: Vec<RunTemplate>,
    #[serde(default)]
    pub parameters: Vec<SolutionParameter>,
}

impl Solution {
    /// Looks up a run template by id
    pub fn run_template(&self, run_template_id: &str) -> Option<&RunTemplate> {
        self.run_templates.iter().find(|t| t.id == run_template_id)
    }

    /// Looks up a declared parameter by id
    pub fn parameter(&self, parameter_id: &str) -> Option<&SolutionParameter> {
        self.parameters.iter().find(|p| p.id == parameter_id)
    }
}

/// Parameter declared by a solution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionParameter {
    pub id: String,
    pub var_type: String,
}

impl SolutionParameter {
    pub fn is_dataset_reference(&self) -> bool {
        self.var_type == DATASET_PARAMETER_TYPE
    }
}

/// Named stage configuration belonging to a solution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunTemplate {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "StageFlag::is_unset")]
    pub fetch_datasets: StageFlag,
    #[serde(default, skip_serializing_if = "StageFlag::is_unset")]
    pub fetch_scenario_parameters: StageFlag,
    #[serde(default, skip_serializing_if = "StageFlag::is_unset")]
    pub apply_parameters: StageFlag,
    #[serde(default, skip_serializing_if = "StageFlag::is_unset")]
    pub validate_data: StageFlag,
    #[serde(default, skip_serializing_if = "StageFlag::is_unset")]
    pub pre_run: StageFlag,
    #[serde(default, skip_serializing_if = "StageFlag::is_unset")]
    pub run: StageFlag,
    #[serde(default, skip_serializing_if = "StageFlag::is_unset")]
    pub post_run: StageFlag,

    #[serde(default)]
    pub parameters_handler_source: Option<StepSource>,
    #[serde(default)]
    pub dataset_validator_source: Option<StepSource>,
    #[serde(default)]
    pub pre_run_source: Option<StepSource>,
    #[serde(default)]
    pub run_source: Option<StepSource>,
    #[serde(default)]
    pub post_run_source: Option<StepSource>,

    /// Node pool size label, e.g. "highcpu"
    #[serde(default)]
    pub compute_size: Option<String>,

    #[serde(default)]
    pub send_datasets_to_data_warehouse: Option<bool>,
    #[serde(default)]
    pub send_input_parameters_to_data_warehouse: Option<bool>,

    /// Opt out of data ingestion state checks for runs of this template
    #[serde(default)]
    pub no_data_ingestion_state: Option<bool>,

    /// Simulation identifier passed to the engine
    #[serde(default)]
    pub csm_simulation: Option<String>,
}

/// Three-valued stage switch
///
/// Stored as an optional boolean. `Unset` keeps the stage in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum StageFlag {
    #[default]
    Unset,
    Enabled,
    Disabled,
}

impl StageFlag {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, StageFlag::Disabled)
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, StageFlag::Unset)
    }
}

impl From<Option<bool>> for StageFlag {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => StageFlag::Unset,
            Some(true) => StageFlag::Enabled,
            Some(false) => StageFlag::Disabled,
        }
    }
}

impl From<StageFlag> for Option<bool> {
    fn from(flag: StageFlag) -> Self {
        match flag {
            StageFlag::Unset => None,
            StageFlag::Enabled => Some(true),
            StageFlag::Disabled => Some(false),
        }
    }
}

/// Where the code of a solution step comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepSource {
    /// Baked into the solution image
    Local,
    /// Downloaded at runtime from the workspace storage
    Cloud,
}

/// Major/minor pair of a solution SDK version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SdkVersion {
    pub major: u32,
    pub minor: u32,
}

impl SdkVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parses `major.minor[.patch][-suffix]`, ignoring anything after minor
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().trim_start_matches('v').split('.');
        let major = parts.next()?.parse().ok()?;
        let minor_part = parts.next()?;
        let digits: String = minor_part
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        let minor = digits.parse().ok()?;
        Some(Self { major, minor })
    }
}

impl fmt::Display for SdkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
