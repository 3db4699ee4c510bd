//! Step specifications of solution containers
//!
//! Fixed table describing the five stages executed from the solution image:
//! which container mode they run, which template flag and source govern them,
//! and which environment variables tell the image where the step code lives.

use simrun_core::domain::solution::{RunTemplate, StageFlag, StepSource};

/// Provider value for steps baked into the solution image
pub const PROVIDER_LOCAL: &str = "local";
/// Provider value for steps downloaded from workspace storage
pub const PROVIDER_CLOUD: &str = "azureStorage";

/// Specification of one solution container stage
#[derive(Debug)]
pub struct StepSpec {
    /// Value of `CSM_CONTAINER_MODE`, also the step name
    pub mode: &'static str,
    pub container_name: &'static str,
    pub provider_var: &'static str,
    pub path_var: &'static str,
    flag: fn(&RunTemplate) -> StageFlag,
    source: fn(&RunTemplate) -> Option<StepSource>,
}

impl StepSpec {
    pub fn is_enabled(&self, template: &RunTemplate) -> bool {
        (self.flag)(template).is_enabled()
    }

    pub fn source(&self, template: &RunTemplate) -> Option<StepSource> {
        (self.source)(template)
    }

    /// Storage path of the step code for cloud sourced steps
    pub fn cloud_path(&self, organization_id: &str, workspace_id: &str, template_id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            organization_id, workspace_id, template_id, self.mode
        )
        .to_lowercase()
    }
}

pub const HANDLE_PARAMETERS: &str = "handle-parameters";
pub const VALIDATE: &str = "validate";
pub const PRERUN: &str = "prerun";
pub const ENGINE: &str = "engine";
pub const POSTRUN: &str = "postrun";

/// Stages in pipeline order. The data warehouse upload runs between
/// `validate` and `prerun`.
pub static STEPS: [StepSpec; 5] = [
    StepSpec {
        mode: HANDLE_PARAMETERS,
        container_name: "applyParametersContainer",
        provider_var: "CSM_PARAMETERS_HANDLER_PROVIDER",
        path_var: "CSM_PARAMETERS_HANDLER_PATH",
        flag: apply_parameters_flag,
        source: parameters_handler_source,
    },
    StepSpec {
        mode: VALIDATE,
        container_name: "validateDataContainer",
        provider_var: "CSM_DATASET_VALIDATOR_PROVIDER",
        path_var: "CSM_DATASET_VALIDATOR_PATH",
        flag: validate_data_flag,
        source: dataset_validator_source,
    },
    StepSpec {
        mode: PRERUN,
        container_name: "preRunContainer",
        provider_var: "CSM_PRERUN_PROVIDER",
        path_var: "CSM_PRERUN_PATH",
        flag: pre_run_flag,
        source: pre_run_source,
    },
    StepSpec {
        mode: ENGINE,
        container_name: "runContainer",
        provider_var: "CSM_ENGINE_PROVIDER",
        path_var: "CSM_ENGINE_PATH",
        flag: run_flag,
        source: run_source,
    },
    StepSpec {
        mode: POSTRUN,
        container_name: "postRunContainer",
        provider_var: "CSM_POSTRUN_PROVIDER",
        path_var: "CSM_POSTRUN_PATH",
        flag: post_run_flag,
        source: post_run_source,
    },
];

/// Looks up a step by mode
pub fn step(mode: &str) -> Option<&'static StepSpec> {
    STEPS.iter().find(|s| s.mode == mode)
}

fn apply_parameters_flag(t: &RunTemplate) -> StageFlag {
    t.apply_parameters
}

fn validate_data_flag(t: &RunTemplate) -> StageFlag {
    t.validate_data
}

fn pre_run_flag(t: &RunTemplate) -> StageFlag {
    t.pre_run
}

fn run_flag(t: &RunTemplate) -> StageFlag {
    t.run
}

fn post_run_flag(t: &RunTemplate) -> StageFlag {
    t.post_run
}

fn parameters_handler_source(t: &RunTemplate) -> Option<StepSource> {
    t.parameters_handler_source
}

fn dataset_validator_source(t: &RunTemplate) -> Option<StepSource> {
    t.dataset_validator_source
}

fn pre_run_source(t: &RunTemplate) -> Option<StepSource> {
    t.pre_run_source
}

fn run_source(t: &RunTemplate) -> Option<StepSource> {
    t.run_source
}

fn post_run_source(t: &RunTemplate) -> Option<StepSource> {
    t.post_run_source
}
