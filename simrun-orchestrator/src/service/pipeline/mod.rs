//! Run pipeline construction
//!
//! Translates a scenario and its related entities into the ordered list of
//! containers executed for one run. Everything in this module is pure: no
//! I/O, no clock, and the run correlation id is an explicit input.

mod builder;
pub mod steps;

pub use builder::{DATASET_PATH, PARAMETERS_PATH, PipelineBuilder, PipelineInputs};

use simrun_core::domain::solution::{RunTemplate, Solution};

/// Configuration inconsistency found while building a pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("run template '{run_template_id}' not found in solution '{solution_id}'")]
    RunTemplateNotFound {
        solution_id: String,
        run_template_id: String,
    },

    #[error("dataset '{dataset_id}' not found")]
    DatasetNotFound { dataset_id: String },

    #[error("dataset '{dataset_id}' has no connector")]
    DatasetWithoutConnector { dataset_id: String },

    #[error("connector '{connector_id}' of dataset '{dataset_id}' not found")]
    ConnectorNotFound {
        connector_id: String,
        dataset_id: String,
    },

    #[error("parameter '{parameter_id}' not declared in solution '{solution_id}'")]
    ParameterNotDeclared {
        parameter_id: String,
        solution_id: String,
    },

    #[error("{entity} id is missing")]
    MissingIdentifier { entity: &'static str },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Resolves the run template of a solution by id
pub fn resolve_run_template<'a>(
    solution: &'a Solution,
    run_template_id: &str,
) -> Result<&'a RunTemplate> {
    solution
        .run_template(run_template_id)
        .ok_or_else(|| PipelineError::RunTemplateNotFound {
            solution_id: solution.id.clone(),
            run_template_id: run_template_id.to_string(),
        })
}
