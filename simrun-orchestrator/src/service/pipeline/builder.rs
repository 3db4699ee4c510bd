//! Pipeline builder
//!
//! Stage order is fixed:
//! dataset fetch, scenario parameter fetch, dataset parameter fetch,
//! apply parameters, validate, send to data warehouse, prerun, run, postrun.
//! Template flags only include or exclude stages.

use simrun_core::domain::dataset::{Connector, Dataset};
use simrun_core::domain::run::{
    CONTROL_PLANE_TOPIC_VAR, ScenarioRunContainer, ScenarioRunStartContainers,
};
use simrun_core::domain::scenario::Scenario;
use simrun_core::domain::solution::{RunTemplate, Solution, StepSource};
use simrun_core::domain::workspace::{Organization, Workspace};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::steps::{PROVIDER_CLOUD, PROVIDER_LOCAL, STEPS, StepSpec};
use super::{PipelineError, Result, resolve_run_template};
use crate::config::PlatformSettings;

pub const DATASET_PATH: &str = "/mnt/scenariorun-data";
pub const PARAMETERS_PATH: &str = "/mnt/scenariorun-parameters";
const SOLUTION_ENTRYPOINT: &str = "entrypoint.py";
const NODE_LABEL_DEFAULT: &str = "basic";
const NODE_LABEL_SUFFIX: &str = "pool";
const GENERATE_NAME_PREFIX: &str = "workflow-";

const FETCH_PARAMETERS_CONTAINER: &str = "fetchScenarioParametersContainer";
const SEND_DATA_WAREHOUSE_CONTAINER: &str = "sendDataWarehouseContainer";

const PROBES_MEASURES_TOPIC_VAR: &str = "CSM_PROBES_MEASURES_TOPIC";
const CONTROL_PLANE_TOPIC_SUFFIX: &str = "-scenariorun";

/// Entities a pipeline is built from
#[derive(Debug, Clone, Copy)]
pub struct PipelineInputs<'a> {
    pub organization: &'a Organization,
    pub workspace: &'a Workspace,
    pub solution: &'a Solution,
    pub scenario: &'a Scenario,
    pub datasets: &'a [Dataset],
    pub connectors: &'a [Connector],
    /// Correlation id of the run being built
    pub csm_simulation_run: Uuid,
}

impl<'a> PipelineInputs<'a> {
    fn dataset_with_connector(&self, dataset_id: &str) -> Result<(&'a Dataset, &'a Connector)> {
        let datasets: &'a [Dataset] = self.datasets;
        let connectors: &'a [Connector] = self.connectors;

        let dataset = datasets
            .iter()
            .find(|d| d.id == dataset_id)
            .ok_or_else(|| PipelineError::DatasetNotFound {
                dataset_id: dataset_id.to_string(),
            })?;

        let binding =
            dataset
                .connector
                .as_ref()
                .ok_or_else(|| PipelineError::DatasetWithoutConnector {
                    dataset_id: dataset.id.clone(),
                })?;

        let connector = connectors
            .iter()
            .find(|c| c.id == binding.id)
            .ok_or_else(|| PipelineError::ConnectorNotFound {
                connector_id: binding.id.clone(),
                dataset_id: dataset.id.clone(),
            })?;

        Ok((dataset, connector))
    }

    /// `(parameter id, dataset id)` of every dataset typed scenario parameter
    ///
    /// Fails on values for parameters the solution does not declare.
    /// Blank values mean no dataset was chosen and are skipped.
    fn dataset_parameters(&self) -> Result<Vec<(&'a str, &'a str)>> {
        let scenario: &'a Scenario = self.scenario;
        let solution: &'a Solution = self.solution;

        let mut references = Vec::new();
        for value in &scenario.parameters_values {
            let declared = solution.parameter(&value.parameter_id).ok_or_else(|| {
                PipelineError::ParameterNotDeclared {
                    parameter_id: value.parameter_id.clone(),
                    solution_id: solution.id.clone(),
                }
            })?;

            if declared.is_dataset_reference() && !value.value.trim().is_empty() {
                references.push((value.parameter_id.as_str(), value.value.as_str()));
            }
        }

        Ok(references)
    }
}

#[derive(Debug, Clone, Copy)]
enum FetchKind {
    Dataset,
    DatasetParameter,
}

impl FetchKind {
    fn container_prefix(self) -> &'static str {
        match self {
            FetchKind::Dataset => "fetchDatasetContainer",
            FetchKind::DatasetParameter => "fetchScenarioDatasetParametersContainer",
        }
    }
}

/// Upload decisions of the data warehouse container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataWarehouseSend {
    pub parameters: bool,
    pub datasets: bool,
}

impl DataWarehouseSend {
    /// Template overrides win over the workspace default
    pub fn resolve(workspace: &Workspace, template: &RunTemplate) -> Self {
        let default = workspace.send_input_to_data_warehouse;
        Self {
            parameters: template
                .send_input_parameters_to_data_warehouse
                .unwrap_or(default),
            datasets: template.send_datasets_to_data_warehouse.unwrap_or(default),
        }
    }

    pub fn any(&self) -> bool {
        self.parameters || self.datasets
    }
}

/// Builds run pipelines from platform settings and scenario entities
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    settings: PlatformSettings,
}

impl PipelineBuilder {
    pub fn new(settings: PlatformSettings) -> Self {
        Self { settings }
    }

    /// Builds the ordered container list of a run
    ///
    /// Any unresolved reference fails the whole build.
    pub fn build(&self, inputs: &PipelineInputs<'_>) -> Result<Vec<ScenarioRunContainer>> {
        if inputs.organization.id.is_empty() {
            return Err(PipelineError::MissingIdentifier {
                entity: "organization",
            });
        }
        if inputs.workspace.id.is_empty() {
            return Err(PipelineError::MissingIdentifier {
                entity: "workspace",
            });
        }

        let template = resolve_run_template(inputs.solution, &inputs.scenario.run_template_id)?;
        let dataset_parameters = inputs.dataset_parameters()?;
        let common = self.common_env(inputs);

        let mut containers = Vec::new();

        if template.fetch_datasets.is_enabled() {
            for (idx, dataset_id) in inputs.scenario.dataset_list.iter().enumerate() {
                let (dataset, connector) = inputs.dataset_with_connector(dataset_id)?;
                containers.push(self.fetch_dataset_container(
                    &common,
                    dataset,
                    connector,
                    FetchKind::Dataset,
                    idx + 1,
                    DATASET_PATH.to_string(),
                ));
            }
        }

        if template.fetch_scenario_parameters.is_enabled() {
            containers.push(self.fetch_parameters_container(&common));

            for (idx, (parameter_id, dataset_id)) in dataset_parameters.iter().enumerate() {
                let (dataset, connector) = inputs.dataset_with_connector(dataset_id)?;
                containers.push(self.fetch_dataset_container(
                    &common,
                    dataset,
                    connector,
                    FetchKind::DatasetParameter,
                    idx + 1,
                    format!("{}/{}", PARAMETERS_PATH, parameter_id),
                ));
            }
        }

        let (before_upload, after_upload) = STEPS.split_at(2);

        for step in before_upload.iter().filter(|s| s.is_enabled(template)) {
            containers.push(self.solution_container(&common, inputs, template, step));
        }

        let send = DataWarehouseSend::resolve(inputs.workspace, template);
        if send.any() {
            containers.push(self.send_data_warehouse_container(&common, inputs.workspace, send));
        }

        for step in after_upload.iter().filter(|s| s.is_enabled(template)) {
            containers.push(self.solution_container(&common, inputs, template, step));
        }

        tracing::debug!(
            "Built pipeline of {} container(s) for scenario {} (template {})",
            containers.len(),
            inputs.scenario.id,
            template.id
        );

        Ok(containers)
    }

    /// Builds the pipeline together with its executor-level naming
    pub fn build_start_containers(
        &self,
        inputs: &PipelineInputs<'_>,
    ) -> Result<ScenarioRunStartContainers> {
        let template = resolve_run_template(inputs.solution, &inputs.scenario.run_template_id)?;
        let containers = self.build(inputs)?;

        Ok(ScenarioRunStartContainers {
            generate_name: format!("{}{}-", GENERATE_NAME_PREFIX, inputs.scenario.id)
                .to_lowercase(),
            node_label: node_label(template),
            csm_simulation_id: inputs.csm_simulation_run,
            containers,
        })
    }

    fn common_env(&self, inputs: &PipelineInputs<'_>) -> BTreeMap<String, String> {
        let s = &self.settings;
        [
            ("CSM_IDENTITY_TENANT_ID", s.identity_tenant_id.clone()),
            ("CSM_IDENTITY_CLIENT_ID", s.identity_client_id.clone()),
            ("CSM_IDENTITY_CLIENT_SECRET", s.identity_client_secret.clone()),
            ("CSM_API_URL", s.api_url.clone()),
            ("CSM_API_SCOPE", s.api_scope.clone()),
            ("CSM_DATASET_ABSOLUTE_PATH", DATASET_PATH.to_string()),
            ("CSM_PARAMETERS_ABSOLUTE_PATH", PARAMETERS_PATH.to_string()),
            ("CSM_SIMULATION_ID", inputs.csm_simulation_run.to_string()),
            ("CSM_ORGANIZATION_ID", inputs.organization.id.clone()),
            ("CSM_WORKSPACE_ID", inputs.workspace.id.clone()),
            ("CSM_SCENARIO_ID", inputs.scenario.id.clone()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    fn fetch_dataset_container(
        &self,
        common: &BTreeMap<String, String>,
        dataset: &Dataset,
        connector: &Connector,
        kind: FetchKind,
        index: usize,
        fetch_path: String,
    ) -> ScenarioRunContainer {
        let mut env_vars = common.clone();
        env_vars.insert("CSM_FETCH_ABSOLUTE_PATH".to_string(), fetch_path);

        let values = dataset.connector.as_ref().map(|c| &c.parameters_values);
        let mut run_args = Vec::new();

        for parameter in connector.parameters() {
            let value = values
                .and_then(|v| v.get(&parameter.id))
                .cloned()
                .unwrap_or_default();

            match &parameter.env_var {
                Some(var) => {
                    env_vars.insert(var.clone(), value);
                }
                None => run_args.push(value),
            }
        }

        ScenarioRunContainer {
            name: format!("{}-{}", kind.container_prefix(), index),
            image: self.image(&connector.repository, &connector.version),
            env_vars,
            run_args: (!run_args.is_empty()).then_some(run_args),
            entrypoint: None,
        }
    }

    fn fetch_parameters_container(&self, common: &BTreeMap<String, String>) -> ScenarioRunContainer {
        let mut env_vars = common.clone();
        env_vars.insert(
            "CSM_FETCH_ABSOLUTE_PATH".to_string(),
            PARAMETERS_PATH.to_string(),
        );
        env_vars.insert(
            "WRITE_CSV".to_string(),
            self.settings.parameters_write_csv.to_string(),
        );
        env_vars.insert(
            "WRITE_JSON".to_string(),
            self.settings.parameters_write_json.to_string(),
        );

        ScenarioRunContainer {
            name: FETCH_PARAMETERS_CONTAINER.to_string(),
            image: self.settings.fetch_parameters_image.clone(),
            env_vars,
            run_args: None,
            entrypoint: None,
        }
    }

    fn send_data_warehouse_container(
        &self,
        common: &BTreeMap<String, String>,
        workspace: &Workspace,
        send: DataWarehouseSend,
    ) -> ScenarioRunContainer {
        let mut env_vars = common.clone();
        env_vars.insert(
            "CSM_SEND_DATAWAREHOUSE_PARAMETERS".to_string(),
            send.parameters.to_string(),
        );
        env_vars.insert(
            "CSM_SEND_DATAWAREHOUSE_DATASETS".to_string(),
            send.datasets.to_string(),
        );
        env_vars.insert(
            "AZURE_DATA_EXPLORER_RESOURCE_URI".to_string(),
            self.settings.data_warehouse_uri.clone(),
        );
        env_vars.insert(
            "AZURE_DATA_EXPLORER_RESOURCE_INGEST_URI".to_string(),
            self.settings.data_warehouse_ingest_uri.clone(),
        );
        env_vars.insert(
            "AZURE_DATA_EXPLORER_DATABASE_NAME".to_string(),
            workspace.key.clone(),
        );

        ScenarioRunContainer {
            name: SEND_DATA_WAREHOUSE_CONTAINER.to_string(),
            image: self.settings.send_data_warehouse_image.clone(),
            env_vars,
            run_args: None,
            entrypoint: None,
        }
    }

    fn solution_container(
        &self,
        common: &BTreeMap<String, String>,
        inputs: &PipelineInputs<'_>,
        template: &RunTemplate,
        step: &StepSpec,
    ) -> ScenarioRunContainer {
        let workspace_key = &inputs.workspace.key;
        let bus = self.settings.analytics_bus_uri.trim_end_matches('/');

        let mut env_vars = common.clone();
        env_vars.insert("CSM_RUN_TEMPLATE_ID".to_string(), template.id.clone());
        env_vars.insert("CSM_CONTAINER_MODE".to_string(), step.mode.to_string());
        env_vars.insert(
            PROBES_MEASURES_TOPIC_VAR.to_string(),
            format!("{}/{}", bus, workspace_key),
        );
        env_vars.insert(
            CONTROL_PLANE_TOPIC_VAR.to_string(),
            format!("{}/{}{}", bus, workspace_key, CONTROL_PLANE_TOPIC_SUFFIX),
        );

        if let Some(simulation) = &template.csm_simulation {
            env_vars.insert("CSM_SIMULATION".to_string(), simulation.clone());
        }

        match step.source(template) {
            Some(StepSource::Local) => {
                env_vars.insert(step.provider_var.to_string(), PROVIDER_LOCAL.to_string());
            }
            Some(StepSource::Cloud) => {
                env_vars.insert(step.provider_var.to_string(), PROVIDER_CLOUD.to_string());
                env_vars.insert(
                    step.path_var.to_string(),
                    step.cloud_path(&inputs.organization.id, &inputs.workspace.id, &template.id),
                );
                env_vars.insert(
                    "AZURE_STORAGE_CONNECTION_STRING".to_string(),
                    self.settings.storage_connection_string.clone(),
                );
            }
            None => {}
        }

        ScenarioRunContainer {
            name: step.container_name.to_string(),
            image: self.image(&inputs.solution.repository, &inputs.solution.version),
            env_vars,
            run_args: None,
            entrypoint: Some(SOLUTION_ENTRYPOINT.to_string()),
        }
    }

    fn image(&self, repository: &str, version: &str) -> String {
        let registry = self.settings.container_registry.trim_end_matches('/');
        if registry.is_empty() {
            format!("{}:{}", repository, version)
        } else {
            format!("{}/{}:{}", registry, repository, version)
        }
    }
}

/// Node pool label derived from the template compute size
pub fn node_label(template: &RunTemplate) -> String {
    format!(
        "{}{}",
        template
            .compute_size
            .as_deref()
            .unwrap_or(NODE_LABEL_DEFAULT),
        NODE_LABEL_SUFFIX
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, platform_settings};
    use simrun_core::domain::solution::StageFlag;
    use std::collections::HashSet;

    fn names(containers: &[ScenarioRunContainer]) -> Vec<&str> {
        containers.iter().map(|c| c.name.as_str()).collect()
    }

    fn builder() -> PipelineBuilder {
        PipelineBuilder::new(platform_settings())
    }

    const FULL_PIPELINE: [&str; 10] = [
        "fetchDatasetContainer-1",
        "fetchDatasetContainer-2",
        "fetchScenarioParametersContainer",
        "fetchScenarioDatasetParametersContainer-1",
        "applyParametersContainer",
        "validateDataContainer",
        "sendDataWarehouseContainer",
        "preRunContainer",
        "runContainer",
        "postRunContainer",
    ];

    #[test]
    fn test_unset_flags_include_every_stage_in_order() {
        let fixture = Fixture::new();
        let containers = builder().build(&fixture.inputs()).unwrap();

        assert_eq!(names(&containers), FULL_PIPELINE.to_vec());
    }

    #[test]
    fn test_disabling_a_flag_removes_only_its_stage() {
        let cases: [(fn(&mut RunTemplate), &[&str]); 6] = [
            (
                |t: &mut RunTemplate| t.fetch_datasets = StageFlag::Disabled,
                &["fetchDatasetContainer-1", "fetchDatasetContainer-2"],
            ),
            (
                |t: &mut RunTemplate| t.fetch_scenario_parameters = StageFlag::Disabled,
                &[
                    "fetchScenarioParametersContainer",
                    "fetchScenarioDatasetParametersContainer-1",
                ],
            ),
            (
                |t: &mut RunTemplate| t.apply_parameters = StageFlag::Disabled,
                &["applyParametersContainer"],
            ),
            (
                |t: &mut RunTemplate| t.validate_data = StageFlag::Disabled,
                &["validateDataContainer"],
            ),
            (|t: &mut RunTemplate| t.pre_run = StageFlag::Disabled, &["preRunContainer"]),
            (|t: &mut RunTemplate| t.post_run = StageFlag::Disabled, &["postRunContainer"]),
        ];

        for (disable, removed) in cases {
            let mut fixture = Fixture::new();
            disable(fixture.template_mut());

            let containers = builder().build(&fixture.inputs()).unwrap();
            let expected: Vec<&str> = FULL_PIPELINE
                .iter()
                .copied()
                .filter(|n| !removed.contains(n))
                .collect();

            assert_eq!(names(&containers), expected);
        }
    }

    #[test]
    fn test_disabling_run_keeps_postrun() {
        let mut fixture = Fixture::new();
        fixture.template_mut().run = StageFlag::Disabled;

        let containers = builder().build(&fixture.inputs()).unwrap();
        let names = names(&containers);

        assert!(!names.contains(&"runContainer"));
        assert_eq!(names.last(), Some(&"postRunContainer"));
        assert_eq!(names.len(), FULL_PIPELINE.len() - 1);
    }

    #[test]
    fn test_explicitly_enabled_flags_behave_like_unset() {
        let mut fixture = Fixture::new();
        let template = fixture.template_mut();
        template.fetch_datasets = StageFlag::Enabled;
        template.run = StageFlag::Enabled;

        let containers = builder().build(&fixture.inputs()).unwrap();
        assert_eq!(names(&containers), FULL_PIPELINE.to_vec());
    }

    #[test]
    fn test_fetch_counts_and_independent_counters() {
        let mut fixture = Fixture::new();
        fixture.add_dataset_parameter("demand_dataset", "d-1");

        let containers = builder().build(&fixture.inputs()).unwrap();

        let regular: Vec<&str> = names(&containers)
            .into_iter()
            .filter(|n| n.starts_with("fetchDatasetContainer-"))
            .collect();
        let from_parameters: Vec<&str> = names(&containers)
            .into_iter()
            .filter(|n| n.starts_with("fetchScenarioDatasetParametersContainer-"))
            .collect();

        assert_eq!(regular, vec!["fetchDatasetContainer-1", "fetchDatasetContainer-2"]);
        assert_eq!(
            from_parameters,
            vec![
                "fetchScenarioDatasetParametersContainer-1",
                "fetchScenarioDatasetParametersContainer-2"
            ]
        );
        assert_eq!(
            regular.len() + from_parameters.len(),
            fixture.scenario.dataset_list.len() + 2
        );

        let unique: HashSet<&str> = names(&containers).into_iter().collect();
        assert_eq!(unique.len(), containers.len());
    }

    #[test]
    fn test_unknown_dataset_fails_without_partial_pipeline() {
        let mut fixture = Fixture::new();
        fixture.scenario.dataset_list.push("d-missing".to_string());

        let result = builder().build(&fixture.inputs());
        assert!(matches!(
            result,
            Err(PipelineError::DatasetNotFound { dataset_id }) if dataset_id == "d-missing"
        ));
    }

    #[test]
    fn test_unknown_dataset_parameter_value_fails() {
        let mut fixture = Fixture::new();
        fixture.add_dataset_parameter("demand_dataset", "d-nowhere");

        assert!(matches!(
            builder().build(&fixture.inputs()),
            Err(PipelineError::DatasetNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_connector_fails() {
        let mut fixture = Fixture::new();
        fixture.connectors.clear();

        assert!(matches!(
            builder().build(&fixture.inputs()),
            Err(PipelineError::ConnectorNotFound { connector_id, .. }) if connector_id == "c-1"
        ));
    }

    #[test]
    fn test_dataset_without_connector_fails() {
        let mut fixture = Fixture::new();
        fixture.datasets[0].connector = None;

        assert!(matches!(
            builder().build(&fixture.inputs()),
            Err(PipelineError::DatasetWithoutConnector { dataset_id }) if dataset_id == "d-1"
        ));
    }

    #[test]
    fn test_undeclared_parameter_fails() {
        let mut fixture = Fixture::new();
        fixture.solution.parameters.clear();

        assert!(matches!(
            builder().build(&fixture.inputs()),
            Err(PipelineError::ParameterNotDeclared { .. })
        ));
    }

    #[test]
    fn test_unknown_run_template_fails() {
        let mut fixture = Fixture::new();
        fixture.scenario.run_template_id = "nope".to_string();

        assert!(matches!(
            builder().build(&fixture.inputs()),
            Err(PipelineError::RunTemplateNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_workspace_id_fails() {
        let mut fixture = Fixture::new();
        fixture.workspace.id = String::new();

        assert!(matches!(
            builder().build(&fixture.inputs()),
            Err(PipelineError::MissingIdentifier {
                entity: "workspace"
            })
        ));
    }

    #[test]
    fn test_fetch_container_env_and_run_args() {
        let fixture = Fixture::new();
        let containers = builder().build(&fixture.inputs()).unwrap();

        let fetch = &containers[0];
        assert_eq!(fetch.image, "registry.local/csv-connector:2.1.0");
        assert_eq!(fetch.env_vars["CONNECTOR_URL"], "https://data/d-1.csv");
        // declared but unvalued parameters default to empty
        assert_eq!(fetch.env_vars["CONNECTOR_TOKEN"], "");
        assert_eq!(
            fetch.run_args,
            Some(vec!["d-1-container".to_string(), String::new()])
        );
        assert_eq!(fetch.env_vars["CSM_FETCH_ABSOLUTE_PATH"], "/mnt/scenariorun-data");
        assert_eq!(fetch.entrypoint, None);

        let parameter_fetch = containers
            .iter()
            .find(|c| c.name == "fetchScenarioDatasetParametersContainer-1")
            .unwrap();
        assert_eq!(
            parameter_fetch.env_vars["CSM_FETCH_ABSOLUTE_PATH"],
            "/mnt/scenariorun-parameters/stock_dataset"
        );
        assert_eq!(parameter_fetch.env_vars["CONNECTOR_URL"], "https://data/d-3.csv");
    }

    #[test]
    fn test_every_container_gets_common_env() {
        let fixture = Fixture::new();
        let containers = builder().build(&fixture.inputs()).unwrap();

        for container in &containers {
            assert_eq!(
                container.env_vars["CSM_SIMULATION_ID"],
                fixture.csm_simulation_run.to_string()
            );
            assert_eq!(container.env_vars["CSM_API_URL"], "https://api.simrun.local");
            assert_eq!(
                container.env_vars["CSM_DATASET_ABSOLUTE_PATH"],
                "/mnt/scenariorun-data"
            );
            assert_eq!(container.env_vars["CSM_ORGANIZATION_ID"], "o-1");
        }
    }

    #[test]
    fn test_solution_container_env() {
        let mut fixture = Fixture::new();
        let template = fixture.template_mut();
        template.csm_simulation = Some("BreweryDemo".to_string());
        template.run_source = Some(StepSource::Cloud);
        template.pre_run_source = Some(StepSource::Local);

        let containers = builder().build(&fixture.inputs()).unwrap();
        let run = containers.iter().find(|c| c.name == "runContainer").unwrap();

        assert_eq!(run.image, "registry.local/brewery-simulator:3.0.1");
        assert_eq!(run.entrypoint.as_deref(), Some("entrypoint.py"));
        assert_eq!(run.env_vars["CSM_RUN_TEMPLATE_ID"], "standard");
        assert_eq!(run.env_vars["CSM_CONTAINER_MODE"], "engine");
        assert_eq!(run.env_vars["CSM_SIMULATION"], "BreweryDemo");
        assert_eq!(
            run.env_vars["CSM_PROBES_MEASURES_TOPIC"],
            "amqps://bus.simrun.local/wk-brewery"
        );
        assert_eq!(
            run.env_vars[CONTROL_PLANE_TOPIC_VAR],
            "amqps://bus.simrun.local/wk-brewery-scenariorun"
        );
        assert_eq!(run.env_vars["CSM_ENGINE_PROVIDER"], "azureStorage");
        assert_eq!(run.env_vars["CSM_ENGINE_PATH"], "o-1/w-1/standard/engine");
        assert!(run.env_vars.contains_key("AZURE_STORAGE_CONNECTION_STRING"));

        let prerun = containers.iter().find(|c| c.name == "preRunContainer").unwrap();
        assert_eq!(prerun.env_vars["CSM_PRERUN_PROVIDER"], "local");
        assert!(!prerun.env_vars.contains_key("CSM_PRERUN_PATH"));

        let postrun = containers.iter().find(|c| c.name == "postRunContainer").unwrap();
        assert!(!postrun.env_vars.contains_key("CSM_POSTRUN_PROVIDER"));
    }

    #[test]
    fn test_fetch_containers_have_no_control_plane_topic() {
        let fixture = Fixture::new();
        let containers = builder().build(&fixture.inputs()).unwrap();

        assert!(
            containers
                .iter()
                .filter(|c| c.name.starts_with("fetch"))
                .all(|c| !c.env_vars.contains_key(CONTROL_PLANE_TOPIC_VAR))
        );
    }

    #[test]
    fn test_data_warehouse_upload_follows_template_override() {
        let mut fixture = Fixture::new();
        fixture.workspace.send_input_to_data_warehouse = false;

        let containers = builder().build(&fixture.inputs()).unwrap();
        assert!(!names(&containers).contains(&"sendDataWarehouseContainer"));

        fixture.template_mut().send_input_parameters_to_data_warehouse = Some(true);
        let containers = builder().build(&fixture.inputs()).unwrap();
        let upload = containers
            .iter()
            .find(|c| c.name == "sendDataWarehouseContainer")
            .unwrap();

        assert_eq!(upload.env_vars["CSM_SEND_DATAWAREHOUSE_PARAMETERS"], "true");
        assert_eq!(upload.env_vars["CSM_SEND_DATAWAREHOUSE_DATASETS"], "false");
        assert_eq!(upload.env_vars["AZURE_DATA_EXPLORER_DATABASE_NAME"], "wk-brewery");
    }

    #[test]
    fn test_template_override_can_disable_upload() {
        let mut fixture = Fixture::new();
        let template = fixture.template_mut();
        template.send_input_parameters_to_data_warehouse = Some(false);
        template.send_datasets_to_data_warehouse = Some(false);

        let containers = builder().build(&fixture.inputs()).unwrap();
        assert!(!names(&containers).contains(&"sendDataWarehouseContainer"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let fixture = Fixture::new();
        let first = builder().build(&fixture.inputs()).unwrap();
        let second = builder().build(&fixture.inputs()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_start_containers_naming() {
        let mut fixture = Fixture::new();
        let start = builder().build_start_containers(&fixture.inputs()).unwrap();

        assert_eq!(start.generate_name, "workflow-s-brewery-");
        assert_eq!(start.node_label, "basicpool");
        assert_eq!(start.csm_simulation_id, fixture.csm_simulation_run);

        fixture.template_mut().compute_size = Some("highcpu".to_string());
        let start = builder().build_start_containers(&fixture.inputs()).unwrap();
        assert_eq!(start.node_label, "highcpupool");
    }

    #[test]
    fn test_image_without_registry() {
        let mut settings = platform_settings();
        settings.container_registry = String::new();
        let fixture = Fixture::new();

        let containers = PipelineBuilder::new(settings)
            .build(&fixture.inputs())
            .unwrap();
        assert_eq!(containers[0].image, "csv-connector:2.1.0");
    }
}
