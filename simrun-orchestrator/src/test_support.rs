//! Fixtures and fakes shared by the unit tests

use anyhow::Result;
use async_trait::async_trait;
use simrun_core::domain::dataset::{
    Connector, ConnectorParameter, ConnectorParameterGroup, Dataset, DatasetConnector,
};
use simrun_core::domain::run::{
    CONTROL_PLANE_TOPIC_VAR, DataIngestionState, ScenarioRun, ScenarioRunContainer,
    ScenarioRunStartContainers,
};
use simrun_core::domain::scenario::{Scenario, ScenarioParameterValue};
use simrun_core::domain::solution::{
    DATASET_PARAMETER_TYPE, RunTemplate, Solution, SolutionParameter,
};
use simrun_core::domain::workspace::{Organization, Workspace};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::PlatformSettings;
use crate::executor::{WorkflowExecutor, WorkflowHandle, WorkflowStatus};
use crate::ingestion::IngestionBackend;
use crate::repository::Catalog;
use crate::service::pipeline::PipelineInputs;

pub fn platform_settings() -> PlatformSettings {
    PlatformSettings {
        container_registry: "registry.local".to_string(),
        fetch_parameters_image: "simrun/fetch-scenario-parameters:1.0".to_string(),
        send_data_warehouse_image: "simrun/send-data-warehouse:1.0".to_string(),
        identity_tenant_id: "tenant".to_string(),
        identity_client_id: "client".to_string(),
        identity_client_secret: "secret".to_string(),
        api_url: "https://api.simrun.local".to_string(),
        api_scope: "https://api.simrun.local/.default".to_string(),
        analytics_bus_uri: "amqps://bus.simrun.local".to_string(),
        storage_connection_string: "DefaultEndpointsProtocol=https".to_string(),
        data_warehouse_uri: "https://adx.simrun.local".to_string(),
        data_warehouse_ingest_uri: "https://ingest-adx.simrun.local".to_string(),
        parameters_write_csv: true,
        parameters_write_json: false,
    }
}

pub fn solution(run_templates: Vec<RunTemplate>) -> Solution {
    Solution {
        id: "sol-brewery".to_string(),
        organization_id: "o-1".to_string(),
        name: "Brewery".to_string(),
        repository: "brewery-simulator".to_string(),
        version: "3.0.1".to_string(),
        sdk_version: Some("8.6.0".to_string()),
        run_templates,
        parameters: vec![
            parameter("stock_dataset", DATASET_PARAMETER_TYPE),
            parameter("demand_dataset", DATASET_PARAMETER_TYPE),
            parameter("horizon", "int"),
        ],
    }
}

fn parameter(id: &str, var_type: &str) -> SolutionParameter {
    SolutionParameter {
        id: id.to_string(),
        var_type: var_type.to_string(),
    }
}

fn dataset(id: &str) -> Dataset {
    Dataset {
        id: id.to_string(),
        name: format!("Dataset {}", id),
        organization_id: "o-1".to_string(),
        connector: Some(DatasetConnector {
            id: "c-1".to_string(),
            parameters_values: HashMap::from([
                ("url".to_string(), format!("https://data/{}.csv", id)),
                ("container".to_string(), format!("{}-container", id)),
            ]),
        }),
        compatibility: Vec::new(),
    }
}

fn connector_parameter(id: &str, env_var: Option<&str>) -> ConnectorParameter {
    ConnectorParameter {
        id: id.to_string(),
        env_var: env_var.map(str::to_string),
    }
}

/// Organization, workspace, solution, scenario, three datasets and their
/// connector, all consistent with each other
pub struct Fixture {
    pub organization: Organization,
    pub workspace: Workspace,
    pub solution: Solution,
    pub scenario: Scenario,
    pub datasets: Vec<Dataset>,
    pub connectors: Vec<Connector>,
    pub csm_simulation_run: Uuid,
}

impl Fixture {
    pub fn new() -> Self {
        let connector = Connector {
            id: "c-1".to_string(),
            name: "CSV".to_string(),
            repository: "csv-connector".to_string(),
            version: "2.1.0".to_string(),
            parameter_groups: vec![
                ConnectorParameterGroup {
                    id: "source".to_string(),
                    parameters: vec![
                        connector_parameter("url", Some("CONNECTOR_URL")),
                        connector_parameter("token", Some("CONNECTOR_TOKEN")),
                        connector_parameter("container", None),
                    ],
                },
                ConnectorParameterGroup {
                    id: "options".to_string(),
                    parameters: vec![connector_parameter("delimiter", None)],
                },
            ],
        };

        Self {
            organization: Organization {
                id: "o-1".to_string(),
                name: "Brewery Corp".to_string(),
            },
            workspace: Workspace {
                id: "w-1".to_string(),
                name: "Brewery".to_string(),
                organization_id: "o-1".to_string(),
                key: "wk-brewery".to_string(),
                solution_id: "sol-brewery".to_string(),
                send_input_to_data_warehouse: true,
            },
            solution: solution(vec![RunTemplate {
                id: "standard".to_string(),
                name: Some("Standard".to_string()),
                ..Default::default()
            }]),
            scenario: Scenario {
                id: "s-brewery".to_string(),
                name: "Brewery scenario".to_string(),
                organization_id: "o-1".to_string(),
                workspace_id: "w-1".to_string(),
                solution_id: "sol-brewery".to_string(),
                run_template_id: "standard".to_string(),
                owner_id: "alice".to_string(),
                dataset_list: vec!["d-1".to_string(), "d-2".to_string()],
                parameters_values: vec![
                    ScenarioParameterValue {
                        parameter_id: "stock_dataset".to_string(),
                        var_type: Some(DATASET_PARAMETER_TYPE.to_string()),
                        value: "d-3".to_string(),
                    },
                    ScenarioParameterValue {
                        parameter_id: "horizon".to_string(),
                        var_type: Some("int".to_string()),
                        value: "12".to_string(),
                    },
                ],
                last_run: None,
            },
            datasets: vec![dataset("d-1"), dataset("d-2"), dataset("d-3")],
            connectors: vec![connector],
            csm_simulation_run: Uuid::new_v4(),
        }
    }

    pub fn template_mut(&mut self) -> &mut RunTemplate {
        &mut self.solution.run_templates[0]
    }

    pub fn add_dataset_parameter(&mut self, parameter_id: &str, dataset_id: &str) {
        self.scenario.parameters_values.push(ScenarioParameterValue {
            parameter_id: parameter_id.to_string(),
            var_type: Some(DATASET_PARAMETER_TYPE.to_string()),
            value: dataset_id.to_string(),
        });
    }

    pub fn inputs(&self) -> PipelineInputs<'_> {
        PipelineInputs {
            organization: &self.organization,
            workspace: &self.workspace,
            solution: &self.solution,
            scenario: &self.scenario,
            datasets: &self.datasets,
            connectors: &self.connectors,
            csm_simulation_run: self.csm_simulation_run,
        }
    }

    /// Stores every entity of the fixture in a catalog
    pub async fn store(&self, catalog: &Catalog) {
        catalog.put(&self.organization).await.unwrap();
        catalog.put(&self.workspace).await.unwrap();
        catalog.put(&self.solution).await.unwrap();
        catalog.put(&self.scenario).await.unwrap();
        for dataset in &self.datasets {
            catalog.put(dataset).await.unwrap();
        }
        for connector in &self.connectors {
            catalog.put(connector).await.unwrap();
        }
    }
}

/// Run of organization `o-1`, workspace `w-1` without telemetry
pub fn scenario_run(scenario_id: &str, owner_id: &str) -> ScenarioRun {
    let now = chrono::Utc::now();
    ScenarioRun {
        id: Uuid::new_v4(),
        owner_id: owner_id.to_string(),
        csm_simulation_run: Uuid::new_v4(),
        organization_id: "o-1".to_string(),
        workspace_id: "w-1".to_string(),
        workspace_key: "wk-brewery".to_string(),
        scenario_id: scenario_id.to_string(),
        solution_id: "sol-brewery".to_string(),
        run_template_id: "standard".to_string(),
        solution_sdk_version: None,
        no_data_ingestion_state: false,
        workflow_id: Uuid::new_v4().to_string(),
        workflow_name: format!("workflow-{}-abcde", scenario_id),
        node_label: "basicpool".to_string(),
        containers: Vec::new(),
        state: None,
        created_at: now,
        updated_at: now,
    }
}

/// Run whose engine container publishes to the control plane
pub fn telemetry_run(sdk_version: Option<&str>) -> ScenarioRun {
    let mut run = scenario_run("s-1", "alice");
    run.solution_sdk_version = sdk_version.map(str::to_string);
    run.containers = vec![ScenarioRunContainer {
        name: "runContainer".to_string(),
        image: "registry.local/brewery-simulator:3.0.1".to_string(),
        env_vars: BTreeMap::from([(
            CONTROL_PLANE_TOPIC_VAR.to_string(),
            "amqps://bus.simrun.local/wk-brewery-scenariorun".to_string(),
        )]),
        run_args: None,
        entrypoint: Some("entrypoint.py".to_string()),
    }];
    run
}

/// Ingestion backend with call counters
#[derive(Default)]
pub struct FakeIngestion {
    pub state: Option<DataIngestionState>,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub state_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl FakeIngestion {
    pub fn reporting(state: DataIngestionState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }
}

#[async_trait]
impl IngestionBackend for FakeIngestion {
    async fn state(
        &self,
        _organization_id: &str,
        _workspace_key: &str,
        _csm_simulation_run: Uuid,
    ) -> Result<Option<DataIngestionState>> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("ingestion backend unavailable");
        }
        Ok(self.state)
    }

    async fn delete_run_data(
        &self,
        _organization_id: &str,
        _workspace_key: &str,
        _csm_simulation_run: Uuid,
    ) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("ingestion backend unavailable");
        }
        Ok(())
    }
}

/// Executor recording submissions and reporting a fixed phase
#[derive(Default)]
pub struct FakeExecutor {
    pub phase: Option<String>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Delay before answering a status query
    pub delay: Option<Duration>,
    pub unavailable: AtomicBool,
    pub submitted: Mutex<Vec<ScenarioRunStartContainers>>,
    pub status_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
}

impl FakeExecutor {
    pub fn with_phase(phase: &str) -> Self {
        Self {
            phase: Some(phase.to_string()),
            ..Default::default()
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("executor unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowExecutor for FakeExecutor {
    async fn submit(&self, pipeline: &ScenarioRunStartContainers) -> Result<WorkflowHandle> {
        self.check_available()?;
        let mut submitted = self.submitted.lock().await;
        submitted.push(pipeline.clone());

        Ok(WorkflowHandle {
            id: Uuid::new_v4().to_string(),
            name: format!("{}{:05}", pipeline.generate_name, submitted.len()),
        })
    }

    async fn status(&self, _workflow_name: &str) -> Result<WorkflowStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available()?;
        Ok(WorkflowStatus {
            phase: self.phase.clone(),
            finished_at: self.finished_at,
        })
    }

    async fn logs(
        &self,
        workflow_name: &str,
        containers: &[String],
    ) -> Result<BTreeMap<String, String>> {
        self.check_available()?;
        Ok(containers
            .iter()
            .map(|c| (c.clone(), format!("{} {} done\n", workflow_name, c)))
            .collect())
    }

    async fn stop(&self, _workflow_name: &str) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()
    }
}
