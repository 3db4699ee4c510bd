//! Argo Workflows executor
//!
//! Pipelines are submitted as a single sequential `steps` template, one step
//! per container. Dataset and parameter directories are shared between steps
//! through volume claim templates.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use simrun_core::domain::run::{ScenarioRunContainer, ScenarioRunStartContainers};
use std::collections::BTreeMap;

use super::{WorkflowExecutor, WorkflowHandle, WorkflowStatus};
use crate::config::ExecutorConfig;
use crate::service::pipeline::{DATASET_PATH, PARAMETERS_PATH};

const ENTRYPOINT_TEMPLATE: &str = "default";
const DATASETS_VOLUME: &str = "datasetsdir";
const PARAMETERS_VOLUME: &str = "parametersdir";
const VOLUME_SIZE: &str = "1Gi";
const SIMULATION_ID_LABEL: &str = "simrun/simulation-id";

/// Executor backed by the Argo Workflows REST API
pub struct ArgoExecutor {
    client: Client,
    config: ExecutorConfig,
}

impl ArgoExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn workflows_url(&self) -> String {
        format!(
            "{}/api/v1/workflows/{}",
            self.config.url.trim_end_matches('/'),
            self.config.namespace
        )
    }

    /// Argo workflow manifest of a pipeline
    pub fn manifest(&self, pipeline: &ScenarioRunStartContainers) -> Value {
        let steps: Vec<Value> = pipeline
            .containers
            .iter()
            .map(|c| json!([{ "name": c.name, "template": c.name }]))
            .collect();

        let mut templates = vec![json!({
            "name": ENTRYPOINT_TEMPLATE,
            "steps": steps,
        })];
        templates.extend(pipeline.containers.iter().map(container_template));

        let mut spec = json!({
            "entrypoint": ENTRYPOINT_TEMPLATE,
            "nodeSelector": { self.config.node_selector_key.as_str(): pipeline.node_label },
            "templates": templates,
            "volumeClaimTemplates": [
                volume_claim(DATASETS_VOLUME),
                volume_claim(PARAMETERS_VOLUME),
            ],
        });

        if let Some(account) = &self.config.service_account {
            spec["serviceAccountName"] = json!(account);
        }
        if let Some(secret) = &self.config.image_pull_secret {
            spec["imagePullSecrets"] = json!([{ "name": secret }]);
        }

        json!({
            "metadata": {
                "generateName": pipeline.generate_name,
                "labels": { SIMULATION_ID_LABEL: pipeline.csm_simulation_id.to_string() },
            },
            "spec": spec,
        })
    }
}

fn container_template(container: &ScenarioRunContainer) -> Value {
    let env: Vec<Value> = container
        .env_vars
        .iter()
        .map(|(name, value)| json!({ "name": name, "value": value }))
        .collect();

    let mut spec = json!({
        "image": container.image,
        "env": env,
        "volumeMounts": [
            { "name": DATASETS_VOLUME, "mountPath": DATASET_PATH },
            { "name": PARAMETERS_VOLUME, "mountPath": PARAMETERS_PATH },
        ],
    });

    if let Some(args) = &container.run_args {
        spec["args"] = json!(args);
    }
    if let Some(entrypoint) = &container.entrypoint {
        spec["command"] = json!([entrypoint]);
    }

    json!({ "name": container.name, "container": spec })
}

fn volume_claim(name: &str) -> Value {
    json!({
        "metadata": { "name": name },
        "spec": {
            "accessModes": ["ReadWriteOnce"],
            "resources": { "requests": { "storage": VOLUME_SIZE } },
        },
    })
}

/// Container a pod ran, from the pod name `<workflow>-<template>-<suffix>`
///
/// Falls back to the pod name for pods that match no container.
fn container_for_pod(pod_name: &str, workflow_name: &str, containers: &[String]) -> String {
    let rest = pod_name
        .strip_prefix(workflow_name)
        .map(|r| r.trim_start_matches('-'))
        .unwrap_or(pod_name)
        .to_lowercase();

    containers
        .iter()
        .filter(|c| {
            let name = c.to_lowercase();
            rest == name || rest.starts_with(&format!("{}-", name))
        })
        .max_by_key(|c| c.len())
        .cloned()
        .unwrap_or_else(|| pod_name.to_string())
}

async fn check(response: Response, action: &str) -> Result<Response> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Failed to {}: {} - {}", action, status, body);
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct WorkflowObject {
    metadata: ObjectMeta,
    #[serde(default)]
    status: Option<WorkflowObjectStatus>,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
    #[serde(default)]
    uid: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowObjectStatus {
    phase: Option<String>,
    finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
struct LogLine {
    result: Option<LogChunk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogChunk {
    #[serde(default)]
    content: String,
    #[serde(default)]
    pod_name: String,
}

#[async_trait]
impl WorkflowExecutor for ArgoExecutor {
    async fn submit(&self, pipeline: &ScenarioRunStartContainers) -> Result<WorkflowHandle> {
        let response = self
            .client
            .post(self.workflows_url())
            .json(&json!({ "workflow": self.manifest(pipeline) }))
            .send()
            .await
            .context("Failed to submit workflow")?;

        let workflow = check(response, "submit workflow")
            .await?
            .json::<WorkflowObject>()
            .await
            .context("Failed to parse submitted workflow")?;

        tracing::info!(
            "Submitted workflow {} ({} containers)",
            workflow.metadata.name,
            pipeline.containers.len()
        );

        Ok(WorkflowHandle {
            id: workflow.metadata.uid,
            name: workflow.metadata.name,
        })
    }

    async fn status(&self, workflow_name: &str) -> Result<WorkflowStatus> {
        let url = format!("{}/{}", self.workflows_url(), workflow_name);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch workflow status")?;

        let workflow = check(response, "fetch workflow status")
            .await?
            .json::<WorkflowObject>()
            .await
            .context("Failed to parse workflow status")?;

        Ok(workflow
            .status
            .map(|s| WorkflowStatus {
                phase: s.phase,
                finished_at: s.finished_at,
            })
            .unwrap_or_default())
    }

    async fn logs(
        &self,
        workflow_name: &str,
        containers: &[String],
    ) -> Result<BTreeMap<String, String>> {
        let url = format!("{}/{}/log", self.workflows_url(), workflow_name);

        let response = self
            .client
            .get(&url)
            .query(&[("logOptions.container", "main")])
            .send()
            .await
            .context("Failed to fetch workflow logs")?;

        let body = check(response, "fetch workflow logs")
            .await?
            .text()
            .await
            .context("Failed to read workflow logs")?;

        let mut logs: BTreeMap<String, String> = BTreeMap::new();
        for line in body.lines().filter(|l| !l.trim().is_empty()) {
            let chunk = match serde_json::from_str::<LogLine>(line) {
                Ok(LogLine {
                    result: Some(chunk),
                }) => chunk,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("Skipping malformed log line: {}", e);
                    continue;
                }
            };

            let container = container_for_pod(&chunk.pod_name, workflow_name, containers);
            let text = logs.entry(container).or_default();
            text.push_str(&chunk.content);
            text.push('\n');
        }

        Ok(logs)
    }

    async fn stop(&self, workflow_name: &str) -> Result<()> {
        let url = format!("{}/{}/stop", self.workflows_url(), workflow_name);

        let response = self
            .client
            .put(&url)
            .json(&json!({}))
            .send()
            .await
            .context("Failed to stop workflow")?;

        check(response, "stop workflow").await?;
        tracing::info!("Stop requested for workflow {}", workflow_name);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    fn executor() -> ArgoExecutor {
        ArgoExecutor::new(ExecutorConfig {
            url: "http://argo:2746/".to_string(),
            namespace: "simrun".to_string(),
            node_selector_key: "agentpool".to_string(),
            service_account: Some("workflow".to_string()),
            image_pull_secret: None,
            timeout: Duration::from_secs(30),
        })
    }

    fn pipeline() -> ScenarioRunStartContainers {
        ScenarioRunStartContainers {
            generate_name: "workflow-s-1-".to_string(),
            node_label: "basicpool".to_string(),
            csm_simulation_id: Uuid::nil(),
            containers: vec![
                ScenarioRunContainer {
                    name: "fetchDatasetContainer-1".to_string(),
                    image: "csv-connector:1.0".to_string(),
                    env_vars: BTreeMap::from([("A".to_string(), "1".to_string())]),
                    run_args: Some(vec!["x".to_string()]),
                    entrypoint: None,
                },
                ScenarioRunContainer {
                    name: "runContainer".to_string(),
                    image: "solution:1.0".to_string(),
                    env_vars: BTreeMap::new(),
                    run_args: None,
                    entrypoint: Some("entrypoint.py".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_manifest_steps_follow_pipeline_order() {
        let manifest = executor().manifest(&pipeline());
        let spec = &manifest["spec"];

        assert_eq!(manifest["metadata"]["generateName"], "workflow-s-1-");
        assert_eq!(spec["nodeSelector"]["agentpool"], "basicpool");
        assert_eq!(spec["serviceAccountName"], "workflow");
        assert!(spec.get("imagePullSecrets").is_none());

        let steps = spec["templates"][0]["steps"].as_array().unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0][0]["template"], "fetchDatasetContainer-1");
        assert_eq!(steps[1][0]["template"], "runContainer");
    }

    #[test]
    fn test_container_template() {
        let manifest = executor().manifest(&pipeline());
        let templates = manifest["spec"]["templates"].as_array().unwrap();

        let fetch = &templates[1]["container"];
        assert_eq!(fetch["image"], "csv-connector:1.0");
        assert_eq!(fetch["env"][0]["name"], "A");
        assert_eq!(fetch["args"][0], "x");
        assert!(fetch.get("command").is_none());

        let run = &templates[2]["container"];
        assert_eq!(run["command"][0], "entrypoint.py");
        assert_eq!(run["volumeMounts"][0]["mountPath"], DATASET_PATH);
    }

    #[test]
    fn test_container_for_pod() {
        let containers = vec![
            "fetchDatasetContainer-1".to_string(),
            "fetchDatasetContainer-10".to_string(),
            "runContainer".to_string(),
        ];

        assert_eq!(
            container_for_pod("wf-abc-rundatacontainer-1", "wf-abc", &containers),
            "wf-abc-rundatacontainer-1"
        );
        assert_eq!(
            container_for_pod("wf-abc-runcontainer-12345", "wf-abc", &containers),
            "runContainer"
        );
        assert_eq!(
            container_for_pod("wf-abc-fetchdatasetcontainer-10-999", "wf-abc", &containers),
            "fetchDatasetContainer-10"
        );
    }
}
