//! ID resolver module
//!
//! Resolves run ID prefixes to full UUIDs by searching the organization's
//! runs, so users can type short prefixes instead of full UUIDs.

use anyhow::{Context, Result, anyhow};
use simrun_client::OrchestratorClient;
use simrun_core::domain::run::ScenarioRun;
use simrun_core::dto::run::RunSearch;
use uuid::Uuid;

use crate::types::IdOrPrefix;

/// Resolve a run ID or prefix to a full UUID
///
/// If the input is already a full UUID, returns it immediately.
/// Otherwise, searches every run of the organization for the prefix.
///
/// # Errors
/// Returns an error if:
/// - No run matches the prefix
/// - Multiple runs match the prefix (ambiguous)
/// - API call fails
pub async fn resolve_run_id(
    client: &OrchestratorClient,
    organization_id: &str,
    id_or_prefix: &IdOrPrefix,
) -> Result<Uuid> {
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let runs = client
        .search_runs(organization_id, &RunSearch::default())
        .await
        .context("Failed to fetch runs for ID resolution")?;

    pick_unique(&runs, id_or_prefix)
}

fn pick_unique(runs: &[ScenarioRun], id_or_prefix: &IdOrPrefix) -> Result<Uuid> {
    let matches: Vec<Uuid> = runs
        .iter()
        .map(|r| r.id)
        .filter(|id| id_or_prefix.matches(id))
        .collect();

    match matches.as_slice() {
        [] => Err(anyhow!(
            "No run found with ID starting with '{}'",
            id_or_prefix
        )),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple runs: {}",
                id_or_prefix,
                ids.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn run(id: &str) -> ScenarioRun {
        ScenarioRun {
            id: Uuid::parse_str(id).unwrap(),
            owner_id: "alice".to_string(),
            csm_simulation_run: Uuid::new_v4(),
            organization_id: "o-1".to_string(),
            workspace_id: "w-1".to_string(),
            workspace_key: "wk-1".to_string(),
            scenario_id: "s-1".to_string(),
            solution_id: "sol-1".to_string(),
            run_template_id: "rt-1".to_string(),
            solution_sdk_version: None,
            no_data_ingestion_state: false,
            workflow_id: "uid-1".to_string(),
            workflow_name: "workflow-s-1-abcde".to_string(),
            node_label: "basicpool".to_string(),
            containers: Vec::new(),
            state: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_pick_unique_prefix() {
        let runs = vec![
            run("ab12cd34-0000-4000-8000-000000000001"),
            run("ab99cd34-0000-4000-8000-000000000002"),
        ];

        let id = pick_unique(&runs, &IdOrPrefix::parse("ab12")).unwrap();
        assert_eq!(id, runs[0].id);

        let err = pick_unique(&runs, &IdOrPrefix::parse("ab")).unwrap_err();
        assert!(err.to_string().contains("Ambiguous prefix 'ab'"));

        let err = pick_unique(&runs, &IdOrPrefix::parse("ff")).unwrap_err();
        assert!(err.to_string().contains("No run found"));
    }
}
