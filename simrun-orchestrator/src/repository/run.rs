//! Run Repository
//!
//! Persists scenario run records. Only the cached state of a record changes
//! after insertion.

use async_trait::async_trait;
use simrun_core::domain::run::{RunState, ScenarioRun, ScenarioRunContainer};
use simrun_core::dto::run::RunSearch;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Result;

const RUN_COLUMNS: &str = "id, owner_id, csm_simulation_run, organization_id, workspace_id, \
     workspace_key, scenario_id, solution_id, run_template_id, solution_sdk_version, \
     no_data_ingestion_state, workflow_id, workflow_name, node_label, containers, state, \
     created_at, updated_at";

/// Store of scenario runs
#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn insert(&self, run: &ScenarioRun) -> Result<()>;

    /// Finds a run of an organization
    async fn find_by_id(&self, organization_id: &str, id: Uuid) -> Result<Option<ScenarioRun>>;

    /// Runs of an organization matching every populated filter, newest first
    async fn search(&self, organization_id: &str, filter: &RunSearch) -> Result<Vec<ScenarioRun>>;

    /// Records the cached state of a run, keyed by run id
    ///
    /// Writes only to an existing record: a run deleted concurrently stays
    /// deleted.
    async fn update_state(&self, id: Uuid, state: RunState) -> Result<()>;

    /// Deletes a run, returning whether it existed
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Postgres implementation of RunRepository
#[derive(Clone)]
pub struct PgRunRepository {
    pool: PgPool,
}

impl PgRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Search query with one equality clause per populated filter
fn search_query(organization_id: &str, filter: &RunSearch) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!(
        "SELECT {} FROM scenario_runs WHERE organization_id = ",
        RUN_COLUMNS
    ));
    query.push_bind(organization_id.to_string());

    for (column, value) in filter.filters() {
        query.push(" AND ").push(column).push(" = ").push_bind(value);
    }

    query.push(" ORDER BY created_at DESC");
    query
}

#[async_trait]
impl RunRepository for PgRunRepository {
    async fn insert(&self, run: &ScenarioRun) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scenario_runs (id, owner_id, csm_simulation_run, organization_id,
                workspace_id, workspace_key, scenario_id, solution_id, run_template_id,
                solution_sdk_version, no_data_ingestion_state, workflow_id, workflow_name,
                node_label, containers, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(run.id)
        .bind(&run.owner_id)
        .bind(run.csm_simulation_run)
        .bind(&run.organization_id)
        .bind(&run.workspace_id)
        .bind(&run.workspace_key)
        .bind(&run.scenario_id)
        .bind(&run.solution_id)
        .bind(&run.run_template_id)
        .bind(&run.solution_sdk_version)
        .bind(run.no_data_ingestion_state)
        .bind(&run.workflow_id)
        .bind(&run.workflow_name)
        .bind(&run.node_label)
        .bind(serde_json::to_value(&run.containers)?)
        .bind(run.state.map(|s| s.to_string()))
        .bind(run.created_at)
        .bind(run.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, organization_id: &str, id: Uuid) -> Result<Option<ScenarioRun>> {
        let row = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {} FROM scenario_runs WHERE id = $1 AND organization_id = $2",
            RUN_COLUMNS
        ))
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ScenarioRun::try_from).transpose()
    }

    async fn search(&self, organization_id: &str, filter: &RunSearch) -> Result<Vec<ScenarioRun>> {
        let mut query = search_query(organization_id, filter);
        let rows = query
            .build_query_as::<RunRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ScenarioRun::try_from).collect()
    }

    async fn update_state(&self, id: Uuid, state: RunState) -> Result<()> {
        sqlx::query("UPDATE scenario_runs SET state = $1, updated_at = $2 WHERE id = $3")
            .bind(state.to_string())
            .bind(chrono::Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM scenario_runs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// In-memory implementation of RunRepository
#[derive(Default)]
pub struct InMemoryRunRepository {
    runs: RwLock<HashMap<Uuid, ScenarioRun>>,
}

impl InMemoryRunRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn insert(&self, run: &ScenarioRun) -> Result<()> {
        self.runs.write().await.insert(run.id, run.clone());
        Ok(())
    }

    async fn find_by_id(&self, organization_id: &str, id: Uuid) -> Result<Option<ScenarioRun>> {
        Ok(self
            .runs
            .read()
            .await
            .get(&id)
            .filter(|r| r.organization_id == organization_id)
            .cloned())
    }

    async fn search(&self, organization_id: &str, filter: &RunSearch) -> Result<Vec<ScenarioRun>> {
        let mut runs: Vec<ScenarioRun> = self
            .runs
            .read()
            .await
            .values()
            .filter(|r| r.organization_id == organization_id && filter.matches(r))
            .cloned()
            .collect();

        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    async fn update_state(&self, id: Uuid, state: RunState) -> Result<()> {
        if let Some(run) = self.runs.write().await.get_mut(&id) {
            run.state = Some(state);
            run.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.runs.write().await.remove(&id).is_some())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    owner_id: String,
    csm_simulation_run: Uuid,
    organization_id: String,
    workspace_id: String,
    workspace_key: String,
    scenario_id: String,
    solution_id: String,
    run_template_id: String,
    solution_sdk_version: Option<String>,
    no_data_ingestion_state: bool,
    workflow_id: String,
    workflow_name: String,
    node_label: String,
    containers: serde_json::Value,
    state: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<RunRow> for ScenarioRun {
    type Error = super::RepositoryError;

    fn try_from(row: RunRow) -> Result<Self> {
        let containers: Vec<ScenarioRunContainer> = serde_json::from_value(row.containers)?;

        Ok(ScenarioRun {
            id: row.id,
            owner_id: row.owner_id,
            csm_simulation_run: row.csm_simulation_run,
            organization_id: row.organization_id,
            workspace_id: row.workspace_id,
            workspace_key: row.workspace_key,
            scenario_id: row.scenario_id,
            solution_id: row.solution_id,
            run_template_id: row.run_template_id,
            solution_sdk_version: row.solution_sdk_version,
            no_data_ingestion_state: row.no_data_ingestion_state,
            workflow_id: row.workflow_id,
            workflow_name: row.workflow_name,
            node_label: row.node_label,
            containers,
            state: row.state.and_then(|s| s.parse().ok()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scenario_run;

    #[test]
    fn test_search_query_has_one_clause_per_filter() {
        let filter = RunSearch {
            workspace_id: Some("w-1".to_string()),
            owner_id: Some("alice".to_string()),
            state: Some(RunState::Successful),
            ..Default::default()
        };

        let query = search_query("o-1", &filter);
        let sql = query.sql();

        assert_eq!(sql.matches(" AND ").count(), 3);
        assert!(sql.contains("workspace_id = $2"));
        assert!(sql.contains("owner_id = $3"));
        assert!(sql.contains("state = $4"));
        assert!(!sql.contains("scenario_id ="));
    }

    #[test]
    fn test_empty_search_only_scopes_organization() {
        let query = search_query("o-1", &RunSearch::default());
        assert!(!query.sql().contains(" AND "));
        assert!(query.sql().contains("organization_id = $1"));
    }

    #[tokio::test]
    async fn test_in_memory_search_and_scope() {
        let repo = InMemoryRunRepository::new();
        let mut first = scenario_run("s-1", "alice");
        first.state = Some(RunState::Failed);
        let second = scenario_run("s-2", "bob");
        repo.insert(&first).await.unwrap();
        repo.insert(&second).await.unwrap();

        let by_scenario = RunSearch {
            scenario_id: Some("s-1".to_string()),
            ..Default::default()
        };
        let found = repo.search("o-1", &by_scenario).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, first.id);

        let by_state = RunSearch {
            state: Some(RunState::Failed),
            owner_id: Some("bob".to_string()),
            ..Default::default()
        };
        assert!(repo.search("o-1", &by_state).await.unwrap().is_empty());

        assert!(repo.search("o-2", &RunSearch::default()).await.unwrap().is_empty());
        assert!(repo.find_by_id("o-2", first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_in_memory_update_state_and_delete() {
        let repo = InMemoryRunRepository::new();
        let run = scenario_run("s-1", "alice");
        repo.insert(&run).await.unwrap();

        repo.update_state(run.id, RunState::Successful).await.unwrap();
        let stored = repo.find_by_id("o-1", run.id).await.unwrap().unwrap();
        assert_eq!(stored.state, Some(RunState::Successful));

        assert!(repo.delete(run.id).await.unwrap());
        assert!(!repo.delete(run.id).await.unwrap());

        repo.update_state(run.id, RunState::Failed).await.unwrap();
        assert!(repo.find_by_id("o-1", run.id).await.unwrap().is_none());
    }
}
