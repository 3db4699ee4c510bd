//! Run teardown
//!
//! Deleting a run removes its ingested data first, then its record. Both
//! steps are attempted independently and failures are only logged.

use futures::future::join_all;
use simrun_core::domain::run::ScenarioRun;
use std::sync::Arc;

pub use simrun_core::dto::run::TeardownOutcome;

use crate::ingestion::IngestionBackend;
use crate::repository::RunRepository;

#[derive(Clone)]
pub struct RunTeardown {
    runs: Arc<dyn RunRepository>,
    ingestion: Arc<dyn IngestionBackend>,
}

impl RunTeardown {
    pub fn new(runs: Arc<dyn RunRepository>, ingestion: Arc<dyn IngestionBackend>) -> Self {
        Self { runs, ingestion }
    }

    /// Best-effort deletion of one run
    pub async fn teardown(&self, run: &ScenarioRun) -> TeardownOutcome {
        let ingestion_deleted = match self
            .ingestion
            .delete_run_data(&run.organization_id, &run.workspace_key, run.csm_simulation_run)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to delete ingested data of run {}: {:#}", run.id, e);
                false
            }
        };

        let record_deleted = match self.runs.delete(run.id).await {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::error!("Failed to delete run {}: {}", run.id, e);
                false
            }
        };

        tracing::info!(
            "Run {} torn down (ingestion: {}, record: {})",
            run.id,
            ingestion_deleted,
            record_deleted
        );

        TeardownOutcome {
            run_id: run.id,
            ingestion_deleted,
            record_deleted,
        }
    }

    /// Tears down every run concurrently, returning once all were attempted
    pub async fn teardown_all(&self, runs: &[ScenarioRun]) -> Vec<TeardownOutcome> {
        join_all(runs.iter().map(|run| self.teardown(run))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRunRepository;
    use crate::test_support::{FakeIngestion, scenario_run};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_record_deleted_even_when_ingestion_fails() {
        let runs = Arc::new(InMemoryRunRepository::new());
        let ingestion = Arc::new(FakeIngestion {
            fail: true,
            ..Default::default()
        });
        let run = scenario_run("s-1", "alice");
        runs.insert(&run).await.unwrap();

        let outcome = RunTeardown::new(runs.clone(), ingestion.clone())
            .teardown(&run)
            .await;

        assert!(!outcome.ingestion_deleted);
        assert!(outcome.record_deleted);
        assert_eq!(ingestion.delete_calls.load(Ordering::SeqCst), 1);
        assert!(runs.find_by_id("o-1", run.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_teardown_all_attempts_every_run() {
        let runs = Arc::new(InMemoryRunRepository::new());
        let ingestion = Arc::new(FakeIngestion::default());
        let batch: Vec<ScenarioRun> = (0..4).map(|_| scenario_run("s-1", "alice")).collect();
        for run in &batch {
            runs.insert(run).await.unwrap();
        }

        let outcomes = RunTeardown::new(runs, ingestion.clone())
            .teardown_all(&batch)
            .await;

        assert_eq!(outcomes.len(), 4);
        assert!(outcomes.iter().all(|o| o.ingestion_deleted && o.record_deleted));
        assert_eq!(ingestion.delete_calls.load(Ordering::SeqCst), 4);
    }
}
