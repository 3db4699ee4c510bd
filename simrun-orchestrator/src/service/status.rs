//! Run state reconciliation
//!
//! Combines the executor phase of a run with the ingestion backend signal
//! into the client facing `RunState`. Ingestion that is still pending once
//! the observation window after workflow completion has elapsed counts as
//! failed, so every succeeded run eventually reaches a terminal state.

use chrono::{DateTime, Utc};
use simrun_core::domain::run::{DataIngestionState, RunState, ScenarioRun};
use simrun_core::domain::solution::SdkVersion;
use std::sync::Arc;
use std::time::Duration;

use crate::executor::WorkflowPhase;
use crate::ingestion::IngestionBackend;

/// Ingestion input of a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionSignal {
    /// The run does not report ingestion progress
    NotChecked,
    /// Lookup returned nothing, failed or timed out
    Absent,
    Reported(DataIngestionState),
}

/// State of a run for a given phase and ingestion signal
pub fn resolve_state(phase: &WorkflowPhase, ingestion: IngestionSignal) -> RunState {
    match phase {
        WorkflowPhase::Pending | WorkflowPhase::Running => RunState::Running,
        WorkflowPhase::Succeeded => match ingestion {
            IngestionSignal::NotChecked => RunState::Successful,
            IngestionSignal::Absent | IngestionSignal::Reported(DataIngestionState::Unknown) => {
                RunState::Unknown
            }
            IngestionSignal::Reported(DataIngestionState::InProgress) => {
                RunState::DataIngestionInProgress
            }
            IngestionSignal::Reported(DataIngestionState::Successful) => RunState::Successful,
            IngestionSignal::Reported(DataIngestionState::Failure) => RunState::Failed,
        },
        WorkflowPhase::Skipped
        | WorkflowPhase::Failed
        | WorkflowPhase::Error
        | WorkflowPhase::Omitted => RunState::Failed,
        WorkflowPhase::Other(raw) => {
            tracing::warn!("Unexpected workflow phase '{}'", raw);
            RunState::Unknown
        }
    }
}

/// Applies the observation window to an ingestion signal
///
/// A pending signal (absent, unknown or in progress) turns into a failure
/// once more than `window` has passed since the workflow finished.
pub fn observe(
    signal: IngestionSignal,
    finished_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window: Duration,
) -> IngestionSignal {
    let pending = matches!(
        signal,
        IngestionSignal::Absent
            | IngestionSignal::Reported(DataIngestionState::Unknown)
            | IngestionSignal::Reported(DataIngestionState::InProgress)
    );
    let expired = finished_at
        .and_then(|end| (now - end).to_std().ok())
        .is_some_and(|elapsed| elapsed > window);

    if pending && expired {
        IngestionSignal::Reported(DataIngestionState::Failure)
    } else {
        signal
    }
}

/// Reconciles executor phases with the ingestion backend
#[derive(Clone)]
pub struct StatusReconciler {
    ingestion: Arc<dyn IngestionBackend>,
    timeout: Duration,
    min_sdk_version: SdkVersion,
    observation_window: Duration,
}

impl StatusReconciler {
    pub fn new(
        ingestion: Arc<dyn IngestionBackend>,
        timeout: Duration,
        min_sdk_version: SdkVersion,
        observation_window: Duration,
    ) -> Self {
        Self {
            ingestion,
            timeout,
            min_sdk_version,
            observation_window,
        }
    }

    /// Whether the ingestion backend has to be consulted for a run
    ///
    /// Requires telemetry emitting containers, no template opt-out and a
    /// solution SDK recent enough to report ingestion progress. A missing or
    /// unparsable SDK version disables the check.
    pub fn should_check_ingestion(&self, run: &ScenarioRun) -> bool {
        let recent_sdk = run
            .solution_sdk_version
            .as_deref()
            .and_then(SdkVersion::parse)
            .is_some_and(|v| v >= self.min_sdk_version);

        run.emits_ingestion_telemetry() && !run.no_data_ingestion_state && recent_sdk
    }

    /// State of a run given its current executor phase
    ///
    /// Performs at most one ingestion lookup, and only for succeeded runs.
    /// `finished_at` is the workflow completion time reported by the executor.
    pub async fn reconcile(
        &self,
        run: &ScenarioRun,
        phase: &WorkflowPhase,
        finished_at: Option<DateTime<Utc>>,
    ) -> RunState {
        let signal = if *phase == WorkflowPhase::Succeeded && self.should_check_ingestion(run) {
            let reported = self.lookup(run).await;
            let observed = observe(reported, finished_at, Utc::now(), self.observation_window);
            if observed != reported {
                tracing::warn!(
                    "Ingestion of run {} still {:?} {:?} after workflow completion, marking it failed",
                    run.id,
                    reported,
                    self.observation_window
                );
            }
            observed
        } else {
            IngestionSignal::NotChecked
        };

        resolve_state(phase, signal)
    }

    async fn lookup(&self, run: &ScenarioRun) -> IngestionSignal {
        let query = self.ingestion.state(
            &run.organization_id,
            &run.workspace_key,
            run.csm_simulation_run,
        );

        match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(Some(state))) => IngestionSignal::Reported(state),
            Ok(Ok(None)) => IngestionSignal::Absent,
            Ok(Err(e)) => {
                tracing::warn!("Ingestion state lookup failed for run {}: {:#}", run.id, e);
                IngestionSignal::Absent
            }
            Err(_) => {
                tracing::warn!(
                    "Ingestion state lookup timed out after {:?} for run {}",
                    self.timeout,
                    run.id
                );
                IngestionSignal::Absent
            }
        }
    }
}
