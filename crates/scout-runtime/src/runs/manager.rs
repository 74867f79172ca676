//! Run lifecycle manager — start/check/cancel/shutdown over a registry of
//! background runs.
//!
//! The registry lock guards short bookkeeping only; it is never held across
//! a background task's execution. Each record is shared between the manager
//! and its single background writer behind its own mutex, and cancellation
//! is delivered through a per-run `CancellationToken`.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::gauge;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::callbacks::{CallbackBus, Stage, observer};
use crate::errors::RuntimeError;
use crate::pipeline::{Pipeline, PipelineConfig};
use crate::runs::record::{RunRecord, RunSnapshot, RunStatus};
use crate::store::{LearningStore, MemoryLearningStore, MemoryOutcomeStore, OutcomeStore};
use crate::tools::ToolRegistry;
use crate::webhook::{CallbackDelivery, CallbackPayload};

/// Error message recorded when a run is cancelled without a prior error.
const CANCELLED_MESSAGE: &str = "run cancelled";

/// One tracked run: its record, cancellation token, and background task.
struct RunEntry {
    record: Arc<Mutex<RunRecord>>,
    cancel: CancellationToken,
    /// Taken by `shutdown` when draining.
    handle: Option<JoinHandle<()>>,
}

/// Coordinates asynchronous orchestrator runs.
pub struct RunManager {
    config: PipelineConfig,
    registry: Arc<ToolRegistry>,
    outcomes: Arc<dyn OutcomeStore>,
    learning: Arc<dyn LearningStore>,
    delivery: CallbackDelivery,
    runs: Mutex<HashMap<String, RunEntry>>,
}

impl RunManager {
    /// Assemble a manager from its collaborators.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        registry: Arc<ToolRegistry>,
        outcomes: Arc<dyn OutcomeStore>,
        learning: Arc<dyn LearningStore>,
    ) -> Self {
        Self {
            config,
            registry,
            outcomes,
            learning,
            delivery: CallbackDelivery::new(),
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Manager over the built-in tool registry and in-memory stores.
    #[must_use]
    pub fn with_defaults(config: PipelineConfig) -> Self {
        Self::new(
            config,
            Arc::new(ToolRegistry::builtin()),
            Arc::new(MemoryOutcomeStore::new()),
            Arc::new(MemoryLearningStore::new()),
        )
    }

    /// Handle to the outcome store runs persist into.
    #[must_use]
    pub fn outcomes(&self) -> Arc<dyn OutcomeStore> {
        Arc::clone(&self.outcomes)
    }

    /// Kick off a new orchestrator execution in the background.
    ///
    /// Fails with a conflict error when `run_id` collides with a
    /// non-terminal run; a terminal run's id may be reused. Returns the
    /// pending record snapshot immediately.
    #[instrument(skip(self, callback_url))]
    pub fn start(
        self: &Arc<Self>,
        doc_path: &str,
        run_id: Option<String>,
        callback_url: Option<String>,
    ) -> Result<RunSnapshot, RuntimeError> {
        let run_key = run_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut runs = self.runs.lock();
        if let Some(existing) = runs.get(&run_key) {
            if !existing.record.lock().status.is_terminal() {
                return Err(RuntimeError::RunConflict(run_key));
            }
        }

        let record = Arc::new(Mutex::new(RunRecord::new(
            run_key.clone(),
            doc_path,
            callback_url,
        )));
        let cancel = CancellationToken::new();
        let snapshot = record.lock().snapshot();

        let handle = tokio::spawn({
            let manager = Arc::clone(self);
            let record = Arc::clone(&record);
            let cancel = cancel.clone();
            let run_key = run_key.clone();
            async move {
                manager.execute_run(&run_key, record, cancel).await;
            }
        });

        let _ = runs.insert(
            run_key.clone(),
            RunEntry {
                record,
                cancel,
                handle: Some(handle),
            },
        );
        gauge!("scout_runs_active").set(active_count(&runs) as f64);
        info!(run_id = %run_key, "run started");
        Ok(snapshot)
    }

    /// Snapshot of the run's current state.
    pub fn check(&self, run_id: &str) -> Result<RunSnapshot, RuntimeError> {
        let runs = self.runs.lock();
        let entry = runs
            .get(run_id)
            .ok_or_else(|| RuntimeError::RunNotFound(run_id.to_string()))?;
        Ok(entry.record.lock().snapshot())
    }

    /// Request cancellation of a run.
    ///
    /// A no-op on already-terminal runs (the unchanged record snapshot is
    /// returned). The error message is only set when none exists yet.
    #[instrument(skip(self))]
    pub fn cancel(&self, run_id: &str) -> Result<RunSnapshot, RuntimeError> {
        let runs = self.runs.lock();
        let entry = runs
            .get(run_id)
            .ok_or_else(|| RuntimeError::RunNotFound(run_id.to_string()))?;

        let mut record = entry.record.lock();
        if record.status.is_terminal() {
            return Ok(record.snapshot());
        }

        entry.cancel.cancel();
        record.status = RunStatus::Cancelled;
        if record.error.is_none() {
            record.error = Some(CANCELLED_MESSAGE.to_string());
        }
        record.touch();
        info!(run_id, "run cancelled");
        Ok(record.snapshot())
    }

    /// Cancel every non-terminal run and wait for all background tasks to
    /// finish. Individual task failures are collected, logged, and not
    /// propagated. Call before discarding the manager to avoid orphaned
    /// background work.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let draining: Vec<(String, CancellationToken, JoinHandle<()>)> = {
            let mut runs = self.runs.lock();
            runs.iter_mut()
                .filter_map(|(run_id, entry)| {
                    entry
                        .handle
                        .take()
                        .map(|handle| (run_id.clone(), entry.cancel.clone(), handle))
                })
                .collect()
        };

        for (_, cancel, _) in &draining {
            cancel.cancel();
        }
        for (run_id, _, handle) in draining {
            if let Err(error) = handle.await {
                warn!(run_id, %error, "background task join failed");
            }
        }
        gauge!("scout_runs_active").set(0.0);
    }

    /// Background execution of one run.
    async fn execute_run(
        &self,
        run_key: &str,
        record: Arc<Mutex<RunRecord>>,
        cancel: CancellationToken,
    ) {
        let bus = Arc::new(CallbackBus::new());
        for stage in Stage::ALL {
            let record = Arc::clone(&record);
            bus.register(
                stage,
                observer(move |_state| {
                    let record = Arc::clone(&record);
                    async move {
                        let mut record = record.lock();
                        record.stages.push(stage.as_str().to_string());
                        record.touch();
                    }
                }),
            )
            .await;
        }

        {
            let mut record = record.lock();
            if !record.status.is_terminal() {
                record.status = RunStatus::Running;
                record.touch();
            }
        }

        let pipeline = Pipeline::new(
            self.config,
            bus,
            Arc::clone(&self.registry),
            Arc::clone(&self.outcomes),
            Arc::clone(&self.learning),
        );
        let doc_path = record.lock().doc_path.clone();
        let result = pipeline.run(&doc_path, Some(run_key), &cancel).await;

        {
            let mut record = record.lock();
            // Terminal states are never left; a racing `cancel` wins.
            if !record.status.is_terminal() {
                match &result {
                    Ok(outcome) => {
                        record.result = serde_json::to_value(outcome).ok();
                        record.status = RunStatus::Completed;
                    }
                    Err(error) if error.is_cancelled() => {
                        record.status = RunStatus::Cancelled;
                        if record.error.is_none() {
                            record.error = Some(CANCELLED_MESSAGE.to_string());
                        }
                    }
                    Err(error) => {
                        record.status = RunStatus::Failed;
                        record.error = Some(error.to_string());
                    }
                }
            }
            record.touch();
        }

        self.send_callback(&record).await;

        let status = record.lock().status;
        gauge!("scout_runs_active").set(active_count(&self.runs.lock()) as f64);
        info!(run_id = run_key, %status, "run finished");
    }

    /// Attempt terminal callback delivery; failures land in
    /// `callback_error` and never change the run status.
    async fn send_callback(&self, record: &Arc<Mutex<RunRecord>>) {
        let (url, payload) = {
            let record = record.lock();
            let Some(url) = record.callback_url.clone() else {
                return;
            };
            (
                url,
                CallbackPayload {
                    run_id: record.run_id.clone(),
                    status: record.status.as_str().to_string(),
                    result: record.result.clone(),
                    error: record.error.clone(),
                },
            )
        };

        if let Err(error) = self.delivery.deliver(&url, &payload).await {
            warn!(run_id = %payload.run_id, %error, "callback delivery failed");
            let mut record = record.lock();
            record.callback_error = Some(error.to_string());
            record.touch();
        }
    }
}

impl std::fmt::Debug for RunManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunManager")
            .field("runs", &self.runs.lock().len())
            .finish_non_exhaustive()
    }
}

/// Number of runs not yet terminal.
fn active_count(runs: &HashMap<String, RunEntry>) -> usize {
    runs.values()
        .filter(|entry| !entry.record.lock().status.is_terminal())
        .count()
}
