//! Pipeline stages and the callback bus.
//!
//! The bus maps a stage to an ordered list of asynchronous observers and
//! delivers sequentially: a slow observer delays the pipeline, never the
//! ordering. The internal lock is held only around list mutation and
//! snapshotting — observer bodies run outside it, so an observer may
//! register further observers without deadlocking. The bus provides no
//! error isolation between observers; observers return `()` and handle
//! their own failures.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::state::PipelineState;

// ─────────────────────────────────────────────────────────────────────────────
// Stages
// ─────────────────────────────────────────────────────────────────────────────

/// The fixed-order macro stages of the pipeline.
///
/// The pipeline advances unconditionally in this order; no branching, no
/// skipping. [`Stage::Completed`] is emitted once, after the outcome has
/// been persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Load the source document, extract requirements.
    IngestDocs,
    /// Build the sub-question DAG.
    Planner,
    /// Derive tool specs and the variable catalog.
    EmitToolSpecs,
    /// Execute tool specs in dependency order.
    DispatchTools,
    /// Report unresolved variables as gaps.
    SubstituteVars,
    /// Synthesize manual tests and automation specs.
    SynthesizeArtifacts,
    /// Execute the automation suite.
    WorkerExecuteSuite,
    /// Build the run report and locator-drift proposals.
    CollectEvidence,
    /// Compute aggregate metrics.
    Resolver,
    /// Merge heal candidates into the learning store.
    PostmortemAndHeal,
    /// Terminal marker emitted after outcome persistence.
    Completed,
}

impl Stage {
    /// Every stage, in pipeline order.
    pub const ALL: [Self; 11] = [
        Self::IngestDocs,
        Self::Planner,
        Self::EmitToolSpecs,
        Self::DispatchTools,
        Self::SubstituteVars,
        Self::SynthesizeArtifacts,
        Self::WorkerExecuteSuite,
        Self::CollectEvidence,
        Self::Resolver,
        Self::PostmortemAndHeal,
        Self::Completed,
    ];

    /// The stages the driver executes, in order (everything but the
    /// terminal `completed` marker).
    pub const EXECUTION_ORDER: [Self; 10] = [
        Self::IngestDocs,
        Self::Planner,
        Self::EmitToolSpecs,
        Self::DispatchTools,
        Self::SubstituteVars,
        Self::SynthesizeArtifacts,
        Self::WorkerExecuteSuite,
        Self::CollectEvidence,
        Self::Resolver,
        Self::PostmortemAndHeal,
    ];

    /// Stable stage name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IngestDocs => "ingest_docs",
            Self::Planner => "planner",
            Self::EmitToolSpecs => "emit_tool_specs",
            Self::DispatchTools => "dispatch_tools",
            Self::SubstituteVars => "substitute_vars",
            Self::SynthesizeArtifacts => "synthesize_artifacts",
            Self::WorkerExecuteSuite => "worker_execute_suite",
            Self::CollectEvidence => "collect_evidence",
            Self::Resolver => "resolver",
            Self::PostmortemAndHeal => "postmortem_and_heal",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Callback bus
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot of the accumulated pipeline state handed to observers.
pub type StateSnapshot = Arc<PipelineState>;

/// An asynchronous stage observer.
pub type StageObserver = Arc<dyn Fn(StateSnapshot) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure into a [`StageObserver`].
pub fn observer<F, Fut>(f: F) -> StageObserver
where
    F: Fn(StateSnapshot) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |state| f(state).boxed())
}

/// Registry mapping stages to ordered observer lists.
#[derive(Default)]
pub struct CallbackBus {
    observers: Mutex<HashMap<Stage, Vec<StageObserver>>>,
}

impl CallbackBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `observer` to the list for `stage`.
    pub async fn register(&self, stage: Stage, observer: StageObserver) {
        self.observers
            .lock()
            .await
            .entry(stage)
            .or_default()
            .push(observer);
    }

    /// Invoke every observer registered for `stage`, in registration order,
    /// awaiting each before the next.
    pub async fn emit(&self, stage: Stage, state: StateSnapshot) {
        let snapshot = {
            let observers = self.observers.lock().await;
            observers.get(&stage).cloned().unwrap_or_default()
        };
        for observer in snapshot {
            observer(Arc::clone(&state)).await;
        }
    }

    /// Remove all registrations.
    pub async fn clear(&self) {
        self.observers.lock().await.clear();
    }

    /// Number of observers registered for `stage`.
    pub async fn observer_count(&self, stage: Stage) -> usize {
        self.observers
            .lock()
            .await
            .get(&stage)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as SyncMutex;

    fn empty_state() -> StateSnapshot {
        Arc::new(PipelineState::new("doc.md"))
    }

    #[tokio::test]
    async fn observers_run_in_registration_order() {
        let bus = CallbackBus::new();
        let order: Arc<SyncMutex<Vec<u32>>> = Arc::new(SyncMutex::new(Vec::new()));

        for tag in 1..=3 {
            let order = Arc::clone(&order);
            bus.register(
                Stage::Planner,
                observer(move |_state| {
                    let order = Arc::clone(&order);
                    async move {
                        order.lock().push(tag);
                    }
                }),
            )
            .await;
        }

        bus.emit(Stage::Planner, empty_state()).await;
        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn emit_on_unregistered_stage_is_a_no_op() {
        let bus = CallbackBus::new();
        bus.emit(Stage::Resolver, empty_state()).await;
        assert_eq!(bus.observer_count(Stage::Resolver).await, 0);
    }

    #[tokio::test]
    async fn observer_may_register_another_observer() {
        let bus = Arc::new(CallbackBus::new());
        let inner_bus = Arc::clone(&bus);

        bus.register(
            Stage::IngestDocs,
            observer(move |_state| {
                let bus = Arc::clone(&inner_bus);
                async move {
                    bus.register(Stage::Completed, observer(|_state| async {}))
                        .await;
                }
            }),
        )
        .await;

        // Would deadlock if the bus held its lock across observer execution.
        bus.emit(Stage::IngestDocs, empty_state()).await;
        assert_eq!(bus.observer_count(Stage::Completed).await, 1);
    }

    #[tokio::test]
    async fn clear_removes_all_registrations() {
        let bus = CallbackBus::new();
        bus.register(Stage::Planner, observer(|_state| async {}))
            .await;
        bus.clear().await;
        assert_eq!(bus.observer_count(Stage::Planner).await, 0);
    }

    #[test]
    fn execution_order_excludes_only_the_terminal_marker() {
        assert_eq!(Stage::ALL.len(), Stage::EXECUTION_ORDER.len() + 1);
        assert_eq!(Stage::ALL.last(), Some(&Stage::Completed));
    }
}
