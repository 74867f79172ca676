//! The fixed-order macro-stage pipeline.
//!
//! Threads one accumulating [`PipelineState`] through the stages in
//! [`Stage::EXECUTION_ORDER`], merging each stage's partial update and
//! emitting a callback with a state snapshot after every merge. The
//! pipeline advances unconditionally — no branching, no skipped stages —
//! and halts at the first stage error.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use scout_core::outcome::OrchestratorOutcome;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::callbacks::{CallbackBus, Stage};
use crate::dispatch::{Dispatcher, apply_variable_results};
use crate::errors::RuntimeError;
use crate::ingest;
use crate::planner::{Planner, PlannerConfig};
use crate::report::{SuiteExecutor, build_run_report, compute_metrics, detect_locator_drift};
use crate::specs::{SpecEmitter, VariableCatalog};
use crate::state::{PipelineState, StageUpdate};
use crate::store::{LearnedSelector, LearningStore, OutcomeStore};
use crate::synthesis::{link_traceability, synthesize_artifacts};
use crate::tools::ToolRegistry;

/// Pipeline tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Minimum sub-question count for the planner.
    pub min_sub_questions: usize,
    /// Bounded dispatch worker width.
    pub max_workers: usize,
    /// Fixed suite-executor seed; OS entropy when unset.
    pub suite_seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_sub_questions: 8,
            max_workers: 4,
            suite_seed: None,
        }
    }
}

/// The macro-stage state machine for one run.
pub struct Pipeline {
    config: PipelineConfig,
    bus: Arc<CallbackBus>,
    registry: Arc<ToolRegistry>,
    outcomes: Arc<dyn OutcomeStore>,
    learning: Arc<dyn LearningStore>,
}

impl Pipeline {
    /// Assemble a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        bus: Arc<CallbackBus>,
        registry: Arc<ToolRegistry>,
        outcomes: Arc<dyn OutcomeStore>,
        learning: Arc<dyn LearningStore>,
    ) -> Self {
        Self {
            config,
            bus,
            registry,
            outcomes,
            learning,
        }
    }

    /// Run the full pipeline over `doc_path`.
    ///
    /// The outcome is persisted under `run_id` (falling back to the doc
    /// path) before the terminal `completed` callback fires. Cancellation
    /// is honored at every stage boundary and inside dispatch.
    pub async fn run(
        &self,
        doc_path: &str,
        run_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<OrchestratorOutcome, RuntimeError> {
        let mut state = PipelineState::new(doc_path);

        for stage in Stage::EXECUTION_ORDER {
            if cancel.is_cancelled() {
                return Err(RuntimeError::Cancelled);
            }
            let update = self.execute_stage(stage, &state, cancel).await?;
            state.apply(update);
            self.bus.emit(stage, Arc::new(state.clone())).await;
            debug!(stage = stage.as_str(), "stage complete");
        }

        let outcome = state.outcome()?;
        let run_key = run_id.unwrap_or(doc_path);
        self.outcomes.save_outcome(run_key, &outcome).await?;
        self.bus.emit(Stage::Completed, Arc::new(state)).await;
        Ok(outcome)
    }

    async fn execute_stage(
        &self,
        stage: Stage,
        state: &PipelineState,
        cancel: &CancellationToken,
    ) -> Result<StageUpdate, RuntimeError> {
        match stage {
            Stage::IngestDocs => self.ingest_docs(state).await,
            Stage::Planner => self.plan(state),
            Stage::EmitToolSpecs => self.emit_tool_specs(state),
            Stage::DispatchTools => self.dispatch_tools(state, cancel).await,
            Stage::SubstituteVars => substitute_vars(state),
            Stage::SynthesizeArtifacts => synthesize(state),
            Stage::WorkerExecuteSuite => self.execute_suite(state),
            Stage::CollectEvidence => collect_evidence(state),
            Stage::Resolver => resolve_metrics(state),
            Stage::PostmortemAndHeal => Ok(self.postmortem(state).await),
            Stage::Completed => Ok(StageUpdate::default()),
        }
    }

    async fn ingest_docs(&self, state: &PipelineState) -> Result<StageUpdate, RuntimeError> {
        if state.doc_path.is_empty() {
            return Err(RuntimeError::MissingInput("doc_path"));
        }
        let doc_pack = ingest::load_doc_pack(Path::new(&state.doc_path)).await?;
        let requirements = ingest::extract_requirements(&doc_pack);
        let traceability = ingest::build_traceability(&requirements);
        let coverage = traceability.coverage_ratio(requirements.len());
        Ok(StageUpdate {
            doc_pack: Some(doc_pack),
            requirements: Some(requirements),
            traceability: Some(traceability),
            coverage: Some(coverage),
            ..StageUpdate::default()
        })
    }

    fn plan(&self, state: &PipelineState) -> Result<StageUpdate, RuntimeError> {
        let requirement_texts: Vec<String> = state
            .require_requirements()?
            .iter()
            .map(|req| req.text.clone())
            .collect();
        let planner = Planner::new(PlannerConfig {
            min_sub_questions: self.config.min_sub_questions,
        });
        let started = Instant::now();
        let plan = planner.build_plan(&requirement_texts)?;
        Ok(StageUpdate {
            plan: Some(plan),
            planning_duration_s: Some(started.elapsed().as_secs_f64()),
            ..StageUpdate::default()
        })
    }

    fn emit_tool_specs(&self, state: &PipelineState) -> Result<StageUpdate, RuntimeError> {
        let plan = state.require_plan()?;
        let specs = SpecEmitter.emit(plan);
        let variables = VariableCatalog.build(plan, &specs);
        Ok(StageUpdate {
            tool_specs: Some(specs),
            variables: Some(variables),
            ..StageUpdate::default()
        })
    }

    async fn dispatch_tools(
        &self,
        state: &PipelineState,
        cancel: &CancellationToken,
    ) -> Result<StageUpdate, RuntimeError> {
        let plan = state.require_plan()?;
        let specs = state.require_tool_specs()?;
        let dispatcher = Dispatcher::with_workers(Arc::clone(&self.registry), self.config.max_workers);
        let results = dispatcher
            .dispatch(plan, specs, Some(&state.doc_path), cancel)
            .await?;

        let mut variables = state.require_variables()?.clone();
        apply_variable_results(&mut variables, &results);
        Ok(StageUpdate {
            tool_results: Some(results),
            variables: Some(variables),
            ..StageUpdate::default()
        })
    }

    fn execute_suite(&self, state: &PipelineState) -> Result<StageUpdate, RuntimeError> {
        let automation_ids = state
            .require_artifacts()?
            .automation_specs
            .iter()
            .map(|spec| spec.id.clone());
        let mut executor = match self.config.suite_seed {
            Some(seed) => SuiteExecutor::seeded(seed),
            None => SuiteExecutor::new(),
        };
        Ok(StageUpdate {
            execution_results: Some(executor.execute(automation_ids)),
            ..StageUpdate::default()
        })
    }

    /// Persist the best heal candidate per proposal. Failures here must not
    /// fail the run, so errors are logged and dropped.
    async fn postmortem(&self, state: &PipelineState) -> StageUpdate {
        let entries: BTreeMap<String, LearnedSelector> = state
            .heal_proposals
            .iter()
            .filter_map(|proposal| {
                proposal.best().map(|candidate| {
                    (
                        proposal.test_id.clone(),
                        LearnedSelector {
                            selector: candidate.selector.clone(),
                            confidence: candidate.confidence,
                        },
                    )
                })
            })
            .collect();

        if !entries.is_empty() {
            if let Err(error) = self.learning.merge(&entries).await {
                warn!(%error, "learning store merge failed");
            }
        }
        StageUpdate::default()
    }
}

fn substitute_vars(state: &PipelineState) -> Result<StageUpdate, RuntimeError> {
    let gaps = state
        .require_variables()?
        .values()
        .filter(|var| var.status != scout_core::plan::VariableStatus::Resolved)
        .map(|var| var.name.clone())
        .collect();
    Ok(StageUpdate {
        gaps: Some(gaps),
        ..StageUpdate::default()
    })
}

fn synthesize(state: &PipelineState) -> Result<StageUpdate, RuntimeError> {
    let plan = state.require_plan()?;
    let requirements = state.require_requirements()?;
    let variables = state.require_variables()?;
    let artifacts = synthesize_artifacts(plan, requirements, variables);

    let mut traceability = state
        .traceability
        .clone()
        .ok_or(RuntimeError::MissingInput("traceability"))?;
    link_traceability(&mut traceability, &artifacts);
    let coverage = traceability.coverage_ratio(requirements.len());

    Ok(StageUpdate {
        artifacts: Some(artifacts),
        traceability: Some(traceability),
        coverage: Some(coverage),
        ..StageUpdate::default()
    })
}

fn collect_evidence(state: &PipelineState) -> Result<StageUpdate, RuntimeError> {
    let results = state.require_execution_results()?;
    Ok(StageUpdate {
        run_report: Some(build_run_report(results, state.coverage)),
        heal_proposals: Some(detect_locator_drift(results)),
        ..StageUpdate::default()
    })
}

fn resolve_metrics(state: &PipelineState) -> Result<StageUpdate, RuntimeError> {
    let metrics = compute_metrics(
        state.planning_duration_s,
        state.require_variables()?,
        state.require_execution_results()?,
    );
    Ok(StageUpdate {
        metrics: Some(metrics),
        ..StageUpdate::default()
    })
}
