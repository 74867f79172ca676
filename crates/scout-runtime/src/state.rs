//! The accumulating pipeline state and per-stage partial updates.
//!
//! Each stage is a function from the accumulated state to a [`StageUpdate`];
//! the driver merges the update and emits a snapshot. Stages never mutate
//! the state directly, which keeps every stage independently testable with
//! a fixed input/output contract.

use std::collections::{BTreeMap, HashMap};

use scout_core::artifact::ArtifactBundle;
use scout_core::document::{DocPack, Requirement, TraceabilityIndex};
use scout_core::evidence::{EvidenceBundle, ExecutionResult, HealProposal, RunMetrics, RunReport};
use scout_core::outcome::OrchestratorOutcome;
use scout_core::plan::{Plan, PlanVariable};
use scout_core::spec::ToolSpec;

use crate::errors::RuntimeError;
use crate::tools::ToolData;

/// Everything accumulated across pipeline stages for one run.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    /// Path of the source document. Set at construction.
    pub doc_path: String,
    /// Parsed document, after `ingest_docs`.
    pub doc_pack: Option<DocPack>,
    /// Extracted requirements, after `ingest_docs`.
    pub requirements: Option<Vec<Requirement>>,
    /// Requirement → test index, seeded at ingest, linked at synthesis.
    pub traceability: Option<TraceabilityIndex>,
    /// Latest coverage ratio.
    pub coverage: f64,
    /// The validated plan, after `planner`.
    pub plan: Option<Plan>,
    /// Planning wall-clock duration in seconds.
    pub planning_duration_s: f64,
    /// Emitted tool specs, after `emit_tool_specs`.
    pub tool_specs: Option<Vec<ToolSpec>>,
    /// Variable catalog keyed by variable name.
    pub variables: Option<BTreeMap<String, PlanVariable>>,
    /// Raw tool results keyed by spec id, after `dispatch_tools`.
    pub tool_results: Option<HashMap<String, ToolData>>,
    /// Names of variables that did not resolve.
    pub gaps: Vec<String>,
    /// Synthesized artifacts, after `synthesize_artifacts`.
    pub artifacts: Option<ArtifactBundle>,
    /// Suite execution results, after `worker_execute_suite`.
    pub execution_results: Option<Vec<ExecutionResult>>,
    /// Suite report, after `collect_evidence`.
    pub run_report: Option<RunReport>,
    /// Selector healing proposals, after `collect_evidence`.
    pub heal_proposals: Vec<HealProposal>,
    /// Aggregate metrics, after `resolver`.
    pub metrics: Option<RunMetrics>,
}

/// A partial update produced by one stage. Only `Some` fields are merged.
#[derive(Debug, Default)]
pub struct StageUpdate {
    /// Parsed document.
    pub doc_pack: Option<DocPack>,
    /// Extracted requirements.
    pub requirements: Option<Vec<Requirement>>,
    /// Traceability index.
    pub traceability: Option<TraceabilityIndex>,
    /// Coverage ratio.
    pub coverage: Option<f64>,
    /// Validated plan.
    pub plan: Option<Plan>,
    /// Planning duration.
    pub planning_duration_s: Option<f64>,
    /// Emitted tool specs.
    pub tool_specs: Option<Vec<ToolSpec>>,
    /// Variable catalog.
    pub variables: Option<BTreeMap<String, PlanVariable>>,
    /// Raw tool results.
    pub tool_results: Option<HashMap<String, ToolData>>,
    /// Unresolved variable names.
    pub gaps: Option<Vec<String>>,
    /// Synthesized artifacts.
    pub artifacts: Option<ArtifactBundle>,
    /// Suite execution results.
    pub execution_results: Option<Vec<ExecutionResult>>,
    /// Suite report.
    pub run_report: Option<RunReport>,
    /// Healing proposals.
    pub heal_proposals: Option<Vec<HealProposal>>,
    /// Aggregate metrics.
    pub metrics: Option<RunMetrics>,
}

impl PipelineState {
    /// Fresh state for a run over `doc_path`.
    #[must_use]
    pub fn new(doc_path: impl Into<String>) -> Self {
        Self {
            doc_path: doc_path.into(),
            ..Self::default()
        }
    }

    /// Merge a stage's partial update into the accumulated state.
    pub fn apply(&mut self, update: StageUpdate) {
        macro_rules! merge_some {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = update.$field { self.$field = Some(value); })+
            };
        }
        macro_rules! merge_plain {
            ($($field:ident),+ $(,)?) => {
                $(if let Some(value) = update.$field { self.$field = value; })+
            };
        }
        merge_some!(
            doc_pack,
            requirements,
            traceability,
            plan,
            tool_specs,
            variables,
            tool_results,
            artifacts,
            execution_results,
            run_report,
            metrics,
        );
        merge_plain!(coverage, planning_duration_s, gaps, heal_proposals);
    }

    // Precondition accessors. Each stage fails fast with a configuration
    // error when a required input is absent.

    /// The requirements, or a configuration error.
    pub fn require_requirements(&self) -> Result<&[Requirement], RuntimeError> {
        self.requirements
            .as_deref()
            .ok_or(RuntimeError::MissingInput("requirements"))
    }

    /// The plan, or a configuration error.
    pub fn require_plan(&self) -> Result<&Plan, RuntimeError> {
        self.plan.as_ref().ok_or(RuntimeError::MissingInput("plan"))
    }

    /// The tool specs, or a configuration error.
    pub fn require_tool_specs(&self) -> Result<&[ToolSpec], RuntimeError> {
        self.tool_specs
            .as_deref()
            .ok_or(RuntimeError::MissingInput("tool_specs"))
    }

    /// The variable catalog, or a configuration error.
    pub fn require_variables(&self) -> Result<&BTreeMap<String, PlanVariable>, RuntimeError> {
        self.variables
            .as_ref()
            .ok_or(RuntimeError::MissingInput("variables"))
    }

    /// The artifact bundle, or a configuration error.
    pub fn require_artifacts(&self) -> Result<&ArtifactBundle, RuntimeError> {
        self.artifacts
            .as_ref()
            .ok_or(RuntimeError::MissingInput("artifacts"))
    }

    /// The execution results, or a configuration error.
    pub fn require_execution_results(&self) -> Result<&[ExecutionResult], RuntimeError> {
        self.execution_results
            .as_deref()
            .ok_or(RuntimeError::MissingInput("execution_results"))
    }

    /// Assemble the terminal outcome from the accumulated state.
    ///
    /// Fails with a configuration error when any required piece is absent,
    /// which can only happen if a stage was skipped.
    pub fn outcome(&self) -> Result<OrchestratorOutcome, RuntimeError> {
        Ok(OrchestratorOutcome {
            doc_pack: self
                .doc_pack
                .clone()
                .ok_or(RuntimeError::MissingInput("doc_pack"))?,
            requirements: self.require_requirements()?.to_vec(),
            traceability: self
                .traceability
                .clone()
                .ok_or(RuntimeError::MissingInput("traceability"))?,
            plan: self.require_plan()?.clone(),
            tool_specs: self.require_tool_specs()?.to_vec(),
            variables: self.require_variables()?.values().cloned().collect(),
            artifacts: self.require_artifacts()?.clone(),
            evidence_bundle: EvidenceBundle {
                results: self.require_execution_results()?.to_vec(),
                report: self
                    .run_report
                    .clone()
                    .ok_or(RuntimeError::MissingInput("run_report"))?,
                heal_proposals: self.heal_proposals.clone(),
            },
            metrics: self
                .metrics
                .clone()
                .ok_or(RuntimeError::MissingInput("metrics"))?,
        })
    }
}
