//! The terminal aggregate of one orchestration run.

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactBundle;
use crate::document::{DocPack, Requirement, TraceabilityIndex};
use crate::evidence::{EvidenceBundle, RunMetrics};
use crate::plan::{Plan, PlanVariable};
use crate::spec::ToolSpec;

/// Everything a completed run produced. Built exactly once per successful
/// run; immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorOutcome {
    /// The ingested source document.
    pub doc_pack: DocPack,
    /// Extracted requirements.
    pub requirements: Vec<Requirement>,
    /// Requirement → test traceability.
    pub traceability: TraceabilityIndex,
    /// The validated plan.
    pub plan: Plan,
    /// Emitted tool specs.
    pub tool_specs: Vec<ToolSpec>,
    /// Variables with their final resolution state.
    pub variables: Vec<PlanVariable>,
    /// Synthesized artifacts.
    pub artifacts: ArtifactBundle,
    /// Execution evidence.
    pub evidence_bundle: EvidenceBundle,
    /// Aggregate metrics.
    pub metrics: RunMetrics,
}
