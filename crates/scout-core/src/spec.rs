//! Tool-spec model — executable contracts derived from sub-questions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Prefix joining a sub-question id to its tool-spec id.
const SPEC_ID_PREFIX: &str = "TS-";

/// Deterministic sub-question id → tool-spec id transform.
#[must_use]
pub fn spec_id_for(sub_question_id: &str) -> String {
    format!("{SPEC_ID_PREFIX}{sub_question_id}")
}

/// One side of a tool invocation contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolIo {
    /// What this side carries.
    pub description: String,
    /// Field name → declared type.
    pub schema: BTreeMap<String, String>,
}

/// A declarative quality gate on a tool-spec result.
///
/// Gates are recorded on the spec and carried into the outcome; the
/// dispatcher does not execute `on_failure` actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityGate {
    /// Gate name.
    pub name: String,
    /// Condition expression.
    pub condition: String,
    /// Declared failure policy (e.g. `retry`).
    pub on_failure: String,
}

/// An executable contract derived 1:1 from a sub-question.
///
/// The dependency list mirrors the sub-question DAG through the
/// [`spec_id_for`] transform, so the tool-spec graph always has identical
/// topology to the planning graph. Immutable after emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Spec id (`TS-<sub-question id>`).
    pub id: String,
    /// Target tool adapter name.
    pub tool: String,
    /// Input contract.
    pub inputs: ToolIo,
    /// Output contract.
    pub outputs: ToolIo,
    /// Per-invocation timeout in seconds.
    pub timeout_s: u64,
    /// Declarative quality gates.
    pub quality: Vec<QualityGate>,
    /// Optional cost bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_bound: Option<String>,
    /// Ids of specs that must complete first.
    pub depends_on: Vec<String>,
}
