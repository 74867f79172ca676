//! Synthesized test artifacts — manual tests, automation specs, test plan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One step of a manual test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualTestStep {
    /// What the tester does.
    pub action: String,
    /// What the tester should observe.
    pub expected: String,
}

/// A manual test synthesized from a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualTest {
    /// Test id (`MT-N`).
    pub id: String,
    /// Test title.
    pub title: String,
    /// Requirements this test validates.
    pub requirement_ids: Vec<String>,
    /// Ordered steps.
    pub steps: Vec<ManualTestStep>,
    /// Data dimension → values to iterate.
    pub data_matrix: BTreeMap<String, Vec<String>>,
}

/// Kind of automation operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Navigate to a screen or URL.
    Navigate,
    /// Click a selector.
    Click,
    /// Assert a condition.
    Assert,
}

/// One operation of an automation spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation kind.
    #[serde(rename = "type")]
    pub kind: OperationKind,
    /// Target selector, when the operation needs one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Assertion text for `assert` operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion: Option<String>,
    /// Name of the data binding feeding this operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_binding: Option<String>,
}

/// An executable automation spec synthesized from a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationSpec {
    /// Spec id (`AT-N`).
    pub id: String,
    /// Spec title.
    pub title: String,
    /// Requirements this spec validates.
    pub requirement_ids: Vec<String>,
    /// Ordered operations.
    pub ops: Vec<Operation>,
    /// Named selectors used by the operations.
    pub selectors: BTreeMap<String, String>,
    /// Named data bindings used by the operations.
    pub data_bindings: BTreeMap<String, String>,
}

/// The test plan artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlanArtifact {
    /// Scope carried over from the plan strategy.
    pub scope: Vec<String>,
    /// Priorities carried over from the plan strategy.
    pub priorities: Vec<String>,
    /// Data dimension → values.
    pub data_matrix: BTreeMap<String, Vec<String>>,
    /// Selected execution environment profile.
    pub environment_profile: String,
}

/// Everything the synthesis stage produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    /// The test plan.
    pub test_plan: TestPlanArtifact,
    /// Synthesized manual tests.
    pub manual_tests: Vec<ManualTest>,
    /// Synthesized automation specs.
    pub automation_specs: Vec<AutomationSpec>,
    /// Operator runbook text.
    pub runbook: String,
}
