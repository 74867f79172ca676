//! Execution evidence — results, heal proposals, report, metrics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Execution results
// ─────────────────────────────────────────────────────────────────────────────

/// Terminal status of one executed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// The test passed (possibly after retries).
    Passed,
    /// The test failed.
    Failed,
}

impl TestStatus {
    /// Stable string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// References to captured execution evidence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEvidence {
    /// Log lines or log file references.
    pub logs: Vec<String>,
    /// Screenshot references.
    pub screenshots: Vec<String>,
    /// Video reference, if recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
}

/// The recorded outcome of one test execution. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Executed test id.
    pub test_id: String,
    /// Terminal status.
    pub status: TestStatus,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Retry count before the terminal status.
    pub retries: u32,
    /// Error message for failed tests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Captured evidence.
    pub evidence: ExecutionEvidence,
}

// ─────────────────────────────────────────────────────────────────────────────
// Healing proposals
// ─────────────────────────────────────────────────────────────────────────────

/// One candidate replacement for a broken selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealCandidate {
    /// Replacement selector text.
    pub selector: String,
    /// Confidence score in `[0, 1]`.
    pub confidence: f64,
    /// Description of how the candidate differs from the broken selector.
    pub diff: String,
}

/// A suggested fix for a broken selector, with ranked candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealProposal {
    /// Test whose selector broke.
    pub test_id: String,
    /// The selector that failed.
    pub broken_selector: String,
    /// Candidate replacements.
    pub candidates: Vec<HealCandidate>,
}

impl HealProposal {
    /// The highest-confidence candidate; ties broken by first-seen order.
    #[must_use]
    pub fn best(&self) -> Option<&HealCandidate> {
        let mut best: Option<&HealCandidate> = None;
        for candidate in &self.candidates {
            if best.is_none_or(|current| candidate.confidence > current.confidence) {
                best = Some(candidate);
            }
        }
        best
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Report and metrics
// ─────────────────────────────────────────────────────────────────────────────

/// Human-facing summary of one suite execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// One-line pass/fail summary.
    pub summary: String,
    /// Requirement coverage at report time.
    pub coverage: f64,
    /// Ids of failed tests.
    pub failures: Vec<String>,
    /// Ids of tests that needed retries.
    pub flakes: Vec<String>,
    /// Test id → artifact link.
    pub links: BTreeMap<String, String>,
}

/// Aggregate metrics computed by the resolver stage.
///
/// Every ratio is 0.0 when its denominator is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// When planning finished.
    pub planned_at: DateTime<Utc>,
    /// Planning wall-clock duration in seconds.
    pub planning_duration_s: f64,
    /// resolved variables / declared variables.
    pub variable_resolution_rate: f64,
    /// passed tests / executed tests.
    pub execution_pass_rate: f64,
    /// tests with ≥1 retry / executed tests.
    pub flake_rate: f64,
    /// Mean retry count across executed tests.
    pub average_retry_count: f64,
}

/// Execution results plus report and healing proposals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    /// Per-test execution results.
    pub results: Vec<ExecutionResult>,
    /// Suite report.
    pub report: RunReport,
    /// Selector healing proposals.
    pub heal_proposals: Vec<HealProposal>,
}
