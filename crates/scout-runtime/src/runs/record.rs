//! The mutable lifecycle record for one orchestration run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle states for orchestration runs.
///
/// `pending → running → {completed | failed | cancelled}`; the three
/// right-hand states are terminal — no transitions leave them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Created, background task not yet running.
    Pending,
    /// The background task is executing the pipeline.
    Running,
    /// The pipeline produced an outcome.
    Completed,
    /// The pipeline failed.
    Failed,
    /// The run was cancelled.
    Cancelled,
}

impl RunStatus {
    /// Whether this status is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Stable string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory representation of one orchestration run.
///
/// Owned exclusively by the run manager's registry; mutated only by the
/// manager and the run's own background task.
#[derive(Debug, Clone)]
pub struct RunRecord {
    /// Run id (caller-supplied or generated).
    pub run_id: String,
    /// Source document path.
    pub doc_path: String,
    /// Terminal notification endpoint, if any.
    pub callback_url: Option<String>,
    /// Current lifecycle status.
    pub status: RunStatus,
    /// Names of completed pipeline stages, in order.
    pub stages: Vec<String>,
    /// Serialized outcome for completed runs.
    pub result: Option<Value>,
    /// Terminal error message.
    pub error: Option<String>,
    /// Callback delivery error, independent of the run's own error.
    pub callback_error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl RunRecord {
    /// Fresh pending record.
    #[must_use]
    pub fn new(
        run_id: impl Into<String>,
        doc_path: impl Into<String>,
        callback_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.into(),
            doc_path: doc_path.into(),
            callback_url,
            status: RunStatus::Pending,
            stages: Vec::new(),
            result: None,
            error: None,
            callback_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump the update timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Serializable summary of the current run state.
    #[must_use]
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: self.run_id.clone(),
            doc_path: self.doc_path.clone(),
            status: self.status,
            stages: self.stages.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            callback_url: self.callback_url.clone(),
            callback_error: self.callback_error.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Serializable snapshot returned by the run query surface.
///
/// `result`, `error`, and the callback fields serialize as explicit nulls
/// so the wire shape is stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Run id.
    pub run_id: String,
    /// Source document path.
    pub doc_path: String,
    /// Lifecycle status.
    pub status: RunStatus,
    /// Completed stage names, in order.
    pub stages: Vec<String>,
    /// Serialized outcome, when completed.
    pub result: Option<Value>,
    /// Terminal error, when failed or cancelled.
    pub error: Option<String>,
    /// Terminal notification endpoint.
    pub callback_url: Option<String>,
    /// Callback delivery error, when delivery failed.
    pub callback_error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
