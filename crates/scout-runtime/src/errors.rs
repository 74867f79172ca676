//! Runtime error taxonomy.
//!
//! Stage and dispatch errors propagate up through the background task to the
//! run lifecycle manager, which is the single point converting them into a
//! terminal `failed` state. Nothing below the manager swallows errors
//! silently except webhook delivery (isolated into `callback_error`).

use scout_core::errors::PlanError;
use thiserror::Error;

use crate::store::StoreError;
use crate::tools::ToolError;

/// Errors surfaced by the orchestration core.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A stage precondition is absent from the accumulated state.
    #[error("missing required input: {0}")]
    MissingInput(&'static str),

    /// The source document could not be read.
    #[error("failed to read document: {0}")]
    DocRead(#[from] std::io::Error),

    /// `start` was called with the id of a non-terminal run.
    #[error("run '{0}' is already active")]
    RunConflict(String),

    /// `check`/`cancel` was called with an unknown run id.
    #[error("run '{0}' not found")]
    RunNotFound(String),

    /// The ready frontier is empty while specs remain outstanding.
    ///
    /// A well-formed DAG can never produce this; it indicates acyclicity
    /// was violated upstream.
    #[error("deadlock in tool execution graph: {outstanding} specs cannot start")]
    DispatchDeadlock {
        /// Specs that can never become ready.
        outstanding: usize,
    },

    /// A tool invocation exceeded its spec's timeout.
    #[error("tool spec {spec} timed out after {timeout_s}s")]
    ToolTimeout {
        /// The spec that timed out.
        spec: String,
        /// The configured timeout.
        timeout_s: u64,
    },

    /// No adapter is registered for the spec's target tool.
    #[error("no adapter registered for tool '{0}'")]
    UnknownTool(String),

    /// A tool adapter failed; fails the dispatch round.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// The planner produced an invalid plan.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Outcome persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The run was cooperatively cancelled. Not a failure; recognized as a
    /// distinct terminal outcome by the lifecycle manager.
    #[error("run cancelled")]
    Cancelled,
}

impl RuntimeError {
    /// Whether this error represents cooperative cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
