//! Plan validation errors.

use thiserror::Error;

/// Errors raised while validating a [`crate::plan::Plan`].
///
/// A plan that fails validation never leaves the planner; these errors
/// indicate a construction bug, not a runtime condition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A DAG edge references a sub-question id that does not exist.
    #[error("edge {from} -> {to} references an unknown sub-question")]
    UnknownEdgeEndpoint {
        /// Source node of the offending edge.
        from: String,
        /// Target node of the offending edge.
        to: String,
    },

    /// The dependency graph contains a cycle.
    #[error("sub-question graph contains a cycle")]
    Cycle,

    /// Fewer sub-questions than the configured minimum.
    #[error("plan has {found} sub-questions, minimum is {min}")]
    TooFewNodes {
        /// Number of sub-questions in the plan.
        found: usize,
        /// Configured minimum.
        min: usize,
    },

    /// Two plan variables declare the same name.
    #[error("variable '{0}' is declared more than once")]
    DuplicateVariable(String),

    /// A sub-question binds a variable with no declaring `PlanVariable`.
    #[error("sub-question {sub_question} references undeclared variable '{name}'")]
    UndeclaredVariable {
        /// Sub-question holding the dangling reference.
        sub_question: String,
        /// The undeclared variable name.
        name: String,
    },
}
