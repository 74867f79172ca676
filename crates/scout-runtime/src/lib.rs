//! # scout-runtime
//!
//! The run-orchestration core: a fixed-order stage pipeline that turns a
//! source document into a test-artifact outcome, wrapped in an asynchronous
//! run-lifecycle manager.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `callbacks` | Stage names and the sequential async observer bus |
//! | `ingest` | Document loading, requirement extraction, traceability seed |
//! | `planner` | Sub-question DAG construction with variable declarations |
//! | `specs` | Tool-spec emission and the variable catalog |
//! | `tools` | Tool adapter trait, registry, and built-in probe adapters |
//! | `dispatch` | Dependency-ordered, concurrency-bounded tool dispatch |
//! | `synthesis` | Manual tests, automation specs, traceability linking |
//! | `report` | Suite execution, run report, locator drift, metrics |
//! | `state` | The accumulating pipeline state and per-stage updates |
//! | `pipeline` | The fixed-order macro-stage driver |
//! | `store` | Outcome and learning store traits + memory/JSON impls |
//! | `webhook` | Fire-and-forget terminal callback delivery |
//! | `runs` | Per-run state machine, background execution, cancellation |
//!
//! ## Data Flow
//!
//! `runs::RunManager` → background task → `pipeline::Pipeline` →
//! (`planner` → `specs` → `dispatch` → `synthesis` → `report`) →
//! `OrchestratorOutcome`, with every stage observed through
//! `callbacks::CallbackBus` and terminal status pushed via `webhook`.

#![deny(unsafe_code)]

pub mod callbacks;
pub mod dispatch;
pub mod errors;
pub mod ingest;
pub mod pipeline;
pub mod planner;
pub mod report;
pub mod runs;
pub mod specs;
pub mod state;
pub mod store;
pub mod synthesis;
pub mod tools;
pub mod webhook;

pub use errors::RuntimeError;
