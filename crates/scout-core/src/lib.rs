//! # scout-core
//!
//! Foundation value types for the Scout test orchestrator.
//!
//! This crate provides the shared vocabulary that the runtime crate builds on:
//!
//! - **Documents**: [`document::DocPack`], [`document::Requirement`], and the
//!   [`document::TraceabilityIndex`] linking requirements to candidate tests
//! - **Plans**: [`plan::Plan`] with its sub-question DAG and declared
//!   [`plan::PlanVariable`]s, validated for acyclicity at construction
//! - **Tool specs**: [`spec::ToolSpec`] contracts derived 1:1 from
//!   sub-questions, with typed I/O schemas and quality gates
//! - **Artifacts**: [`artifact::ArtifactBundle`] — manual tests, automation
//!   specs, and the test plan
//! - **Evidence**: [`evidence::ExecutionResult`], [`evidence::HealProposal`],
//!   [`evidence::RunReport`], [`evidence::RunMetrics`]
//! - **Outcome**: [`outcome::OrchestratorOutcome`], the terminal aggregate of
//!   one orchestration run
//!
//! All types here are plain values: immutable after construction apart from
//! the explicitly mutable resolution fields on [`plan::PlanVariable`] and the
//! candidate-test lists on the traceability index. Behavior beyond derived
//! computations (coverage ratio, best heal candidate) lives in the runtime.
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by `scout-runtime` and the `scout` binary.

#![deny(unsafe_code)]

pub mod artifact;
pub mod document;
pub mod errors;
pub mod evidence;
pub mod outcome;
pub mod plan;
pub mod spec;
