//! Run lifecycle integration tests — start/check/cancel/shutdown semantics.

mod support;

use std::sync::Arc;

use assert_matches::assert_matches;
use scout_runtime::RuntimeError;
use scout_runtime::pipeline::PipelineConfig;
use scout_runtime::runs::{RunManager, RunStatus};
use scout_runtime::store::{MemoryLearningStore, MemoryOutcomeStore};

use support::{SAMPLE_DOC, stuck_registry, wait_for_stage, wait_terminal, write_doc};

fn default_manager() -> Arc<RunManager> {
    Arc::new(RunManager::with_defaults(PipelineConfig {
        suite_seed: Some(3),
        ..PipelineConfig::default()
    }))
}

/// Manager whose dispatch stage parks forever (until cancelled).
fn stuck_manager() -> Arc<RunManager> {
    Arc::new(RunManager::new(
        PipelineConfig::default(),
        Arc::new(stuck_registry()),
        Arc::new(MemoryOutcomeStore::new()),
        Arc::new(MemoryLearningStore::new()),
    ))
}

#[tokio::test]
async fn start_returns_pending_then_reaches_completed() {
    let doc = write_doc(SAMPLE_DOC);
    let manager = default_manager();

    let snapshot = manager
        .start(doc.path().to_str().unwrap(), Some("run-1".into()), None)
        .unwrap();
    assert_eq!(snapshot.status, RunStatus::Pending);
    assert!(snapshot.stages.is_empty());
    assert!(snapshot.result.is_none());

    let terminal = wait_terminal(&manager, "run-1").await;
    assert_eq!(terminal.status, RunStatus::Completed);
    assert!(terminal.error.is_none());
    assert!(terminal.result.is_some());

    // Stage callbacks arrive strictly in pipeline order.
    let expected = [
        "ingest_docs",
        "planner",
        "emit_tool_specs",
        "dispatch_tools",
        "substitute_vars",
        "synthesize_artifacts",
        "worker_execute_suite",
        "collect_evidence",
        "resolver",
        "postmortem_and_heal",
        "completed",
    ];
    assert_eq!(terminal.stages, expected);
    assert!(terminal.updated_at >= terminal.created_at);
}

#[tokio::test]
async fn unknown_ids_raise_not_found() {
    let manager = default_manager();
    assert_matches!(manager.check("ghost"), Err(RuntimeError::RunNotFound(_)));
    assert_matches!(manager.cancel("ghost"), Err(RuntimeError::RunNotFound(_)));
}

#[tokio::test]
async fn colliding_active_id_raises_conflict_and_terminal_id_is_reusable() {
    let doc = write_doc(SAMPLE_DOC);
    let manager = stuck_manager();
    let path = doc.path().to_str().unwrap().to_string();

    let _ = manager.start(&path, Some("dup".into()), None).unwrap();
    let err = manager.start(&path, Some("dup".into()), None).unwrap_err();
    assert_matches!(err, RuntimeError::RunConflict(id) if id == "dup");

    // After the first run terminates its id becomes available again.
    let _ = manager.cancel("dup").unwrap();
    let terminal = wait_terminal(&manager, "dup").await;
    assert_eq!(terminal.status, RunStatus::Cancelled);

    let reused = manager.start(&path, Some("dup".into()), None).unwrap();
    assert_eq!(reused.status, RunStatus::Pending);
    assert!(reused.stages.is_empty());

    manager.shutdown().await;
}

#[tokio::test]
async fn cancel_mid_dispatch_keeps_only_earlier_stages() {
    let doc = write_doc(SAMPLE_DOC);
    let manager = stuck_manager();

    let _ = manager
        .start(doc.path().to_str().unwrap(), Some("run-c".into()), None)
        .unwrap();

    // The dispatch stage parks on the stuck adapters; stages up to
    // emit_tool_specs complete, nothing later can.
    wait_for_stage(&manager, "run-c", "emit_tool_specs").await;
    let cancelled = manager.cancel("run-c").unwrap();
    assert_eq!(cancelled.status, RunStatus::Cancelled);
    assert_eq!(cancelled.error.as_deref(), Some("run cancelled"));

    let terminal = wait_terminal(&manager, "run-c").await;
    assert_eq!(terminal.status, RunStatus::Cancelled);
    assert_eq!(
        terminal.stages,
        ["ingest_docs", "planner", "emit_tool_specs"]
    );

    manager.shutdown().await;
}

#[tokio::test]
async fn cancel_is_idempotent_on_terminal_runs() {
    let doc = write_doc(SAMPLE_DOC);
    let manager = stuck_manager();

    let _ = manager
        .start(doc.path().to_str().unwrap(), Some("run-i".into()), None)
        .unwrap();

    // Park the run inside dispatch so no further stages can land, then
    // cancel twice: the second call must be a no-op on the same record.
    wait_for_stage(&manager, "run-i", "emit_tool_specs").await;
    let first = manager.cancel("run-i").unwrap();
    let terminal = wait_terminal(&manager, "run-i").await;

    let second = manager.cancel("run-i").unwrap();
    assert_eq!(second.status, RunStatus::Cancelled);
    assert_eq!(second.error, first.error);
    assert_eq!(second.stages, terminal.stages);

    manager.shutdown().await;
}

#[tokio::test]
async fn failed_ingest_surfaces_as_failed_run() {
    let manager = default_manager();
    let _ = manager
        .start("/nonexistent/never.md", Some("run-f".into()), None)
        .unwrap();

    let terminal = wait_terminal(&manager, "run-f").await;
    assert_eq!(terminal.status, RunStatus::Failed);
    let error = terminal.error.unwrap();
    assert!(error.contains("failed to read document"), "error: {error}");
}

#[tokio::test]
async fn shutdown_drains_every_non_terminal_run() {
    let doc = write_doc(SAMPLE_DOC);
    let manager = stuck_manager();
    let path = doc.path().to_str().unwrap().to_string();

    for i in 0..3 {
        let _ = manager.start(&path, Some(format!("run-{i}")), None).unwrap();
    }
    manager.shutdown().await;

    for i in 0..3 {
        let snapshot = manager.check(&format!("run-{i}")).unwrap();
        assert!(
            snapshot.status.is_terminal(),
            "run-{i} still {}",
            snapshot.status
        );
    }
}

#[tokio::test]
async fn generated_run_ids_are_unique() {
    let doc = write_doc(SAMPLE_DOC);
    let manager = default_manager();
    let path = doc.path().to_str().unwrap().to_string();

    let a = manager.start(&path, None, None).unwrap();
    let b = manager.start(&path, None, None).unwrap();
    assert_ne!(a.run_id, b.run_id);

    manager.shutdown().await;
}
