//! Shared helpers for runtime integration tests.
#![allow(dead_code)] // not every test binary uses every helper

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use scout_runtime::runs::{RunManager, RunSnapshot};
use scout_runtime::tools::{ToolAdapter, ToolError, ToolOutput, ToolRegistry};
use serde_json::{Value, json};

/// A three-requirement markdown document.
pub const SAMPLE_DOC: &str = "# Web user stories\n\
    - User must sign in with email: session persists\n\
    - Cart updates reflect instantly\n\
    - Checkout must confirm the order\n";

/// Write `contents` to a fresh temp markdown file.
pub fn write_doc(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Adapter that never finishes on its own; used to park a run inside the
/// dispatch stage until it is cancelled.
pub struct StuckAdapter {
    name: &'static str,
}

#[async_trait]
impl ToolAdapter for StuckAdapter {
    fn name(&self) -> &str {
        self.name
    }

    async fn execute(&self, _args: Value) -> Result<ToolOutput, ToolError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ToolOutput {
            data: [("value".to_string(), json!("late"))].into_iter().collect(),
            ..ToolOutput::default()
        })
    }
}

/// Registry whose every tool blocks forever.
pub fn stuck_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for name in [
        "playwright.navigate",
        "playwright.selector_probe",
        "appium.navigate",
        "appium.selector_probe",
        "filesystem.fetch_doc",
        "artifact_store.persist",
    ] {
        registry.register(Arc::new(StuckAdapter { name }));
    }
    registry
}

/// Poll `check` until the run reaches a terminal state.
pub async fn wait_terminal(manager: &Arc<RunManager>, run_id: &str) -> RunSnapshot {
    for _ in 0..600 {
        let snapshot = manager.check(run_id).unwrap();
        if snapshot.status.is_terminal() {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run {run_id} never reached a terminal state");
}

/// Poll until the mock server has received at least `count` requests.
/// Delivery is fire-and-forget relative to the terminal transition, so
/// tests must not assert on the mock immediately after `wait_terminal`.
pub async fn wait_for_request_count(server: &wiremock::MockServer, count: usize) {
    for _ in 0..600 {
        let received = server.received_requests().await.unwrap_or_default().len();
        if received >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("mock server never received {count} requests");
}

/// Poll until the run has recorded `stage` as completed.
pub async fn wait_for_stage(manager: &Arc<RunManager>, run_id: &str, stage: &str) {
    for _ in 0..600 {
        let snapshot = manager.check(run_id).unwrap();
        if snapshot.stages.iter().any(|s| s == stage) {
            return;
        }
        assert!(
            !snapshot.status.is_terminal(),
            "run {run_id} terminated ({}) before reaching {stage}",
            snapshot.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run {run_id} never reached stage {stage}");
}
