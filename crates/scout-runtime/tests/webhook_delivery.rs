//! Terminal callback delivery against a mock endpoint.

mod support;

use std::sync::Arc;

use scout_runtime::pipeline::PipelineConfig;
use scout_runtime::runs::{RunManager, RunStatus};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{SAMPLE_DOC, wait_for_request_count, wait_terminal, write_doc};

fn manager() -> Arc<RunManager> {
    Arc::new(RunManager::with_defaults(PipelineConfig {
        suite_seed: Some(5),
        ..PipelineConfig::default()
    }))
}

#[tokio::test]
async fn completed_run_posts_its_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(serde_json::json!({
            "run_id": "run-w",
            "status": "completed",
            "error": null,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let doc = write_doc(SAMPLE_DOC);
    let manager = manager();
    let _ = manager
        .start(
            doc.path().to_str().unwrap(),
            Some("run-w".into()),
            Some(format!("{}/hook", server.uri())),
        )
        .unwrap();

    let terminal = wait_terminal(&manager, "run-w").await;
    assert_eq!(terminal.status, RunStatus::Completed);

    wait_for_request_count(&server, 1).await;
    server.verify().await;
    assert!(manager.check("run-w").unwrap().callback_error.is_none());
}

#[tokio::test]
async fn failed_run_posts_status_and_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(serde_json::json!({
            "run_id": "run-x",
            "status": "failed",
            "result": null,
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let manager = manager();
    let _ = manager
        .start(
            "/nonexistent/never.md",
            Some("run-x".into()),
            Some(format!("{}/hook", server.uri())),
        )
        .unwrap();

    let terminal = wait_terminal(&manager, "run-x").await;
    assert_eq!(terminal.status, RunStatus::Failed);
    assert!(terminal.error.is_some());
    wait_for_request_count(&server, 1).await;
    server.verify().await;
}

#[tokio::test]
async fn delivery_failure_is_isolated_from_run_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let doc = write_doc(SAMPLE_DOC);
    let manager = manager();
    let _ = manager
        .start(
            doc.path().to_str().unwrap(),
            Some("run-y".into()),
            Some(format!("{}/hook", server.uri())),
        )
        .unwrap();

    let terminal = wait_terminal(&manager, "run-y").await;
    assert_eq!(terminal.status, RunStatus::Completed);
    wait_for_request_count(&server, 1).await;

    // The run stays completed; only callback_error records the failure.
    let mut snapshot = manager.check("run-y").unwrap();
    for _ in 0..100 {
        if snapshot.callback_error.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        snapshot = manager.check("run-y").unwrap();
    }
    assert!(
        snapshot
            .callback_error
            .as_deref()
            .is_some_and(|err| err.contains("500")),
        "callback_error: {:?}",
        snapshot.callback_error
    );
    assert_eq!(snapshot.status, RunStatus::Completed);
}

#[tokio::test]
async fn runs_without_a_callback_url_post_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let doc = write_doc(SAMPLE_DOC);
    let manager = manager();
    let _ = manager
        .start(doc.path().to_str().unwrap(), Some("run-z".into()), None)
        .unwrap();

    let terminal = wait_terminal(&manager, "run-z").await;
    assert_eq!(terminal.status, RunStatus::Completed);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    server.verify().await;
}
