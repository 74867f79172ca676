//! Built-in probe adapters.
//!
//! These stand in for real Playwright/Appium transports: they answer with
//! plausible canned data so the pipeline can be exercised end to end
//! without a browser or device farm attached. Selector probes shuffle
//! their variants to mimic non-deterministic probe ordering.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde_json::{Value, json};

use super::{ToolAdapter, ToolError, ToolOutput};

fn arg_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn output(data: impl IntoIterator<Item = (String, Value)>, logs: impl Into<String>) -> ToolOutput {
    ToolOutput {
        data: data.into_iter().collect(),
        logs: logs.into(),
        screenshot: None,
        video: None,
    }
}

/// Web navigation probe.
pub struct PlaywrightNavigate;

#[async_trait]
impl ToolAdapter for PlaywrightNavigate {
    fn name(&self) -> &str {
        "playwright.navigate"
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let url = arg_str(&args, "url").unwrap_or("http://example.com");
        let wait_for = arg_str(&args, "wait_for").unwrap_or("#root");
        let mut out = output(
            [("value".to_string(), json!(format!("path:{url}->{wait_for}")))],
            format!("Navigated to {url} and waited for {wait_for}"),
        );
        out.screenshot = Some("screens/nav.png".to_string());
        Ok(out)
    }
}

/// Web selector stability probe.
pub struct PlaywrightSelectorProbe;

#[async_trait]
impl ToolAdapter for PlaywrightSelectorProbe {
    fn name(&self) -> &str {
        "playwright.selector_probe"
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let base = arg_str(&args, "selector_hint").unwrap_or("button.primary");
        let mut variants = vec![
            base.to_string(),
            format!("{base} >> text='Submit'"),
            format!("{base}[data-qa='submit']"),
        ];
        variants.shuffle(&mut rand::rng());
        let mut out = output(
            [("selectors".to_string(), json!(variants))],
            format!("Probed selector variants for {base}"),
        );
        out.screenshot = Some("screens/selector.png".to_string());
        Ok(out)
    }
}

/// Mobile screen navigation probe.
pub struct AppiumNavigate;

#[async_trait]
impl ToolAdapter for AppiumNavigate {
    fn name(&self) -> &str {
        "appium.navigate"
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let screen = arg_str(&args, "screen").unwrap_or("home");
        let mut out = output(
            [("value".to_string(), json!(format!("screen:{screen}")))],
            format!("Navigated to mobile screen {screen}"),
        );
        out.video = Some("videos/navigate.mp4".to_string());
        Ok(out)
    }
}

/// Mobile accessibility-id probe.
pub struct AppiumSelectorProbe;

#[async_trait]
impl ToolAdapter for AppiumSelectorProbe {
    fn name(&self) -> &str {
        "appium.selector_probe"
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let hint = arg_str(&args, "selector_hint").unwrap_or("~loginButton");
        let mut variants = vec![
            hint.to_string(),
            format!("accessibility_id={hint}"),
            format!("xpath=//button[@name='{hint}']"),
        ];
        variants.shuffle(&mut rand::rng());
        let mut out = output(
            [("selectors".to_string(), json!(variants))],
            format!("Generated Appium selector variants for {hint}"),
        );
        out.screenshot = Some("screens/mobile.png".to_string());
        Ok(out)
    }
}

/// Reads a document from disk.
pub struct FilesystemFetchDoc;

#[async_trait]
impl ToolAdapter for FilesystemFetchDoc {
    fn name(&self) -> &str {
        "filesystem.fetch_doc"
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let path = arg_str(&args, "path").ok_or(ToolError::MissingArgument("path"))?;
        let text = tokio::fs::read_to_string(path).await?;
        Ok(output(
            [("value".to_string(), json!(text))],
            format!("Loaded document {path}"),
        ))
    }
}

/// Persists an artifact and answers with its URI.
pub struct ArtifactStorePersist;

#[async_trait]
impl ToolAdapter for ArtifactStorePersist {
    fn name(&self) -> &str {
        "artifact_store.persist"
    }

    async fn execute(&self, _args: Value) -> Result<ToolOutput, ToolError> {
        Ok(output(
            [("uri".to_string(), json!("artifacts/run.json"))],
            "Persisted artifact",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn selector_probe_answers_three_variants() {
        let out = PlaywrightSelectorProbe
            .execute(json!({"selector_hint": "button.primary"}))
            .await
            .unwrap();
        let variants = out.data["selectors"].as_array().unwrap();
        assert_eq!(variants.len(), 3);
        assert!(
            variants
                .iter()
                .any(|v| v.as_str().unwrap() == "button.primary")
        );
    }

    #[tokio::test]
    async fn fetch_doc_requires_a_path() {
        let err = FilesystemFetchDoc.execute(json!({})).await.unwrap_err();
        assert_matches!(err, ToolError::MissingArgument("path"));
    }

    #[tokio::test]
    async fn fetch_doc_reads_the_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "# Doc\n- req").unwrap();
        let out = FilesystemFetchDoc
            .execute(json!({"path": file.path().to_str().unwrap()}))
            .await
            .unwrap();
        assert_eq!(out.data["value"], json!("# Doc\n- req"));
    }
}
