//! Dependency-ordered, concurrency-bounded tool dispatch.
//!
//! Executes every tool-spec exactly once, never starting a spec before all
//! of its dependencies have completed. Each round dispatches the entire
//! ready frontier with bounded worker concurrency, folds the results into
//! the completed set, and repeats. An empty frontier with specs outstanding
//! is a deadlock: a well-formed DAG can never produce it, so the dispatcher
//! fails fast instead of hanging.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{FutureExt, StreamExt};
use metrics::{counter, histogram};
use scout_core::plan::{Plan, PlanVariable, VariableStatus};
use scout_core::spec::ToolSpec;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::RuntimeError;
use crate::tools::{ToolData, ToolRegistry};

/// Default bounded worker width.
const DEFAULT_MAX_WORKERS: usize = 4;

/// Dependency-ordered dispatcher over a tool registry.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    max_workers: usize,
}

impl Dispatcher {
    /// Dispatcher with the default worker width.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self::with_workers(registry, DEFAULT_MAX_WORKERS)
    }

    /// Dispatcher with an explicit worker width (minimum 1).
    #[must_use]
    pub fn with_workers(registry: Arc<ToolRegistry>, max_workers: usize) -> Self {
        Self {
            registry,
            max_workers: max_workers.max(1),
        }
    }

    /// Execute all `specs`, respecting dependency order.
    ///
    /// Returns result data keyed by spec id. Cancellation is honored at
    /// every round boundary and while a round is in flight.
    pub async fn dispatch(
        &self,
        plan: &Plan,
        specs: &[ToolSpec],
        doc_path: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, ToolData>, RuntimeError> {
        let mut completed: HashSet<String> = HashSet::new();
        let mut results: HashMap<String, ToolData> = HashMap::new();

        while completed.len() < specs.len() {
            if cancel.is_cancelled() {
                return Err(RuntimeError::Cancelled);
            }

            let ready: Vec<&ToolSpec> = specs
                .iter()
                .filter(|spec| {
                    !completed.contains(&spec.id)
                        && spec.depends_on.iter().all(|dep| completed.contains(dep))
                })
                .collect();
            if ready.is_empty() {
                return Err(RuntimeError::DispatchDeadlock {
                    outstanding: specs.len() - completed.len(),
                });
            }

            counter!("scout_dispatch_rounds").increment(1);
            debug!(frontier = ready.len(), done = completed.len(), "dispatching round");

            let mut round_futures = Vec::with_capacity(ready.len());
            for spec in ready {
                round_futures.push(self.run_spec(plan, spec, doc_path).boxed());
            }
            let round = futures::stream::iter(round_futures)
                .buffer_unordered(self.max_workers)
                .collect::<Vec<Result<(String, ToolData), RuntimeError>>>();

            let round_results = tokio::select! {
                () = cancel.cancelled() => return Err(RuntimeError::Cancelled),
                round_results = round => round_results,
            };

            for result in round_results {
                let (spec_id, data) = result?;
                let _ = completed.insert(spec_id.clone());
                let _ = results.insert(spec_id, data);
            }
        }

        Ok(results)
    }

    /// Invoke one spec's adapter with its canned request payload.
    async fn run_spec(
        &self,
        plan: &Plan,
        spec: &ToolSpec,
        doc_path: Option<&str>,
    ) -> Result<(String, ToolData), RuntimeError> {
        let adapter = self
            .registry
            .get(&spec.tool)
            .ok_or_else(|| RuntimeError::UnknownTool(spec.tool.clone()))?;
        let payload = build_payload(plan, spec, doc_path);

        let started = Instant::now();
        let output = tokio::time::timeout(
            Duration::from_secs(spec.timeout_s),
            adapter.execute(payload),
        )
        .await
        .map_err(|_| RuntimeError::ToolTimeout {
            spec: spec.id.clone(),
            timeout_s: spec.timeout_s,
        })??;
        histogram!("scout_tool_execution_ms").record(started.elapsed().as_millis() as f64);

        Ok((spec.id.clone(), output.data))
    }
}

/// Build a request payload from the spec's input schema using static
/// per-tool value-selection rules.
fn build_payload(plan: &Plan, spec: &ToolSpec, doc_path: Option<&str>) -> Value {
    let mut payload = Map::new();
    let _ = payload.insert(
        "plan_context".to_string(),
        json!(plan.strategy.scope.first().cloned().unwrap_or_default()),
    );
    if spec.inputs.schema.contains_key("selector_hint") {
        let _ = payload.insert("selector_hint".to_string(), json!("button.primary"));
    }
    if spec.inputs.schema.contains_key("story_ids") {
        let _ = payload.insert("story_ids".to_string(), json!(["STORY-1", "STORY-2"]));
    }
    if spec.tool == "filesystem.fetch_doc" {
        if let Some(path) = doc_path {
            let _ = payload.insert("path".to_string(), json!(path));
        }
    }
    Value::Object(payload)
}

/// Whether a tool result value counts as empty for variable resolution.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Fold dispatch results into the variable catalog.
///
/// For each declared variable: no result for its source spec → `missing`;
/// an empty produced value → `invalid`; otherwise the value is copied and
/// the variable marked `resolved`. Variables without a source spec are
/// left untouched.
pub fn apply_variable_results(
    variables: &mut BTreeMap<String, PlanVariable>,
    results: &HashMap<String, ToolData>,
) {
    for variable in variables.values_mut() {
        let Some(source) = &variable.source_spec_id else {
            continue;
        };
        let Some(data) = results.get(source) else {
            variable.status = VariableStatus::Missing;
            continue;
        };
        let value = data.iter().next().map(|(_, value)| value);
        match value {
            Some(value) if !is_empty_value(value) => {
                variable.value = Some(match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                });
                variable.status = VariableStatus::Resolved;
            }
            _ => variable.status = VariableStatus::Invalid,
        }
    }
}
