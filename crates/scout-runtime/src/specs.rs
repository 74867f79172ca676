//! Tool-spec emission and the variable catalog.
//!
//! The emitter maps every sub-question to a tool invocation contract and
//! copies the sub-question's dependency edges through the deterministic
//! `TS-` id transform. The resulting tool-spec DAG has identical topology
//! to the sub-question DAG — the dispatcher relies on this.

use std::collections::BTreeMap;

use scout_core::plan::{Plan, PlanVariable};
use scout_core::spec::{QualityGate, ToolIo, ToolSpec, spec_id_for};

/// Default per-spec timeout in seconds.
const SPEC_TIMEOUT_S: u64 = 90;

/// Derives tool specs from a plan.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpecEmitter;

impl SpecEmitter {
    /// Emit one spec per sub-question, preserving DAG topology.
    #[must_use]
    pub fn emit(&self, plan: &Plan) -> Vec<ToolSpec> {
        plan.sub_questions
            .iter()
            .map(|sq| {
                let prompt = sq.prompt.to_lowercase();
                ToolSpec {
                    id: spec_id_for(&sq.id),
                    tool: determine_tool(&prompt).to_string(),
                    inputs: build_inputs(&sq.prompt, &prompt),
                    outputs: build_outputs(&sq.id, &prompt),
                    timeout_s: SPEC_TIMEOUT_S,
                    quality: vec![QualityGate {
                        name: "non_empty".to_string(),
                        condition: "output != ''".to_string(),
                        on_failure: "retry".to_string(),
                    }],
                    cost_bound: None,
                    depends_on: sq.depends_on.iter().map(|dep| spec_id_for(dep)).collect(),
                }
            })
            .collect()
    }
}

/// Keyword-priority tool selection.
fn determine_tool(prompt: &str) -> &'static str {
    if prompt.contains("mobile") {
        "appium.selector_probe"
    } else if prompt.contains("api") || prompt.contains("manual") {
        "filesystem.fetch_doc"
    } else if prompt.contains("automation") {
        "playwright.selector_probe"
    } else {
        "playwright.navigate"
    }
}

fn build_inputs(description: &str, prompt: &str) -> ToolIo {
    let mut schema = BTreeMap::new();
    let _ = schema.insert("plan_context".to_string(), "string".to_string());
    if prompt.contains("selector") {
        let _ = schema.insert("selector_hint".to_string(), "string".to_string());
    }
    if prompt.contains("api") {
        let _ = schema.insert("story_ids".to_string(), "list[str]".to_string());
    }
    ToolIo {
        description: description.to_string(),
        schema,
    }
}

fn build_outputs(sq_id: &str, prompt: &str) -> ToolIo {
    let mut schema = BTreeMap::new();
    if prompt.contains("selectors") {
        let _ = schema.insert("selectors".to_string(), "list[str]".to_string());
    } else if prompt.contains("automation") {
        let _ = schema.insert("graph".to_string(), "json".to_string());
    } else if prompt.contains("data") {
        let _ = schema.insert("matrix".to_string(), "json".to_string());
    } else {
        let _ = schema.insert("value".to_string(), "string".to_string());
    }
    ToolIo {
        description: format!("Outputs for {sq_id}"),
        schema,
    }
}

/// Binds declared variables to the specs expected to resolve them.
#[derive(Debug, Default, Clone, Copy)]
pub struct VariableCatalog;

impl VariableCatalog {
    /// Build the catalog: first matching spec wins; variables with no
    /// matching spec get a `manual_review` fallback instead of a source.
    #[must_use]
    pub fn build(&self, plan: &Plan, specs: &[ToolSpec]) -> BTreeMap<String, PlanVariable> {
        let mut catalog: BTreeMap<String, PlanVariable> = BTreeMap::new();
        let declarations: BTreeMap<&str, &PlanVariable> = plan
            .variables
            .iter()
            .map(|var| (var.name.as_str(), var))
            .collect();

        for sq in &plan.sub_questions {
            let spec_id = spec_id_for(&sq.id);
            let matching_spec = specs.iter().find(|spec| spec.id == spec_id);
            for name in &sq.variable_refs {
                let Some(declaration) = declarations.get(name.as_str()) else {
                    continue;
                };
                let entry = catalog
                    .entry(name.clone())
                    .or_insert_with(|| (*declaration).clone());
                if entry.source_spec_id.is_some() {
                    continue;
                }
                if let Some(spec) = matching_spec {
                    entry.source_spec_id = Some(spec.id.clone());
                    let _ = entry
                        .validation
                        .entry("type".to_string())
                        .or_insert_with(|| format!("{:?}", spec.outputs.schema));
                } else {
                    entry.fallback = Some("manual_review".to_string());
                }
            }
        }

        for var in &plan.variables {
            let _ = catalog
                .entry(var.name.clone())
                .or_insert_with(|| var.clone());
        }
        catalog
    }
}
