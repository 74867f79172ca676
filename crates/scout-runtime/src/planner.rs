//! Planner — builds the sub-question DAG with variable declarations.
//!
//! The scaffold is deterministic template expansion: a web branch
//! (navigation → selectors → stability), a mobile branch (screens →
//! accessibility ids), and fan-in nodes combining both, padded with
//! synthetic leaves until the configured minimum node count is reached.
//! Edges only ever point from earlier-declared nodes to later ones, so the
//! graph is acyclic by construction; `Plan::validate` asserts it anyway.

use scout_core::errors::PlanError;
use scout_core::plan::{Plan, PlanVariable, Strategy, SubQuestion};

/// Planner tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct PlannerConfig {
    /// Minimum number of sub-questions a plan must carry.
    pub min_sub_questions: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_sub_questions: 8,
        }
    }
}

/// Deterministic plan builder.
#[derive(Debug, Default, Clone, Copy)]
pub struct Planner {
    config: PlannerConfig,
}

/// Accumulates nodes, declarations, and edges while the scaffold unfolds.
#[derive(Default)]
struct PlanDraft {
    sub_questions: Vec<SubQuestion>,
    variables: Vec<PlanVariable>,
    dag_edges: Vec<(String, String)>,
}

impl PlanDraft {
    fn add(&mut self, prompt: &str, variable: &str, depends_on: &[&str]) {
        let id = format!("S{}", self.sub_questions.len() + 1);
        self.sub_questions.push(SubQuestion {
            id: id.clone(),
            prompt: prompt.to_string(),
            depends_on: depends_on.iter().map(ToString::to_string).collect(),
            variable_refs: vec![variable.to_string()],
        });
        let mut declaration = PlanVariable::declare(variable, prompt);
        let _ = declaration
            .validation
            .insert("non_empty".to_string(), "value must not be blank".to_string());
        self.variables.push(declaration);
        for dep in depends_on {
            self.dag_edges.push(((*dep).to_string(), id.clone()));
        }
    }
}

impl Planner {
    /// Create a planner with the given config.
    #[must_use]
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Build and validate a plan.
    ///
    /// `requirements` is only a sizing hint; the scaffold itself is fixed.
    pub fn build_plan(&self, requirements: &[String]) -> Result<Plan, PlanError> {
        let _ = requirements;
        let strategy = Strategy {
            scope: vec![
                "Web UI flows".to_string(),
                "Mobile journey parity".to_string(),
                "API validation".to_string(),
            ],
            risks: vec![
                "Selector instability".to_string(),
                "Mobile navigation latency".to_string(),
                "Out-of-date documentation".to_string(),
            ],
            priorities: vec![
                "Critical user journeys".to_string(),
                "Happy path automation".to_string(),
                "Coverage of high priority requirements".to_string(),
            ],
        };

        let mut draft = PlanDraft::default();
        draft.add(
            "Identify canonical navigation path for primary story",
            "V.navigation_path",
            &[],
        );
        draft.add(
            "Collect DOM selectors for primary journey",
            "V.dom_selectors",
            &["S1"],
        );
        draft.add(
            "Validate selector stability under reload",
            "V.selector_stability",
            &["S2"],
        );
        draft.add("Map API endpoints to user stories", "V.api_story_map", &[]);
        draft.add("Extract mobile screen identifiers", "V.mobile_screens", &[]);
        draft.add(
            "Verify Appium accessibility identifiers",
            "V.mobile_accessibility",
            &["S5"],
        );
        draft.add("Assemble manual test flow", "V.manual_flow", &["S1", "S5"]);
        draft.add(
            "Construct automation spec graph",
            "V.automation_graph",
            &["S2", "S6"],
        );
        draft.add("Derive test data matrix", "V.data_matrix", &["S7"]);
        draft.add(
            "Prioritize execution order",
            "V.execution_priority",
            &["S1", "S5"],
        );

        while draft.sub_questions.len() < self.config.min_sub_questions {
            let idx = draft.sub_questions.len() + 1;
            draft.add(
                &format!("Investigate additional validation path {idx}"),
                &format!("V.extra_{idx}"),
                &[],
            );
        }

        let plan = Plan {
            strategy,
            sub_questions: draft.sub_questions,
            variables: draft.variables,
            dag_edges: draft.dag_edges,
        };
        plan.validate(self.config.min_sub_questions)?;
        Ok(plan)
    }
}
