//! Artifact synthesis — manual tests, automation specs, the test plan.

use std::collections::BTreeMap;

use scout_core::artifact::{
    ArtifactBundle, AutomationSpec, ManualTest, ManualTestStep, Operation, OperationKind,
    TestPlanArtifact,
};
use scout_core::document::{Requirement, TraceabilityIndex};
use scout_core::plan::{Plan, PlanVariable};

/// Selector used when probing resolved nothing better.
const FALLBACK_SELECTOR: &str = "button.primary";

fn resolved_value<'a>(
    variables: &'a BTreeMap<String, PlanVariable>,
    name: &str,
) -> Option<&'a str> {
    variables.get(name).and_then(|var| var.value.as_deref())
}

fn build_manual_tests(requirements: &[Requirement]) -> Vec<ManualTest> {
    requirements
        .iter()
        .enumerate()
        .map(|(idx, requirement)| ManualTest {
            id: format!("MT-{}", idx + 1),
            title: format!("Manual validation for {}", requirement.id),
            requirement_ids: vec![requirement.id.clone()],
            steps: vec![
                ManualTestStep {
                    action: "Prepare environment".to_string(),
                    expected: "Environment ready".to_string(),
                },
                ManualTestStep {
                    action: format!("Validate requirement: {}", requirement.text),
                    expected: "Matches acceptance".to_string(),
                },
            ],
            data_matrix: [(
                "users".to_string(),
                vec!["standard".to_string(), "admin".to_string()],
            )]
            .into_iter()
            .collect(),
        })
        .collect()
}

fn build_automation_specs(
    requirements: &[Requirement],
    variables: &BTreeMap<String, PlanVariable>,
) -> Vec<AutomationSpec> {
    let selector = resolved_value(variables, "V.dom_selectors").unwrap_or(FALLBACK_SELECTOR);
    let navigation = resolved_value(variables, "V.navigation_path").unwrap_or("home");

    requirements
        .iter()
        .enumerate()
        .map(|(idx, requirement)| AutomationSpec {
            id: format!("AT-{}", idx + 1),
            title: format!("Automation for {}", requirement.id),
            requirement_ids: vec![requirement.id.clone()],
            ops: vec![
                Operation {
                    kind: OperationKind::Navigate,
                    selector: None,
                    assertion: None,
                    data_binding: Some("navigation".to_string()),
                },
                Operation {
                    kind: OperationKind::Click,
                    selector: Some(selector.to_string()),
                    assertion: None,
                    data_binding: Some("action".to_string()),
                },
                Operation {
                    kind: OperationKind::Assert,
                    selector: None,
                    assertion: Some(format!("{} satisfied", requirement.text)),
                    data_binding: None,
                },
            ],
            selectors: [("primary".to_string(), selector.to_string())]
                .into_iter()
                .collect(),
            data_bindings: [("navigation".to_string(), navigation.to_string())]
                .into_iter()
                .collect(),
        })
        .collect()
}

fn select_environment_profile(variables: &BTreeMap<String, PlanVariable>) -> String {
    if variables.keys().any(|name| name.contains("mobile")) {
        "mobile-emu".to_string()
    } else {
        "web-local".to_string()
    }
}

/// Build the artifact bundle from the plan, requirements, and resolved
/// variables.
#[must_use]
pub fn synthesize_artifacts(
    plan: &Plan,
    requirements: &[Requirement],
    variables: &BTreeMap<String, PlanVariable>,
) -> ArtifactBundle {
    let data_matrix = [(
        "dataset".to_string(),
        vec![
            resolved_value(variables, "V.data_matrix")
                .unwrap_or("baseline")
                .to_string(),
        ],
    )]
    .into_iter()
    .collect();

    ArtifactBundle {
        test_plan: TestPlanArtifact {
            scope: plan.strategy.scope.clone(),
            priorities: plan.strategy.priorities.clone(),
            data_matrix,
            environment_profile: select_environment_profile(variables),
        },
        manual_tests: build_manual_tests(requirements),
        automation_specs: build_automation_specs(requirements, variables),
        runbook: "1. Provision environment.\n2. Run orchestrator.\n3. Review evidence bundle."
            .to_string(),
    }
}

/// Record every synthesized test against the requirements it validates.
pub fn link_traceability(index: &mut TraceabilityIndex, artifacts: &ArtifactBundle) {
    for manual in &artifacts.manual_tests {
        for req_id in &manual.requirement_ids {
            index.link(req_id, &manual.id);
        }
    }
    for auto in &artifacts.automation_specs {
        for req_id in &auto.requirement_ids {
            index.link(req_id, &auto.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::Planner;
    use scout_core::plan::VariableStatus;

    fn requirements() -> Vec<Requirement> {
        (1..=3)
            .map(|i| Requirement {
                id: format!("REQ-{i}"),
                text: format!("requirement {i}"),
                priority: "medium".to_string(),
                tags: vec![],
                acceptance: vec![],
            })
            .collect()
    }

    fn variables_with(name: &str, value: &str) -> BTreeMap<String, PlanVariable> {
        let mut var = PlanVariable::declare(name, "test");
        var.value = Some(value.to_string());
        var.status = VariableStatus::Resolved;
        [(name.to_string(), var)].into_iter().collect()
    }

    #[test]
    fn one_manual_and_one_automation_test_per_requirement() {
        let plan = Planner::default().build_plan(&[]).unwrap();
        let bundle = synthesize_artifacts(&plan, &requirements(), &BTreeMap::new());
        assert_eq!(bundle.manual_tests.len(), 3);
        assert_eq!(bundle.automation_specs.len(), 3);
        assert_eq!(bundle.automation_specs[0].ops.len(), 3);
    }

    #[test]
    fn resolved_selector_feeds_the_click_operation() {
        let plan = Planner::default().build_plan(&[]).unwrap();
        let variables = variables_with("V.dom_selectors", "button[data-qa='go']");
        let bundle = synthesize_artifacts(&plan, &requirements(), &variables);
        assert_eq!(
            bundle.automation_specs[0].ops[1].selector.as_deref(),
            Some("button[data-qa='go']")
        );
    }

    #[test]
    fn unresolved_selector_falls_back() {
        let plan = Planner::default().build_plan(&[]).unwrap();
        let bundle = synthesize_artifacts(&plan, &requirements(), &BTreeMap::new());
        assert_eq!(
            bundle.automation_specs[0].selectors["primary"],
            FALLBACK_SELECTOR
        );
    }

    #[test]
    fn mobile_variables_select_the_mobile_profile() {
        let plan = Planner::default().build_plan(&[]).unwrap();
        let variables = variables_with("V.mobile_screens", "home,login");
        let bundle = synthesize_artifacts(&plan, &requirements(), &variables);
        assert_eq!(bundle.test_plan.environment_profile, "mobile-emu");

        let bundle = synthesize_artifacts(&plan, &requirements(), &BTreeMap::new());
        assert_eq!(bundle.test_plan.environment_profile, "web-local");
    }

    #[test]
    fn linking_covers_every_requirement() {
        let plan = Planner::default().build_plan(&[]).unwrap();
        let reqs = requirements();
        let bundle = synthesize_artifacts(&plan, &reqs, &BTreeMap::new());
        let mut index = TraceabilityIndex::seed(&reqs);
        link_traceability(&mut index, &bundle);
        assert_eq!(index.coverage_ratio(reqs.len()), 1.0);
        assert_eq!(index.entries[0].candidate_tests, vec!["MT-1", "AT-1"]);
    }
}
