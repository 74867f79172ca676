//! Planning model — strategy, sub-question DAG, declared variables.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::errors::PlanError;

/// High-level test strategy attached to a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    /// What the plan covers.
    pub scope: Vec<String>,
    /// Known risks driving prioritization.
    pub risks: Vec<String>,
    /// Ordered priorities.
    pub priorities: Vec<String>,
}

/// One planning DAG node: a unit of investigation with declared dependencies
/// and the variables it populates. Created once during planning, immutable
/// thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestion {
    /// Node id (`S1`, `S2`, …).
    pub id: String,
    /// Natural-language prompt describing the investigation.
    pub prompt: String,
    /// Ids of sub-questions that must resolve first.
    pub depends_on: Vec<String>,
    /// Names of variables this node populates.
    pub variable_refs: Vec<String>,
}

/// Resolution state of a plan variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableStatus {
    /// Declared but not yet dispatched.
    #[default]
    Pending,
    /// Source spec produced a non-empty value.
    Resolved,
    /// No result exists for the source spec.
    Missing,
    /// The source spec produced an empty value.
    Invalid,
}

impl VariableStatus {
    /// Stable string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Missing => "missing",
            Self::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for VariableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named value produced by the plan.
///
/// Declared during planning; the resolution fields (`value`, `status`,
/// `evidence`) are written exactly once per dispatch cycle when the source
/// tool-spec result lands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanVariable {
    /// Unique variable name (`V.…`).
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub var_type: String,
    /// Human description (the declaring prompt).
    pub description: String,
    /// Tool-spec expected to resolve this variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_spec_id: Option<String>,
    /// Validation rules (rule name → description).
    pub validation: BTreeMap<String, String>,
    /// Resolved value, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Evidence reference backing the value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// Fallback policy when no spec can resolve the variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    /// Resolution status.
    pub status: VariableStatus,
}

impl PlanVariable {
    /// Declare a pending variable of type `string`.
    #[must_use]
    pub fn declare(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            var_type: "string".to_string(),
            description: description.into(),
            source_spec_id: None,
            validation: BTreeMap::new(),
            value: None,
            evidence: None,
            fallback: None,
            status: VariableStatus::Pending,
        }
    }
}

/// The planner's output: strategy + sub-question DAG + variable declarations
/// + explicit edge list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Test strategy.
    pub strategy: Strategy,
    /// Ordered sub-questions.
    pub sub_questions: Vec<SubQuestion>,
    /// Declared variables.
    pub variables: Vec<PlanVariable>,
    /// Explicit dependency edges as `(from, to)` pairs.
    pub dag_edges: Vec<(String, String)>,
}

impl Plan {
    /// Validate the plan invariants.
    ///
    /// Checks, in order: every edge references existing sub-question ids,
    /// the dependency graph is acyclic (Kahn topological sort succeeds),
    /// the node count meets `min_nodes`, and every variable referenced by a
    /// sub-question has exactly one declaring [`PlanVariable`].
    pub fn validate(&self, min_nodes: usize) -> Result<(), PlanError> {
        let ids: HashSet<&str> = self.sub_questions.iter().map(|sq| sq.id.as_str()).collect();

        for (from, to) in &self.dag_edges {
            if !ids.contains(from.as_str()) || !ids.contains(to.as_str()) {
                return Err(PlanError::UnknownEdgeEndpoint {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }

        topological_order(
            self.sub_questions.iter().map(|sq| sq.id.as_str()),
            self.dag_edges
                .iter()
                .map(|(from, to)| (from.as_str(), to.as_str())),
        )
        .ok_or(PlanError::Cycle)?;

        if self.sub_questions.len() < min_nodes {
            return Err(PlanError::TooFewNodes {
                found: self.sub_questions.len(),
                min: min_nodes,
            });
        }

        let mut declared: HashSet<&str> = HashSet::new();
        for var in &self.variables {
            if !declared.insert(var.name.as_str()) {
                return Err(PlanError::DuplicateVariable(var.name.clone()));
            }
        }
        for sq in &self.sub_questions {
            for name in &sq.variable_refs {
                if !declared.contains(name.as_str()) {
                    return Err(PlanError::UndeclaredVariable {
                        sub_question: sq.id.clone(),
                        name: name.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Kahn topological sort over string node ids.
///
/// Returns `None` when the graph contains a cycle. Exposed for reuse by the
/// dispatcher's DAG assertions.
pub fn topological_order<'a>(
    nodes: impl Iterator<Item = &'a str>,
    edges: impl Iterator<Item = (&'a str, &'a str)>,
) -> Option<Vec<String>> {
    let mut indegree: HashMap<&str, usize> = nodes.map(|n| (n, 0)).collect();
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();

    for (from, to) in edges {
        successors.entry(from).or_default().push(to);
        *indegree.get_mut(to)? += 1;
    }

    let mut queue: VecDeque<&str> = indegree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(node, _)| *node)
        .collect();
    let mut order = Vec::with_capacity(indegree.len());

    while let Some(node) = queue.pop_front() {
        order.push(node.to_string());
        for &next in successors.get(node).into_iter().flatten() {
            let degree = indegree.get_mut(next)?;
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(next);
            }
        }
    }

    (order.len() == indegree.len()).then_some(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn sq(id: &str, deps: &[&str], var: &str) -> SubQuestion {
        SubQuestion {
            id: id.to_string(),
            prompt: format!("prompt for {id}"),
            depends_on: deps.iter().map(ToString::to_string).collect(),
            variable_refs: vec![var.to_string()],
        }
    }

    fn plan(sub_questions: Vec<SubQuestion>, dag_edges: Vec<(String, String)>) -> Plan {
        let variables = sub_questions
            .iter()
            .flat_map(|node| &node.variable_refs)
            .map(|name| PlanVariable::declare(name.clone(), "test"))
            .collect();
        Plan {
            strategy: Strategy {
                scope: vec!["scope".to_string()],
                risks: vec![],
                priorities: vec![],
            },
            sub_questions,
            variables,
            dag_edges,
        }
    }

    #[test]
    fn valid_plan_passes() {
        let p = plan(
            vec![sq("S1", &[], "V.a"), sq("S2", &["S1"], "V.b")],
            vec![("S1".to_string(), "S2".to_string())],
        );
        assert!(p.validate(2).is_ok());
    }

    #[test]
    fn unknown_edge_endpoint_is_rejected() {
        let p = plan(
            vec![sq("S1", &[], "V.a")],
            vec![("S1".to_string(), "S9".to_string())],
        );
        assert_matches!(p.validate(1), Err(PlanError::UnknownEdgeEndpoint { .. }));
    }

    #[test]
    fn cycle_is_rejected() {
        let p = plan(
            vec![sq("S1", &["S2"], "V.a"), sq("S2", &["S1"], "V.b")],
            vec![
                ("S1".to_string(), "S2".to_string()),
                ("S2".to_string(), "S1".to_string()),
            ],
        );
        assert_matches!(p.validate(1), Err(PlanError::Cycle));
    }

    #[test]
    fn minimum_node_count_is_enforced() {
        let p = plan(vec![sq("S1", &[], "V.a")], vec![]);
        assert_matches!(
            p.validate(8),
            Err(PlanError::TooFewNodes { found: 1, min: 8 })
        );
    }

    #[test]
    fn duplicate_variable_declaration_is_rejected() {
        let mut p = plan(vec![sq("S1", &[], "V.a")], vec![]);
        p.variables.push(PlanVariable::declare("V.a", "again"));
        assert_matches!(p.validate(1), Err(PlanError::DuplicateVariable(_)));
    }

    #[test]
    fn undeclared_variable_reference_is_rejected() {
        let mut p = plan(vec![sq("S1", &[], "V.a")], vec![]);
        p.variables.clear();
        assert_matches!(p.validate(1), Err(PlanError::UndeclaredVariable { .. }));
    }

    #[test]
    fn topological_order_covers_all_nodes() {
        let order = topological_order(
            ["a", "b", "c"].into_iter(),
            [("a", "b"), ("b", "c")].into_iter(),
        )
        .unwrap();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
