//! Source document model — doc packs, requirements, traceability.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Documents
// ─────────────────────────────────────────────────────────────────────────────

/// Supported source document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Markdown requirement docs.
    Markdown,
    /// Exported HTML pages.
    Html,
    /// Confluence exports.
    Confluence,
    /// PDF specs.
    Pdf,
    /// OpenAPI descriptions.
    OpenApi,
    /// Issue-tracker tickets.
    Ticket,
}

impl DocumentType {
    /// Stable string form used in requirement tags.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Confluence => "confluence",
            Self::Pdf => "pdf",
            Self::OpenApi => "openapi",
            Self::Ticket => "ticket",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One heading-delimited section of a source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section id (`sec-N`).
    pub id: String,
    /// Heading text.
    pub title: String,
    /// Body text under the heading.
    pub text: String,
}

/// A parsed source document plus extracted structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocPack {
    /// Document id (file stem).
    pub id: String,
    /// Document title (first section heading, or the id).
    pub title: String,
    /// Document type.
    pub doc_type: DocumentType,
    /// Full raw text.
    pub text: String,
    /// Heading-delimited sections.
    pub sections: Vec<Section>,
    /// Outbound links found in the document.
    pub links: Vec<String>,
    /// Named entities found in the document.
    pub entities: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Requirements
// ─────────────────────────────────────────────────────────────────────────────

/// An acceptance criterion attached to a requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceCriterion {
    /// Criterion id (`AC-N`).
    pub id: String,
    /// Criterion text.
    pub text: String,
}

/// A single extracted requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Requirement id (`REQ-N`).
    pub id: String,
    /// Requirement text.
    pub text: String,
    /// Priority: `high` when the text demands ("must"), else `medium`.
    pub priority: String,
    /// Tags (currently the source document type).
    pub tags: Vec<String>,
    /// Acceptance criteria split off the requirement text.
    pub acceptance: Vec<AcceptanceCriterion>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Traceability
// ─────────────────────────────────────────────────────────────────────────────

/// Links one requirement to the tests that exercise it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceabilityEntry {
    /// Requirement id.
    pub requirement_id: String,
    /// Ids of manual tests and automation specs covering the requirement.
    pub candidate_tests: Vec<String>,
}

/// Requirement → test index built during ingestion, filled during synthesis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceabilityIndex {
    /// One entry per requirement.
    pub entries: Vec<TraceabilityEntry>,
}

impl TraceabilityIndex {
    /// Seed an index with one empty entry per requirement.
    #[must_use]
    pub fn seed(requirements: &[Requirement]) -> Self {
        Self {
            entries: requirements
                .iter()
                .map(|req| TraceabilityEntry {
                    requirement_id: req.id.clone(),
                    candidate_tests: Vec::new(),
                })
                .collect(),
        }
    }

    /// Fraction of requirements with at least one linked test.
    ///
    /// Returns 0.0 when there are no requirements.
    #[must_use]
    pub fn coverage_ratio(&self, total_requirements: usize) -> f64 {
        if total_requirements == 0 {
            return 0.0;
        }
        let covered = self
            .entries
            .iter()
            .filter(|entry| !entry.candidate_tests.is_empty())
            .count();
        covered as f64 / total_requirements as f64
    }

    /// Record `test_id` as covering `requirement_id`, skipping duplicates.
    pub fn link(&mut self, requirement_id: &str, test_id: &str) {
        for entry in &mut self.entries {
            if entry.requirement_id == requirement_id
                && !entry.candidate_tests.iter().any(|t| t == test_id)
            {
                entry.candidate_tests.push(test_id.to_string());
            }
        }
    }
}
