//! Document ingestion — doc packs, requirement extraction, traceability seed.

use std::path::Path;

use scout_core::document::{
    AcceptanceCriterion, DocPack, DocumentType, Requirement, Section, TraceabilityIndex,
};

use crate::errors::RuntimeError;

/// Split a document into heading-delimited sections.
fn extract_sections(text: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current_lines: Vec<&str> = Vec::new();
    let mut current_title = "Overview".to_string();
    let mut section_idx = 0;

    for line in text.lines() {
        if line.starts_with('#') {
            if !current_lines.is_empty() {
                sections.push(Section {
                    id: format!("sec-{section_idx}"),
                    title: current_title.clone(),
                    text: current_lines.join("\n").trim().to_string(),
                });
                section_idx += 1;
                current_lines.clear();
            }
            current_title = line.trim_start_matches(['#', ' ']).to_string();
        } else {
            current_lines.push(line);
        }
    }
    if !current_lines.is_empty() {
        sections.push(Section {
            id: format!("sec-{section_idx}"),
            title: current_title,
            text: current_lines.join("\n").trim().to_string(),
        });
    }
    sections
}

/// Load and parse the source document at `path`.
pub async fn load_doc_pack(path: &Path) -> Result<DocPack, RuntimeError> {
    let text = tokio::fs::read_to_string(path).await?;
    let doc_type = match path.extension().and_then(|ext| ext.to_str()) {
        Some("md" | "markdown") => DocumentType::Markdown,
        _ => DocumentType::OpenApi,
    };
    let sections = extract_sections(&text);
    let stem = path
        .file_stem()
        .map_or_else(String::new, |stem| stem.to_string_lossy().into_owned());
    Ok(DocPack {
        id: stem.clone(),
        title: sections.first().map_or(stem, |s| s.title.clone()),
        doc_type,
        text,
        sections,
        links: Vec::new(),
        entities: Vec::new(),
    })
}

/// Extract one requirement per bullet line across all sections.
///
/// A trailing `:` clause becomes an acceptance criterion; a "must" in the
/// text raises the priority to `high`.
#[must_use]
pub fn extract_requirements(doc_pack: &DocPack) -> Vec<Requirement> {
    let mut requirements = Vec::new();
    let mut idx = 0;

    for section in &doc_pack.sections {
        for bullet in section
            .text
            .lines()
            .filter(|line| line.trim_start().starts_with('-'))
        {
            idx += 1;
            let mut text = bullet.trim_start().trim_start_matches(['-', ' ']).trim();
            let mut acceptance = Vec::new();
            if let Some((head, criteria)) = text.split_once(':') {
                text = head;
                acceptance.push(AcceptanceCriterion {
                    id: format!("AC-{idx}"),
                    text: criteria.trim().to_string(),
                });
            }
            let priority = if text.to_lowercase().contains("must") {
                "high"
            } else {
                "medium"
            };
            requirements.push(Requirement {
                id: format!("REQ-{idx}"),
                text: text.to_string(),
                priority: priority.to_string(),
                tags: vec![doc_pack.doc_type.as_str().to_string()],
                acceptance,
            });
        }
    }
    requirements
}

/// Seed an empty traceability index for the extracted requirements.
#[must_use]
pub fn build_traceability(requirements: &[Requirement]) -> TraceabilityIndex {
    TraceabilityIndex::seed(requirements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOC: &str = "# Login flows\n\
        - User must sign in with email: session persists for 30 days\n\
        - Password reset sends a mail\n\
        # Mobile\n\
        - App mirrors the web journey\n";

    fn write_doc(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn doc_pack_splits_sections_and_classifies_markdown() {
        let file = write_doc(DOC);
        let pack = load_doc_pack(file.path()).await.unwrap();
        assert_eq!(pack.doc_type, DocumentType::Markdown);
        assert_eq!(pack.sections.len(), 2);
        assert_eq!(pack.title, "Login flows");
    }

    #[tokio::test]
    async fn missing_document_is_an_error() {
        let result = load_doc_pack(Path::new("/nonexistent/doc.md")).await;
        assert!(matches!(result, Err(RuntimeError::DocRead(_))));
    }

    #[tokio::test]
    async fn requirements_carry_priority_and_acceptance() {
        let file = write_doc(DOC);
        let pack = load_doc_pack(file.path()).await.unwrap();
        let requirements = extract_requirements(&pack);

        assert_eq!(requirements.len(), 3);
        assert_eq!(requirements[0].id, "REQ-1");
        assert_eq!(requirements[0].priority, "high");
        assert_eq!(requirements[0].acceptance.len(), 1);
        assert_eq!(
            requirements[0].acceptance[0].text,
            "session persists for 30 days"
        );
        assert_eq!(requirements[1].priority, "medium");
        assert!(requirements[1].acceptance.is_empty());
    }

    #[tokio::test]
    async fn traceability_starts_uncovered() {
        let file = write_doc(DOC);
        let pack = load_doc_pack(file.path()).await.unwrap();
        let requirements = extract_requirements(&pack);
        let index = build_traceability(&requirements);
        assert_eq!(index.entries.len(), 3);
        assert_eq!(index.coverage_ratio(requirements.len()), 0.0);
    }
}
