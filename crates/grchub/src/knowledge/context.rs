//! Rendering of knowledge entries into model context.
//!
//! Both functions are pure: for a given store and filter the output is
//! byte-identical across calls. Selection order is the store's native order,
//! never re-sorted; severity prioritization is an instruction to the model,
//! not a property of the context block.

use grchub_protocol::Category;

use crate::knowledge::types::KnowledgeEntry;
use crate::knowledge::KnowledgeStore;

/// Render the selected entries as the line-oriented context block, one line
/// per entry, blank line between entries.
pub fn context_block(store: &KnowledgeStore, category: Option<Category>) -> String {
    let lines: Vec<String> = match category {
        Some(category) => store
            .by_category(category)
            .into_iter()
            .map(entry_line)
            .collect(),
        None => store.all().iter().map(entry_line).collect(),
    };
    lines.join("\n\n")
}

fn entry_line(entry: &KnowledgeEntry) -> String {
    let opt = |value: &Option<String>| -> String {
        value.clone().unwrap_or_else(|| "N/A".to_string())
    };
    format!(
        "[{}] {} | Category: {} | Severity: {} | Status: {} | Framework: {} | Region: {} | Description: {} | Recommendation: {} | Last Updated: {}",
        entry.id,
        entry.title,
        entry.category,
        entry
            .severity
            .map(|s| s.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        entry
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        opt(&entry.framework),
        opt(&entry.region),
        entry.description,
        opt(&entry.recommendation),
        entry.last_updated,
    )
}

/// Build the full system instruction for the chat model: advisor role, active
/// filter, delimited knowledge block, and response-formatting rules.
pub fn system_prompt(store: &KnowledgeStore, category: Option<Category>) -> String {
    let knowledge_context = context_block(store, category);
    let viewing = match category {
        Some(category) => {
            format!("The user is currently viewing the \"{}\" category.", category)
        }
        None => "The user is viewing all categories.".to_string(),
    };

    format!(
        r#"You are an expert GRC (Governance, Risk & Compliance) AI advisor. You help organizations manage risks, ensure compliance, navigate regulatory requirements, and provide strategic recommendations.

You have access to the following knowledge base data. When answering questions, you MUST reference specific entries from this data using their IDs (e.g., RSK-001, CMP-002) and present relevant information in a structured format.

{viewing}

=== KNOWLEDGE BASE ===
{knowledge_context}
=== END KNOWLEDGE BASE ===

Guidelines:
1. Always reference specific knowledge base entries by their ID when relevant.
2. When presenting data, structure it clearly with entry IDs, titles, severity levels, and statuses.
3. Provide actionable recommendations based on the data.
4. If the user asks about something not in the knowledge base, say so clearly and provide general guidance.
5. For risk queries, prioritize by severity (critical > high > medium > low).
6. For compliance queries, highlight frameworks and deadlines.
7. For regulatory queries, include jurisdictional context.
8. For recommendation queries, provide implementation prioritization.
9. When returning multiple items, format them as a structured list with key details.
10. Always end with a brief actionable summary or next steps."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::types::{Severity, Status};

    fn single_entry_store() -> KnowledgeStore {
        KnowledgeStore::from_entries(vec![KnowledgeEntry {
            id: "RSK-001".to_string(),
            category: Category::Risks,
            title: "Third-Party Vendor Data Breach".to_string(),
            severity: Some(Severity::Critical),
            status: Some(Status::Active),
            description: "Data exposure through vendor integrations.".to_string(),
            framework: Some("NIST CSF".to_string()),
            region: None,
            recommendation: Some("Encrypt vendor exchanges.".to_string()),
            last_updated: "2026-02-01".to_string(),
        }])
        .unwrap()
    }

    #[test]
    fn context_is_deterministic() {
        let store = KnowledgeStore::load_default().unwrap();
        assert_eq!(
            system_prompt(&store, Some(Category::Risks)),
            system_prompt(&store, Some(Category::Risks))
        );
        assert_eq!(context_block(&store, None), context_block(&store, None));
    }

    #[test]
    fn single_entry_renders_one_line_with_severity() {
        let store = single_entry_store();
        let block = context_block(&store, Some(Category::Risks));
        assert_eq!(block.lines().count(), 1);
        assert!(block.starts_with("[RSK-001]"));
        assert!(block.contains("Severity: critical"));
        assert!(block.contains("Status: active"));
        assert!(block.contains("Region: N/A"));
    }

    #[test]
    fn empty_store_keeps_template_markers() {
        let store = KnowledgeStore::from_entries(Vec::new()).unwrap();
        let prompt = system_prompt(&store, Some(Category::Risks));
        assert!(prompt.contains("=== KNOWLEDGE BASE ==="));
        assert!(prompt.contains("=== END KNOWLEDGE BASE ==="));
        assert!(!prompt.contains('['));
    }

    #[test]
    fn full_context_covers_every_entry_and_dominates_filters() {
        let store = KnowledgeStore::load_default().unwrap();
        let full = context_block(&store, None);
        let entry_lines = full.lines().filter(|l| l.starts_with('[')).count();
        assert_eq!(entry_lines, store.len());

        for category in Category::ALL {
            let filtered = context_block(&store, Some(category));
            let filtered_lines = filtered.lines().filter(|l| l.starts_with('[')).count();
            assert!(filtered_lines < entry_lines);
        }
    }

    #[test]
    fn prompt_names_the_active_filter() {
        let store = single_entry_store();
        let filtered = system_prompt(&store, Some(Category::Risks));
        assert!(filtered.contains("currently viewing the \"risks\" category"));

        let unfiltered = system_prompt(&store, None);
        assert!(unfiltered.contains("viewing all categories"));
    }
}
