//! Prompt templates for type-guided extraction.

use crate::types::Node;

use super::schema::{ExtractionSchema, NodeTypeSpec};

/// System prompt shared by all extraction calls.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are an expert in extracting knowledge graphs from text. \
You answer with a single JSON object and nothing else.";

/// Prompt asking for every entity of exactly one type.
pub fn node_extraction_prompt(
    text: &str,
    node_type: &NodeTypeSpec,
    schema: &ExtractionSchema,
    section_title: Option<&str>,
) -> String {
    let label = &node_type.label;
    let mut prompt = format!("You extract entities from {}.\n\n", schema.domain);

    if let Some(title) = section_title {
        prompt.push_str(&format!("SECTION: {}\n\n", title));
    }

    prompt.push_str(&format!(
        "TEXT:\n\"\"\"\n{}\n\"\"\"\n\nTASK: Extract ALL entities of type \"{}\".\n\n",
        text, label
    ));

    if let Some(rules) = &node_type.rules {
        prompt.push_str(&format!("RULES for {}:\n{}\n\n", label, rules));
    }

    prompt.push_str(&format!(
        r#"IMPORTANT:
- Extract ONLY type "{label}" and ignore everything else
- Use the exact names as written in the text
- No duplicates

Output JSON in this exact format:
{{"nodes": [{{"id": "entity name", "type": "{label}"}}]}}

If there are none, return {{"nodes": []}}."#,
        label = label
    ));

    prompt
}

/// Render found nodes grouped by type, e.g. `Person: A, B`.
///
/// Types appear in order of their first node.
pub fn format_node_list(nodes: &[Node]) -> String {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for node in nodes {
        match groups.iter_mut().find(|(t, _)| *t == node.node_type) {
            Some((_, ids)) => ids.push(&node.id),
            None => groups.push((&node.node_type, vec![&node.id])),
        }
    }

    groups
        .iter()
        .map(|(node_type, ids)| format!("{}: {}", node_type, ids.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt asking for relationships between already found nodes.
pub fn relationship_extraction_prompt(
    text: &str,
    nodes: &[Node],
    schema: &ExtractionSchema,
    section_title: Option<&str>,
) -> String {
    let mut prompt = format!("You analyze relationships in {}.\n\n", schema.domain);

    if let Some(title) = section_title {
        prompt.push_str(&format!("SECTION: {}\n\n", title));
    }

    let allowed = schema
        .relationship_types
        .iter()
        .map(|r| match &r.description {
            Some(description) => format!("- {}: {}", r.name, description),
            None => format!("- {}", r.name),
        })
        .collect::<Vec<_>>()
        .join("\n");

    prompt.push_str(&format!(
        r#"TEXT:
"""
{text}
"""

FOUND ENTITIES:
{nodes}

TASK: Find relationships between these entities.

ALLOWED RELATIONSHIP TYPES:
{allowed}

RULES:
1. Use ONLY the entities listed above as source and target, never invent new ones
2. Use ONLY the allowed relationship types
3. If a clock time is mentioned for a relationship, put it in the "time" field (format "HH:MM")
4. Do not invent relationships that are not stated in the text

Output JSON in this exact format:
{{"relationships": [{{"source": "entity name", "target": "entity name", "type": "RELATIONSHIP_TYPE", "time": ""}}]}}

If there are none, return {{"relationships": []}}."#,
        text = text,
        nodes = format_node_list(nodes),
        allowed = allowed
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_prompt_mentions_only_one_type() {
        let schema = ExtractionSchema::case_file();
        let prompt = node_extraction_prompt(
            "Um 13:45 sah ich Peter Klein.",
            &schema.node_types[3],
            &schema,
            Some("Zeugin Frau Schmidt"),
        );

        assert!(prompt.contains("ALL entities of type \"Zeitpunkt\""));
        assert!(prompt.contains("HH:MM"));
        assert!(prompt.contains("SECTION: Zeugin Frau Schmidt"));
        assert!(prompt.contains("a witness statement"));
        assert!(!prompt.contains("\"Person\""));
    }

    #[test]
    fn test_node_prompt_without_rules_or_title() {
        let schema = ExtractionSchema::business();
        let prompt = node_extraction_prompt("NVIDIA designs the H100.", &schema.node_types[0], &schema, None);
        assert!(!prompt.contains("SECTION"));
        assert!(!prompt.contains("RULES for"));
        assert!(prompt.contains(r#"{"nodes": [{"id": "entity name", "type": "Organization"}]}"#));
    }

    #[test]
    fn test_format_node_list_groups_by_type() {
        let nodes = vec![
            Node::new("Peter Klein", "Person"),
            Node::new("Raum 404", "Ort"),
            Node::new("Frau Schmidt", "Person"),
        ];
        assert_eq!(format_node_list(&nodes), "Person: Peter Klein, Frau Schmidt\nOrt: Raum 404");
    }

    #[test]
    fn test_relationship_prompt_lists_allowed_types() {
        let schema = ExtractionSchema::new(["Person", "Organization"], ["FOUNDED"]);
        let nodes = vec![Node::new("Steve Jobs", "Person"), Node::new("Apple", "Organization")];
        let prompt = relationship_extraction_prompt("Steve Jobs founded Apple.", &nodes, &schema, None);

        assert!(prompt.contains("- FOUNDED\n"));
        assert!(prompt.contains("Person: Steve Jobs\nOrganization: Apple"));
    }
}
