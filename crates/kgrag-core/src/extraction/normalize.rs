//! Id normalization, first-wins node merging and relationship validation.
//!
//! Normalization is purely technical: "der Praktikant" and "Torben-Malte"
//! stay two nodes. Schemas connect such aliases with an explicit
//! relationship instead.

use std::collections::HashMap;

use crate::types::{Node, Relationship};

/// Comparison key of a node id.
///
/// Collapses whitespace runs, trims, lowercases and drops `"` and `'`.
pub fn normalize_id(id: &str) -> String {
    id.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace(['"', '\''], "")
}

/// Keep the first node per normalized id, in order of first appearance.
///
/// Later duplicates are dropped even when their type differs.
pub fn merge_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let mut seen = std::collections::HashSet::new();
    nodes
        .into_iter()
        .filter(|node| seen.insert(normalize_id(&node.id)))
        .collect()
}

/// Relationships kept and dropped by [`validate_relationships`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Relationships with both endpoints rewritten to canonical ids.
    pub valid: Vec<Relationship>,
    /// Relationships referring to an unknown node.
    pub dropped: Vec<Relationship>,
}

impl ValidationReport {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// Keep relationships whose endpoints both match a merged node.
///
/// Survivors point at the canonical (first-seen) id strings, so
/// "apple" becomes "Apple" if that is how the node was first named.
pub fn validate_relationships(
    relationships: Vec<Relationship>,
    merged: &[Node],
) -> ValidationReport {
    let canonical: HashMap<String, &str> = merged
        .iter()
        .map(|n| (normalize_id(&n.id), n.id.as_str()))
        .collect();

    let mut report = ValidationReport::default();
    for mut rel in relationships {
        let source = canonical.get(&normalize_id(&rel.source));
        let target = canonical.get(&normalize_id(&rel.target));

        match (source, target) {
            (Some(source), Some(target)) => {
                rel.source = source.to_string();
                rel.target = target.to_string();
                report.valid.push(rel);
            }
            _ => {
                tracing::debug!(
                    source = %rel.source,
                    target = %rel.target,
                    relationship_type = %rel.relationship_type,
                    "Dropping relationship with unknown endpoint"
                );
                report.dropped.push(rel);
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("  Steve   Jobs "), "steve jobs");
        assert_eq!(normalize_id("\"Apple\""), "apple");
        assert_eq!(normalize_id("O'Brien"), "obrien");
        assert_eq!(normalize_id("Raum\t404\n"), "raum 404");
        assert_eq!(normalize_id(""), "");
    }

    #[test]
    fn test_normalize_ignores_surrounding_whitespace() {
        for s in ["Apple", " apple", "Steve  Jobs\n", "\t'x'", "", "   "] {
            assert_eq!(normalize_id(s), normalize_id(s.trim()));
        }
        assert_eq!(normalize_id("Apple"), normalize_id("apple"));
    }

    #[test]
    fn test_merge_first_wins() {
        let merged = merge_nodes(vec![
            Node::new("Apple", "Organization"),
            Node::new("apple", "Organization"),
            Node::new("Steve Jobs", "Person"),
            Node::new("APPLE", "Product"),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "Apple");
        assert_eq!(merged[0].node_type, "Organization");
        assert_eq!(merged[1].id, "Steve Jobs");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let nodes = vec![
            Node::new("Peter Klein", "Person"),
            Node::new("peter  klein", "Person"),
            Node::new("CTO", "Rolle"),
        ];
        let once = merge_nodes(nodes);
        let twice = merge_nodes(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_keeps_aliases_apart() {
        let merged = merge_nodes(vec![
            Node::new("der Praktikant", "Person"),
            Node::new("Torben-Malte", "Person"),
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_validate_drops_unknown_endpoints() {
        let merged = vec![Node::new("Apple", "Organization")];
        let report = validate_relationships(
            vec![Relationship::new("Apple", "Ghost", "FOUNDED")],
            &merged,
        );

        assert!(report.valid.is_empty());
        assert_eq!(report.dropped_count(), 1);
    }

    #[test]
    fn test_validate_rewrites_to_canonical_ids() {
        let merged = vec![
            Node::new("Steve Jobs", "Person"),
            Node::new("Apple", "Organization"),
        ];
        let report = validate_relationships(
            vec![Relationship::new(" steve jobs", "\"apple\"", "FOUNDED").with_property("time", "1976")],
            &merged,
        );

        assert_eq!(report.valid.len(), 1);
        let rel = &report.valid[0];
        assert_eq!(rel.source, "Steve Jobs");
        assert_eq!(rel.target, "Apple");
        assert_eq!(rel.properties["time"].as_str(), Some("1976"));
    }
}
