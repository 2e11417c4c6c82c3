//! Allowed node and relationship types that guide extraction.

use serde::{Deserialize, Serialize};

use crate::error::{KgError, KgResult};
use crate::types::ENTITY_LABEL;

/// One node type the extractor asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTypeSpec {
    /// Label written to the graph (e.g. "Person").
    pub label: String,
    /// Extra instructions for this type only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,
}

impl NodeTypeSpec {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            rules: None,
        }
    }

    pub fn with_rules(mut self, rules: impl Into<String>) -> Self {
        self.rules = Some(rules.into());
        self
    }
}

/// One relationship type the extractor may use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipTypeSpec {
    /// Relationship type (e.g. "FOUNDED").
    pub name: String,
    /// When to use it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RelationshipTypeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Node and relationship types allowed in one graph.
///
/// Node types are prompted for one at a time, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSchema {
    /// Short description of what the text is (e.g. "a witness statement").
    #[serde(default = "default_domain")]
    pub domain: String,
    pub node_types: Vec<NodeTypeSpec>,
    pub relationship_types: Vec<RelationshipTypeSpec>,
}

fn default_domain() -> String {
    "a text".to_string()
}

impl ExtractionSchema {
    /// Schema from bare label and type names.
    pub fn new<N, R>(node_types: N, relationship_types: R) -> Self
    where
        N: IntoIterator,
        N::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            domain: default_domain(),
            node_types: node_types.into_iter().map(NodeTypeSpec::new).collect(),
            relationship_types: relationship_types
                .into_iter()
                .map(RelationshipTypeSpec::new)
                .collect(),
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Load a schema from a TOML, JSON, or YAML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> KgResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let schema: Self = match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| KgError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)?,
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| KgError::Configuration(e.to_string()))?
            }
            _ => {
                return Err(KgError::Configuration(
                    "Unsupported schema file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Reject schemas with no node types or blank names.
    pub fn validate(&self) -> KgResult<()> {
        if self.node_types.is_empty() {
            return Err(KgError::Configuration(
                "Schema needs at least one node type".to_string(),
            ));
        }
        if self.node_types.iter().any(|n| n.label.trim().is_empty())
            || self
                .relationship_types
                .iter()
                .any(|r| r.name.trim().is_empty())
        {
            return Err(KgError::Configuration(
                "Schema type names must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    pub fn node_labels(&self) -> Vec<&str> {
        self.node_types.iter().map(|n| n.label.as_str()).collect()
    }

    pub fn relationship_names(&self) -> Vec<&str> {
        self.relationship_types.iter().map(|r| r.name.as_str()).collect()
    }

    /// Text description of the graph this schema produces, for query generation.
    pub fn graph_schema(&self) -> String {
        let mut out = String::from("Node properties:\n");
        for node in &self.node_types {
            out.push_str(&format!("{} {{id: STRING, name: STRING}}\n", node.label));
        }
        out.push_str("\nRelationship properties:\n");
        for rel in &self.relationship_types {
            out.push_str(&format!("{} {{time: STRING}}\n", rel.name));
        }
        out.push_str("\nThe relationships:\n");
        for rel in &self.relationship_types {
            out.push_str(&format!("(:{0})-[:{1}]->(:{0})", ENTITY_LABEL, rel.name));
            if let Some(ref description) = rel.description {
                out.push_str(&format!(" // {}", description));
            }
            out.push('\n');
        }
        out.push_str(&format!(
            "\nEvery node also carries the {} label; node ids are the entity names.\n",
            ENTITY_LABEL
        ));
        out
    }

    /// Built-in schema by name (`business` or `case-file`).
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('_', "-").as_str() {
            "business" => Some(Self::business()),
            "case-file" | "krimi" => Some(Self::case_file()),
            _ => None,
        }
    }

    /// Companies, people, places and products.
    pub fn business() -> Self {
        Self::new(
            ["Organization", "Person", "Location", "Product"],
            [
                "HEADQUARTERED_IN",
                "LED_BY",
                "DESIGNS",
                "MANUFACTURED_BY",
                "LOCATED_IN",
                "USES",
                "COMPETES_WITH",
            ],
        )
        .with_domain("a business news text")
    }

    /// Witness statements of a case file, with German type names.
    pub fn case_file() -> Self {
        Self {
            domain: "a witness statement".to_string(),
            node_types: vec![
                NodeTypeSpec::new("Person").with_rules(
                    "- Use full names where possible (\"Peter Klein\", not just \"Peter\")\n\
                     - Include titles (\"Dr. Justus Vormann\")\n\
                     - Witnesses, suspects and victims are all persons",
                ),
                NodeTypeSpec::new("Ort").with_rules(
                    "- Room numbers (\"Raum 404\")\n\
                     - Named places (\"Teeküche\", \"Kopierraum\", \"Hauptkorridor\")\n\
                     - Parts of the building (\"Etage 4\", \"Empfangsbereich\")",
                ),
                NodeTypeSpec::new("Objekt").with_rules(
                    "- Items (\"goldene Trophäe\", \"roter USB-Stick\")\n\
                     - Drinks (\"Chai-Latte\")\n\
                     - Documents and supplies",
                ),
                NodeTypeSpec::new("Zeitpunkt").with_rules(
                    "- ONLY clock times in the format HH:MM (\"13:45\")\n\
                     - Every mentioned clock time is a Zeitpunkt",
                ),
                NodeTypeSpec::new("Rolle").with_rules(
                    "- Job titles (\"CTO\", \"Praktikant\", \"Sicherheitschef\")\n\
                     - Functions (\"Reinigungskraft\", \"Head of Sales\")\n\
                     - NOT the person, only the role",
                ),
            ],
            relationship_types: vec![
                RelationshipTypeSpec::new("BEFINDET_SICH_IN")
                    .with_description("a person or object is at a place"),
                RelationshipTypeSpec::new("BEWEGT")
                    .with_description("a person takes, carries or moves an object"),
                RelationshipTypeSpec::new("SIEHT")
                    .with_description("a person observes another person or an object"),
                RelationshipTypeSpec::new("INTERAGIERT_MIT")
                    .with_description("a person talks or argues with another person"),
                RelationshipTypeSpec::new("GEHOERT").with_description("an object belongs to a person"),
                RelationshipTypeSpec::new("IST").with_description(
                    "two names denote the same entity (\"der Praktikant\" IST \"Torben-Malte\")",
                ),
                RelationshipTypeSpec::new("HAT_ROLLE")
                    .with_description("a person has a role (\"Peter Klein\" HAT_ROLLE \"CTO\")"),
                RelationshipTypeSpec::new("ARBEITET_ALS").with_description("a person works as a role"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_graph_schema_text() {
        let schema = ExtractionSchema::new(["Person", "Organization"], ["FOUNDED"]);
        let text = schema.graph_schema();
        assert!(text.starts_with("Node properties:\nPerson {id: STRING, name: STRING}\nOrganization"));
        assert!(text.contains("FOUNDED {time: STRING}"));
        assert!(text.contains("The relationships:\n(:Entity)-[:FOUNDED]->(:Entity)\n"));
    }

    #[test]
    fn test_presets() {
        let business = ExtractionSchema::preset("business").unwrap();
        assert_eq!(business.node_labels(), vec!["Organization", "Person", "Location", "Product"]);
        assert!(business.relationship_names().contains(&"MANUFACTURED_BY"));

        let case_file = ExtractionSchema::preset("case_file").unwrap();
        assert_eq!(case_file.node_types.len(), 5);
        assert!(case_file.node_types[3].rules.as_deref().unwrap().contains("HH:MM"));
        assert!(ExtractionSchema::preset("unknown").is_none());
    }

    #[test]
    fn test_validate() {
        assert!(ExtractionSchema::business().validate().is_ok());
        assert!(ExtractionSchema::new(Vec::<String>::new(), ["FOUNDED"]).validate().is_err());
        assert!(ExtractionSchema::new(["Person", " "], ["FOUNDED"]).validate().is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
node_types:
  - label: Person
  - label: Organization
    rules: "- Companies only"
relationship_types:
  - name: FOUNDED
    description: a person founded an organization
"#
        )
        .unwrap();

        let schema = ExtractionSchema::from_file(file.path()).unwrap();
        assert_eq!(schema.domain, "a text");
        assert_eq!(schema.node_labels(), vec!["Person", "Organization"]);
        assert_eq!(schema.relationship_types[0].name, "FOUNDED");
    }
}
