//! Cypher statement builders.
//!
//! Labels, relationship types, property keys and index names cannot be
//! passed as query parameters, so they are inlined as backtick-quoted
//! identifiers. Everything else goes through parameters.

use kgrag_core::traits::{SimilarityFunction, VectorIndexConfig};

/// Quote an identifier, doubling any backtick inside it.
pub fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Label set such as `` :`Person`:`Entity` ``.
pub fn label_clause<'a>(labels: impl IntoIterator<Item = &'a str>) -> String {
    labels
        .into_iter()
        .filter(|l| !l.is_empty())
        .map(|l| format!(":{}", escape_identifier(l)))
        .collect()
}

/// Merge a node by id, update its properties and add extra labels.
///
/// Parameters: `$id`, `$props`, and `$embedding` when `with_embedding`.
pub fn merge_node(node_type: &str, extra_labels: &[String], with_embedding: bool) -> String {
    let mut q = format!(
        "MERGE (n{} {{id: $id}})\nSET n += $props",
        label_clause([node_type])
    );
    let extra = label_clause(extra_labels.iter().map(String::as_str));
    if !extra.is_empty() {
        q.push_str(&format!("\nSET n{}", extra));
    }
    if with_embedding {
        q.push_str("\nSET n.embedding = $embedding");
    }
    q
}

/// Merge a relationship between two existing nodes.
///
/// Parameters: `$source`, `$target`, `$props`. Returns `written`, which is
/// zero when an endpoint is missing.
pub fn merge_relationship(relationship_type: &str) -> String {
    format!(
        "MATCH (a {{id: $source}}), (b {{id: $target}})\n\
         MERGE (a)-[r:{}]->(b)\n\
         SET r += $props\n\
         RETURN count(r) AS written",
        escape_identifier(relationship_type)
    )
}

/// Set a vector property on a node. Parameters: `$id`, `$vector`.
pub fn set_vector(property: &str) -> String {
    format!(
        "MATCH (n {{id: $id}}) SET n.{} = $vector",
        escape_identifier(property)
    )
}

pub fn create_vector_index(index: &VectorIndexConfig) -> String {
    let similarity = match index.similarity {
        SimilarityFunction::Cosine => "cosine",
        SimilarityFunction::Euclidean => "euclidean",
    };
    format!(
        "CREATE VECTOR INDEX {} IF NOT EXISTS\n\
         FOR (n:{}) ON (n.{})\n\
         OPTIONS {{indexConfig: {{`vector.dimensions`: {}, `vector.similarity_function`: '{}'}}}}",
        escape_identifier(&index.name),
        escape_identifier(&index.label),
        escape_identifier(&index.property),
        index.dimensions,
        similarity
    )
}

pub fn drop_index(name: &str) -> String {
    format!("DROP INDEX {} IF EXISTS", escape_identifier(name))
}

/// Look up an index's dimensions. Parameter: `$name`.
pub const VECTOR_INDEX_DIMENSIONS: &str = "SHOW VECTOR INDEXES YIELD name, options\n\
     WHERE name = $name\n\
     RETURN options.indexConfig['vector.dimensions'] AS dims";

pub fn create_unique_constraint(label: &str, property: &str) -> String {
    format!(
        "CREATE CONSTRAINT IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
        escape_identifier(label),
        escape_identifier(property)
    )
}

pub fn label_nodes_with_property(label: &str, property: &str) -> String {
    format!(
        "MATCH (n) WHERE n.{} IS NOT NULL\nSET n:{}\nRETURN count(n) AS count",
        escape_identifier(property),
        escape_identifier(label)
    )
}

pub fn nodes_missing_vector(label: &str, vector_property: &str, text_property: &str) -> String {
    format!(
        "MATCH (n:{}) WHERE n.{} IS NULL AND n.id IS NOT NULL\n\
         RETURN n.id AS id, coalesce(toString(n.{}), n.id) AS text",
        escape_identifier(label),
        escape_identifier(vector_property),
        escape_identifier(text_property)
    )
}

/// Nearest-neighbour query. Parameters: `$index`, `$k`, `$vector`.
pub fn vector_search(return_properties: &[String]) -> String {
    let projection = return_properties
        .iter()
        .map(|p| format!(".{}", escape_identifier(p)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CALL db.index.vector.queryNodes($index, $k, $vector) YIELD node, score\n\
         RETURN node.id AS id, labels(node) AS labels, node {{{}}} AS properties, score\n\
         ORDER BY score DESC",
        projection
    )
}

/// Relationships touching a node. Parameters: `$id`, `$limit`.
pub const NEIGHBORHOOD: &str = "MATCH (n {id: $id})-[r]-()\n\
     RETURN startNode(r).id AS source, type(r) AS relationship, endNode(r).id AS target\n\
     LIMIT $limit";

pub const DELETE_ALL: &str = "MATCH (n) DETACH DELETE n";

pub const COUNT_NODES: &str = "MATCH (n) RETURN count(n) AS count";

pub const COUNT_RELATIONSHIPS: &str = "MATCH ()-[r]->() RETURN count(r) AS count";

pub fn count_with_property(property: &str) -> String {
    format!(
        "MATCH (n) WHERE n.{} IS NOT NULL RETURN count(n) AS count",
        escape_identifier(property)
    )
}

/// Node count per primary label, ignoring the generic label.
/// Parameter: `$generic`.
pub const NODES_BY_LABEL: &str = "MATCH (n)\n\
     WITH coalesce([l IN labels(n) WHERE l <> $generic][0], $generic) AS label\n\
     RETURN label, count(*) AS count";

pub const RELATIONSHIPS_BY_TYPE: &str = "MATCH ()-[r]->() RETURN type(r) AS label, count(*) AS count";
