//! Natural-language questions answered by LLM-written Cypher.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{KgError, KgResult};
use crate::json_parser::remove_think_tags;
use crate::traits::{GenerationOptions, GraphStore, Llm};
use crate::types::{Message, RetrievedItem, RetrieverResult, ScoredNode};

use super::retrievers::Retriever;

static CYPHER_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```(?:cypher)?\s*\n?([\s\S]*?)\n?\s*```").unwrap());

static STRING_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*""#).unwrap());

static WRITE_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(CREATE|MERGE|DELETE|DETACH|SET|REMOVE|DROP|FOREACH|LOAD\s+CSV)\b").unwrap()
});

/// Build the prompt asking for one Cypher statement.
pub fn text2cypher_prompt(schema: &str, examples: &[(String, String)], question: &str) -> String {
    let examples = examples
        .iter()
        .map(|(input, cypher)| format!("USER INPUT: '{}' QUERY: {}", input, cypher))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Task: Generate a Cypher statement for querying a Neo4j graph database from a user input.\n\n\
         Schema:\n{}\n\n\
         Examples (optional):\n{}\n\n\
         Input:\n{}\n\n\
         Do not use any properties or relationships not included in the schema.\n\
         Return scalar properties, not whole nodes.\n\
         Do not include triple backticks ``` or any additional text except the generated Cypher statement in your response.\n\n\
         Cypher query:",
        schema.trim(),
        examples,
        question
    )
}

/// Pull the Cypher statement out of a model reply.
///
/// Handles fenced blocks, a leading `cypher` tag and a trailing semicolon.
pub fn extract_cypher(reply: &str) -> String {
    let reply = remove_think_tags(reply);
    let body = match CYPHER_BLOCK.captures(&reply).and_then(|c| c.get(1)) {
        Some(content) => content.as_str(),
        None => reply.as_str(),
    };
    let body = body.trim();
    let body = match body.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("cypher:") => &body[7..],
        _ => match body.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("cypher") && body[6..].starts_with(char::is_whitespace) => {
                &body[6..]
            }
            _ => body,
        },
    };
    body.trim().trim_end_matches(';').trim().to_string()
}

/// Reject statements that would modify the graph.
pub fn ensure_read_only(cypher: &str) -> KgResult<()> {
    let stripped = STRING_LITERAL.replace_all(cypher, "''");
    if cypher.trim().is_empty() {
        return Err(KgError::llm("Model returned an empty Cypher statement"));
    }
    if let Some(clause) = WRITE_CLAUSE.find(&stripped) {
        return Err(KgError::llm(format!(
            "Refusing to run Cypher with a write clause ({}): {}",
            clause.as_str().to_uppercase(),
            cypher
        )));
    }
    Ok(())
}

/// Retriever that lets the LLM translate the question into Cypher.
pub struct Text2CypherRetriever {
    store: Arc<dyn GraphStore>,
    llm: Arc<dyn Llm>,
    schema: String,
    examples: Vec<(String, String)>,
}

impl Text2CypherRetriever {
    /// `schema` describes node labels, properties and relationships in text.
    pub fn new(store: Arc<dyn GraphStore>, llm: Arc<dyn Llm>, schema: impl Into<String>) -> Self {
        Self {
            store,
            llm,
            schema: schema.into(),
            examples: Vec::new(),
        }
    }

    /// Few-shot pairs of question and Cypher.
    pub fn with_examples<I, Q, C>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = (Q, C)>,
        Q: Into<String>,
        C: Into<String>,
    {
        self.examples = examples
            .into_iter()
            .map(|(q, c)| (q.into(), c.into()))
            .collect();
        self
    }

    /// Ask the model for a statement and validate it.
    pub async fn generate_cypher(&self, question: &str) -> KgResult<String> {
        let prompt = text2cypher_prompt(&self.schema, &self.examples, question);
        let options = GenerationOptions {
            temperature: Some(0.0),
            ..Default::default()
        };
        let response = self.llm.generate(&[Message::user(prompt)], Some(options)).await?;
        let cypher = extract_cypher(response.content_or_empty());
        ensure_read_only(&cypher)?;
        Ok(cypher)
    }
}

#[async_trait]
impl Retriever for Text2CypherRetriever {
    async fn search(&self, query: &str, top_k: usize) -> KgResult<RetrieverResult> {
        let cypher = self.generate_cypher(query).await?;
        info!(cypher = %cypher, "Generated Cypher");

        let rows = self.store.read_query(&cypher).await?;
        debug!(rows = rows.len(), "Cypher rows");

        let items = rows
            .into_iter()
            .take(top_k)
            .enumerate()
            .map(|(i, properties)| {
                let id = ["id", "name", "title"]
                    .iter()
                    .find_map(|key| properties.get(*key).map(ToString::to_string))
                    .unwrap_or_else(|| format!("Row {}", i + 1));
                RetrievedItem {
                    node: ScoredNode {
                        id,
                        labels: Vec::new(),
                        properties,
                        score: 1.0,
                    },
                    context: Vec::new(),
                }
            })
            .collect();

        Ok(RetrieverResult {
            items,
            cypher: Some(cypher),
        })
    }
}
