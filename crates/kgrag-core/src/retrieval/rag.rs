//! Retrieval-augmented answering.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::KgResult;
use crate::traits::{GenerationOptions, Llm};
use crate::types::{Message, RagAnswer};

use super::retrievers::Retriever;

/// System instruction for answering from retrieved context.
pub const RAG_SYSTEM_PROMPT: &str = "Answer the user question using only the provided context. \
If the context does not contain the answer, say that you do not know. \
Do not add information that is not in the context.";

/// Strip surrounding whitespace and quotes from a user query.
pub fn clean_query(query: &str) -> &str {
    query.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}

/// Retriever plus LLM.
pub struct GraphRag {
    retriever: Arc<dyn Retriever>,
    llm: Arc<dyn Llm>,
    options: GenerationOptions,
}

impl GraphRag {
    pub fn new(retriever: Arc<dyn Retriever>, llm: Arc<dyn Llm>) -> Self {
        Self {
            retriever,
            llm,
            options: GenerationOptions {
                temperature: Some(0.0),
                ..Default::default()
            },
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Answer `question` from the top `top_k` retrieved items.
    pub async fn search(&self, question: &str, top_k: usize, return_context: bool) -> KgResult<RagAnswer> {
        let question = clean_query(question);
        let result = self.retriever.search(question, top_k).await?;
        info!(items = result.items.len(), "Retrieved context");

        let context = result.render();
        debug!(context = %context, "Context");

        let messages = vec![
            Message::system(RAG_SYSTEM_PROMPT),
            Message::user(format!(
                "Context:\n{}\n\nQuestion:\n{}\n\nAnswer:",
                context, question
            )),
        ];
        let response = self.llm.generate(&messages, Some(self.options.clone())).await?;

        Ok(RagAnswer {
            answer: response.content_or_empty().trim().to_string(),
            context: return_context.then_some(result),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::LlmResponse;
    use crate::types::{GraphTriple, RetrievedItem, RetrieverResult, ScoredNode};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedRetriever {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Retriever for FixedRetriever {
        async fn search(&self, query: &str, _top_k: usize) -> KgResult<RetrieverResult> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(RetrieverResult {
                items: vec![RetrievedItem {
                    node: ScoredNode {
                        id: "SpaceX".into(),
                        labels: vec!["Organization".into()],
                        properties: Default::default(),
                        score: 0.93,
                    },
                    context: vec![GraphTriple::new("Elon Musk", "FOUNDED", "SpaceX")],
                }],
                cypher: None,
            })
        }
    }

    struct EchoLlm {
        seen: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl Llm for EchoLlm {
        async fn generate(&self, messages: &[Message], _: Option<GenerationOptions>) -> KgResult<LlmResponse> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            Ok(LlmResponse::text("  Elon Musk founded SpaceX.\n"))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn test_clean_query() {
        assert_eq!(clean_query("  \"Who founded SpaceX?\" "), "Who founded SpaceX?");
        assert_eq!(clean_query("'Toys coming alive'"), "Toys coming alive");
        assert_eq!(clean_query("plain"), "plain");
    }

    #[tokio::test]
    async fn test_search_builds_context_prompt() {
        let retriever = Arc::new(FixedRetriever {
            queries: Mutex::new(Vec::new()),
        });
        let llm = Arc::new(EchoLlm {
            seen: Mutex::new(Vec::new()),
        });
        let rag = GraphRag::new(retriever.clone(), llm.clone());

        let answer = rag.search("\"Who founded SpaceX?\"", 3, true).await.unwrap();

        assert_eq!(answer.answer, "Elon Musk founded SpaceX.");
        assert_eq!(answer.context.unwrap().items.len(), 1);
        assert_eq!(retriever.queries.lock().unwrap()[0], "Who founded SpaceX?");

        let seen = llm.seen.lock().unwrap();
        assert!(seen[0].is_system());
        assert!(seen[1]
            .content
            .contains("Main Entity: SpaceX\nElon Musk --[FOUNDED]--> SpaceX"));
        assert!(seen[1].content.ends_with("Question:\nWho founded SpaceX?\n\nAnswer:"));
    }

    #[tokio::test]
    async fn test_search_without_context() {
        let rag = GraphRag::new(
            Arc::new(FixedRetriever {
                queries: Mutex::new(Vec::new()),
            }),
            Arc::new(EchoLlm {
                seen: Mutex::new(Vec::new()),
            }),
        );
        let answer = rag.search("Who?", 1, false).await.unwrap();
        assert!(answer.context.is_none());
    }
}
