//! Provider adapters.

use async_trait::async_trait;

use kgrag_core::error::KgResult;
use kgrag_core::traits::{GenerationOptions, Llm, LlmResponse};
use kgrag_core::types::{Message, MessageRole};

/// Wraps a model that rejects system instructions.
///
/// System messages are removed and their text is prepended to the first
/// user message, separated by a blank line. If there is no user message the
/// system text becomes one.
pub struct SystemPromptFolding<L> {
    inner: L,
}

impl<L: Llm> SystemPromptFolding<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> L {
        self.inner
    }
}

/// Fold system messages into the first user message.
pub fn fold_system_messages(messages: &[Message]) -> Vec<Message> {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.is_system())
        .map(|m| m.content.as_str())
        .collect();
    if system.is_empty() {
        return messages.to_vec();
    }
    let preamble = system.join("\n\n");

    let mut folded: Vec<Message> = messages.iter().filter(|m| !m.is_system()).cloned().collect();
    match folded.iter_mut().find(|m| m.role == MessageRole::User) {
        Some(first_user) => {
            first_user.content = format!("{}\n\n{}", preamble, first_user.content);
        }
        None => folded.insert(0, Message::user(preamble)),
    }
    folded
}

#[async_trait]
impl<L: Llm> Llm for SystemPromptFolding<L> {
    async fn generate(
        &self,
        messages: &[Message],
        options: Option<GenerationOptions>,
    ) -> KgResult<LlmResponse> {
        let folded = fold_system_messages(messages);
        self.inner.generate(&folded, options).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn supports_system_instruction(&self) -> bool {
        true
    }

    fn supports_json_mode(&self) -> bool {
        self.inner.supports_json_mode()
    }
}
