//! LLM abstraction and Ollama client.
//!
//! The agent loop talks to any [`LlmBackend`]; [`OllamaClient`] is the shipped implementation.

mod ollama;

use async_trait::async_trait;

pub use ollama::{
    ChatMessage, ChatResponse, OllamaClient, OllamaModel, ToolCall, ToolCallFunction,
    ToolDefinition, ToolFunctionDefinition,
};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm api error: {0}")]
    Api(String),
}

/// A chat-completion backend with optional function calling.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// One non-streaming completion over the full message list.
    async fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
    ) -> Result<ChatResponse, LlmError>;
}
