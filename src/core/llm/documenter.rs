use serde::{Serialize, Deserialize};
use std::collections::HashMap;

use crate::error::Result;

/// A single completion call: one system prompt, one user prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Role description for the model
    pub system_prompt: String,

    /// Instructions plus the directory content
    pub prompt: String,
}

/// Response from the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated markdown
    pub content: String,

    /// Provider details (model, token usage)
    pub metadata: HashMap<String, String>,
}

/// Trait for LLM providers that write artifacts
#[async_trait::async_trait]
pub trait LlmDocumenter: Send + Sync {
    /// Run one completion
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g., "OpenAI", "Anthropic")
    fn provider_name(&self) -> &str;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}
