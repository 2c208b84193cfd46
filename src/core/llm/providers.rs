use std::collections::HashMap;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::error::{TreescribeError, Result};
use crate::config::LlmConfig;
use super::documenter::{LlmDocumenter, CompletionRequest, CompletionResponse};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Factory function to create the appropriate LLM documenter based on config
pub fn create_documenter(config: &LlmConfig) -> Result<Box<dyn LlmDocumenter>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiProvider::new(config)?)),
        "anthropic" => Ok(Box::new(AnthropicProvider::new(config)?)),
        _ => Err(TreescribeError::Config(
            format!("Unsupported LLM provider: {}", config.provider)
        )),
    }
}

/// OpenAI chat completions, or any endpoint speaking the same protocol
pub struct OpenAiProvider {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            TreescribeError::Config(
                "OpenAI API key not set (llm.api_key or OPENAI_API_KEY)".to_string()
            )
        })?;

        Ok(Self {
            config: config.clone(),
            api_key,
            client: reqwest::Client::new(),
        })
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmDocumenter for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let payload = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": request.system_prompt
                },
                {
                    "role": "user",
                    "content": request.prompt
                }
            ],
            "max_tokens": self.config.max_tokens.unwrap_or(4000),
            "temperature": self.config.temperature.unwrap_or(0.3)
        });

        debug!("OpenAI request: {} prompt chars", request.prompt.len());

        let response = self.client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| TreescribeError::Llm(format!("OpenAI API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TreescribeError::Llm(
                format!("OpenAI API error {}: {}", status, error_text)
            ));
        }

        let response_data: serde_json::Value = response.json().await
            .map_err(|e| TreescribeError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        let content = extract_openai_content(&response_data)?;

        let mut metadata = HashMap::new();
        metadata.insert("provider".to_string(), "OpenAI".to_string());
        metadata.insert("model".to_string(), self.config.model.clone());
        if let Some(usage) = response_data.get("usage") {
            metadata.insert("tokens_used".to_string(), usage["total_tokens"].to_string());
        }

        Ok(CompletionResponse { content, metadata })
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Anthropic messages API
pub struct AnthropicProvider {
    config: LlmConfig,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.resolve_api_key().ok_or_else(|| {
            TreescribeError::Config(
                "Anthropic API key not set (llm.api_key or ANTHROPIC_API_KEY)".to_string()
            )
        })?;

        Ok(Self {
            config: config.clone(),
            api_key,
            client: reqwest::Client::new(),
        })
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(ANTHROPIC_BASE_URL);
        format!("{}/messages", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmDocumenter for AnthropicProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let payload = json!({
            "model": self.config.model,
            "system": request.system_prompt,
            "messages": [
                {
                    "role": "user",
                    "content": request.prompt
                }
            ],
            "max_tokens": self.config.max_tokens.unwrap_or(4000),
            "temperature": self.config.temperature.unwrap_or(0.3)
        });

        debug!("Anthropic request: {} prompt chars", request.prompt.len());

        let response = self.client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| TreescribeError::Llm(format!("Anthropic API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(TreescribeError::Llm(
                format!("Anthropic API error {}: {}", status, error_text)
            ));
        }

        let response_data: serde_json::Value = response.json().await
            .map_err(|e| TreescribeError::Llm(format!("Failed to parse Anthropic response: {}", e)))?;

        let content = extract_anthropic_content(&response_data)?;

        let mut metadata = HashMap::new();
        metadata.insert("provider".to_string(), "Anthropic".to_string());
        metadata.insert("model".to_string(), self.config.model.clone());
        if let Some(usage) = response_data.get("usage") {
            metadata.insert("input_tokens".to_string(), usage["input_tokens"].to_string());
            metadata.insert("output_tokens".to_string(), usage["output_tokens"].to_string());
        }

        Ok(CompletionResponse { content, metadata })
    }

    fn provider_name(&self) -> &str {
        "Anthropic"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn extract_openai_content(response: &serde_json::Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| TreescribeError::Llm("OpenAI response contained no message content".to_string()))
}

fn extract_anthropic_content(response: &serde_json::Value) -> Result<String> {
    let blocks = response["content"]
        .as_array()
        .ok_or_else(|| TreescribeError::Llm("Anthropic response contained no content".to_string()))?;

    let text: Vec<&str> = blocks
        .iter()
        .filter(|block| block["type"] == "text")
        .filter_map(|block| block["text"].as_str())
        .collect();

    if text.is_empty() {
        return Err(TreescribeError::Llm("Anthropic response contained no text blocks".to_string()));
    }
    Ok(text.join(""))
}
