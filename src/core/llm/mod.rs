//! LLM integration for writing directory artifacts
//!
//! Providers implement [`LlmDocumenter`]; the generator only ever sees the
//! trait, so tests can swap in a scripted documenter.

mod documenter;
mod providers;

pub use documenter::{LlmDocumenter, CompletionRequest, CompletionResponse};
pub use providers::{OpenAiProvider, AnthropicProvider, create_documenter};
