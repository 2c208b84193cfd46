// src/core/mod.rs
mod ignore_oracle;
mod scanner;
mod analyzer;
mod collector;
mod aggregator;
mod tools;
mod generator;
mod fallback;
mod engine;
mod llm;

pub use ignore_oracle::IgnoreOracle;
pub use scanner::{DirectoryNode, TreeScanner};
pub use analyzer::{
    AnalysisResult, AnalyzedFile, ExcludedFile, FileAnalyzer, FILE_COUNT_EXCLUDED,
    MARKDOWN_EXCLUDED,
};
pub use collector::{ChildContentCollector, ChildContentItem};
pub use aggregator::{
    AggregationDriver, AggregationResult, ArtifactGenerator, DirectoryError, FallbackReporter,
    GenerationOutcome, GenerationRequest, ProgressSink, TracingProgress,
};
pub use tools::{ArtifactKind, ArtifactTool, PromptRole, PromptSet, ToolRegistry};
pub use generator::LlmGenerator;
pub use fallback::TemplateFallbackReporter;
pub use llm::{
    create_documenter, AnthropicProvider, CompletionRequest, CompletionResponse, LlmDocumenter,
    OpenAiProvider,
};

// Export the main engine
pub use engine::{Engine, PlanVerdict, PlannedDirectory, DEFAULT_CONFIG_FILE};
