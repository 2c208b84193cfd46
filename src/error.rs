use thiserror::Error;

/// Main error type for Treescribe operations
#[derive(Error, Debug)]
pub enum TreescribeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Ignore rules error: {0}")]
    Ignore(String),

    #[error("LLM request failed: {0}")]
    Llm(String),
}

pub type Result<T> = std::result::Result<T, TreescribeError>;
