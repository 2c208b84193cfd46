use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{TreescribeError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// LLM provider (openai, anthropic)
    pub provider: String,

    /// Model name (e.g., "gpt-4o", "claude-3-5-sonnet-latest")
    pub model: String,

    /// API key; falls back to the provider's environment variable
    pub api_key: Option<String>,

    /// Base URL for OpenAI-compatible endpoints
    pub base_url: Option<String>,

    /// Maximum tokens for LLM responses
    pub max_tokens: Option<u32>,

    /// Temperature for LLM responses (0.0 to 1.0)
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory crawling and file selection limits
    pub crawl: CrawlConfig,

    /// Artifact generation settings
    pub generation: GenerationConfig,

    /// LLM integration settings
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// File extensions that count as code (without the leading dot)
    pub code_extensions: Vec<String>,

    /// Maximum size of a single file sent to the LLM (in bytes)
    pub max_file_size: u64,

    /// Maximum number of code files analyzed per directory
    pub max_files_per_directory: usize,

    /// Aggregate size ceiling per directory (in bytes); defaults to
    /// `max_files_per_directory * max_file_size`
    pub max_total_size: Option<u64>,

    /// Whether dot-prefixed files and directories are crawled
    pub include_hidden: bool,

    /// Ignore file read from the crawl root
    pub ignore_file: String,

    /// Extra gitignore-style patterns applied on top of the ignore file
    pub extra_ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Overwrite artifacts that already exist
    pub update_existing: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: Some(4000),
            temperature: Some(0.3),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        let code_extensions = [
            "rs", "py", "js", "jsx", "ts", "tsx", "java", "kt", "scala", "go", "c", "h",
            "cpp", "hpp", "cc", "cs", "rb", "php", "swift", "sh", "sql", "vue", "svelte",
        ]
        .iter()
        .map(|ext| ext.to_string())
        .collect();

        Self {
            code_extensions,
            max_file_size: 100 * 1024, // 100KB
            max_files_per_directory: 50,
            max_total_size: None,
            include_hidden: false,
            ignore_file: ".gitignore".to_string(),
            extra_ignore_patterns: vec![
                "node_modules/".to_string(),
                "target/".to_string(),
                "dist/".to_string(),
            ],
        }
    }
}

impl CrawlConfig {
    /// Aggregate byte ceiling for one directory
    pub fn total_size_limit(&self) -> u64 {
        self.max_total_size.unwrap_or_else(|| {
            (self.max_files_per_directory as u64).saturating_mul(self.max_file_size)
        })
    }

    /// Whether the path's extension is on the code allow-list
    pub fn is_code_extension(&self, path: &Path) -> bool {
        match file_extension(path) {
            Some(ext) => self
                .code_extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(&ext)),
            None => false,
        }
    }

    /// Allow-listed and not markdown
    pub fn is_qualifying_file(&self, path: &Path) -> bool {
        !is_markdown(path) && self.is_code_extension(path)
    }
}

impl LlmConfig {
    /// Configured key, or the provider's conventional environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Some(key.clone());
        }

        let var = match self.provider.as_str() {
            "anthropic" => "ANTHROPIC_API_KEY",
            _ => "OPENAI_API_KEY",
        };
        std::env::var(var).ok().filter(|k| !k.trim().is_empty())
    }
}

/// Lowercased extension without the dot
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn is_markdown(path: &Path) -> bool {
    file_extension(path).as_deref() == Some("md")
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| TreescribeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TreescribeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Err(TreescribeError::Config(format!(
                        "Config file not found: {}",
                        p.as_ref().display()
                    )))
                }
            }
            None => {
                // Try common config file locations
                let candidates = [
                    "Treescribe.toml",
                    "treescribe.toml",
                    ".treescribe.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.crawl.max_files_per_directory == 0 {
            return Err(TreescribeError::Config(
                "crawl.max_files_per_directory must be at least 1".to_string(),
            ));
        }
        if self.crawl.max_file_size == 0 {
            return Err(TreescribeError::Config(
                "crawl.max_file_size must be greater than zero".to_string(),
            ));
        }
        if self.crawl.max_total_size == Some(0) {
            return Err(TreescribeError::Config(
                "crawl.max_total_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
