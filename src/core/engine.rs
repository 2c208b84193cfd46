// src/core/engine.rs
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::TreescribeError;
use super::{
    create_documenter, AggregationDriver, AggregationResult, ArtifactKind, ArtifactTool,
    DirectoryError,
    FileAnalyzer, IgnoreOracle, LlmDocumenter, LlmGenerator, TemplateFallbackReporter,
    ToolRegistry, TracingProgress, TreeScanner,
};

/// Default file written by `init`
pub const DEFAULT_CONFIG_FILE: &str = "Treescribe.toml";

/// What a run would do with one directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "detail")]
pub enum PlanVerdict {
    /// Not documented on its own; a single file is inlined into the parent
    Skip,
    /// Limits exceeded, the fallback report would be written
    Fallback(String),
    /// Artifact exists and would be left alone
    Keep,
    Update,
    Create,
}

impl fmt::Display for PlanVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanVerdict::Skip => write!(f, "skip"),
            PlanVerdict::Fallback(reason) => write!(f, "fallback ({})", reason),
            PlanVerdict::Keep => write!(f, "keep"),
            PlanVerdict::Update => write!(f, "update"),
            PlanVerdict::Create => write!(f, "create"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedDirectory {
    pub directory: PathBuf,
    pub code_files: usize,
    pub verdict: PlanVerdict,
}

/// Main orchestration engine: configuration, tool registry and the LLM seam
pub struct Engine {
    config: Config,
    registry: ToolRegistry,
    documenter: Option<Arc<dyn LlmDocumenter>>,
}

impl Engine {
    /// Create an engine from a config file, or the first candidate found in the working directory
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;
        debug!("Loaded configuration: {:?}", config);
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            registry: ToolRegistry::default(),
            documenter: None,
        }
    }

    /// Use this documenter instead of building one from `[llm]`
    pub fn with_documenter(mut self, documenter: Arc<dyn LlmDocumenter>) -> Self {
        self.documenter = Some(documenter);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.registry
    }

    fn tool(&self, kind: ArtifactKind) -> Result<&ArtifactTool> {
        self.registry
            .get(kind)
            .with_context(|| format!("No artifact tool registered for '{}'", kind))
    }

    fn documenter(&self) -> Result<Arc<dyn LlmDocumenter>> {
        if let Some(documenter) = &self.documenter {
            return Ok(documenter.clone());
        }
        let documenter = create_documenter(&self.config.llm)
            .context("Failed to initialize LLM documenter")?;
        info!(
            "LLM integration enabled: {} ({})",
            documenter.provider_name(),
            documenter.model_name()
        );
        Ok(Arc::from(documenter))
    }

    /// Write the `kind` artifact into every eligible directory under `path`, bottom-up
    pub async fn generate(
        &self,
        kind: ArtifactKind,
        path: &Path,
        update_existing: bool,
    ) -> Result<AggregationResult> {
        let tool = self.tool(kind)?;
        let update_existing = update_existing || self.config.generation.update_existing;

        info!(
            "Running {} on {} (update existing: {})",
            tool.name,
            path.display(),
            update_existing
        );

        // A root that cannot be scanned is reported before any LLM setup
        let root = std::path::absolute(path)
            .with_context(|| format!("Cannot resolve {}", path.display()))?;
        let unscannable = match std::fs::metadata(&root) {
            Ok(metadata) if metadata.is_dir() => None,
            Ok(_) => Some(format!("{} is not a directory", root.display())),
            Err(e) => Some(format!("Cannot scan {}: {}", root.display(), e)),
        };
        if let Some(error) = unscannable {
            warn!("Aborting run: {}", error);
            return Ok(AggregationResult {
                errors: vec![DirectoryError { directory: root, error }],
                ..AggregationResult::default()
            });
        }

        let generator = LlmGenerator::new(tool, self.documenter()?)?;
        let fallback = TemplateFallbackReporter::new(tool, &self.config.crawl);
        let driver = AggregationDriver::new(
            &self.config.crawl,
            tool,
            &generator,
            &fallback,
            &TracingProgress,
        );

        Ok(driver.run(&root, update_existing).await)
    }

    /// Dry run: the bottom-up order with the verdict each directory would get
    pub async fn plan(&self, kind: ArtifactKind, path: &Path) -> Result<Vec<PlannedDirectory>> {
        let tool = self.tool(kind)?;
        let crawl = &self.config.crawl;
        let root = std::path::absolute(path)
            .with_context(|| format!("Cannot resolve {}", path.display()))?;

        let scanner = TreeScanner::new(crawl, IgnoreOracle::load(&root, crawl)?);
        let analyzer = FileAnalyzer::new(crawl);
        let order = scanner.create_bottom_up_order(&root)?;

        let mut planned = Vec::with_capacity(order.len());
        for directory in order {
            let code_files = scanner.get_code_files(&directory);
            let has_subdirectories = scanner.has_subdirectories(&directory);

            let verdict = if !analyzer.should_document(&directory, &code_files, has_subdirectories) {
                PlanVerdict::Skip
            } else {
                let analysis = analyzer.analyze_files(&directory, &code_files).await;
                if analysis.limited {
                    PlanVerdict::Fallback(
                        analysis
                            .limit_reason
                            .unwrap_or_else(|| "limits exceeded".to_string()),
                    )
                } else if directory.join(tool.output_filename).exists() {
                    if self.config.generation.update_existing {
                        PlanVerdict::Update
                    } else {
                        PlanVerdict::Keep
                    }
                } else {
                    PlanVerdict::Create
                }
            };

            planned.push(PlannedDirectory {
                directory,
                code_files: code_files.len(),
                verdict,
            });
        }

        Ok(planned)
    }

    /// Write the default configuration into `path`
    pub fn init(&self, path: &Path) -> Result<PathBuf> {
        if !path.is_dir() {
            return Err(TreescribeError::FileSystem(format!(
                "{} is not a directory",
                path.display()
            ))
            .into());
        }

        let config_path = path.join(DEFAULT_CONFIG_FILE);
        if config_path.exists() {
            anyhow::bail!("{} already exists", config_path.display());
        }

        Config::default().save(&config_path)?;
        info!("Wrote {}", config_path.display());
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use crate::config::CrawlConfig;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn engine_with(crawl: CrawlConfig) -> Engine {
        Engine::with_config(Config {
            crawl,
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn plan_reports_a_verdict_per_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "main.rs", "fn main() {}");
        write(root, "lonely/only.rs", "pub fn f() {}");
        write(root, "done/a.rs", "");
        write(root, "done/b.rs", "");
        write(root, "done/DOCUMENTATION.md", "# Done");
        write(root, "huge/a.rs", "");
        write(root, "huge/b.rs", "");
        write(root, "huge/c.rs", "");

        let engine = engine_with(CrawlConfig {
            max_files_per_directory: 2,
            ..CrawlConfig::default()
        });
        let plan = engine.plan(ArtifactKind::Docs, root).await.unwrap();

        let verdict = |name: &str| {
            plan.iter()
                .find(|p| p.directory.file_name().map(|n| n == name).unwrap_or(false))
                .map(|p| p.verdict.clone())
                .unwrap()
        };

        assert_eq!(plan.len(), 4);
        assert_eq!(verdict("lonely"), PlanVerdict::Skip);
        assert_eq!(verdict("done"), PlanVerdict::Keep);
        assert!(matches!(verdict("huge"), PlanVerdict::Fallback(_)));
        assert_eq!(plan.last().unwrap().verdict, PlanVerdict::Create);
        assert_eq!(plan.last().unwrap().code_files, 1);
    }

    #[tokio::test]
    async fn plan_fails_for_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(CrawlConfig::default());

        assert!(engine
            .plan(ArtifactKind::Docs, &dir.path().join("nope"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn missing_root_is_reported_without_llm_setup() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let engine = Engine::with_config(Config {
            llm: crate::config::LlmConfig {
                provider: "unconfigured".to_string(),
                ..crate::config::LlmConfig::default()
            },
            ..Config::default()
        });

        let result = engine
            .generate(ArtifactKind::Docs, &missing, false)
            .await
            .unwrap();

        assert_eq!(result.total_directories, 0);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].directory, missing);
        assert!(result.errors[0].error.starts_with("Cannot scan"));
    }

    #[test]
    fn init_writes_loadable_config_once() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(CrawlConfig::default());

        let written = engine.init(dir.path()).unwrap();
        assert_eq!(written, dir.path().join(DEFAULT_CONFIG_FILE));

        let loaded = Config::load(&written).unwrap();
        assert_eq!(loaded.crawl.max_files_per_directory, 50);

        assert!(engine.init(dir.path()).is_err());
    }

    #[test]
    fn verdicts_display_for_the_plan_listing() {
        assert_eq!(PlanVerdict::Create.to_string(), "create");
        assert_eq!(
            PlanVerdict::Fallback("too many files".to_string()).to_string(),
            "fallback (too many files)"
        );
    }
}
