// src/core/aggregator.rs
use std::fmt;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use tracing::{debug, info, warn};

use crate::config::CrawlConfig;
use crate::error::Result;
use super::{
    AnalysisResult, ChildContentCollector, ChildContentItem, FileAnalyzer, IgnoreOracle,
    TreeScanner,
};
use super::tools::ArtifactTool;

/// Everything the generator needs for one directory
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub directory: &'a Path,
    pub analysis: &'a AnalysisResult,
    pub is_top_level: bool,
    pub child_content: &'a [ChildContentItem],
    pub update_existing: bool,
}

/// What happened when an artifact was requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub output_path: PathBuf,
    pub success: bool,
    pub content: String,
    pub error: Option<String>,

    /// An artifact already existed at `output_path` before the call
    pub is_update: bool,

    /// An artifact existed and overwriting was not allowed
    pub skipped: bool,
}

/// Writes the artifact for one directory
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<GenerationOutcome>;
}

/// Produces the diagnostic written instead of an artifact when limits are hit
pub trait FallbackReporter: Send + Sync {
    fn fallback_content(&self, directory: &Path, analysis: &AnalysisResult) -> Result<String>;
}

/// Receives one call per visited directory
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, relative_directory: &str, file_count: usize, current_index: usize, total_directories: usize);
}

/// Progress reported through tracing
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_progress(&self, relative_directory: &str, file_count: usize, current_index: usize, total_directories: usize) {
        info!(
            "[{}/{}] {} ({} code files)",
            current_index, total_directories, relative_directory, file_count
        );
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryError {
    pub directory: PathBuf,
    pub error: String,
}

/// Run-level counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub total_directories: usize,
    pub successful_generations: usize,
    pub failed_generations: usize,
    pub fallback_files: usize,
    pub updated_generations: usize,
    pub skipped_generations: usize,
    pub errors: Vec<DirectoryError>,
}

impl AggregationResult {
    fn record_error(&mut self, directory: &Path, error: impl Into<String>) {
        self.errors.push(DirectoryError {
            directory: directory.to_path_buf(),
            error: error.into(),
        });
    }
}

impl fmt::Display for AggregationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Directories visited:   {}", self.total_directories)?;
        writeln!(f, "Generated:             {}", self.successful_generations)?;
        writeln!(f, "  updated existing:    {}", self.updated_generations)?;
        writeln!(f, "  skipped existing:    {}", self.skipped_generations)?;
        writeln!(f, "Fallback reports:      {}", self.fallback_files)?;
        write!(f, "Failed:                {}", self.failed_generations)?;

        if !self.errors.is_empty() {
            writeln!(f)?;
            writeln!(f, "Errors:")?;
            for (i, error) in self.errors.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                write!(f, "  - {}: {}", error.directory.display(), error.error)?;
            }
        }
        Ok(())
    }
}

/// Per-directory verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectoryState {
    SkippedIneligible,
    LimitedFallback,
    Generated,
    Failed,
}

/// Drives the bottom-up pass: analyze, collect, generate, count
pub struct AggregationDriver<'a> {
    config: CrawlConfig,
    tool: &'a ArtifactTool,
    generator: &'a dyn ArtifactGenerator,
    fallback: &'a dyn FallbackReporter,
    progress: &'a dyn ProgressSink,
}

impl<'a> AggregationDriver<'a> {
    pub fn new(
        config: &CrawlConfig,
        tool: &'a ArtifactTool,
        generator: &'a dyn ArtifactGenerator,
        fallback: &'a dyn FallbackReporter,
        progress: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            config: config.clone(),
            tool,
            generator,
            fallback,
            progress,
        }
    }

    /// Process every directory under `root`, children before parents.
    ///
    /// Never fails: per-directory problems land in `errors`, and a root that
    /// cannot be scanned yields a single error keyed by the root path.
    pub async fn run(&self, root: &Path, update_existing: bool) -> AggregationResult {
        let mut result = AggregationResult::default();

        let root = match std::path::absolute(root) {
            Ok(root) => root,
            Err(e) => {
                result.record_error(root, format!("Cannot resolve root path: {}", e));
                return result;
            }
        };

        let scanner = match IgnoreOracle::load(&root, &self.config) {
            Ok(oracle) => TreeScanner::new(&self.config, oracle),
            Err(e) => {
                result.record_error(&root, e.to_string());
                return result;
            }
        };

        let order = match scanner.create_bottom_up_order(&root) {
            Ok(order) => order,
            Err(e) => {
                warn!("Aborting run: {}", e);
                result.record_error(&root, e.to_string());
                return result;
            }
        };

        result.total_directories = order.len();
        info!(
            "Processing {} directories under {} with {}",
            order.len(),
            root.display(),
            self.tool.name
        );

        let analyzer = FileAnalyzer::new(&self.config);
        let collector = ChildContentCollector::new(&scanner, self.tool.output_filename);

        for (index, directory) in order.iter().enumerate() {
            let code_files = scanner.get_code_files(directory);
            self.progress.on_progress(
                &relative_display(&root, directory),
                code_files.len(),
                index + 1,
                order.len(),
            );

            let state = self
                .process_directory(
                    &root,
                    directory,
                    &code_files,
                    update_existing,
                    &scanner,
                    &analyzer,
                    &collector,
                    &mut result,
                )
                .await;

            let state = match state {
                Ok(state) => state,
                Err(e) => {
                    result.failed_generations += 1;
                    result.record_error(directory, e.to_string());
                    DirectoryState::Failed
                }
            };
            debug!("{} -> {:?}", directory.display(), state);
        }

        info!(
            "Finished {}: {} generated, {} fallback, {} failed",
            self.tool.name,
            result.successful_generations,
            result.fallback_files,
            result.failed_generations
        );
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_directory(
        &self,
        root: &Path,
        directory: &Path,
        code_files: &[PathBuf],
        update_existing: bool,
        scanner: &TreeScanner,
        analyzer: &FileAnalyzer,
        collector: &ChildContentCollector<'_>,
        result: &mut AggregationResult,
    ) -> Result<DirectoryState> {
        let has_subdirectories = scanner.has_subdirectories(directory);
        if !analyzer.should_document(directory, code_files, has_subdirectories) {
            return Ok(DirectoryState::SkippedIneligible);
        }

        let subdirectory_artifacts = collector.collect_subdirectory_artifacts(directory).await;
        let single_file_content = collector.collect_single_file_content(directory).await;

        let analysis = analyzer.analyze_files(directory, code_files).await;

        if analysis.limited {
            let content = self.fallback.fallback_content(directory, &analysis)?;
            let fallback_path = directory.join(self.tool.fallback_filename);
            tokio::fs::write(&fallback_path, content).await?;
            warn!(
                "{}: {}; wrote {}",
                directory.display(),
                analysis.limit_reason.as_deref().unwrap_or("limits exceeded"),
                fallback_path.display()
            );
            result.fallback_files += 1;
            return Ok(DirectoryState::LimitedFallback);
        }

        let mut child_content = subdirectory_artifacts;
        child_content.extend(single_file_content);

        let request = GenerationRequest {
            directory,
            analysis: &analysis,
            is_top_level: directory == root,
            child_content: &child_content,
            update_existing,
        };

        let outcome = match self.generator.generate(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("{}: generation failed: {}", directory.display(), e);
                result.failed_generations += 1;
                result.record_error(directory, e.to_string());
                return Ok(DirectoryState::Failed);
            }
        };

        if !outcome.success {
            let error = outcome
                .error
                .unwrap_or_else(|| "generation failed".to_string());
            warn!("{}: generation failed: {}", directory.display(), error);
            result.failed_generations += 1;
            result.record_error(directory, error);
            return Ok(DirectoryState::Failed);
        }

        result.successful_generations += 1;
        if outcome.skipped {
            result.skipped_generations += 1;
        } else if outcome.is_update {
            result.updated_generations += 1;
        }

        Ok(DirectoryState::Generated)
    }
}

fn relative_display(root: &Path, directory: &Path) -> String {
    match directory.strip_prefix(root) {
        Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
        Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
        Err(_) => directory.display().to_string(),
    }
}
