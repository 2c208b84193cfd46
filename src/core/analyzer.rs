// src/core/analyzer.rs
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::config::{file_extension, is_markdown, CrawlConfig};

pub const MARKDOWN_EXCLUDED: &str = "documentation file excluded from code analysis";
pub const FILE_COUNT_EXCLUDED: &str = "excluded due to file count limit";

/// A file whose content will be sent to the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedFile {
    pub path: PathBuf,
    pub content: String,
    pub extension: String,
    pub size: u64,
}

/// A file left out of generation, with a human-readable reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Per-directory outcome of file selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analyzed_files: Vec<AnalyzedFile>,
    pub excluded_files: Vec<ExcludedFile>,

    /// Set only when a directory-wide limit (file count or aggregate size) was hit
    pub limited: bool,

    pub total_size: u64,
    pub limit_reason: Option<String>,
}

impl AnalysisResult {
    fn exclude(&mut self, path: &Path, reason: impl Into<String>) {
        self.excluded_files.push(ExcludedFile {
            path: path.to_path_buf(),
            reason: reason.into(),
        });
    }
}

/// Decides which files of a directory are read and sent for generation
pub struct FileAnalyzer {
    config: CrawlConfig,
}

impl FileAnalyzer {
    pub fn new(config: &CrawlConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Select and read the files of one directory under the configured limits.
    ///
    /// The file-count limit takes precedence: it still analyzes the first
    /// `max_files_per_directory` candidates and lists every remaining one as
    /// excluded. The aggregate-size limit stops at the first file that would
    /// push the total past the ceiling, and neither that file nor any later
    /// one appears in the result.
    pub async fn analyze_files(&self, directory: &Path, file_paths: &[PathBuf]) -> AnalysisResult {
        let mut result = AnalysisResult::default();

        let mut candidates = Vec::new();
        for path in file_paths {
            if is_markdown(path) {
                result.exclude(path, MARKDOWN_EXCLUDED);
            } else if !self.config.is_code_extension(path) {
                result.exclude(path, "unsupported file type");
            } else {
                candidates.push(path);
            }
        }

        let max_files = self.config.max_files_per_directory;
        if candidates.len() > max_files {
            result.limited = true;
            result.limit_reason = Some(format!(
                "Directory contains {} code files, exceeding the limit of {} files per directory",
                candidates.len(),
                max_files
            ));

            for path in &candidates[..max_files] {
                self.analyze_file(path, &mut result).await;
            }
            for path in &candidates[max_files..] {
                result.exclude(path, FILE_COUNT_EXCLUDED);
            }

            debug!(
                "{}: file count limit hit ({} > {})",
                directory.display(),
                candidates.len(),
                max_files
            );
            return result;
        }

        let total_limit = self.config.total_size_limit();
        for path in candidates {
            let size = match tokio::fs::metadata(path).await {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    result.exclude(path, format!("error reading file: {}", e));
                    continue;
                }
            };

            if size <= self.config.max_file_size && result.total_size.saturating_add(size) > total_limit {
                result.limited = true;
                result.limit_reason = Some(format!(
                    "Total size of code files exceeds the limit of {} (analyzed {} before stopping)",
                    format_kb(total_limit),
                    format_kb(result.total_size)
                ));
                debug!("{}: aggregate size limit hit", directory.display());
                break;
            }

            self.analyze_sized_file(path, size, &mut result).await;
        }

        result
    }

    async fn analyze_file(&self, path: &Path, result: &mut AnalysisResult) {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => self.analyze_sized_file(path, metadata.len(), result).await,
            Err(e) => result.exclude(path, format!("error reading file: {}", e)),
        }
    }

    async fn analyze_sized_file(&self, path: &Path, size: u64, result: &mut AnalysisResult) {
        if size > self.config.max_file_size {
            result.exclude(
                path,
                format!(
                    "file too large ({}, limit {})",
                    format_kb(size),
                    format_kb(self.config.max_file_size)
                ),
            );
            return;
        }

        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                result.total_size += size;
                result.analyzed_files.push(AnalyzedFile {
                    path: path.to_path_buf(),
                    content,
                    extension: file_extension(path).unwrap_or_default(),
                    size,
                });
            }
            Err(e) => result.exclude(path, format!("error reading file: {}", e)),
        }
    }

    /// Whether a directory gets its own artifact.
    ///
    /// A directory with exactly one qualifying file and no subdirectories is
    /// deferred into its parent instead. A directory with no qualifying files
    /// is still documented when it has subdirectories to summarize.
    pub fn should_document(&self, directory: &Path, file_paths: &[PathBuf], has_subdirectories: bool) -> bool {
        let qualifying = file_paths
            .iter()
            .filter(|path| self.config.is_qualifying_file(path))
            .count();

        let eligible = match qualifying {
            0 | 1 => has_subdirectories,
            _ => true,
        };

        debug!(
            "{}: {} qualifying files, subdirectories={}, eligible={}",
            directory.display(),
            qualifying,
            has_subdirectories,
            eligible
        );
        eligible
    }
}

pub(crate) fn format_kb(bytes: u64) -> String {
    format!("{:.1}KB", bytes as f64 / 1024.0)
}
