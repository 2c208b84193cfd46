// src/core/collector.rs
use std::path::{Path, PathBuf};
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::config::file_extension;
use super::TreeScanner;
use super::scanner::display_name;

/// Content contributed to a parent's generation request by one subdirectory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildContentItem {
    /// Directory the content came from
    pub path: PathBuf,
    pub content: String,
}

/// Gathers what immediate subdirectories contribute to their parent
pub struct ChildContentCollector<'a> {
    scanner: &'a TreeScanner,
    artifact_filename: &'a str,
}

impl<'a> ChildContentCollector<'a> {
    pub fn new(scanner: &'a TreeScanner, artifact_filename: &'a str) -> Self {
        Self {
            scanner,
            artifact_filename,
        }
    }

    /// Subdirectory artifacts first, then inlined single-file directories
    pub async fn collect(&self, directory: &Path) -> Vec<ChildContentItem> {
        let mut items = self.collect_subdirectory_artifacts(directory).await;
        items.extend(self.collect_single_file_content(directory).await);
        items
    }

    /// Artifacts already written into immediate subdirectories, read verbatim
    pub async fn collect_subdirectory_artifacts(&self, directory: &Path) -> Vec<ChildContentItem> {
        let mut items = Vec::new();

        for subdirectory in self.scanner.list_subdirectories(directory) {
            let artifact_path = subdirectory.join(self.artifact_filename);
            if !artifact_path.is_file() {
                continue;
            }

            match tokio::fs::read_to_string(&artifact_path).await {
                Ok(content) => items.push(ChildContentItem {
                    path: subdirectory,
                    content,
                }),
                Err(e) => warn!("Could not read {}: {}", artifact_path.display(), e),
            }
        }

        debug!("{}: {} subdirectory artifacts", directory.display(), items.len());
        items
    }

    /// Raw content of subdirectories holding exactly one qualifying file.
    /// Files over the per-file size limit are left out silently.
    pub async fn collect_single_file_content(&self, directory: &Path) -> Vec<ChildContentItem> {
        let max_file_size = self.scanner.config().max_file_size;
        let mut items = Vec::new();

        for subdirectory in self.scanner.list_subdirectories(directory) {
            let code_files = self.scanner.get_code_files(&subdirectory);
            let [file] = code_files.as_slice() else {
                continue;
            };

            let within_limit = tokio::fs::metadata(file)
                .await
                .map(|metadata| metadata.len() <= max_file_size)
                .unwrap_or(false);
            if !within_limit {
                continue;
            }

            let Ok(raw) = tokio::fs::read_to_string(file).await else {
                continue;
            };

            items.push(ChildContentItem {
                content: format_single_file(directory, &subdirectory, file, &raw),
                path: subdirectory,
            });
        }

        debug!("{}: {} inlined single-file directories", directory.display(), items.len());
        items
    }
}

fn format_single_file(parent: &Path, subdirectory: &Path, file: &Path, raw: &str) -> String {
    let relative = file
        .strip_prefix(parent)
        .unwrap_or(file)
        .to_string_lossy()
        .replace('\\', "/");
    let language = file_extension(file).unwrap_or_default();
    let fence = code_fence_for(raw);

    format!(
        "# {} - {}\n\nThis file is from a single-file directory: {}\n\n{}{}\n{}\n{}\n",
        display_name(subdirectory),
        display_name(file),
        relative,
        fence,
        language,
        raw.trim_end_matches('\n'),
        fence
    )
}

/// A backtick fence longer than any run inside the content
pub(crate) fn code_fence_for(raw: &str) -> String {
    let longest_run = raw
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest_run.max(2) + 1)
}
