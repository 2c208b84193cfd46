// src/core/fallback.rs
use std::path::Path;
use serde::Serialize;
use tera::{Context, Tera};

use crate::config::CrawlConfig;
use crate::error::Result;
use super::aggregator::FallbackReporter;
use super::analyzer::{format_kb, AnalysisResult};
use super::scanner::display_name;
use super::tools::ArtifactTool;

const FALLBACK_TEMPLATE: &str = r#"# {{ tool_name }}: limits exceeded in `{{ directory_name }}`

No `{{ output_filename }}` was generated for this directory because it exceeds the configured analysis limits.

**Reason:** {{ limit_reason }}

| Limit | Value |
|-------|-------|
| Files per directory | {{ max_files }} |
| Size per file | {{ max_file_size }} |
| Total size per directory | {{ max_total_size }} |

## Analyzed files ({{ analyzed | length }}, {{ total_size }})

{% for file in analyzed -%}
- `{{ file.name }}` ({{ file.size }})
{% endfor -%}
{% if not analyzed -%}
_None._
{% endif %}
## Excluded files ({{ excluded | length }})

{% for file in excluded -%}
- `{{ file.name }}`: {{ file.reason }}
{% endfor -%}
{% if not excluded -%}
_None._
{% endif %}
## How to fix

1. Split `{{ directory_name }}` into smaller subdirectories so each stays under the limits.
2. Add generated, vendored or fixture files to `{{ ignore_file }}` so they are skipped.
3. Raise `max_files_per_directory` or `max_file_size` in the `[crawl]` section of the configuration.
4. Delete this file and rerun once the directory fits.
"#;

#[derive(Serialize)]
struct ReportedFile {
    name: String,
    size: String,
    reason: String,
}

/// Renders the diagnostic markdown written when a directory exceeds its limits
pub struct TemplateFallbackReporter {
    tool_name: String,
    output_filename: String,
    config: CrawlConfig,
}

impl TemplateFallbackReporter {
    pub fn new(tool: &ArtifactTool, config: &CrawlConfig) -> Self {
        Self {
            tool_name: tool.name.to_string(),
            output_filename: tool.output_filename.to_string(),
            config: config.clone(),
        }
    }
}

impl FallbackReporter for TemplateFallbackReporter {
    fn fallback_content(&self, directory: &Path, analysis: &AnalysisResult) -> Result<String> {
        let relative_name = |path: &Path| {
            path.strip_prefix(directory)
                .unwrap_or(path)
                .to_string_lossy()
                .to_string()
        };

        let analyzed: Vec<ReportedFile> = analysis
            .analyzed_files
            .iter()
            .map(|file| ReportedFile {
                name: relative_name(&file.path),
                size: format_kb(file.size),
                reason: String::new(),
            })
            .collect();

        let excluded: Vec<ReportedFile> = analysis
            .excluded_files
            .iter()
            .map(|file| ReportedFile {
                name: relative_name(&file.path),
                size: String::new(),
                reason: file.reason.clone(),
            })
            .collect();

        let mut context = Context::new();
        context.insert("tool_name", &self.tool_name);
        context.insert("output_filename", &self.output_filename);
        context.insert("directory_name", &display_name(directory));
        context.insert(
            "limit_reason",
            analysis.limit_reason.as_deref().unwrap_or("directory limits exceeded"),
        );
        context.insert("max_files", &self.config.max_files_per_directory);
        context.insert("max_file_size", &format_kb(self.config.max_file_size));
        context.insert("max_total_size", &format_kb(self.config.total_size_limit()));
        context.insert("total_size", &format_kb(analysis.total_size));
        context.insert("ignore_file", &self.config.ignore_file);
        context.insert("analyzed", &analyzed);
        context.insert("excluded", &excluded);

        Ok(Tera::one_off(FALLBACK_TEMPLATE, &context, false)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analyzer::{AnalyzedFile, ExcludedFile};
    use crate::core::tools::{ArtifactKind, ToolRegistry};
    use std::path::PathBuf;

    fn reporter() -> TemplateFallbackReporter {
        let registry = ToolRegistry::default();
        let tool = registry.get(ArtifactKind::Docs).unwrap();
        let config = CrawlConfig {
            max_files_per_directory: 1,
            ..CrawlConfig::default()
        };
        TemplateFallbackReporter::new(tool, &config)
    }

    #[test]
    fn report_lists_reason_and_files() {
        let directory = PathBuf::from("/proj/generated");
        let analysis = AnalysisResult {
            analyzed_files: vec![AnalyzedFile {
                path: directory.join("a.ts"),
                content: "a".to_string(),
                extension: "ts".to_string(),
                size: 2048,
            }],
            excluded_files: vec![ExcludedFile {
                path: directory.join("b.ts"),
                reason: "excluded due to file count limit".to_string(),
            }],
            limited: true,
            total_size: 2048,
            limit_reason: Some("Directory contains 2 code files, exceeding the limit of 1 files per directory".to_string()),
        };

        let report = reporter().fallback_content(&directory, &analysis).unwrap();

        assert!(report.starts_with("# generate_documentation: limits exceeded in `generated`"));
        assert!(report.contains("No `DOCUMENTATION.md` was generated"));
        assert!(report.contains("**Reason:** Directory contains 2 code files"));
        assert!(report.contains("- `a.ts` (2.0KB)"));
        assert!(report.contains("- `b.ts`: excluded due to file count limit"));
        assert!(report.contains("| Files per directory | 1 |"));
        assert!(report.contains("`.gitignore`"));
    }

    #[test]
    fn empty_sections_say_none() {
        let analysis = AnalysisResult {
            limited: true,
            limit_reason: Some("too big".to_string()),
            ..AnalysisResult::default()
        };

        let report = reporter()
            .fallback_content(Path::new("/proj/x"), &analysis)
            .unwrap();

        assert_eq!(report.matches("_None._").count(), 2);
    }
}
