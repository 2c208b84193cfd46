// src/core/generator.rs
use std::path::Path;
use std::sync::Arc;
use async_trait::async_trait;
use regex::Regex;
use sha2::{Sha256, Digest};
use tracing::{debug, info};

use crate::error::Result;
use super::aggregator::{ArtifactGenerator, GenerationOutcome, GenerationRequest};
use super::collector::code_fence_for;
use super::llm::{CompletionRequest, LlmDocumenter};
use super::scanner::display_name;
use super::tools::{ArtifactTool, PromptRole};

/// Writes one artifact per directory by asking the LLM
pub struct LlmGenerator {
    tool: ArtifactTool,
    documenter: Arc<dyn LlmDocumenter>,
    wrapping_fence: Regex,
}

impl LlmGenerator {
    pub fn new(tool: &ArtifactTool, documenter: Arc<dyn LlmDocumenter>) -> Result<Self> {
        Ok(Self {
            tool: tool.clone(),
            documenter,
            wrapping_fence: Regex::new(r"(?s)\A\s*```(?:markdown|md)?[ \t]*\r?\n(.*?)\r?\n```\s*\z")?,
        })
    }

    /// User prompt: role instructions, the directory's own files, then child content
    pub fn build_prompt(&self, request: &GenerationRequest<'_>) -> String {
        let role = PromptRole::select(request.is_top_level, !request.child_content.is_empty());
        let mut prompt = String::new();

        prompt.push_str(self.tool.prompts.instructions(role));
        prompt.push_str("\n\n");

        prompt.push_str(&format!(
            "Directory: {} ({})\n",
            display_name(request.directory),
            request.directory.display()
        ));

        let analysis = request.analysis;
        if analysis.analyzed_files.is_empty() {
            prompt.push_str("\nThis directory has no code files of its own.\n");
        } else {
            prompt.push_str(&format!("\n## Files ({})\n", analysis.analyzed_files.len()));
            for file in &analysis.analyzed_files {
                let name = file
                    .path
                    .strip_prefix(request.directory)
                    .unwrap_or(&file.path)
                    .display()
                    .to_string();
                let fence = code_fence_for(&file.content);
                prompt.push_str(&format!(
                    "\n### {}\n\n{}{}\n{}\n{}\n",
                    name,
                    fence,
                    file.extension,
                    file.content.trim_end_matches('\n'),
                    fence
                ));
            }
        }

        if !analysis.excluded_files.is_empty() {
            prompt.push_str("\n## Files not included\n\n");
            for file in &analysis.excluded_files {
                prompt.push_str(&format!("- {}: {}\n", display_name(&file.path), file.reason));
            }
        }

        if !request.child_content.is_empty() {
            prompt.push_str(&format!(
                "\n## Subdirectory content ({})\n",
                request.child_content.len()
            ));
            for item in request.child_content {
                let name = item
                    .path
                    .strip_prefix(request.directory)
                    .unwrap_or(&item.path)
                    .display()
                    .to_string();
                prompt.push_str(&format!("\n<subdirectory path=\"{}\">\n", name));
                prompt.push_str(item.content.trim_end_matches('\n'));
                prompt.push_str("\n</subdirectory>\n");
            }
        }

        prompt
    }

    /// Remove a single fence wrapping the whole reply
    fn clean_response(&self, content: &str) -> String {
        match self.wrapping_fence.captures(content) {
            Some(caps) => caps[1].to_string(),
            None => content.trim().to_string(),
        }
    }

    fn metadata_header(&self, prompt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prompt.as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        format!(
            "<!-- {} | {} | generated {} | inputs sha256:{} -->\n\n",
            self.tool.name,
            self.documenter.model_name(),
            chrono::Utc::now().to_rfc3339(),
            &digest[..16]
        )
    }

    async fn write_artifact(&self, request: &GenerationRequest<'_>, output_path: &Path) -> Result<String> {
        let prompt = self.build_prompt(request);
        debug!(
            "Requesting {} for {} ({} prompt chars)",
            self.tool.output_filename,
            request.directory.display(),
            prompt.len()
        );

        let response = self
            .documenter
            .complete(CompletionRequest {
                system_prompt: self.tool.prompts.system.to_string(),
                prompt: prompt.clone(),
            })
            .await?;
        debug!(
            "{} replied for {}: {:?}",
            self.documenter.provider_name(),
            request.directory.display(),
            response.metadata
        );

        let mut content = self.metadata_header(&prompt);
        content.push_str(&self.clean_response(&response.content));
        content.push('\n');

        tokio::fs::write(output_path, &content).await?;
        Ok(content)
    }
}

#[async_trait]
impl ArtifactGenerator for LlmGenerator {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<GenerationOutcome> {
        let output_path = request.directory.join(self.tool.output_filename);
        let is_update = tokio::fs::try_exists(&output_path).await?;

        if is_update && !request.update_existing {
            let content = tokio::fs::read_to_string(&output_path).await?;
            debug!("Keeping existing {}", output_path.display());
            return Ok(GenerationOutcome {
                output_path,
                success: true,
                content,
                error: None,
                is_update,
                skipped: true,
            });
        }

        match self.write_artifact(&request, &output_path).await {
            Ok(content) => {
                info!(
                    "{} {}",
                    if is_update { "Updated" } else { "Wrote" },
                    output_path.display()
                );
                Ok(GenerationOutcome {
                    output_path,
                    success: true,
                    content,
                    error: None,
                    is_update,
                    skipped: false,
                })
            }
            Err(e) => Ok(GenerationOutcome {
                output_path,
                success: false,
                content: String::new(),
                error: Some(e.to_string()),
                is_update,
                skipped: false,
            }),
        }
    }
}
