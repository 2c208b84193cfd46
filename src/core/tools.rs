// src/core/tools.rs
use std::fmt;
use clap::ValueEnum;
use serde::{Serialize, Deserialize};

/// The kinds of artifact the crawler can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Per-directory documentation
    Docs,
    /// Per-directory test plans
    Tests,
    /// Per-directory code reviews
    Review,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Docs => "docs",
            ArtifactKind::Tests => "tests",
            ArtifactKind::Review => "review",
        };
        f.write_str(name)
    }
}

/// Which prompt a directory gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    Directory,
    DirectoryWithChildren,
    TopLevel,
    TopLevelWithChildren,
}

impl PromptRole {
    pub fn select(is_top_level: bool, has_child_content: bool) -> Self {
        match (is_top_level, has_child_content) {
            (false, false) => PromptRole::Directory,
            (false, true) => PromptRole::DirectoryWithChildren,
            (true, false) => PromptRole::TopLevel,
            (true, true) => PromptRole::TopLevelWithChildren,
        }
    }
}

/// Instructions sent to the LLM for one artifact kind
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub system: &'static str,
    pub directory: &'static str,
    pub directory_with_children: &'static str,
    pub top_level: &'static str,
    pub top_level_with_children: &'static str,
}

impl PromptSet {
    pub fn instructions(&self, role: PromptRole) -> &'static str {
        match role {
            PromptRole::Directory => self.directory,
            PromptRole::DirectoryWithChildren => self.directory_with_children,
            PromptRole::TopLevel => self.top_level,
            PromptRole::TopLevelWithChildren => self.top_level_with_children,
        }
    }
}

/// One artifact generator configuration: what to write, where, and how to ask for it
#[derive(Debug, Clone)]
pub struct ArtifactTool {
    pub kind: ArtifactKind,
    pub name: &'static str,
    pub description: &'static str,
    pub output_filename: &'static str,
    pub fallback_filename: &'static str,
    pub prompts: PromptSet,
}

/// Lookup table of the available artifact tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ArtifactTool>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self {
            tools: vec![documentation_tool(), test_plan_tool(), code_review_tool()],
        }
    }
}

impl ToolRegistry {
    pub fn get(&self, kind: ArtifactKind) -> Option<&ArtifactTool> {
        self.tools.iter().find(|tool| tool.kind == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArtifactTool> {
        self.tools.iter()
    }
}

fn documentation_tool() -> ArtifactTool {
    ArtifactTool {
        kind: ArtifactKind::Docs,
        name: "generate_documentation",
        description: "Write DOCUMENTATION.md into every directory, bottom-up",
        output_filename: "DOCUMENTATION.md",
        fallback_filename: "DOCUMENTATION_FALLBACK.md",
        prompts: PromptSet {
            system: "You are an expert technical writer. You document source code for the developers who maintain it. \
                     Respond with GitHub-flavored markdown only.",
            directory: "Write documentation for this directory. Describe its purpose, the role of each file, \
                        the main types and functions, and how they are used.",
            directory_with_children: "Write documentation for this directory. Describe its purpose and the role of each file, \
                                      and explain how it relates to the subdirectories summarized below. \
                                      Link the subdirectory documentation where helpful instead of repeating it.",
            top_level: "Write the top-level documentation for this project. Cover what the project does, \
                        how the code is organized, how to build and run it, and its main entry points.",
            top_level_with_children: "Write the top-level documentation for this project. Use the subdirectory documentation \
                                      below to give an architecture overview: what each part does, how the parts interact, \
                                      and where a new contributor should start.",
        },
    }
}

fn test_plan_tool() -> ArtifactTool {
    ArtifactTool {
        kind: ArtifactKind::Tests,
        name: "generate_test_plan",
        description: "Write TEST_PLAN.md into every directory, bottom-up",
        output_filename: "TEST_PLAN.md",
        fallback_filename: "TEST_PLAN_FALLBACK.md",
        prompts: PromptSet {
            system: "You are a senior test engineer. You design practical, prioritized test plans for source code. \
                     Respond with GitHub-flavored markdown only.",
            directory: "Write a test plan for the code in this directory. List unit tests per function or type, \
                        edge cases, error paths, and any fixtures or mocks they need.",
            directory_with_children: "Write a test plan for this directory. Cover its own files with unit tests and \
                                      describe integration tests across the subdirectories summarized below.",
            top_level: "Write the project-level test strategy: test levels, tooling, critical paths, \
                        and the order in which coverage should be added.",
            top_level_with_children: "Write the project-level test strategy. Combine the subdirectory test plans below \
                                      into end-to-end scenarios, shared fixtures, and a prioritized rollout.",
        },
    }
}

fn code_review_tool() -> ArtifactTool {
    ArtifactTool {
        kind: ArtifactKind::Review,
        name: "code_review",
        description: "Write CODE_REVIEW.md into every directory, bottom-up",
        output_filename: "CODE_REVIEW.md",
        fallback_filename: "CODE_REVIEW_FALLBACK.md",
        prompts: PromptSet {
            system: "You are a meticulous senior code reviewer. You point out bugs, risks and maintainability problems \
                     with concrete suggestions. Respond with GitHub-flavored markdown only.",
            directory: "Review the code in this directory. Report bugs, security issues, performance problems \
                        and readability concerns, each with file, severity and a suggested fix.",
            directory_with_children: "Review the code in this directory and how it uses the subdirectories summarized below. \
                                      Report issues in its own files and problems at the boundaries between modules.",
            top_level: "Review this project as a whole: architecture, error handling, dependency hygiene, \
                        and the most important issues to fix first.",
            top_level_with_children: "Write the project-level review. Consolidate the subdirectory reviews below into \
                                      cross-cutting themes and a prioritized list of fixes.",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_one_tool_per_kind() {
        let registry = ToolRegistry::default();

        for kind in [ArtifactKind::Docs, ArtifactKind::Tests, ArtifactKind::Review] {
            let tool = registry.get(kind).unwrap();
            assert_eq!(tool.kind, kind);
            assert!(tool.output_filename.ends_with(".md"));
            assert_ne!(tool.output_filename, tool.fallback_filename);
        }
        assert_eq!(registry.iter().count(), 3);
    }

    #[test]
    fn role_follows_position_and_children() {
        let prompts = ToolRegistry::default()
            .get(ArtifactKind::Docs)
            .unwrap()
            .prompts
            .clone();

        assert_eq!(PromptRole::select(false, false), PromptRole::Directory);
        assert_eq!(PromptRole::select(true, true), PromptRole::TopLevelWithChildren);
        assert_eq!(
            prompts.instructions(PromptRole::select(true, false)),
            prompts.top_level
        );
        assert_eq!(
            prompts.instructions(PromptRole::select(false, true)),
            prompts.directory_with_children
        );
    }
}
