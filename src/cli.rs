use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;

use crate::core::{ArtifactKind, Engine};

#[derive(Parser)]
#[command(name = "treescribe")]
#[command(about = "Writes documentation, test plans and code reviews into every directory, bottom-up")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate one kind of artifact for a directory tree
    Generate {
        /// Artifact to write
        #[arg(value_enum)]
        kind: ArtifactKind,

        /// Root of the tree (defaults to current directory)
        path: Option<PathBuf>,

        /// Regenerate artifacts that already exist
        #[arg(long)]
        update: bool,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what a run would do without calling the LLM
    Plan {
        /// Root of the tree (defaults to current directory)
        path: Option<PathBuf>,

        /// Artifact to plan for
        #[arg(short, long, value_enum, default_value_t = ArtifactKind::Docs)]
        kind: ArtifactKind,
    },

    /// List the available artifact tools
    Tools,

    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,
    },
}

fn path_or_current(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => Ok(std::env::current_dir()?),
    }
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let engine = Engine::new(self.config.as_deref())?;

        match self.command {
            Commands::Generate { kind, path, update, json } => {
                let path = path_or_current(path)?;
                let result = engine.generate(kind, &path, update).await?;

                if json {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                } else {
                    println!("{}", result);
                }

                if result.failed_generations > 0 {
                    anyhow::bail!("{} directories failed", result.failed_generations);
                }
                Ok(())
            }
            Commands::Plan { path, kind } => {
                let path = path_or_current(path)?;
                let plan = engine.plan(kind, &path).await?;
                let root = std::path::absolute(&path)?;

                for (index, entry) in plan.iter().enumerate() {
                    let relative = entry
                        .directory
                        .strip_prefix(&root)
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|_| entry.directory.display().to_string());
                    let relative = if relative.is_empty() { ".".to_string() } else { relative };
                    println!(
                        "{:>4}. {:<40} {:>3} files  {}",
                        index + 1,
                        relative,
                        entry.code_files,
                        entry.verdict
                    );
                }
                Ok(())
            }
            Commands::Tools => {
                for tool in engine.tools().iter() {
                    println!(
                        "{:<8} {:<24} {:<16} {}",
                        tool.kind.to_string(),
                        tool.name,
                        tool.output_filename,
                        tool.description
                    );
                }
                Ok(())
            }
            Commands::Init { path } => {
                let path = path_or_current(path)?;
                let written = engine.init(&path)?;
                println!("Created {}", written.display());
                Ok(())
            }
        }
    }
}
