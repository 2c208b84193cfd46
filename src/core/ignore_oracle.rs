// src/core/ignore_oracle.rs
use std::path::{Path, PathBuf};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::{debug, warn};

use crate::config::CrawlConfig;
use crate::error::{TreescribeError, Result};

/// Answers "should this path be skipped" using gitignore rules rooted at the crawl root
#[derive(Debug, Clone)]
pub struct IgnoreOracle {
    root: PathBuf,
    matcher: Gitignore,
}

impl IgnoreOracle {
    /// Load the root-relative ignore file plus any configured extra patterns.
    /// A missing ignore file ignores nothing.
    pub fn load(root: &Path, config: &CrawlConfig) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);

        let ignore_path = root.join(&config.ignore_file);
        if ignore_path.is_file() {
            if let Some(err) = builder.add(&ignore_path) {
                // Partial errors still leave the valid globs in place
                warn!("Some rules in {} could not be parsed: {}", ignore_path.display(), err);
            }
            debug!("Loaded ignore rules from {}", ignore_path.display());
        }

        for pattern in &config.extra_ignore_patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| TreescribeError::Ignore(format!("{}: {}", pattern, e)))?;
        }

        let matcher = builder
            .build()
            .map_err(|e| TreescribeError::Ignore(e.to_string()))?;

        Ok(Self {
            root: root.to_path_buf(),
            matcher,
        })
    }

    /// True when the path (absolute, or relative to the root) matches an ignore rule
    pub fn should_ignore(&self, path: &Path) -> bool {
        let Some(relative) = self.normalize(path) else {
            return false;
        };
        if relative.is_empty() {
            return false;
        }

        let is_dir = self.root.join(&relative).is_dir();
        self.matcher
            .matched_path_or_any_parents(Path::new(&relative), is_dir)
            .is_ignore()
    }

    /// Keep only non-ignored paths, preserving order
    pub fn filter_paths(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths
            .iter()
            .filter(|path| !self.should_ignore(path))
            .cloned()
            .collect()
    }

    /// Root-relative path with forward slashes; None when outside the root
    fn normalize(&self, path: &Path) -> Option<String> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.root).ok()?
        } else {
            path
        };

        let normalized = relative
            .to_string_lossy()
            .replace('\\', "/")
            .trim_start_matches("./")
            .trim_matches('/')
            .to_string();
        Some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle_with(rules: &str) -> (tempfile::TempDir, IgnoreOracle) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), rules).unwrap();
        std::fs::create_dir_all(dir.path().join("build/out")).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();

        let config = CrawlConfig {
            extra_ignore_patterns: vec![],
            ..CrawlConfig::default()
        };
        let oracle = IgnoreOracle::load(dir.path(), &config).unwrap();
        (dir, oracle)
    }

    #[test]
    fn matches_absolute_and_relative_paths() {
        let (dir, oracle) = oracle_with("*.log\nbuild/\n");

        assert!(oracle.should_ignore(&dir.path().join("debug.log")));
        assert!(oracle.should_ignore(Path::new("src/trace.log")));
        assert!(oracle.should_ignore(&dir.path().join("build")));
        assert!(oracle.should_ignore(&dir.path().join("build/out/x.ts")));
        assert!(!oracle.should_ignore(&dir.path().join("src/main.ts")));
    }

    #[test]
    fn root_and_outside_paths_are_never_ignored() {
        let (dir, oracle) = oracle_with("*\n");

        assert!(!oracle.should_ignore(dir.path()));
        assert!(!oracle.should_ignore(Path::new("/definitely/elsewhere/file.ts")));
    }

    #[test]
    fn missing_ignore_file_ignores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = CrawlConfig {
            extra_ignore_patterns: vec![],
            ..CrawlConfig::default()
        };
        let oracle = IgnoreOracle::load(dir.path(), &config).unwrap();

        assert!(!oracle.should_ignore(&dir.path().join("anything.ts")));
    }

    #[test]
    fn extra_patterns_apply_without_ignore_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        let oracle = IgnoreOracle::load(dir.path(), &CrawlConfig::default()).unwrap();

        assert!(oracle.should_ignore(&dir.path().join("node_modules")));
        assert!(oracle.should_ignore(&dir.path().join("node_modules/pkg/index.js")));
    }

    #[test]
    fn filter_paths_preserves_order() {
        let (dir, oracle) = oracle_with("*.log\n");
        let paths = vec![
            dir.path().join("b.ts"),
            dir.path().join("a.log"),
            dir.path().join("a.ts"),
        ];

        assert_eq!(
            oracle.filter_paths(&paths),
            vec![dir.path().join("b.ts"), dir.path().join("a.ts")]
        );
    }
}
