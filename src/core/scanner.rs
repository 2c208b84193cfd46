// src/core/scanner.rs
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};
use tracing::{debug, warn};

use crate::config::CrawlConfig;
use crate::error::{TreescribeError, Result};
use super::IgnoreOracle;

/// One directory of a scanned tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    /// Absolute path, unique within a scan
    pub path: PathBuf,

    /// Final path segment
    pub name: String,

    /// Files directly inside this directory
    pub files: Vec<PathBuf>,

    /// Child directories, owned exclusively by this node
    pub subdirectories: Vec<DirectoryNode>,
}

impl DirectoryNode {
    fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            name: display_name(path),
            files: Vec::new(),
            subdirectories: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.subdirectories.is_empty()
    }
}

/// Walks a root directory applying ignore rules and hidden-file filtering at every level
pub struct TreeScanner {
    config: CrawlConfig,
    oracle: IgnoreOracle,
}

impl TreeScanner {
    pub fn new(config: &CrawlConfig, oracle: IgnoreOracle) -> Self {
        Self {
            config: config.clone(),
            oracle,
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Scan the whole tree. The root must be a readable directory; below it an
    /// unreadable directory becomes an empty leaf.
    pub fn scan(&self, root: &Path) -> Result<DirectoryNode> {
        let metadata = std::fs::metadata(root).map_err(|e| {
            TreescribeError::FileSystem(format!("Cannot scan {}: {}", root.display(), e))
        })?;
        if !metadata.is_dir() {
            return Err(TreescribeError::FileSystem(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        // Surface an unreadable root instead of degrading it to an empty tree
        self.list_entries(root)?;

        Ok(self.scan_directory(root))
    }

    fn scan_directory(&self, path: &Path) -> DirectoryNode {
        let entries = match self.list_entries(path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Skipping unreadable directory {}: {}", path.display(), e);
                return DirectoryNode::empty(path);
            }
        };

        let mut node = DirectoryNode::empty(path);
        for entry in entries {
            let file_type = entry.file_type();
            if file_type.is_dir() {
                node.subdirectories.push(self.scan_directory(entry.path()));
            } else if file_type.is_file() {
                node.files.push(entry.into_path());
            }
        }

        node
    }

    /// Post-order linearization: every subdirectory precedes its parent, each path once
    pub fn create_bottom_up_order(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let tree = self.scan(root)?;

        let mut order = Vec::new();
        let mut visited = HashSet::new();
        Self::post_order(&tree, &mut visited, &mut order);

        debug!("Bottom-up order for {} covers {} directories", root.display(), order.len());
        Ok(order)
    }

    fn post_order(node: &DirectoryNode, visited: &mut HashSet<PathBuf>, order: &mut Vec<PathBuf>) {
        if !visited.insert(node.path.clone()) {
            return;
        }
        for child in &node.subdirectories {
            Self::post_order(child, visited, order);
        }
        order.push(node.path.clone());
    }

    /// Fresh shallow check; does not reuse an earlier scan
    pub fn has_subdirectories(&self, path: &Path) -> bool {
        self.immediate_subdirectories(path).next().is_some()
    }

    /// Immediate, non-ignored, visible subdirectories in name order
    pub fn list_subdirectories(&self, path: &Path) -> Vec<PathBuf> {
        self.immediate_subdirectories(path).collect()
    }

    fn immediate_subdirectories(&self, path: &Path) -> impl Iterator<Item = PathBuf> {
        self.list_entries(path)
            .unwrap_or_default()
            .into_iter()
            .filter(|entry| entry.file_type().is_dir())
            .map(DirEntry::into_path)
    }

    /// Immediate qualifying code files in name order
    pub fn get_code_files(&self, path: &Path) -> Vec<PathBuf> {
        self.list_entries(path)
            .unwrap_or_default()
            .into_iter()
            .filter(|entry| entry.file_type().is_file())
            .map(DirEntry::into_path)
            .filter(|file| self.config.is_qualifying_file(file))
            .collect()
    }

    /// Shallow listing with ignore, hidden and symlink filtering applied
    fn list_entries(&self, dir: &Path) -> Result<Vec<DirEntry>> {
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        let mut entries = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                TreescribeError::FileSystem(format!("Cannot read {}: {}", dir.display(), e))
            })?;

            if entry.path_is_symlink() {
                continue;
            }
            if !self.config.include_hidden && is_hidden(&entry) {
                continue;
            }
            if self.oracle.should_ignore(entry.path()) {
                continue;
            }
            entries.push(entry);
        }

        Ok(entries)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scanner_for(root: &Path, config: CrawlConfig) -> TreeScanner {
        let oracle = IgnoreOracle::load(root, &config).unwrap();
        TreeScanner::new(&config, oracle)
    }

    fn sample_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "main.ts", "export {}");
        write(root, "api/handlers/users.ts", "u");
        write(root, "api/handlers/orders.ts", "o");
        write(root, "api/routes.ts", "r");
        write(root, "lib/util.ts", "x");
        write(root, ".cache/blob.ts", "hidden");
        write(root, "node_modules/dep/index.js", "dep");
        write(root, "logs/run.ts", "ignored");
        write(root, ".gitignore", "logs/\n");
        dir
    }

    #[test]
    fn scan_builds_filtered_tree() {
        let dir = sample_tree();
        let scanner = scanner_for(dir.path(), CrawlConfig::default());

        let tree = scanner.scan(dir.path()).unwrap();
        let names: Vec<_> = tree.subdirectories.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["api", "lib"]);
        assert_eq!(tree.files, vec![dir.path().join("main.ts")]);

        let api = &tree.subdirectories[0];
        assert_eq!(api.files, vec![dir.path().join("api/routes.ts")]);
        assert_eq!(api.subdirectories.len(), 1);
        assert!(api.subdirectories[0].is_leaf());
        assert_eq!(api.subdirectories[0].files.len(), 2);
    }

    #[test]
    fn hidden_entries_included_when_configured() {
        let dir = sample_tree();
        let config = CrawlConfig {
            include_hidden: true,
            ..CrawlConfig::default()
        };
        let scanner = scanner_for(dir.path(), config);

        let tree = scanner.scan(dir.path()).unwrap();
        assert!(tree.subdirectories.iter().any(|n| n.name == ".cache"));
        assert!(tree.files.contains(&dir.path().join(".gitignore")));
    }

    #[test]
    fn bottom_up_order_puts_children_first() {
        let dir = sample_tree();
        let root = dir.path();
        let scanner = scanner_for(root, CrawlConfig::default());

        let order = scanner.create_bottom_up_order(root).unwrap();
        assert_eq!(
            order,
            vec![
                root.join("api/handlers"),
                root.join("api"),
                root.join("lib"),
                root.to_path_buf(),
            ]
        );
    }

    #[test]
    fn every_subdirectory_precedes_its_parent_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for relative in ["a/b/c/d.ts", "a/e/f.ts", "g/h.ts", "a/x.ts"] {
            write(root, relative, "1");
        }
        let scanner = scanner_for(root, CrawlConfig::default());

        let order = scanner.create_bottom_up_order(root).unwrap();
        let unique: HashSet<_> = order.iter().collect();
        assert_eq!(unique.len(), order.len());
        assert_eq!(order.len(), 6);

        for (child_index, child) in order.iter().enumerate() {
            if let Some(parent) = child.parent() {
                if let Some(parent_index) = order.iter().position(|p| p == parent) {
                    assert!(child_index < parent_index, "{:?} after parent", child);
                }
            }
        }
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let scanner = scanner_for(dir.path(), CrawlConfig::default());

        assert!(scanner.scan(&missing).is_err());
        assert!(scanner.create_bottom_up_order(&missing).is_err());
    }

    #[test]
    fn file_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.ts", "1");
        let scanner = scanner_for(dir.path(), CrawlConfig::default());

        assert!(scanner.scan(&dir.path().join("a.ts")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_becomes_empty_leaf() {
        use std::os::unix::fs::PermissionsExt;

        let dir = sample_tree();
        let root = dir.path();
        write(root, "locked/secret.ts", "s");
        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can still list it; nothing to check then
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let scanner = scanner_for(root, CrawlConfig::default());
        let tree = scanner.scan(root);
        let order = scanner.create_bottom_up_order(root);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let tree = tree.unwrap();
        let names: Vec<_> = tree.subdirectories.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["api", "lib", "locked"]);

        let locked_node = &tree.subdirectories[2];
        assert!(locked_node.is_leaf());
        assert!(locked_node.files.is_empty());

        let order = order.unwrap();
        assert_eq!(order.len(), 5);
        assert_eq!(order.iter().filter(|p| **p == locked).count(), 1);
        assert_eq!(order.last().unwrap(), root);
    }

    #[test]
    fn shallow_queries_read_current_state() {
        let dir = sample_tree();
        let root = dir.path();
        let scanner = scanner_for(root, CrawlConfig::default());

        assert!(scanner.has_subdirectories(root));
        assert!(!scanner.has_subdirectories(&root.join("lib")));

        fs::create_dir(root.join("lib/nested")).unwrap();
        assert!(scanner.has_subdirectories(&root.join("lib")));

        // Ignored and hidden directories do not count
        fs::create_dir_all(root.join("only_ignored/logs")).unwrap();
        fs::create_dir_all(root.join("only_ignored/.git")).unwrap();
        assert!(!scanner.has_subdirectories(&root.join("only_ignored")));
    }

    #[test]
    fn code_files_respect_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for name in ["b.ts", "a.py", "notes.md", "image.png", ".hidden.ts", "trace.log"] {
            write(root, name, "data");
        }
        write(root, ".gitignore", "*.log\n");
        fs::create_dir(root.join("dir.ts")).unwrap();
        let scanner = scanner_for(root, CrawlConfig::default());

        assert_eq!(
            scanner.get_code_files(root),
            vec![root.join("a.py"), root.join("b.ts")]
        );
    }
}
