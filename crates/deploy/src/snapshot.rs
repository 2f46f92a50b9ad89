//! The project's files at deployment time.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use anyhow::{Context, Result};

/// An in-memory copy of a project's files, keyed by `/`-separated relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    files: BTreeMap<String, Vec<u8>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every file under `root`, honouring `.gitignore` and skipping `.git`.
    pub fn from_dir(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("Project directory not found: {}", root.display());
        }

        let walker = ignore::WalkBuilder::new(root)
            .hidden(false)
            .require_git(false)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();

        let mut snapshot = Self::new();
        for entry in walker {
            let entry = entry.context("Failed to walk project directory")?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .context("Walked outside of the project directory")?;
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let content = std::fs::read(entry.path())
                .with_context(|| format!("Failed to read {}", entry.path().display()))?;
            snapshot.files.insert(key, content);
        }

        tracing::debug!(root = %root.display(), files = snapshot.len(), "Project snapshot taken");
        Ok(snapshot)
    }

    /// Add or replace a file.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files
            .iter()
            .map(|(path, content)| (path.as_str(), content.as_slice()))
    }

    /// Materialize the snapshot under `dir`.
    ///
    /// Paths that would escape `dir` (absolute or containing `..`) are rejected.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        for (path, content) in self.iter() {
            let relative = Path::new(path);
            if relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
            {
                anyhow::bail!("Refusing to write file outside of the project: {path}");
            }

            let target = dir.join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&target, content)
                .with_context(|| format!("Failed to write {}", target.display()))?;
        }
        Ok(())
    }
}

impl<P: Into<String>, C: Into<Vec<u8>>> FromIterator<(P, C)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (path, content) in iter {
            snapshot.insert(path, content);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    #[test]
    fn test_from_dir_skips_git_and_ignored_files() {
        let dir = TempDir::new("liftoff-snapshot").unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/react")).unwrap();
        std::fs::write(root.join("index.html"), "<h1>hi</h1>").unwrap();
        std::fs::write(root.join("src/main.js"), "console.log(1)").unwrap();
        std::fs::write(root.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        std::fs::write(root.join(".gitignore"), "node_modules\n").unwrap();
        std::fs::write(root.join("node_modules/react/index.js"), "").unwrap();

        let snapshot = Snapshot::from_dir(root).unwrap();

        let paths: Vec<_> = snapshot.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec![".gitignore", "index.html", "src/main.js"]);
        assert_eq!(snapshot.get("src/main.js"), Some(b"console.log(1)".as_slice()));
    }

    #[test]
    fn test_from_dir_missing_directory() {
        assert!(Snapshot::from_dir(Path::new("/definitely/not/here")).is_err());
    }

    #[test]
    fn test_write_to_round_trips_through_disk() {
        let snapshot: Snapshot = [("a.txt", "a"), ("nested/b.txt", "b")].into_iter().collect();
        let dir = TempDir::new("liftoff-snapshot").unwrap();

        snapshot.write_to(dir.path()).unwrap();

        assert_eq!(Snapshot::from_dir(dir.path()).unwrap(), snapshot);
    }

    #[test]
    fn test_write_to_rejects_escaping_paths() {
        let snapshot: Snapshot = [("../evil.txt", "x")].into_iter().collect();
        let dir = TempDir::new("liftoff-snapshot").unwrap();
        assert!(snapshot.write_to(dir.path()).is_err());
    }
}
