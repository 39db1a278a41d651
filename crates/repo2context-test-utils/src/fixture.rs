//! Fixture repositories on disk.
//!
//! [`FixtureRepo`] owns a temporary directory that is deleted when the value
//! is dropped, guaranteeing cleanup even on panic.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A scratch repository for engine and CLI tests.
pub struct FixtureRepo {
    root: PathBuf,
    _temp_dir: TempDir,
}

impl FixtureRepo {
    /// An empty repository directory named `repo` inside a fresh temp dir.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let root = temp_dir.path().join("repo");
        std::fs::create_dir(&root).expect("failed to create fixture root");
        Self {
            root,
            _temp_dir: temp_dir,
        }
    }

    /// Write a text file, creating parent directories.
    pub fn file(self, rel: &str, content: &str) -> Self {
        self.write_bytes(rel, content.as_bytes());
        self
    }

    /// Write a file with arbitrary bytes.
    pub fn binary(self, rel: &str, bytes: &[u8]) -> Self {
        self.write_bytes(rel, bytes);
        self
    }

    /// Write a text file of `lines` lines, each `width` characters plus a
    /// newline. Handy for predictable estimated token counts.
    pub fn sized(self, rel: &str, lines: usize, width: usize) -> Self {
        let content = format!("{}\n", "x".repeat(width)).repeat(lines);
        self.file(rel, &content)
    }

    /// Create an empty directory.
    pub fn dir(self, rel: &str) -> Self {
        std::fs::create_dir_all(self.root.join(rel)).expect("failed to create fixture dir");
        self
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// A path next to (not inside) the repository, for output files and
    /// out-of-tree ignore files.
    pub fn outside(&self, name: &str) -> PathBuf {
        self.root
            .parent()
            .expect("fixture root has a parent")
            .join(name)
    }

    fn write_bytes(&self, rel: &str, bytes: &[u8]) {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create fixture dirs");
        }
        std::fs::write(&path, bytes).expect("failed to write fixture file");
    }
}

impl Default for FixtureRepo {
    fn default() -> Self {
        Self::new()
    }
}
