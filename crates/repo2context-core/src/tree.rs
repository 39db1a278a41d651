//! The repository tree: every entry the walk visited, with its filter status.
//!
//! Built once during the filtering pass (after each file's read step, so a
//! file's status is final when it is inserted) and read-only afterwards.

use std::collections::HashMap;

/// Directory or file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Directory,
    File,
}

/// Outcome of path filtering and the read step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    /// Readable text (files) or a traversed directory.
    Candidate,
    /// Excluded by an ignore rule.
    Ignored,
    /// Binary content; listed but never included.
    Binary,
    /// Over `filter.max_file_bytes`; never read.
    TooLarge,
    /// Excluded by the extension filter.
    Filtered,
    /// Could not be read.
    Unreadable,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Candidate => "candidate",
            EntryStatus::Ignored => "ignored",
            EntryStatus::Binary => "binary",
            EntryStatus::TooLarge => "too large",
            EntryStatus::Filtered => "filtered",
            EntryStatus::Unreadable => "unreadable",
        }
    }

    /// Statuses listed only when ignored entries are requested.
    pub fn is_hidden_by_default(self) -> bool {
        matches!(self, EntryStatus::Ignored | EntryStatus::Filtered)
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// `/`-separated path relative to the root; unique within the tree.
    pub rel: String,
    /// Last path component.
    pub name: String,
    pub kind: EntryKind,
    pub status: EntryStatus,
    /// Byte size for files, 0 for directories.
    pub size: u64,
    children: Vec<usize>,
}

/// Inserting a path that is already present.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("path {0:?} is already in the repository tree")]
pub struct DuplicatePath(pub String);

/// Ordered hierarchy of the entries under the scan root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryTree {
    root_name: String,
    nodes: Vec<TreeNode>,
    top: Vec<usize>,
    index: HashMap<String, usize>,
}

impl RepositoryTree {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root_name: root_name.into(),
            ..Self::default()
        }
    }

    /// Add an entry. Its parent directory must already be present, otherwise
    /// the entry is attached at the top level. Entries keep insertion order.
    pub fn insert(
        &mut self,
        rel: &str,
        kind: EntryKind,
        status: EntryStatus,
        size: u64,
    ) -> Result<(), DuplicatePath> {
        if self.index.contains_key(rel) {
            return Err(DuplicatePath(rel.to_string()));
        }
        let (parent, name) = match rel.rsplit_once('/') {
            Some((parent, name)) => (self.index.get(parent).copied(), name),
            None => (None, rel),
        };
        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            rel: rel.to_string(),
            name: name.to_string(),
            kind,
            status,
            size,
            children: Vec::new(),
        });
        self.index.insert(rel.to_string(), id);
        match parent {
            Some(p) => self.nodes[p].children.push(id),
            None => self.top.push(id),
        }
        Ok(())
    }

    /// Name of the scan root directory.
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Top-level entries in order.
    pub fn roots(&self) -> impl Iterator<Item = &TreeNode> {
        self.top.iter().map(|&i| &self.nodes[i])
    }

    /// Children of `node` in order.
    pub fn children<'a>(&'a self, node: &'a TreeNode) -> impl Iterator<Item = &'a TreeNode> {
        node.children.iter().map(|&i| &self.nodes[i])
    }

    pub fn get(&self, rel: &str) -> Option<&TreeNode> {
        self.index.get(rel).map(|&i| &self.nodes[i])
    }

    /// All nodes in insertion (traversal) order.
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of files with the given status.
    pub fn count_files(&self, status: EntryStatus) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == EntryKind::File && n.status == status)
            .count()
    }
}
