//! Depth-first traversal of the scan root.
//!
//! Built on [`ignore::WalkBuilder`] with its own filters turned off. The
//! repository's rules are applied through `filter_entry`, which prunes an
//! excluded directory so nothing beneath it is visited. Pruned entries are
//! still reported, in the position where the walk met them.

use std::collections::VecDeque;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ignore::{DirEntry, WalkBuilder};
use tracing::{debug, trace, warn};

use super::rules::IgnoreRuleSet;
use crate::error::EngineError;
use crate::tree::{EntryKind, EntryStatus};

/// Reported for entries whose name cannot be represented as UTF-8.
const NON_UTF8_NAME: &str = "file name is not valid UTF-8";

/// Path-level filter over one scan root.
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    rules: Arc<IgnoreRuleSet>,
    only_extensions: Vec<String>,
    max_file_bytes: u64,
}

impl PathFilter {
    pub fn new(root: impl Into<PathBuf>, rules: IgnoreRuleSet) -> Self {
        Self {
            root: root.into(),
            rules: Arc::new(rules),
            only_extensions: Vec::new(),
            max_file_bytes: 0,
        }
    }

    /// Restrict candidates to these lowercase extensions (empty = all).
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.only_extensions = extensions;
        self
    }

    /// Files above this size are listed but not read (0 = unlimited).
    pub fn with_max_file_bytes(mut self, limit: u64) -> Self {
        self.max_file_bytes = limit;
        self
    }

    /// Start a walk. Fails when the root is missing, not a directory, or
    /// cannot be listed.
    pub fn walk(&self) -> Result<Walk<'_>, EngineError> {
        check_root(&self.root)?;

        let pruned: Arc<Mutex<VecDeque<WalkEntry>>> = Arc::default();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b));
        let root = self.root.clone();
        let rules = Arc::clone(&self.rules);
        let queue = Arc::clone(&pruned);
        builder.filter_entry(move |entry| keep_entry(entry, &root, &rules, &queue));

        let mut inner = builder.build();
        // The root comes first; a failure to list it follows immediately.
        let _root = inner.next();
        let first = inner.next();
        if let Some(Err(ref err)) = first
            && error_path(err) == Some(self.root.as_path())
        {
            return Err(EngineError::filesystem(&self.root, io_message(err)));
        }

        debug!(root = %self.root.display(), "Starting walk");
        Ok(Walk {
            filter: self,
            inner,
            pruned,
            pending: first,
        })
    }

    fn extension_allowed(&self, name: &str) -> bool {
        if self.only_extensions.is_empty() {
            return true;
        }
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| self.only_extensions.contains(&e))
    }
}

/// One visited filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Absolute (root-joined) path.
    pub path: PathBuf,
    /// `/`-separated path relative to the root. Bytes that are not UTF-8
    /// appear as `\xNN` escapes, so distinct names stay distinct.
    pub rel: String,
    /// Nesting depth; direct children of the root are at depth 1.
    pub depth: usize,
    pub kind: EntryKind,
    pub status: EntryStatus,
    /// Byte size for files, 0 for directories.
    pub size: u64,
    /// Why the entry is `Unreadable`.
    pub error: Option<String>,
}

/// Iterator over the entries under the root, depth first, in name order.
pub struct Walk<'a> {
    filter: &'a PathFilter,
    inner: ignore::Walk,
    /// Entries the filter pruned; they precede whatever `inner` yields next.
    pruned: Arc<Mutex<VecDeque<WalkEntry>>>,
    /// An item pulled from `inner` ahead of time.
    pending: Option<Result<DirEntry, ignore::Error>>,
}

impl Iterator for Walk<'_> {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<WalkEntry> {
        loop {
            if let Some(entry) = self.pop_pruned() {
                return Some(entry);
            }
            let Some(item) = self.pending.take() else {
                match self.inner.next() {
                    Some(item) => {
                        self.pending = Some(item);
                        continue;
                    }
                    None => return self.pop_pruned(),
                }
            };
            match item {
                Ok(entry) => return Some(self.visit(entry)),
                Err(err) => warn!(error = %err, "Skipping entry the walk could not read"),
            }
        }
    }
}

impl Walk<'_> {
    fn pop_pruned(&self) -> Option<WalkEntry> {
        self.pruned.lock().ok()?.pop_front()
    }

    fn visit(&mut self, entry: DirEntry) -> WalkEntry {
        let path = entry.path().to_path_buf();
        let rel = relative_path(&self.filter.root, &path).unwrap_or_else(|escaped| escaped);
        let mut out = WalkEntry {
            path,
            rel,
            depth: entry.depth(),
            kind: EntryKind::File,
            status: EntryStatus::Candidate,
            size: 0,
            error: None,
        };

        let is_symlink = entry.path_is_symlink();
        let meta = if is_symlink {
            match std::fs::metadata(&out.path) {
                Ok(meta) => meta,
                Err(e) => return unreadable(out, format!("broken symlink: {e}")),
            }
        } else {
            match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => return unreadable(out, io_message(&e)),
            }
        };

        if meta.is_dir() {
            out.kind = EntryKind::Directory;
            if is_symlink {
                trace!(path = %out.rel, "Not descending into symlinked directory");
            } else if let Some(message) = self.listing_error(&out.path) {
                return unreadable(out, message);
            }
            return out;
        }

        out.size = meta.len();
        if !self.filter.extension_allowed(&out.rel) {
            out.status = EntryStatus::Filtered;
        } else if self.filter.max_file_bytes > 0 && out.size > self.filter.max_file_bytes {
            out.status = EntryStatus::TooLarge;
        }
        trace!(path = %out.rel, status = %out.status, "Visited file");
        out
    }

    /// A directory that cannot be listed shows up as an error right after
    /// the directory itself.
    fn listing_error(&mut self, dir: &Path) -> Option<String> {
        match self.inner.next() {
            Some(Err(err)) if error_path(&err) == Some(dir) => Some(io_message(&err)),
            next => {
                self.pending = next;
                None
            }
        }
    }
}

/// `filter_entry` callback: keep included entries, record and prune the rest.
fn keep_entry(
    entry: &DirEntry,
    root: &Path,
    rules: &IgnoreRuleSet,
    pruned: &Mutex<VecDeque<WalkEntry>>,
) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    let is_dir = entry
        .file_type()
        .is_some_and(|t| t.is_dir() || (t.is_symlink() && entry.path().is_dir()));
    let (rel, status, error) = match relative_path(root, entry.path()) {
        Err(escaped) => (escaped, EntryStatus::Unreadable, Some(NON_UTF8_NAME.to_string())),
        Ok(rel) if rules.excludes_entry(&rel, is_dir) => (rel, EntryStatus::Ignored, None),
        Ok(_) => return true,
    };
    trace!(path = %rel, status = %status, "Pruned");

    let size = if is_dir {
        0
    } else {
        entry.metadata().map(|m| m.len()).unwrap_or(0)
    };
    let record = WalkEntry {
        path: entry.path().to_path_buf(),
        rel,
        depth: entry.depth(),
        kind: if is_dir {
            EntryKind::Directory
        } else {
            EntryKind::File
        },
        status,
        size,
        error,
    };
    if let Ok(mut queue) = pruned.lock() {
        queue.push_back(record);
    }
    false
}

/// Fail unless `root` exists and is a directory.
pub fn check_root(root: &Path) -> Result<(), EngineError> {
    let meta = std::fs::metadata(root).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::filesystem(root, "path does not exist")
        } else {
            EngineError::filesystem(root, e.to_string())
        }
    })?;
    if !meta.is_dir() {
        return Err(EngineError::filesystem(root, "not a directory"));
    }
    Ok(())
}

/// `/`-joined path of `path` below `root`. `Err` carries an escaped form
/// when some component is not UTF-8.
fn relative_path(root: &Path, path: &Path) -> Result<String, String> {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut valid = true;
    let parts: Vec<String> = rel
        .components()
        .map(|c| match c.as_os_str().to_str() {
            Some(part) => part.to_string(),
            None => {
                valid = false;
                escape_name(c.as_os_str())
            }
        })
        .collect();
    let joined = parts.join("/");
    if valid { Ok(joined) } else { Err(joined) }
}

fn escape_name(name: &OsStr) -> String {
    let quoted = format!("{name:?}");
    quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(str::to_string)
        .unwrap_or(quoted)
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

/// The underlying I/O message without the path prefix.
fn io_message(err: &ignore::Error) -> String {
    err.io_error()
        .map_or_else(|| err.to_string(), |e| e.to_string())
}

fn unreadable(mut entry: WalkEntry, message: String) -> WalkEntry {
    entry.status = EntryStatus::Unreadable;
    entry.error = Some(message);
    entry
}
