//! Writing the finished document.
//!
//! The document is fully rendered in memory before anything is written.
//! File targets are written through a temporary file in the destination
//! directory and renamed into place, so readers never see a partial file.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::info;

/// File name used when the output target is a directory.
pub const DEFAULT_OUTPUT_NAME: &str = "repocontext.md";

/// Errors writing the document.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write to stdout: {0}")]
    Stdout(#[source] io::Error),
}

/// Where the document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// Resolve an optional path: none is stdout, an existing directory
    /// receives [`DEFAULT_OUTPUT_NAME`].
    pub fn from_path(path: Option<&Path>) -> Self {
        match path {
            None => OutputTarget::Stdout,
            Some(p) if p.as_os_str() == "-" => OutputTarget::Stdout,
            Some(p) if p.is_dir() => OutputTarget::File(p.join(DEFAULT_OUTPUT_NAME)),
            Some(p) => OutputTarget::File(p.to_path_buf()),
        }
    }

    /// Write `document` once.
    pub fn write(&self, document: &str) -> Result<(), OutputError> {
        match self {
            OutputTarget::Stdout => {
                let stdout = io::stdout();
                let mut lock = stdout.lock();
                lock.write_all(document.as_bytes())
                    .and_then(|()| lock.flush())
                    .map_err(OutputError::Stdout)
            }
            OutputTarget::File(path) => {
                write_atomic(path, document).map_err(|source| OutputError::Write {
                    path: path.clone(),
                    source,
                })?;
                info!(path = %path.display(), bytes = document.len(), "Wrote context document");
                Ok(())
            }
        }
    }
}

/// Temp file in the target directory, fsync, then rename over the target.
fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
