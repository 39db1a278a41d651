//! The read step: turning a candidate path into text or a binary marker.

use std::path::Path;

/// Bytes inspected for a NUL when sniffing for binary content.
pub const BINARY_SNIFF_BYTES: usize = 8 * 1024;

/// File content after the read step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary,
}

/// A readable file handed to the content selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    /// `/`-separated path relative to the root.
    pub path: String,
    pub size: u64,
    pub content: FileContent,
}

impl FileCandidate {
    /// Build a text candidate directly (tests, in-memory sources).
    pub fn text(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            size: content.len() as u64,
            content: FileContent::Text(content),
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self.content, FileContent::Binary)
    }
}

/// True when the sniffed prefix contains a NUL byte.
pub fn looks_binary(bytes: &[u8]) -> bool {
    let end = bytes.len().min(BINARY_SNIFF_BYTES);
    bytes[..end].contains(&0)
}

/// Read a file and classify it. Content that is not valid UTF-8 is binary.
pub fn read_candidate(path: &Path, rel: &str) -> std::io::Result<FileCandidate> {
    let bytes = std::fs::read(path)?;
    let size = bytes.len() as u64;
    let content = if looks_binary(&bytes) {
        FileContent::Binary
    } else {
        match String::from_utf8(bytes) {
            Ok(text) => FileContent::Text(text),
            Err(_) => FileContent::Binary,
        }
    };
    Ok(FileCandidate {
        path: rel.to_string(),
        size,
        content,
    })
}
