//! Optional reordering of candidates before the selection pass.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::filter::{FileCandidate, FilterError};

/// Ordered glob patterns; files matching earlier patterns are selected first.
#[derive(Debug, Clone)]
pub struct PriorityOrder {
    set: GlobSet,
    len: usize,
}

impl PriorityOrder {
    /// Compile `patterns`. `*` does not cross `/`; use `**` for that.
    pub fn new(patterns: &[String]) -> Result<Self, FilterError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| FilterError::InvalidPattern {
                    pattern: pattern.clone(),
                    origin: "budget.priority".to_string(),
                    message: e.to_string(),
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| FilterError::InvalidPattern {
            pattern: String::new(),
            origin: "budget.priority".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            set,
            len: patterns.len(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the first matching pattern; unmatched paths rank last.
    pub fn rank(&self, path: &str) -> usize {
        self.set
            .matches(path)
            .into_iter()
            .min()
            .unwrap_or(self.len)
    }

    /// Stable sort: traversal order is kept among equal ranks.
    pub fn sort(&self, candidates: &mut [FileCandidate]) {
        if self.is_empty() {
            return;
        }
        candidates.sort_by_key(|c| self.rank(&c.path));
    }
}
