//! API credential handling for the summarizer.
//!
//! The engine never reads the environment itself. The CLI resolves the
//! configured variable and hands the value over as an [`ApiKey`], which is
//! zeroized on drop and redacted in `Debug` output.

use std::fmt;

use zeroize::Zeroize;

/// A completion-service API key with automatic zeroization.
#[derive(Clone)]
pub struct ApiKey {
    inner: String,
}

impl ApiKey {
    /// Wrap a raw key. Surrounding whitespace is dropped.
    ///
    /// Returns `None` for a blank value so an exported-but-empty variable is
    /// treated the same as a missing one.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let mut raw = value.into();
        let trimmed = raw.trim().to_string();
        raw.zeroize();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self { inner: trimmed })
        }
    }

    /// Read a key from the named environment variable.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var).ok().and_then(Self::new)
    }

    /// Get the key as a string slice.
    ///
    /// Only the HTTP adapters should call this, when building headers.
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// Key length, without exposing the value.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Always false for a constructed key; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("inner", &"[REDACTED]")
            .field("len", &self.inner.len())
            .finish()
    }
}

impl Drop for ApiKey {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let key = ApiKey::new("sk-super-secret").unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-super-secret"));
        assert!(debug.contains("len: 15"));
    }

    #[test]
    fn test_blank_value_is_no_key() {
        assert!(ApiKey::new("").is_none());
        assert!(ApiKey::new("   \n").is_none());
    }

    #[test]
    fn test_value_is_trimmed() {
        let key = ApiKey::new("  sk-abc\n").unwrap();
        assert_eq!(key.expose(), "sk-abc");
        assert_eq!(key.len(), 6);
        assert!(!key.is_empty());
    }

    #[test]
    fn test_from_env_missing_variable() {
        assert!(ApiKey::from_env("REPO2CONTEXT_TEST_SURELY_UNSET_VARIABLE").is_none());
    }
}
