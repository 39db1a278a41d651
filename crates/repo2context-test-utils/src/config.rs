//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries. The builder does not call
//! [`AppConfig::validate`], so tests may use budgets far below the
//! command-line minimum.

use std::path::PathBuf;

use repo2context_config::{AppConfig, SummaryProviderKind};

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .max_tokens(100)
///     .truncate(false)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn max_tokens(mut self, limit: usize) -> Self {
        self.config.budget.max_tokens = limit;
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.config.budget.model = model.to_string();
        self
    }

    pub fn truncate(mut self, enabled: bool) -> Self {
        self.config.budget.truncate = enabled;
        self
    }

    pub fn min_truncated_lines(mut self, lines: usize) -> Self {
        self.config.budget.min_truncated_lines = lines;
        self
    }

    pub fn priority(mut self, patterns: &[&str]) -> Self {
        self.config.budget.priority = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn respect_gitignore(mut self, enabled: bool) -> Self {
        self.config.filter.respect_gitignore = enabled;
        self
    }

    pub fn ignore_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.filter.ignore_files.push(path.into());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.config.filter.exclude.push(pattern.to_string());
        self
    }

    pub fn only_extensions(mut self, extensions: &[&str]) -> Self {
        self.config.filter.only_extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn max_file_bytes(mut self, limit: u64) -> Self {
        self.config.filter.max_file_bytes = limit;
        self
    }

    pub fn show_ignored(mut self, enabled: bool) -> Self {
        self.config.filter.show_ignored = enabled;
        self
    }

    pub fn summaries(mut self, enabled: bool) -> Self {
        self.config.summary.enabled = enabled;
        self
    }

    pub fn summary_provider(mut self, provider: SummaryProviderKind) -> Self {
        self.config.summary.provider = provider;
        self
    }

    pub fn summary_timeout_secs(mut self, secs: u64) -> Self {
        self.config.summary.timeout_secs = secs;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
