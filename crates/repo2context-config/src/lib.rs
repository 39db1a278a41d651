#![deny(unsafe_code)]

//! Configuration loading and validation for repo2context.
//!
//! Loads TOML configuration files and validates them. [`AppConfig`] is the
//! single configuration structure consumed by the engine; the CLI layers its
//! flags on top of whatever was loaded from disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of the per-repository config file picked up from the scan root.
pub const CONFIG_FILE_NAME: &str = "repo2context.toml";

/// Smallest token limit accepted from a config file or the command line.
pub const MIN_MAX_TOKENS: usize = 1_000;

/// Largest token limit accepted from a config file or the command line.
pub const MAX_MAX_TOKENS: usize = 2_000_000;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Token budget and tokenizer selection.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Path filtering: ignore files, override patterns, extension filter.
    #[serde(default)]
    pub filter: FilterConfig,

    /// Optional AI summaries for files that do not fit.
    #[serde(default)]
    pub summary: SummaryConfig,

    /// Where and how the document is written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Token budget configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum number of content tokens the document may carry.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Model whose tokenization scheme is used for counting.
    #[serde(default = "default_model")]
    pub model: String,

    /// Whether files that overflow the budget may be cut to a line prefix.
    #[serde(default = "default_true")]
    pub truncate: bool,

    /// A truncated excerpt must keep at least this many lines to be used.
    #[serde(default = "default_min_truncated_lines")]
    pub min_truncated_lines: usize,

    /// Glob patterns processed first, in order. Empty keeps traversal order.
    #[serde(default)]
    pub priority: Vec<String>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            model: default_model(),
            truncate: true,
            min_truncated_lines: default_min_truncated_lines(),
            priority: Vec::new(),
        }
    }
}

fn default_max_tokens() -> usize {
    100_000
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_true() -> bool {
    true
}

fn default_min_truncated_lines() -> usize {
    1
}

/// Path filtering configuration.
///
/// ## TOML Example
///
/// ```toml
/// [filter]
/// ignore_files = ["tools/context.ignore"]
/// exclude = ["*.snap", "fixtures/"]
/// include = ["fixtures/keep.json"]
/// only_extensions = ["rs", "toml"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Honour the root `.gitignore`.
    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Extra gitignore-syntax files, applied in order after the root ones.
    #[serde(default)]
    pub ignore_files: Vec<PathBuf>,

    /// Exclude patterns applied after every ignore file.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Re-include patterns; these win over everything else.
    #[serde(default)]
    pub include: Vec<String>,

    /// When non-empty, only files with one of these extensions are read.
    #[serde(default)]
    pub only_extensions: Vec<String>,

    /// Files larger than this many bytes are listed but never read (0 = no limit).
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// List ignored and filtered paths in the tree overview.
    #[serde(default)]
    pub show_ignored: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            ignore_files: Vec::new(),
            exclude: Vec::new(),
            include: Vec::new(),
            only_extensions: Vec::new(),
            max_file_bytes: default_max_file_bytes(),
            show_ignored: false,
        }
    }
}

fn default_max_file_bytes() -> u64 {
    2 * 1024 * 1024 // 2 MiB
}

impl FilterConfig {
    /// Extensions lowercased with any leading dot stripped.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.only_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }
}

/// Which completion API the summarizer talks to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryProviderKind {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
}

impl SummaryProviderKind {
    /// Environment variable conventionally holding this provider's key.
    pub fn default_api_key_env(self) -> &'static str {
        match self {
            SummaryProviderKind::OpenAi => "OPENAI_API_KEY",
            SummaryProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Model used when `[summary] model` is not set.
    pub fn default_model(self) -> &'static str {
        match self {
            SummaryProviderKind::OpenAi => "gpt-4o-mini",
            SummaryProviderKind::Anthropic => "claude-3-5-haiku-latest",
        }
    }
}

impl std::fmt::Display for SummaryProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryProviderKind::OpenAi => write!(f, "openai"),
            SummaryProviderKind::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// AI summary configuration.
///
/// The API key itself never lives in the config file; only the name of the
/// environment variable it is read from.
///
/// ## TOML Example
///
/// ```toml
/// [summary]
/// enabled = true
/// provider = "openai"
/// model = "gpt-4o-mini"
/// base_url = "http://localhost:11434/v1/chat/completions"
/// api_key_env = "LOCAL_LLM_KEY"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Whether overflowing files may be replaced by a summary.
    #[serde(default)]
    pub enabled: bool,

    /// Completion API flavour.
    #[serde(default)]
    pub provider: SummaryProviderKind,

    /// Model used for summaries. Defaults per provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Custom endpoint (OpenAI-compatible servers).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key. Defaults per provider.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Ceiling for a single summary request, in seconds.
    #[serde(default = "default_summary_timeout_secs")]
    pub timeout_secs: u64,

    /// File content sent for summarization is clipped to this many tokens.
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,

    /// Maximum tokens the model may generate per summary.
    #[serde(default = "default_max_summary_tokens")]
    pub max_summary_tokens: u32,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: SummaryProviderKind::default(),
            model: None,
            base_url: None,
            api_key_env: None,
            timeout_secs: default_summary_timeout_secs(),
            max_input_tokens: default_max_input_tokens(),
            max_summary_tokens: default_max_summary_tokens(),
        }
    }
}

impl SummaryConfig {
    /// The environment variable the CLI reads the credential from.
    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_key_env())
    }

    /// The model summaries are requested from.
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model())
    }
}

fn default_summary_timeout_secs() -> u64 {
    20
}

fn default_max_input_tokens() -> usize {
    8_000
}

fn default_max_summary_tokens() -> u32 {
    256
}

/// Output configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Destination file or directory. Unset means stdout.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Add a generation timestamp line under the document title.
    #[serde(default)]
    pub timestamp: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&self.budget.max_tokens) {
            return Err(ConfigError::Validation(format!(
                "budget.max_tokens must be between {MIN_MAX_TOKENS} and {MAX_MAX_TOKENS}, got {}",
                self.budget.max_tokens
            )));
        }
        if self.budget.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "budget.model must not be empty".to_string(),
            ));
        }
        if self.budget.min_truncated_lines == 0 {
            return Err(ConfigError::Validation(
                "budget.min_truncated_lines must be at least 1".to_string(),
            ));
        }
        for (i, pattern) in self.budget.priority.iter().enumerate() {
            if pattern.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "budget.priority[{i}] must not be empty"
                )));
            }
        }

        for (i, pattern) in self.filter.exclude.iter().enumerate() {
            if pattern.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "filter.exclude[{i}] must not be empty"
                )));
            }
        }
        for (i, pattern) in self.filter.include.iter().enumerate() {
            if pattern.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "filter.include[{i}] must not be empty"
                )));
            }
        }

        if self.summary.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "summary.model must not be empty".to_string(),
            ));
        }
        if !(1..=120).contains(&self.summary.timeout_secs) {
            return Err(ConfigError::Validation(format!(
                "summary.timeout_secs must be between 1 and 120, got {}",
                self.summary.timeout_secs
            )));
        }
        if self.summary.max_input_tokens == 0 {
            return Err(ConfigError::Validation(
                "summary.max_input_tokens must be non-zero".to_string(),
            ));
        }
        if self.summary.max_summary_tokens == 0 {
            return Err(ConfigError::Validation(
                "summary.max_summary_tokens must be non-zero".to_string(),
            ));
        }
        if let Some(ref env) = self.summary.api_key_env
            && env.trim().is_empty()
        {
            return Err(ConfigError::Validation(
                "summary.api_key_env must not be empty when set".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}
