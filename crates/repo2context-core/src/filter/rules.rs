//! Layered ignore rules in gitignore syntax.
//!
//! Rules are collected lowest-precedence first (built-in defaults, then
//! ignore files, then overrides) and compiled into one [`Gitignore`] matcher.
//! Gitignore semantics apply throughout: the last matching rule decides, so a
//! later layer always beats an earlier one.

use std::io;
use std::path::{Path, PathBuf};

use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::debug;

/// Patterns excluded unless a later rule re-includes them.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git/",
    ".hg/",
    ".svn/",
    "node_modules/",
    "target/",
    "__pycache__/",
    "*.pyc",
    ".venv/",
    "venv/",
    "dist/",
    "build/",
    ".idea/",
    ".vscode/",
    ".cache/",
    ".mypy_cache/",
    ".pytest_cache/",
    ".tox/",
    "*.egg-info/",
    "coverage/",
    ".next/",
    ".DS_Store",
    "*.o",
    "*.so",
    "*.dylib",
    "*.dll",
    "*.class",
    "*.exe",
    // A previous run's document written into the root
    "/repocontext.md",
];

/// Ignore file picked up from the scan root, after `.gitignore`.
pub const IGNORE_FILE_NAME: &str = ".repo2contextignore";

/// Whether a rule drops or re-admits the paths it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Exclude,
    Include,
}

/// Where a rule came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    Default,
    IgnoreFile(PathBuf),
    Override,
}

impl std::fmt::Display for RuleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSource::Default => write!(f, "built-in defaults"),
            RuleSource::IgnoreFile(path) => write!(f, "{}", path.display()),
            RuleSource::Override => write!(f, "command-line override"),
        }
    }
}

/// A single ignore rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Pattern text without a leading `!`.
    pub pattern: String,
    pub polarity: Polarity,
    pub source: RuleSource,
}

impl Rule {
    /// The line as it is fed to the gitignore matcher.
    fn line(&self) -> String {
        match self.polarity {
            Polarity::Exclude => self.pattern.clone(),
            Polarity::Include => format!("!{}", self.pattern),
        }
    }

    fn origin(&self) -> Option<PathBuf> {
        match self.source {
            RuleSource::IgnoreFile(ref path) => Some(path.clone()),
            RuleSource::Default | RuleSource::Override => None,
        }
    }
}

/// Errors raised while assembling a rule set or pattern list.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("invalid pattern {pattern:?} ({origin}): {message}")]
    InvalidPattern {
        pattern: String,
        origin: String,
        message: String,
    },

    #[error("failed to read ignore file {}: {source}", path.display())]
    IgnoreFileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Builder collecting rules in precedence order.
#[derive(Debug)]
pub struct RuleSetBuilder {
    root: PathBuf,
    rules: Vec<Rule>,
    missing: Vec<PathBuf>,
}

impl RuleSetBuilder {
    /// Start an empty rule set whose patterns are anchored at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            rules: Vec::new(),
            missing: Vec::new(),
        }
    }

    /// Append the built-in default excludes.
    pub fn with_defaults(mut self) -> Self {
        for pattern in DEFAULT_EXCLUDES {
            self.push_line(pattern, RuleSource::Default);
        }
        self
    }

    /// Append every rule in a block of ignore-file text.
    pub fn add_text(&mut self, text: &str, source: RuleSource) -> &mut Self {
        for line in text.lines() {
            self.push_line(line, source.clone());
        }
        self
    }

    /// Append the rules of an ignore file.
    ///
    /// A missing file is not an error: it is remembered (see
    /// [`IgnoreRuleSet::missing_files`]) and `Ok(false)` is returned.
    pub fn add_file(&mut self, path: &Path) -> Result<bool, FilterError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), "Loaded ignore file");
                self.add_text(&text, RuleSource::IgnoreFile(path.to_path_buf()));
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.missing.push(path.to_path_buf());
                Ok(false)
            }
            Err(source) => Err(FilterError::IgnoreFileRead {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Append the rules of an ignore file that may legitimately be absent
    /// (`.gitignore`, `.repo2contextignore`). Absence is not remembered.
    pub fn add_optional_file(&mut self, path: &Path) -> Result<bool, FilterError> {
        let found = self.add_file(path)?;
        if !found {
            self.missing.pop();
        }
        Ok(found)
    }

    /// Append an override pattern with explicit polarity.
    pub fn add_override(&mut self, pattern: &str, polarity: Polarity) -> &mut Self {
        let pattern = pattern.trim();
        let pattern = pattern.strip_prefix('!').unwrap_or(pattern);
        if !pattern.is_empty() {
            self.rules.push(Rule {
                pattern: pattern.to_string(),
                polarity,
                source: RuleSource::Override,
            });
        }
        self
    }

    fn push_line(&mut self, line: &str, source: RuleSource) {
        // Trailing whitespace is insignificant unless escaped
        let line = if line.ends_with("\\ ") {
            line
        } else {
            line.trim_end()
        };
        if line.is_empty() || line.starts_with('#') {
            return;
        }
        let (polarity, pattern) = match line.strip_prefix('!') {
            Some(rest) => (Polarity::Include, rest),
            None => (Polarity::Exclude, line),
        };
        if pattern.is_empty() {
            return;
        }
        self.rules.push(Rule {
            pattern: pattern.to_string(),
            polarity,
            source,
        });
    }

    /// Compile the collected rules.
    pub fn build(self) -> Result<IgnoreRuleSet, FilterError> {
        let mut builder = GitignoreBuilder::new(&self.root);
        for rule in &self.rules {
            builder
                .add_line(rule.origin(), &rule.line())
                .map_err(|e| FilterError::InvalidPattern {
                    pattern: rule.line(),
                    origin: rule.source.to_string(),
                    message: e.to_string(),
                })?;
        }
        let matcher = builder.build().map_err(|e| FilterError::InvalidPattern {
            pattern: String::new(),
            origin: "rule set".to_string(),
            message: e.to_string(),
        })?;
        debug!(rules = self.rules.len(), "Compiled ignore rules");
        Ok(IgnoreRuleSet {
            rules: self.rules,
            missing: self.missing,
            matcher,
        })
    }
}

/// The decisive rule for a path, as reported by [`IgnoreRuleSet::explain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation<'a> {
    /// Path the rule matched: the entry itself or one of its ancestors.
    pub matched: String,
    pub rule: &'a Rule,
}

/// An immutable, compiled set of ignore rules.
#[derive(Debug, Clone)]
pub struct IgnoreRuleSet {
    rules: Vec<Rule>,
    missing: Vec<PathBuf>,
    matcher: Gitignore,
}

impl IgnoreRuleSet {
    /// The rules in precedence order (lowest first).
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Ignore files that were requested but did not exist.
    pub fn missing_files(&self) -> &[PathBuf] {
        &self.missing
    }

    /// Decide a single entry without looking at its ancestors.
    ///
    /// The walker calls this for every entry it visits; ancestors are
    /// already known to be included because excluded directories are pruned.
    pub fn excludes_entry(&self, rel: &str, is_dir: bool) -> bool {
        self.matcher.matched(rel, is_dir).is_ignore()
    }

    /// Whether `rel` is excluded, taking excluded ancestor directories
    /// into account (an excluded directory's contents cannot be re-included).
    pub fn is_excluded(&self, rel: &str, is_dir: bool) -> bool {
        self.explain(rel, is_dir)
            .is_some_and(|e| e.rule.polarity == Polarity::Exclude)
    }

    /// Report the rule that decides `rel`, if any rule matches it.
    pub fn explain(&self, rel: &str, is_dir: bool) -> Option<Explanation<'_>> {
        let rel = rel.trim_matches('/');
        let components: Vec<&str> = rel.split('/').filter(|c| !c.is_empty()).collect();

        for depth in 1..components.len() {
            let ancestor = components[..depth].join("/");
            if let Match::Ignore(glob) = self.matcher.matched(&ancestor, true) {
                return self
                    .rule_for(glob.original(), glob.from())
                    .map(|rule| Explanation {
                        matched: ancestor,
                        rule,
                    });
            }
        }

        let glob = match self.matcher.matched(rel, is_dir) {
            Match::None => return None,
            Match::Ignore(glob) | Match::Whitelist(glob) => glob,
        };
        self.rule_for(glob.original(), glob.from())
            .map(|rule| Explanation {
                matched: rel.to_string(),
                rule,
            })
    }

    /// The last rule with this line text and origin. Identical lines later in
    /// the list would also match, so the last one is always the decisive one.
    fn rule_for(&self, original: &str, from: Option<&Path>) -> Option<&Rule> {
        self.rules
            .iter()
            .rev()
            .find(|r| r.line() == original && r.origin().as_deref() == from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rules_from(text: &str) -> IgnoreRuleSet {
        let mut builder = RuleSetBuilder::new("/repo").with_defaults();
        builder.add_text(text, RuleSource::IgnoreFile(PathBuf::from("/repo/.gitignore")));
        builder.build().unwrap()
    }

    #[test]
    fn test_defaults_exclude_vcs_and_build_dirs() {
        let rules = RuleSetBuilder::new("/repo").with_defaults().build().unwrap();
        assert!(rules.excludes_entry(".git", true));
        assert!(rules.excludes_entry("node_modules", true));
        assert!(rules.excludes_entry("src/__pycache__", true));
        assert!(rules.excludes_entry("pkg/mod.pyc", false));
        assert!(!rules.excludes_entry("src/main.py", false));
        // Directory-only pattern does not hit a file of the same name
        assert!(!rules.excludes_entry("target", false));
    }

    #[test]
    fn test_previous_output_in_root_is_excluded() {
        let rules = RuleSetBuilder::new("/repo").with_defaults().build().unwrap();
        assert!(rules.excludes_entry("repocontext.md", false));
        assert!(!rules.excludes_entry("docs/repocontext.md", false));
        assert!(!rules.excludes_entry("README.md", false));
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let rules = rules_from("# a comment\n\n*.custom\n   \ncustom_dir/\n");
        let sourced: Vec<&str> = rules
            .rules()
            .iter()
            .filter(|r| r.source != RuleSource::Default)
            .map(|r| r.pattern.as_str())
            .collect();
        assert_eq!(sourced, vec!["*.custom", "custom_dir/"]);
        assert!(rules.is_excluded("file.custom", false));
        assert!(rules.is_excluded("custom_dir", true));
        assert!(rules.is_excluded("custom_dir/inner.txt", false));
        assert!(!rules.is_excluded("regular.py", false));
    }

    #[test]
    fn test_negation_reincludes() {
        let rules = rules_from("*.log\n!keep.log\n");
        assert!(rules.is_excluded("a.log", false));
        assert!(!rules.is_excluded("keep.log", false));
    }

    #[test]
    fn test_last_matching_rule_wins() {
        // Re-include first, exclude last: exclusion wins
        let rules = rules_from("!important.log\n*.log\n");
        assert!(rules.is_excluded("important.log", false));
    }

    #[test]
    fn test_override_beats_ignore_file() {
        let mut builder = RuleSetBuilder::new("/repo").with_defaults();
        builder.add_text("*.log\n", RuleSource::IgnoreFile(PathBuf::from("/repo/.gitignore")));
        builder.add_override("debug.log", Polarity::Include);
        let rules = builder.build().unwrap();
        assert!(!rules.is_excluded("debug.log", false));
        assert!(rules.is_excluded("other.log", false));
    }

    #[test]
    fn test_override_can_reinclude_default_dir() {
        let mut builder = RuleSetBuilder::new("/repo").with_defaults();
        builder.add_override("build/", Polarity::Include);
        let rules = builder.build().unwrap();
        assert!(!rules.is_excluded("build", true));
    }

    #[test]
    fn test_excluded_parent_cannot_be_reincluded_from_inside() {
        let rules = rules_from("vendor/\n!vendor/keep.rs\n");
        assert!(rules.is_excluded("vendor/keep.rs", false));
        let explanation = rules.explain("vendor/keep.rs", false).unwrap();
        assert_eq!(explanation.matched, "vendor");
        assert_eq!(explanation.rule.pattern, "vendor/");
    }

    #[test]
    fn test_anchored_pattern() {
        let rules = rules_from("/docs\n");
        assert!(rules.is_excluded("docs", true));
        assert!(!rules.is_excluded("src/docs", true));
    }

    #[test]
    fn test_escaped_hash_is_a_pattern() {
        let rules = rules_from("\\#notes.md\n");
        assert!(rules.is_excluded("#notes.md", false));
    }

    #[test]
    fn test_explain_reports_source_and_polarity() {
        let mut builder = RuleSetBuilder::new("/repo").with_defaults();
        builder.add_text("*.log\n", RuleSource::IgnoreFile(PathBuf::from("/repo/.gitignore")));
        builder.add_override("*.log", Polarity::Exclude);
        builder.add_override("keep.log", Polarity::Include);
        let rules = builder.build().unwrap();

        let ex = rules.explain("a.log", false).unwrap();
        assert_eq!(ex.rule.source, RuleSource::Override);
        assert_eq!(ex.rule.polarity, Polarity::Exclude);

        let ex = rules.explain("keep.log", false).unwrap();
        assert_eq!(ex.rule.polarity, Polarity::Include);

        let ex = rules.explain(".git", true).unwrap();
        assert_eq!(ex.rule.source, RuleSource::Default);

        assert!(rules.explain("src/lib.rs", false).is_none());
    }

    #[test]
    fn test_missing_ignore_file_is_recorded() {
        let mut builder = RuleSetBuilder::new("/repo").with_defaults();
        let found = builder
            .add_file(Path::new("/definitely/not/here/.ignore"))
            .unwrap();
        assert!(!found);
        let rules = builder.build().unwrap();
        assert_eq!(
            rules.missing_files(),
            &[PathBuf::from("/definitely/not/here/.ignore")]
        );
        // Defaults still apply
        assert!(rules.is_excluded(".git", true));
    }

    #[test]
    fn test_optional_file_absence_not_recorded() {
        let mut builder = RuleSetBuilder::new("/repo");
        let found = builder
            .add_optional_file(Path::new("/definitely/not/here/.gitignore"))
            .unwrap();
        assert!(!found);
        assert!(builder.build().unwrap().missing_files().is_empty());
    }

    #[test]
    fn test_add_file_reads_rules() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("custom.ignore");
        std::fs::write(&path, "*.tmp\n").unwrap();

        let mut builder = RuleSetBuilder::new(tmp.path());
        assert!(builder.add_file(&path).unwrap());
        let rules = builder.build().unwrap();
        let ex = rules.explain("x.tmp", false).unwrap();
        assert_eq!(ex.rule.source, RuleSource::IgnoreFile(path));
    }
}
