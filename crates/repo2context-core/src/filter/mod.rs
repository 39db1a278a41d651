//! Path filtering: which entries under the root become content candidates.
//!
//! - [`rules`]: layered gitignore-style rules with last-match-wins precedence
//! - [`walk`]: lazy, name-ordered depth-first traversal that prunes excluded
//!   directories
//! - [`content`]: the read step with binary detection

pub mod content;
pub mod rules;
pub mod walk;

pub use content::{FileCandidate, FileContent, read_candidate};
pub use rules::{
    DEFAULT_EXCLUDES, Explanation, FilterError, IGNORE_FILE_NAME, IgnoreRuleSet, Polarity, Rule,
    RuleSetBuilder, RuleSource,
};
pub use walk::{PathFilter, Walk, WalkEntry, check_root};

use std::path::Path;

use repo2context_config::FilterConfig;

/// Assemble the full rule set for `root` in precedence order: defaults,
/// `.gitignore`, `.repo2contextignore`, configured ignore files, config
/// excludes, then the command-line `overrides` (which win last).
///
/// Relative ignore-file paths resolve against the current directory, the
/// way a shell user expects `--rules` to behave.
pub fn build_rules(
    root: &Path,
    config: &FilterConfig,
    overrides: &[(String, Polarity)],
) -> Result<IgnoreRuleSet, FilterError> {
    let mut builder = RuleSetBuilder::new(root).with_defaults();
    if config.respect_gitignore {
        builder.add_optional_file(&root.join(".gitignore"))?;
    }
    builder.add_optional_file(&root.join(IGNORE_FILE_NAME))?;
    for file in &config.ignore_files {
        builder.add_file(file)?;
    }
    for pattern in &config.exclude {
        builder.add_override(pattern, Polarity::Exclude);
    }
    for pattern in &config.include {
        builder.add_override(pattern, Polarity::Include);
    }
    for (pattern, polarity) in overrides {
        builder.add_override(pattern, *polarity);
    }
    builder.build()
}
