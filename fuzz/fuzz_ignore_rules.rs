//! Fuzz target for ignore-rule compilation and matching.
//!
//! Run with: cargo +nightly fuzz run fuzz_ignore_rules
//!
//! The first line of the input is a relative path; the rest is an ignore
//! file. Invalid patterns must surface as errors, never panics.

#![no_main]

use libfuzzer_sys::fuzz_target;
use repo2context_core::filter::{RuleSetBuilder, RuleSource};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (path, rules) = text.split_once('\n').unwrap_or((text, ""));

    let mut builder = RuleSetBuilder::new("/fuzz-root").with_defaults();
    builder.add_text(rules, RuleSource::Override);
    let Ok(set) = builder.build() else {
        return;
    };

    let path = path.trim_matches('/');
    if path.is_empty() {
        return;
    }
    let excluded = set.is_excluded(path, false);
    let _ = set.is_excluded(path, true);
    if excluded {
        let _ = set.explain(path, false);
    }
});
