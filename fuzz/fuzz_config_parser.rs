//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary text to `AppConfig::parse()`, which parses and validates,
//! looking for panics in either step.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = repo2context_config::AppConfig::parse(s) {
            let _ = config.filter.normalized_extensions();
            let _ = config.summary.api_key_env();
        }
    }
});
