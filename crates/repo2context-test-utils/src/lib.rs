#![deny(unsafe_code)]

//! Shared test utilities for the repo2context workspace.
//!
//! Provides fixture repositories, config builders, a scripted completion
//! provider, and tracing helpers so that individual crate tests stay concise
//! and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! repo2context-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod fixture;
pub mod provider;
pub mod tracing_setup;

pub use config::TestConfigBuilder;
pub use fixture::FixtureRepo;
pub use provider::ScriptedProvider;
