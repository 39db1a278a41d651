//! Build metadata embedded by the build script, shown by `--version`.

/// Short commit hash, with `-dirty` for uncommitted changes, or `unknown`
/// outside a git checkout.
pub const GIT_REVISION: &str = env!("REPO2CONTEXT_GIT_REVISION");

/// The build profile (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("REPO2CONTEXT_BUILD_PROFILE");

/// Target triple the binary was compiled for.
pub const BUILD_TARGET: &str = env!("REPO2CONTEXT_BUILD_TARGET");

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Whether the binary was built from a modified work tree.
pub fn is_dirty() -> bool {
    GIT_REVISION.ends_with("-dirty")
}

/// Example: `"0.1.0 (abc1234, release, x86_64-unknown-linux-gnu)"`
pub fn version_string() -> String {
    format!("{VERSION} ({GIT_REVISION}, {BUILD_PROFILE}, {BUILD_TARGET})")
}
