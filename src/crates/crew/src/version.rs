//! Build metadata injected by `build.rs`.

use serde::Serialize;

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short git commit hash, or "unknown" outside a checkout
pub const GIT_COMMIT: &str = env!("CREW_GIT_COMMIT");

/// Cargo profile the binary was built with
pub const BUILD_PROFILE: &str = env!("CREW_BUILD_PROFILE");

/// UTC build time
pub const BUILD_TIMESTAMP: &str = env!("CREW_BUILD_TIMESTAMP");

/// Version metadata as a struct
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_commit: &'static str,
    pub profile: &'static str,
    pub built_at: &'static str,
}

impl VersionInfo {
    pub fn get() -> Self {
        Self {
            version: VERSION,
            git_commit: GIT_COMMIT,
            profile: BUILD_PROFILE,
            built_at: BUILD_TIMESTAMP,
        }
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "crew v{} ({} build, commit {}, built {})",
            self.version, self.profile, self.git_commit, self.built_at
        )
    }
}

/// Full one-line version string, e.g. `crew v0.1.0 (release build, commit abc123, built ...)`.
pub fn full_version() -> String {
    VersionInfo::get().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constants_are_populated() {
        assert!(!VERSION.is_empty());
        assert!(!GIT_COMMIT.is_empty());
        assert!(!BUILD_PROFILE.is_empty());
        assert!(!BUILD_TIMESTAMP.is_empty());
    }

    #[test]
    fn test_full_version_mentions_crate() {
        let version = full_version();
        assert!(version.starts_with("crew v"));
        assert!(version.contains(VERSION));
    }
}
