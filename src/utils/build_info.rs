/// Compile-time build metadata produced by `build.rs`.
#[derive(Debug, Clone, Copy)]
pub struct BuildMetadata {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_status: &'static str,
    pub timestamp: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
}

pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn current() -> BuildMetadata {
    BuildMetadata {
        version: CLI_VERSION,
        git_hash: option_env!("BACKOFFICE_BUILD_HASH").unwrap_or("unknown"),
        git_status: option_env!("BACKOFFICE_BUILD_STATUS").unwrap_or("unknown"),
        timestamp: option_env!("BACKOFFICE_BUILD_TIMESTAMP").unwrap_or("unknown"),
        target: option_env!("BACKOFFICE_BUILD_TARGET").unwrap_or("unknown"),
        profile: option_env!("BACKOFFICE_BUILD_PROFILE").unwrap_or("unknown"),
        rustc: option_env!("BACKOFFICE_BUILD_RUSTC").unwrap_or("unknown"),
    }
}

impl BuildMetadata {
    /// `name=value` pairs in display order.
    pub fn fields(&self) -> [(&'static str, &'static str); 7] {
        [
            ("version", self.version),
            ("commit", self.git_hash),
            ("tree", self.git_status),
            ("built", self.timestamp),
            ("target", self.target),
            ("profile", self.profile),
            ("rustc", self.rustc),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_matches_package() {
        let meta = current();
        assert_eq!(meta.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(meta.fields()[0], ("version", CLI_VERSION));
    }
}
