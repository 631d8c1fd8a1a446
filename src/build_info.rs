//! Build information
//!
//! Metadata stamped in by `build.rs` plus the package fields from
//! Cargo.toml. Reported by `igtrack_status` and printed at startup.

use serde::Serialize;

/// Raw build counter as set by `build.rs`, if it ran
const RAW_BUILD_NUMBER: Option<&str> = option_env!("IGTRACK_BUILD_NUMBER");

/// Build timestamp (UTC, ISO 8601), or "unknown" outside a cargo build
pub const BUILD_TIMESTAMP: &str = match option_env!("IGTRACK_BUILD_TIMESTAMP") {
    Some(s) => s,
    None => "unknown",
};

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Package description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Parse a build counter; anything that is not a plain decimal number is 0
fn parse_build_number(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

/// Snapshot of the running binary's build metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    /// Incremented by every recompilation; 0 when unknown
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub description: &'static str,
}

impl BuildInfo {
    /// Build info of this binary
    pub fn current() -> Self {
        Self {
            name: NAME,
            version: VERSION,
            build_number: parse_build_number(RAW_BUILD_NUMBER),
            build_timestamp: BUILD_TIMESTAMP,
            description: DESCRIPTION,
        }
    }

    /// Short identifier, e.g. `igtrack 0.1.0 (build 12)`
    pub fn label(&self) -> String {
        format!("{} {} (build {})", self.name, self.version, self.build_number)
    }
}

/// Print the startup banner to stderr (stdout carries the MCP protocol)
pub fn print_startup_banner() {
    let info = BuildInfo::current();
    let rule = "=".repeat(47);
    eprintln!("{}", rule);
    eprintln!("  Instagram Growth Tracker");
    eprintln!("  {}", info.label());
    eprintln!("  Compiled: {}", info.build_timestamp);
    eprintln!("{}", rule);
}
