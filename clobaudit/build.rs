//! Build script for clobaudit
//!
//! Captures build identification for the startup log line:
//! - Git commit hash (short form)
//! - Build timestamp
//! - Build profile (debug/release)
//!
//! Reruns only when sources, bundled resources or the checked-out commit
//! change, so the timestamp reflects the last build that changed something.

use std::process::Command;

/// Paths relative to the package root that invalidate build identification
const WATCHED_PATHS: &[&str] = &[
    "build.rs",
    "src",
    "resources",
    "clobaudit.toml",
    "../.git/HEAD",
    "../.git/refs/heads",
];

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}

fn main() {
    for path in WATCHED_PATHS {
        println!("cargo:rerun-if-changed={}", path);
    }

    let git_hash = git_short_hash().unwrap_or_else(|| "unknown".to_string());
    let build_timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
}
