//! Build script for igtrack
//!
//! Bumps a persistent build counter and embeds build metadata.

use std::fs;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src");

    // Counter lives in the target directory so source checkouts stay clean
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap_or_else(|_| ".".to_string()));
    let counter_path = out_dir.join("igtrack_build_number.txt");

    let previous: u64 = fs::read_to_string(&counter_path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let build_number = previous + 1;

    if let Err(e) = fs::write(&counter_path, build_number.to_string()) {
        println!("cargo:warning=could not persist build number: {}", e);
    }

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    println!("cargo:rustc-env=IGTRACK_BUILD_NUMBER={}", build_number);
    println!("cargo:rustc-env=IGTRACK_BUILD_TIMESTAMP={}", timestamp);
}
