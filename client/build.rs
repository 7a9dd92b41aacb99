//! Embeds the commit and build time reported by `swarmhub version`

use std::env;
use std::process::Command;

use chrono::Utc;

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string())
}

fn main() {
    // Release tarballs carry no .git, packagers pass the hash instead
    let git_hash = env::var("SWARMHUB_GIT_HASH")
        .ok()
        .filter(|hash| !hash.is_empty())
        .or_else(git_short_hash)
        .unwrap_or_else(|| "unknown".to_string());

    let build_time = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIME={}", build_time);
    println!("cargo:rerun-if-env-changed=SWARMHUB_GIT_HASH");
    println!("cargo:rerun-if-changed=../.git/HEAD");
}
