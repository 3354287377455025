//! Stamps `APP_VERSION`, reported by `/api/version` and the startup log.

use std::process::Command;

fn git_short_sha() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn main() {
    let base = env!("CARGO_PKG_VERSION");

    let version = if env_flag("PRACHT_DEV_BUILD") {
        // CI checkouts without .git pass the sha in GIT_SHA
        let sha = git_short_sha()
            .or_else(|| std::env::var("GIT_SHA").ok().filter(|s| !s.is_empty()));
        match sha {
            Some(sha) => format!("{base}-dev+{sha}"),
            None => format!("{base}-dev"),
        }
    } else {
        base.to_string()
    };

    println!("cargo:rustc-env=APP_VERSION={version}");
    println!("cargo:rerun-if-env-changed=PRACHT_DEV_BUILD");
    println!("cargo:rerun-if-env-changed=GIT_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
