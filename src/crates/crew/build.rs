use std::env;
use std::process::Command;

fn main() {
    let git_commit = env::var("CREW_GIT_COMMIT").unwrap_or_else(|_| {
        Command::new("git")
            .args(["rev-parse", "--short", "HEAD"])
            .output()
            .ok()
            .filter(|output| output.status.success())
            .and_then(|output| String::from_utf8(output.stdout).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    });
    println!("cargo:rustc-env=CREW_GIT_COMMIT={}", git_commit);

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=CREW_BUILD_PROFILE={}", profile);

    println!(
        "cargo:rustc-env=CREW_BUILD_TIMESTAMP={}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );

    println!("cargo:rerun-if-env-changed=CREW_GIT_COMMIT");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
