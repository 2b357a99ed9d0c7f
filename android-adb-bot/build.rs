use std::env;
use std::process::Command;
use time::OffsetDateTime;

// Embeds APP_VERSION_DISPLAY ("0.1.0" on a matching tag or in release
// builds, "0.1.0-dev" otherwise) and APP_BUILD_YEAR.
fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-env-changed=CARGO_PKG_VERSION");

    println!("cargo:rustc-env=APP_BUILD_YEAR={}", build_year());
    println!("cargo:rustc-env=APP_VERSION_DISPLAY={}", display_version());
}

/// Year of SOURCE_DATE_EPOCH for reproducible builds, else the current year.
fn build_year() -> i32 {
    env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|raw| raw.parse::<i64>().ok())
        .and_then(|epoch| OffsetDateTime::from_unix_timestamp(epoch).ok())
        .map(|dt| dt.year())
        .unwrap_or_else(|| OffsetDateTime::now_utc().year())
}

fn display_version() -> String {
    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    if env::var("PROFILE").as_deref() == Ok("release") {
        return version;
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/tags");
    let tag = Command::new("git")
        .args(["describe", "--tags", "--exact-match"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok());

    match tag {
        Some(tag) if tag.trim() == format!("v{version}") => version,
        _ => format!("{version}-dev"),
    }
}
