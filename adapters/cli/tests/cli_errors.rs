use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn run_with_level(level: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_party-grid"))
        .arg("--level")
        .arg(level)
        .arg("place")
        .output()
        .expect("failed to launch party-grid")
}

#[test]
fn malformed_level_exits_with_context() {
    let output = run_with_level(&fixture("ragged.toml"));
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("failed to load level"), "stderr: {stderr}");
    assert!(stderr.contains("ragged.toml"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_level_file_exits_with_context() {
    let output = run_with_level(&fixture("does-not-exist.toml"));
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("failed to read level file"), "stderr: {stderr}");
}
