use std::{
    fs,
    io::Write,
    path::PathBuf,
    process::{Command, Stdio},
};

fn write_source(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("spinwheel-cli-{}-{name}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("items.txt");
    fs::write(&path, contents).expect("write item source");
    path
}

#[test]
fn cli_compiles_without_warnings() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--quiet", "--bin", "spinwheel"])
        .status()
        .expect("failed to invoke cargo check for spinwheel CLI binary");

    assert!(status.success(), "cargo check --bin spinwheel should succeed");
}

#[test]
fn dump_items_prints_parsed_entries_as_json() {
    let source = write_source("dump", "Gem (1/30) (+1)\nRelax (>5s)\n");
    let output = Command::new(env!("CARGO_BIN_EXE_spinwheel"))
        .arg(&source)
        .arg("--dump-items")
        .output()
        .expect("failed to run spinwheel");

    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be json");
    let entries = json["entries"].as_array().expect("entries array");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["base_name"], "Gem");
    assert_eq!(entries[0]["modifiers"]["special_target"], 30);
}

#[test]
fn conflicting_modifiers_fail_to_start() {
    let source = write_source("conflict", "Gem (+1)\nGem (+2)\n");
    let output = Command::new(env!("CARGO_BIN_EXE_spinwheel"))
        .arg(&source)
        .stdin(Stdio::null())
        .output()
        .expect("failed to run spinwheel");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("conflicting modifiers"), "stderr: {stderr}");
}

#[test]
fn scripted_session_reports_the_result() {
    let source = write_source("session", "Only\n");
    let mut child = Command::new(env!("CARGO_BIN_EXE_spinwheel"))
        .arg(&source)
        .args(["--no-heartbeat", "--seed", "7"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to run spinwheel");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(b"spin\nstatus\nquit\n")
        .expect("write commands");
    let output = child.wait_with_output().expect("wait for spinwheel");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Result: Only. Spin again."), "stdout: {stdout}");
    assert!(stdout.contains("BPM: 60"), "stdout: {stdout}");
}
