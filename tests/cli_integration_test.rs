//! CLI integration tests: run the bftool binary against a fixture file.
//! Uses CARGO_BIN_EXE_bftool when set (e.g. by `cargo test`).

mod common;

use std::io::Write;
use std::process::Command;

use common::fixtures::{FILE, fixture_json};

fn bin() -> Option<std::path::PathBuf> {
    std::env::var_os("CARGO_BIN_EXE_bftool").map(std::path::PathBuf::from)
}

fn fixture_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("create temp fixture");
    write!(file, "{}", fixture_json()).expect("write fixture");
    file
}

#[test]
fn test_cli_help_succeeds() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let out = Command::new(bin)
        .arg("--help")
        .output()
        .expect("run --help");
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("bftool"));
    assert!(stdout.contains("show"));
    assert!(stdout.contains("serve"));
}

#[test]
fn test_cli_show_text_with_toggles() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let fixture = fixture_file();
    let out = Command::new(&bin)
        .arg("show")
        .arg("--fixture")
        .arg(fixture.path())
        .args(["--file", FILE, "--function", "handle"])
        .args(["--toggle", "b1", "--toggle", "b2"])
        .output()
        .expect("run show");
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Call flow: app/service.py::handle"));
    assert!(stdout.contains("validate"));
    assert!(stdout.contains("reject"));
    assert!(stdout.contains("[-] b1 then"));
    assert!(stdout.contains("[+] b3 retry"));
}

#[test]
fn test_cli_show_json_round_trip_hides_branch() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let fixture = fixture_file();
    let out = Command::new(&bin)
        .arg("show")
        .arg("--fixture")
        .arg(fixture.path())
        .args(["--file", FILE, "--function", "handle"])
        .args(["--toggle", "b1", "--toggle", "b1", "--format", "json"])
        .output()
        .expect("run show --format json");
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let graph: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json output");
    let ids: Vec<&str> = graph["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["root"]);
    let b1 = &graph["decisionNodes"][0]["branches"][0];
    assert_eq!(b1["isLoaded"], true);
    assert_eq!(b1["isExpanded"], false);
}

#[test]
fn test_cli_show_dot() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let fixture = fixture_file();
    let out = Command::new(&bin)
        .arg("show")
        .arg("--fixture")
        .arg(fixture.path())
        .args(["--file", FILE, "--function", "handle", "--toggle", "b1"])
        .args(["--format", "dot"])
        .output()
        .expect("run show --format dot");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("digraph"));
    assert!(stdout.contains("validate"));
}

#[test]
fn test_cli_show_unknown_branch_fails() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let fixture = fixture_file();
    let out = Command::new(&bin)
        .arg("show")
        .arg("--fixture")
        .arg(fixture.path())
        .args(["--file", FILE, "--function", "handle", "--toggle", "b42"])
        .output()
        .expect("run show with unknown branch");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("b42"));
}

#[test]
fn test_cli_show_missing_fixture_fails() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let out = Command::new(&bin)
        .args(["show", "--fixture", "nonexistent_fixture_12345.json"])
        .args(["--file", FILE, "--function", "handle"])
        .output()
        .expect("run show with missing fixture");
    assert!(!out.status.success(), "expected failure when fixture missing");
}

#[test]
fn test_cli_serve_requires_a_source() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let out = Command::new(&bin)
        .arg("serve")
        .env_remove("BRANCHFLOW_SERVICE_URL")
        .output()
        .expect("run serve without a source");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("--service-url") || stderr.contains("--fixture"));
}
