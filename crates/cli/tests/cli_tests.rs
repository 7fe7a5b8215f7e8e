//! CLI integration tests

use std::process::Command;

fn meshstat(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "meshstat-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = meshstat(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Traffic statistics for service mesh workloads"),
        "Should show about text"
    );
    assert!(stdout.contains("stat"), "Should show stat command");
    assert!(stdout.contains("pods"), "Should show pods command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = meshstat(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("meshstat"), "Should show binary name");
}

#[test]
fn test_stat_help() {
    let output = meshstat(&["stat", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Stat help should succeed");
    for flag in [
        "--namespace",
        "--all-namespaces",
        "--time-window",
        "--to",
        "--to-namespace",
        "--from",
        "--from-namespace",
    ] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

#[test]
fn test_pods_help() {
    let output = meshstat(&["pods", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Pods help should succeed");
    assert!(stdout.contains("--namespace"), "Should show namespace option");
}

#[test]
fn test_to_and_from_conflict() {
    let output = meshstat(&["stat", "deploy", "--to", "deploy/a", "--from", "deploy/b"]);
    assert!(!output.status.success(), "--to with --from should be rejected");
}

#[test]
fn test_stat_requires_resource() {
    let output = meshstat(&["stat"]);
    assert!(!output.status.success(), "Missing resource should fail");
}
