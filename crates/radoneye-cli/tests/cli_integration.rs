//! CLI Integration Tests
//!
//! These run the `radoneye` binary for behaviour that needs no hardware:
//! help output, argument validation and the config file.
//!
//! ```
//! cargo test --package radoneye-cli --test cli_integration
//! ```

use std::path::Path;
use std::process::{Command, Output};

fn run_radoneye(args: &[&str], config: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_radoneye"))
        .args(args)
        .env("RADONEYE_CONFIG", config)
        .env_remove("RADONEYE_DEVICE")
        .env_remove("RADONEYE_ROUNDING_OFF")
        .output()
        .expect("Failed to run radoneye binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_command() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_radoneye(&["--help"], &dir.path().join("config.toml"));

    assert!(output.status.success(), "Help should succeed");
    let out = stdout(&output);
    assert!(out.contains("RadonEye"), "Help should mention RadonEye");
    for command in ["list", "status", "history", "beep", "alarm", "unit", "config"] {
        assert!(out.contains(command), "Help should list {command}");
    }
}

#[test]
fn test_version_command() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_radoneye(&["--version"], &dir.path().join("config.toml"));

    assert!(output.status.success(), "Version should succeed");
    assert!(stdout(&output).contains("radoneye"));
}

#[test]
fn test_subcommand_help() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");

    for command in ["list", "status", "history", "beep", "alarm", "unit", "config"] {
        let output = run_radoneye(&[command, "--help"], &config);
        assert!(output.status.success(), "{command} --help should succeed");
        assert!(!stdout(&output).is_empty());
    }
}

// =============================================================================
// Argument validation (fails before touching Bluetooth)
// =============================================================================

#[test]
fn test_status_without_device_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_radoneye(&["status"], &dir.path().join("config.toml"));

    assert!(!output.status.success());
    assert!(stderr(&output).contains("No device specified"));
}

#[test]
fn test_alarm_requires_enabled_or_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_radoneye(&["alarm", "FR:RU2201"], &dir.path().join("config.toml"));

    assert!(!output.status.success());
    assert!(stderr(&output).contains("--enabled"));
}

#[test]
fn test_invalid_output_format() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_radoneye(
        &["status", "FR:RU2201", "--output", "csv"],
        &dir.path().join("config.toml"),
    );

    assert!(!output.status.success());
}

// =============================================================================
// Config Commands
// =============================================================================

#[test]
fn test_config_path_honours_env() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("custom.toml");
    let output = run_radoneye(&["config", "path"], &config);

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), config.display().to_string());
}

#[test]
fn test_config_set_then_show() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");

    let output = run_radoneye(&["config", "set", "device", "FR:RU22012020159"], &config);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = run_radoneye(&["config", "set", "history_scale", "legacy"], &config);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = run_radoneye(&["config", "show"], &config);
    assert!(output.status.success());
    let shown = stdout(&output);
    assert!(shown.contains("device = \"FR:RU22012020159\""));
    assert!(shown.contains("history_scale = \"legacy\""));
}

#[test]
fn test_config_rejects_unknown_key() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let output = run_radoneye(&["config", "set", "colour", "red"], &config);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown config key"));
    assert!(!config.exists());
}
