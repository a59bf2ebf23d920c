//! Tests that run the `elxbridge` binary.

use std::fs;
use std::process::Command;

use elxbridge_params::{get_value, presets};
use pretty_assertions::assert_eq;

fn elxbridge() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_elxbridge"));
    command.env("RUST_LOG", "error");
    command
}

#[test]
fn params_show_prints_preset() {
    let output = elxbridge().args(["params", "show", "rigid"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), presets::rigid());
}

#[test]
fn params_set_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("pp.txt");
    let output = dir.path().join("pp.edited.txt");
    fs::write(&input, presets::deformable()).unwrap();

    let status = elxbridge()
        .args(["params", "set"])
        .arg(&input)
        .args(["FinalGridSpacingInPhysicalUnits", "8", "8"])
        .arg("--output")
        .arg(&output)
        .status()
        .unwrap();
    assert!(status.success());

    let edited = fs::read_to_string(&output).unwrap();
    assert_eq!(
        get_value(&edited, "FinalGridSpacingInPhysicalUnits"),
        Some(vec!["8".to_string(), "8".to_string()])
    );
    assert_eq!(fs::read_to_string(&input).unwrap(), presets::deformable());
}

#[test]
fn missing_input_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = elxbridge()
        .args(["warp", "--field"])
        .arg(dir.path().join("field.nrrd"))
        .arg("--input")
        .arg(dir.path().join("absent.nrrd"))
        .arg("--output")
        .arg(dir.path().join("out.nrrd"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Failed to read image"));
}
