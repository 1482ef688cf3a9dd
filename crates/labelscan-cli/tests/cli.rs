use std::fs::File;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command with its config directory redirected into `home`.
fn labelscan(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("labelscan").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

fn write_png(path: &Path) {
    image::RgbImage::from_pixel(64, 64, image::Rgb([255, 255, 255]))
        .save(path)
        .unwrap();
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    labelscan(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_path_before_init() {
    let home = TempDir::new().unwrap();
    labelscan(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("labelscan"))
        .stdout(predicate::str::contains("not created"));
}

#[test]
fn test_config_init_set_get() {
    let home = TempDir::new().unwrap();

    labelscan(home.path()).args(["config", "init"]).assert().success();
    assert!(home.path().join(".config/labelscan/config.json").exists());

    labelscan(home.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    labelscan(home.path())
        .args(["config", "get", "blocks.eps_ratio"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.05"));

    labelscan(home.path())
        .args(["config", "set", "detection.max_diagnostic_texts", "5"])
        .assert()
        .success();

    labelscan(home.path())
        .args(["config", "get", "detection.max_diagnostic_texts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5"));

    labelscan(home.path())
        .args(["config", "get", "detection.unknown"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn test_config_show_defaults() {
    let home = TempDir::new().unwrap();
    labelscan(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"eps_ratio\""))
        .stdout(predicate::str::contains("\"max_plausible_value\""));
}

#[test]
fn test_process_missing_file() {
    let home = TempDir::new().unwrap();
    labelscan(home.path())
        .args(["process", "/nonexistent/label.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_process_rejects_unsupported_extension() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("label.gif");
    File::create(&input).unwrap();

    labelscan(home.path())
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format: gif"));
}

#[test]
fn test_process_rejects_oversized_file() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("huge.png");
    File::create(&input).unwrap().set_len(10 * 1024 * 1024 + 1).unwrap();

    labelscan(home.path())
        .arg("process")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("too large"));
}

#[test]
fn test_process_reports_missing_models_as_result() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("label.png");
    write_png(&input);
    let models = home.path().join("models");
    std::fs::create_dir_all(&models).unwrap();

    labelscan(home.path())
        .arg("process")
        .arg(&input)
        .arg("--model-dir")
        .arg(&models)
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"success\": false"))
        .stdout(predicate::str::contains("model files not found"));
}

#[test]
fn test_batch_without_matches() {
    let home = TempDir::new().unwrap();
    let pattern = home.path().join("*.png");

    labelscan(home.path())
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn test_batch_fails_fast_without_models() {
    let home = TempDir::new().unwrap();
    write_png(&home.path().join("a.png"));
    write_png(&home.path().join("b.png"));
    let pattern = home.path().join("*.png");

    labelscan(home.path())
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .arg("--model-dir")
        .arg(home.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load OCR models"));
}
