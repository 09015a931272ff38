use std::fs;
use std::process::Command;

use tempfile::TempDir;

#[test]
fn fallback_cli_writes_png() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let output = root.path().join("fallback.png");

    let status = Command::new(env!("CARGO_BIN_EXE_backdrop"))
        .env("BACKDROP_CONFIG_DIR", &config_dir)
        .args(["fallback", "--output"])
        .arg(&output)
        .args(["--size", "64x48"])
        .status()
        .expect("failed to run backdrop fallback");

    assert!(status.success());

    let bytes = fs::read(&output).unwrap();
    assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
}

#[test]
fn config_cli_layers_settings_file_and_flags() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("settings.toml"),
        "profile = \"production\"\n\n[gpu]\npower = \"low\"\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_backdrop"))
        .env("BACKDROP_CONFIG_DIR", &config_dir)
        .env_remove("BACKDROP_DEBUG")
        .args(["config", "--no-parallax"])
        .output()
        .expect("failed to run backdrop config");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("profile = \"production\""));
    assert!(stdout.contains("power = \"low\""));
    assert!(stdout.contains("enable_scroll_parallax = false"));
    assert!(stdout.contains("enable_debug_overlay = false"));
}

#[test]
fn config_cli_rejects_invalid_settings() {
    let root = TempDir::new().unwrap();
    let config_dir = root.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("settings.toml"), "version = 2\n").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_backdrop"))
        .env("BACKDROP_CONFIG_DIR", &config_dir)
        .arg("config")
        .status()
        .expect("failed to run backdrop config");

    assert!(!status.success());
}
