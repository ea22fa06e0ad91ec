//! Subcommands that work without a WebSocket endpoint.
//!
//! `builders` and `preview` read the config and exit; they never connect.

use anyhow::Result;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn sioscope(config: &std::path::Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_sioscope"));
    command.arg("--config").arg(config).env_remove("RUST_LOG");
    command
}

#[test]
fn test_builders_lists_bundled_and_config_builders() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = temp_dir.path().join("sioscope.yml");
    fs::write(
        &config,
        r#"
builders:
  - event: "ChatRoomAdmin"
    fields: { MemberNumber: "", Action: "Kick" }
"#,
    )?;

    let output = sioscope(&config).arg("builders").output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let names: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(
        names,
        vec![
            "AccountLogin",
            "ChatRoomSearch",
            "ChatRoomJoin",
            "ChatRoomLeave",
            "ChatRoomChat",
            "ChatRoomAdmin"
        ]
    );
    assert!(stdout.contains(r#"Action="Kick""#));
    Ok(())
}

#[test]
fn test_preview_prints_coerced_payload() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = temp_dir.path().join("missing.yml");

    let output = sioscope(&config)
        .args(["preview", "ChatRoomSearch", "Query=42", "FullRooms=TRUE"])
        .output()?;
    assert!(output.status.success());

    let payload: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(payload["event"], "ChatRoomSearch");
    assert_eq!(payload["data"]["Query"], 42);
    assert_eq!(payload["data"]["FullRooms"], true);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found, using defaults"));
    Ok(())
}

#[test]
fn test_preview_unknown_builder_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = temp_dir.path().join("missing.yml");

    let output = sioscope(&config).args(["preview", "Nope"]).output()?;
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown builder: Nope"));
    Ok(())
}

#[test]
fn test_invalid_url_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = temp_dir.path().join("sioscope.yml");
    fs::write(&config, "transport:\n  url: \"http://127.0.0.1/ws\"\n")?;

    let output = sioscope(&config).arg("builders").output()?;
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Configuration validation failed"));
    Ok(())
}

#[test]
fn test_url_flag_overrides_config() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = temp_dir.path().join("sioscope.yml");
    fs::write(&config, "transport:\n  url: \"http://127.0.0.1/ws\"\n")?;

    let output = sioscope(&config)
        .args(["--url", "ws://127.0.0.1:9/ws", "builders"])
        .output()?;
    assert!(output.status.success());
    Ok(())
}
