//! Integration tests for CLI commands, in-process and through the binary

use super::test_utils::write_sample_inputs;
use qstage::cli::{Commands, RunContext, SessionArgs};
use qstage::config::QStageConfig;
use qstage::ApiError;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn context(temp: &TempDir) -> RunContext {
    write_sample_inputs(temp.path());
    RunContext::with_config(temp.path().to_path_buf(), QStageConfig::default()).unwrap()
}

fn session(changes: Option<&str>) -> SessionArgs {
    SessionArgs {
        structure: PathBuf::from("structure.json"),
        properties: PathBuf::from("properties.json"),
        changes: changes.map(PathBuf::from),
    }
}

fn write_changes(temp: &TempDir, body: &str) {
    std::fs::write(temp.path().join("changes.json"), body).unwrap();
}

#[test]
fn test_paths_lists_discovered_queues() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let out = ctx
        .execute(&Commands::Paths {
            properties: PathBuf::from("properties.json"),
            format: "json".to_string(),
        })
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&out.text).unwrap();
    assert_eq!(
        json["paths"],
        serde_json::json!(["root", "root.dev", "root.prod", "root.prod.adhoc", "root.prod.etl"])
    );
}

#[test]
fn test_validate_clean_sample() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let out = ctx
        .execute(&Commands::Validate {
            session: session(None),
            labels: None,
            format: "json".to_string(),
        })
        .unwrap();
    assert!(out.success);
    assert_eq!(out.exit_code(), 0);
}

#[test]
fn test_validate_reports_staged_errors() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    write_changes(
        &temp,
        r#"[{"op": "update", "queue": "root.prod.etl", "properties": {"state": "STOPPED"}}]"#,
    );
    let out = ctx
        .execute(&Commands::Validate {
            session: session(Some("changes.json")),
            labels: None,
            format: "json".to_string(),
        })
        .unwrap();
    assert!(!out.success);
    assert_ne!(out.exit_code(), 0);
    assert!(out.text.contains("root.prod.etl"), "{}", out.text);
}

#[test]
fn test_diff_lists_changes() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    write_changes(
        &temp,
        r#"[{"op": "update", "queue": "root.dev", "properties": {"capacity": "25"}},
            {"op": "update", "queue": "root.prod", "properties": {"capacity": "75"}}]"#,
    );
    let out = ctx
        .execute(&Commands::Diff {
            session: session(Some("changes.json")),
            format: "json".to_string(),
        })
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&out.text).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["changes"][0]["queue_path"], "root.prod");
}

#[test]
fn test_payload_refuses_invalid_session_unless_forced() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    write_changes(
        &temp,
        r#"[{"op": "update", "queue": "root.dev", "properties": {"capacity": "50"}}]"#,
    );

    let err = ctx
        .execute(&Commands::Payload {
            session: session(Some("changes.json")),
            labels: None,
            force: false,
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationFailed(1)));

    let out = ctx
        .execute(&Commands::Payload {
            session: session(Some("changes.json")),
            labels: None,
            force: true,
        })
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&out.text).unwrap();
    assert_eq!(json["update-queue"][0]["queue-name"], "root.dev");
    assert_eq!(json["update-queue"][0]["params"]["capacity"], "50");
}

#[test]
fn test_failing_change_script_reports_index() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    write_changes(
        &temp,
        r#"[{"op": "update", "queue": "root.dev", "properties": {"capacity": "30"}},
            {"op": "delete", "queue": "root.prod"}]"#,
    );
    let err = ctx
        .execute(&Commands::Diff {
            session: session(Some("changes.json")),
            format: "text".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, ApiError::ChangeScript { index: 1, .. }));
}

#[test]
fn test_show_single_queue() {
    let temp = TempDir::new().unwrap();
    let ctx = context(&temp);
    let out = ctx
        .execute(&Commands::Show {
            session: session(None),
            queue: Some("root.prod".to_string()),
            format: "text".to_string(),
        })
        .unwrap();
    assert!(out.text.contains("root.prod"));
    assert!(out.text.contains("maximum-capacity"));
}

#[test]
fn test_binary_exit_codes() {
    let temp = TempDir::new().unwrap();
    write_sample_inputs(temp.path());
    let bin = env!("CARGO_BIN_EXE_qstage");

    let ok = Command::new(bin)
        .args(["--quiet", "--workspace"])
        .arg(temp.path())
        .args(["validate", "--structure", "structure.json", "--properties", "properties.json"])
        .env("XDG_CONFIG_HOME", temp.path().join("xdg"))
        .output()
        .unwrap();
    assert!(ok.status.success(), "{}", String::from_utf8_lossy(&ok.stderr));

    let missing = Command::new(bin)
        .args(["--quiet", "--workspace"])
        .arg(temp.path())
        .args(["paths", "--properties", "absent.json"])
        .env("XDG_CONFIG_HOME", temp.path().join("xdg"))
        .output()
        .unwrap();
    assert!(!missing.status.success());
}
