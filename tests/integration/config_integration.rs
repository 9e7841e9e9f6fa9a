//! Integration tests for layered configuration loading

use super::test_utils::with_xdg_env;
use qstage::cli::RunContext;
use qstage::config::{ConfigLoader, QStageConfig};
use std::fs;
use tempfile::TempDir;

fn write_workspace_config(workspace: &std::path::Path, name: &str, body: &str) {
    let dir = workspace.join("config");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), body).unwrap();
}

#[test]
fn test_defaults_without_any_files() {
    let temp = TempDir::new().unwrap();
    let config = with_xdg_env(&temp, || ConfigLoader::load(temp.path()).unwrap());
    assert_eq!(config, QStageConfig::default());
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let temp = TempDir::new().unwrap();
    let config = with_xdg_env(&temp, || {
        let global_dir = temp.path().join("xdg").join("qstage");
        fs::create_dir_all(&global_dir).unwrap();
        fs::write(
            global_dir.join("config.toml"),
            "[validation]\ncapacity_epsilon = 0.5\nallow_zero_sum = true\n",
        )
        .unwrap();
        write_workspace_config(
            temp.path(),
            "config.toml",
            "[validation]\ncapacity_epsilon = 0.1\n",
        );
        ConfigLoader::load(temp.path()).unwrap()
    });

    assert_eq!(config.validation.capacity_epsilon, 0.1);
    assert!(config.validation.allow_zero_sum);
}

#[test]
fn test_environment_overlay_file() {
    let temp = TempDir::new().unwrap();
    let config = with_xdg_env(&temp, || {
        write_workspace_config(temp.path(), "config.toml", "[logging]\nlevel = \"info\"\n");
        write_workspace_config(temp.path(), "staging.toml", "[logging]\nlevel = \"debug\"\n");
        std::env::set_var("QSTAGE_ENV", "staging");
        ConfigLoader::load(temp.path()).unwrap()
    });
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_environment_variables_win() {
    let temp = TempDir::new().unwrap();
    let config = with_xdg_env(&temp, || {
        write_workspace_config(
            temp.path(),
            "config.toml",
            "[validation]\nallow_zero_sum = false\n",
        );
        std::env::set_var("QSTAGE_VALIDATION__ALLOW_ZERO_SUM", "true");
        let loaded = ConfigLoader::load(temp.path());
        std::env::remove_var("QSTAGE_VALIDATION__ALLOW_ZERO_SUM");
        loaded.unwrap()
    });
    assert!(config.validation.allow_zero_sum);
}

#[test]
fn test_explicit_file_is_required() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("absent.toml");
    assert!(with_xdg_env(&temp, || ConfigLoader::load_from_file(&missing)).is_err());
}

#[test]
fn test_invalid_workspace_config_fails_run_context() {
    let temp = TempDir::new().unwrap();
    let result = with_xdg_env(&temp, || {
        write_workspace_config(
            temp.path(),
            "config.toml",
            "[properties]\nprefix = \"missing-dot\"\n",
        );
        RunContext::new(temp.path().to_path_buf(), None)
    });
    let err = result.err().expect("invalid prefix should be rejected");
    assert!(err.to_string().contains("Properties"));
}

#[test]
fn test_xdg_path_follows_config_home() {
    let temp = TempDir::new().unwrap();
    let path = with_xdg_env(&temp, ConfigLoader::xdg_config_path).unwrap();
    assert!(path.starts_with(temp.path().join("xdg")));
    assert!(path.ends_with("qstage/config.toml"));
}
