//! Tests for settings module - YAML merge and resolved defaults.

use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use omni_apply::{
    ApplySettings, DEFAULT_GIT_TIMEOUT_SECS, DEFAULT_MAX_FILE_SIZE, load_runtime_settings_from_paths,
};
use omni_patch::PatchMode;

#[test]
fn test_user_overrides_system() {
    let dir = TempDir::new().unwrap();
    let system = dir.path().join("settings-system.yaml");
    let user = dir.path().join("settings-user.yaml");
    fs::write(
        &system,
        "apply:\n  default_mode: smart\n  backup: true\n  git_timeout_secs: 5\n",
    )
    .unwrap();
    fs::write(&user, "apply:\n  default_mode: functions\n").unwrap();

    let settings = load_runtime_settings_from_paths(&system, &user).apply;
    assert_eq!(settings.mode(), PatchMode::Functions);
    assert_eq!(settings.backup, Some(true));
    assert_eq!(settings.git_timeout(), Duration::from_secs(5));
}

#[test]
fn test_missing_and_invalid_files_fall_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let system = dir.path().join("absent.yaml");
    let user = dir.path().join("broken.yaml");
    fs::write(&user, "apply: [not, a, map\n").unwrap();

    let settings = load_runtime_settings_from_paths(&system, &user).apply;
    assert_eq!(settings.mode(), PatchMode::Replace);
    assert_eq!(settings.max_file_size(), DEFAULT_MAX_FILE_SIZE);
    assert_eq!(
        settings.git_timeout(),
        Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS)
    );
}

#[test]
fn test_other_sections_are_ignored() {
    let dir = TempDir::new().unwrap();
    let system = dir.path().join("settings.yaml");
    fs::write(
        &system,
        "mcp:\n  agent_pool_size: 4\napply:\n  ignore_whitespace: true\n",
    )
    .unwrap();

    let settings = load_runtime_settings_from_paths(&system, &dir.path().join("none.yaml")).apply;
    assert_eq!(settings.ignore_whitespace, Some(true));
}

#[test]
fn test_unknown_mode_falls_back_to_replace() {
    let settings = ApplySettings {
        default_mode: Some("rewrite".to_string()),
        ..ApplySettings::default()
    };
    assert_eq!(settings.mode(), PatchMode::Replace);
}

#[test]
fn test_commit_message_template() {
    assert_eq!(
        ApplySettings::default().commit_message("app.js"),
        "Applied patch to app.js"
    );
    let settings = ApplySettings {
        commit_message_template: Some("chore: patch {file}".to_string()),
        ..ApplySettings::default()
    };
    assert_eq!(settings.commit_message("lib.rs"), "chore: patch lib.rs");
}

#[test]
fn test_zero_limits_use_defaults() {
    let settings = ApplySettings {
        git_timeout_secs: Some(0),
        max_file_size: Some(0),
        ..ApplySettings::default()
    };
    assert_eq!(
        settings.git_timeout(),
        Duration::from_secs(DEFAULT_GIT_TIMEOUT_SECS)
    );
    assert_eq!(settings.max_file_size(), DEFAULT_MAX_FILE_SIZE);
}

#[test]
fn test_empty_user_file_keeps_system_values() {
    let dir = TempDir::new().unwrap();
    let system = dir.path().join("system.yaml");
    let user = dir.path().join("user.yaml");
    fs::write(&system, "apply:\n  backup: true\n").unwrap();
    fs::write(&user, "   \n").unwrap();

    let settings = load_runtime_settings_from_paths(&system, &user).apply;
    assert_eq!(settings.backup, Some(true));
}
