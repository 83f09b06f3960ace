//! Runtime settings loader for omni-apply.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/settings.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/omni-dev-fusion/settings.yaml`
//!
//! Merge precedence is user over system. Only the `apply` section is read;
//! other sections of the shared settings file are ignored.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use omni_patch::PatchMode;
use serde::Deserialize;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/settings.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "omni-dev-fusion/settings.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

/// Largest target or patch file read by default (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
/// Default budget for each git subprocess.
pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 60;
/// Default commit message; `{file}` expands to the target's file name.
pub const DEFAULT_COMMIT_MESSAGE_TEMPLATE: &str = "Applied patch to {file}";

/// Settings file root.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    /// `apply:` section.
    #[serde(default)]
    pub apply: ApplySettings,
}

/// `apply:` section; every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplySettings {
    /// Mode used when `--mode` is not given.
    pub default_mode: Option<String>,
    /// Enable normalized and fuzzy matching by default.
    pub ignore_whitespace: Option<bool>,
    /// Always take a backup before writing.
    pub backup: Option<bool>,
    /// Budget for each git subprocess, in seconds.
    pub git_timeout_secs: Option<u64>,
    /// Commit message template with a `{file}` placeholder.
    pub commit_message_template: Option<String>,
    /// Largest file read, in bytes.
    pub max_file_size: Option<u64>,
}

impl RuntimeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            apply: self.apply.merge(overlay.apply),
        }
    }
}

impl ApplySettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            default_mode: overlay.default_mode.or(self.default_mode),
            ignore_whitespace: overlay.ignore_whitespace.or(self.ignore_whitespace),
            backup: overlay.backup.or(self.backup),
            git_timeout_secs: overlay.git_timeout_secs.or(self.git_timeout_secs),
            commit_message_template: overlay
                .commit_message_template
                .or(self.commit_message_template),
            max_file_size: overlay.max_file_size.or(self.max_file_size),
        }
    }

    /// Configured default mode; an unknown name falls back to `replace`.
    #[must_use]
    pub fn mode(&self) -> PatchMode {
        let Some(raw) = self.default_mode.as_deref() else {
            return PatchMode::default();
        };
        match raw.parse() {
            Ok(mode) => mode,
            Err(error) => {
                tracing::warn!(
                    value = raw,
                    error = %error,
                    "invalid apply.default_mode in settings; using replace"
                );
                PatchMode::default()
            }
        }
    }

    /// Per-invocation git budget.
    #[must_use]
    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(
            self.git_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_GIT_TIMEOUT_SECS),
        )
    }

    /// Read limit in bytes.
    #[must_use]
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
            .filter(|bytes| *bytes > 0)
            .unwrap_or(DEFAULT_MAX_FILE_SIZE)
    }

    /// Commit message for a target with this file name.
    #[must_use]
    pub fn commit_message(&self, file_name: &str) -> String {
        self.commit_message_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_COMMIT_MESSAGE_TEMPLATE)
            .replace("{file}", file_name)
    }
}

/// Where the two settings layers live for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsPaths {
    /// Project defaults, checked into the repository.
    pub system: PathBuf,
    /// Per-user overrides under the config home.
    pub user: PathBuf,
}

impl SettingsPaths {
    /// Resolve both layers from `PRJ_ROOT` (else the working directory) and
    /// the config home: `--conf`, then `PRJ_CONFIG_HOME`, then `.config`.
    #[must_use]
    pub fn resolve() -> Self {
        let root = env_path("PRJ_ROOT")
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let config_home = CONFIG_HOME_OVERRIDE
            .get()
            .cloned()
            .or_else(|| env_path("PRJ_CONFIG_HOME"))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_HOME_RELATIVE_PATH));
        // Joining an absolute path replaces the root.
        Self {
            system: root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH),
            user: root
                .join(config_home)
                .join(DEFAULT_USER_SETTINGS_RELATIVE_PATH),
        }
    }
}

/// Load the `apply` settings for this process; user values win over system.
#[must_use]
pub fn load_runtime_settings() -> RuntimeSettings {
    let paths = SettingsPaths::resolve();
    tracing::debug!(
        system = %paths.system.display(),
        user = %paths.user.display(),
        "loading settings"
    );
    load_runtime_settings_from_paths(&paths.system, &paths.user)
}

/// Merge two explicit settings files. A missing, unreadable or invalid file
/// contributes nothing.
#[must_use]
pub fn load_runtime_settings_from_paths(system: &Path, user: &Path) -> RuntimeSettings {
    let base = read_layer(system).unwrap_or_default();
    match read_layer(user) {
        Some(overlay) => base.merge(overlay),
        None => base,
    }
}

fn read_layer(path: &Path) -> Option<RuntimeSettings> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return None,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "settings file unreadable; skipped"
            );
            return None;
        }
    };
    if raw.trim().is_empty() {
        return None;
    }
    serde_yaml::from_str::<RuntimeSettings>(&raw)
        .inspect_err(|error| {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "settings file is not valid yaml; skipped"
            );
        })
        .ok()
}

/// Non-empty, trimmed value of an environment variable, as a path.
fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Point the user layer at another config home (CLI `--conf`).
///
/// Relative paths resolve against `PRJ_ROOT` or the working directory. Only
/// the first non-empty value sticks.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if let Err(rejected) = CONFIG_HOME_OVERRIDE.set(path)
        && CONFIG_HOME_OVERRIDE.get() != Some(&rejected)
    {
        tracing::warn!(
            ignored = %rejected.display(),
            "config home already set; keeping the first value"
        );
    }
}

