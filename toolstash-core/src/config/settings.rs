//! Runtime settings for toolstash.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

const HOME_DIR_NAME: &str = ".toolstash";
const CONFIG_FILE: &str = "config.json";

pub const ENV_HOME: &str = "TOOLSTASH_HOME";
pub const ENV_PROGRESS: &str = "TOOLSTASH_PROGRESS";
pub const ENV_GITHUB_API: &str = "TOOLSTASH_GITHUB_API";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must be a boolean (1, t, true, 0, f, false), got {value:?}")]
    InvalidBool { var: String, value: String },
}

/// Parses a boolean the way Go's `strconv.ParseBool` does.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of all persistent state (`$HOME/.toolstash`).
    pub toolstash_home: PathBuf,

    /// Show a progress bar while downloading.
    pub progress: bool,

    /// Base URL of the GitHub REST API.
    pub github_api_url: String,

    /// Bearer token for GitHub API requests.
    #[serde(skip_serializing)]
    pub github_token: Option<String>,

    pub connect_timeout_secs: u64,

    /// Longest wait for any single read from a server.
    pub read_timeout_secs: u64,

    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            toolstash_home: default_home(),
            progress: true,
            github_api_url: DEFAULT_GITHUB_API.to_string(),
            github_token: None,
            connect_timeout_secs: 30,
            read_timeout_secs: 60,
            user_agent: format!("toolstash/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(HOME_DIR_NAME)
}

impl Settings {
    /// Loads settings from the config file and the process environment.
    ///
    /// `TOOLSTASH_PROGRESS` is not read here; see [`Settings::progress_override`].
    pub fn load() -> Self {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Like [`Settings::load`], reading variables through `env`.
    pub fn load_from<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = env(ENV_HOME)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_home);

        let mut settings = Self::read_file(&home.join(CONFIG_FILE)).unwrap_or_default();
        settings.toolstash_home = home;
        settings.apply_env(env);

        debug!(home = %settings.toolstash_home.display(), "Settings loaded");
        settings
    }

    /// The `TOOLSTASH_PROGRESS` value, if set.
    pub fn progress_override() -> Result<Option<bool>, ConfigError> {
        Self::progress_override_from(|key| std::env::var(key).ok())
    }

    /// Like [`Settings::progress_override`], reading variables through `env`.
    pub fn progress_override_from<F>(env: F) -> Result<Option<bool>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        env(ENV_PROGRESS)
            .map(|value| {
                parse_bool(&value).ok_or_else(|| ConfigError::InvalidBool {
                    var: ENV_PROGRESS.to_string(),
                    value,
                })
            })
            .transpose()
    }

    /// Reads a config file; a missing or malformed file yields `None`.
    fn read_file(path: &Path) -> Option<Self> {
        let json = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str::<Settings>(&json) {
            Ok(loaded) => Some(loaded),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to parse settings, using defaults");
                None
            }
        }
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = env(ENV_GITHUB_API).filter(|v| !v.is_empty()) {
            self.github_api_url = url;
        }

        let token = env("GITHUB_TOKEN")
            .filter(|v| !v.is_empty())
            .or_else(|| env("GH_TOKEN").filter(|v| !v.is_empty()));
        if token.is_some() {
            self.github_token = token;
        }
    }

    /// Persistent binaries directory: `{home}/bin`.
    pub fn stash_dir(&self) -> PathBuf {
        self.toolstash_home.join("bin")
    }

    /// Optional user catalog: `{home}/tools.json`.
    pub fn catalog_path(&self) -> PathBuf {
        self.toolstash_home.join("tools.json")
    }
}
