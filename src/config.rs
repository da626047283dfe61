use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, UsesGraphError};

/// Name of the configuration file stored inside the home directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the SQLite store inside the home directory.
pub const STORE_FILENAME: &str = "usesgraph.db";

/// Name of the directory created under the platform data directory.
pub const USESGRAPH_DIR: &str = "usesgraph";

/// Configuration for usesgraph.
///
/// Controls where workflows are looked up, how the hosting service is
/// reached, and whether resolved references are remembered across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsesGraphConfig {
    /// Schema version of the configuration.
    pub version: u32,
    /// Directory, relative to a repository root, holding workflow files.
    pub workflows_dir: String,
    /// File extensions (without leading dot) recognised as workflow files.
    pub workflow_extensions: Vec<String>,
    /// Base URL of the hosting service REST API.
    pub github_api_url: String,
    /// Base URL serving raw file contents.
    pub raw_content_url: String,
    /// Base URL of the hosting service web UI, used for artifact links.
    pub web_url: String,
    /// Environment variable holding the API token.
    pub token_env: String,
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Whether resolved references are persisted and skipped on later runs.
    pub persist_visited: bool,
}

impl Default for UsesGraphConfig {
    fn default() -> Self {
        Self {
            version: 1,
            workflows_dir: ".github/workflows".to_string(),
            workflow_extensions: vec!["yml".to_string(), "yaml".to_string()],
            github_api_url: "https://api.github.com".to_string(),
            raw_content_url: "https://raw.githubusercontent.com".to_string(),
            web_url: "https://github.com".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            user_agent: format!("usesgraph/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            persist_visited: true,
        }
    }
}

impl UsesGraphConfig {
    /// Reads the API token from the environment variable named by `token_env`.
    pub fn token_from_env(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }

    /// Returns `true` if `file_name` carries one of the workflow extensions.
    pub fn is_workflow_file(&self, file_name: &str) -> bool {
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self
                .workflow_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }
}

/// Returns the default home directory (`<data dir>/usesgraph`).
pub fn default_home() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(USESGRAPH_DIR)
}

/// Returns the path to the configuration file within the home directory.
pub fn get_config_path(home: &Path) -> PathBuf {
    home.join(CONFIG_FILENAME)
}

/// Returns the path to the SQLite store within the home directory.
pub fn get_store_path(home: &Path) -> PathBuf {
    home.join(STORE_FILENAME)
}

/// Loads the configuration from disk.
///
/// If the configuration file does not exist, returns the default configuration.
pub fn load_config(home: &Path) -> Result<UsesGraphConfig> {
    let config_path = get_config_path(home);

    if !config_path.exists() {
        return Ok(UsesGraphConfig::default());
    }

    let contents = fs::read_to_string(&config_path).map_err(|e| UsesGraphError::Config {
        message: format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    serde_json::from_str(&contents).map_err(|e| UsesGraphError::Config {
        message: format!(
            "failed to parse config file '{}': {}",
            config_path.display(),
            e
        ),
    })
}

/// Saves the configuration to disk using an atomic write.
///
/// Writes to a temporary file first and then renames it to the final location.
pub fn save_config(home: &Path, config: &UsesGraphConfig) -> Result<()> {
    fs::create_dir_all(home).map_err(|e| UsesGraphError::Config {
        message: format!(
            "failed to create home directory '{}': {}",
            home.display(),
            e
        ),
    })?;

    let config_path = get_config_path(home);
    let tmp_path = config_path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config).map_err(|e| UsesGraphError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| UsesGraphError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, &config_path).map_err(|e| UsesGraphError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            config_path.display(),
            e
        ),
    })?;

    Ok(())
}

/// Decides whether a workflow file is selected by the allow-list.
///
/// An empty allow-list selects every workflow. Entries are matched
/// case-insensitively against the file name and may be glob patterns.
pub fn should_scan_workflow(file_name: &str, only_workflows: &[String]) -> bool {
    if only_workflows.is_empty() {
        return true;
    }

    let match_opts = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    only_workflows.iter().any(|entry| {
        if entry.eq_ignore_ascii_case(file_name) {
            return true;
        }
        Pattern::new(entry)
            .map(|p| p.matches_with(file_name, match_opts))
            .unwrap_or(false)
    })
}
