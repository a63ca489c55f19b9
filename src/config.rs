//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.sentiview.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".sentiview.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Analysis API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// History store settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "sentiview_report.md".to_string()
}

/// Analysis API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the analysis API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Endpoint exchanging a session token for an access token.
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_endpoint: default_token_endpoint(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.sentinova.my.id".to_string()
}

fn default_token_endpoint() -> String {
    "/get-firebase-token".to_string()
}

fn default_timeout() -> u64 {
    300 // large uploads are analysed synchronously by both models
}

/// History store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Save every analysis run.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding the history documents.
    #[serde(default = "default_history_dir")]
    pub dir: String,

    /// User the history belongs to.
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_history_dir(),
            user_id: default_user_id(),
        }
    }
}

fn default_history_dir() -> String {
    ".sentiview/history".to_string()
}

fn default_user_id() -> String {
    "local".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Reviews per page in the review table.
    #[serde(default = "default_per_page")]
    pub per_page: usize,

    /// Include the review table at all.
    #[serde(default = "default_true")]
    pub include_reviews: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            include_reviews: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_per_page() -> usize {
    10
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(ref user) = args.user {
            self.history.user_id = user.clone();
        }
        if let Some(ref dir) = args.history_dir {
            self.history.dir = dir.display().to_string();
        }

        if let Some(render) = args.render_options() {
            if let Some(per_page) = render.per_page {
                self.report.per_page = per_page;
            }
            if render.no_reviews {
                self.report.include_reviews = false;
            }
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
