//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$GMAIL_QUERY_CONFIG` (environment variable)
//! 2. `~/.config/gmail-query/config.toml` (Linux/macOS)
//!    `%APPDATA%\gmail-query\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Gmail API settings.
    pub fetch: FetchConfig,
    /// Classification rules.
    pub rules: RulesConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default output directory for downloaded mail.
    pub output_dir: PathBuf,
    /// Which message represents a thread: "first" or "last".
    pub policy: String,
    /// Whether rule patterns match case-sensitively.
    pub case_sensitive: bool,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Gmail API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Stored OAuth credentials file (JSON with an `access_token` field).
    pub credentials_path: Option<PathBuf>,
    /// Messages per list page.
    pub max_results: u32,
    /// Download attachment payloads.
    pub download_attachments: bool,
    /// Maximum attachment size in bytes (default: 20 MiB).
    pub max_attachment_size: u64,
}

/// Classification rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// JSON rules file. No file means no classification — everything
    /// lands in the default output location.
    pub path: Option<PathBuf>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: dirs::download_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("email"),
            policy: "first".to_string(),
            case_sensitive: false,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            credentials_path: None,
            max_results: 500,
            download_attachments: false,
            max_attachment_size: 20 * 1024 * 1024, // 20 MiB
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    // 1. Environment variable override
    if let Ok(env_path) = std::env::var("GMAIL_QUERY_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    // 2. Standard config directory
    dirs::config_dir().map(|d| d.join("gmail-query").join("config.toml"))
}

/// Default location of the stored OAuth credentials file.
pub fn default_credentials_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gmail-query").join("token.json"))
}

/// Return the cache directory for logs.
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gmail-query")
}
