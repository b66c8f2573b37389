use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::ChatId;

use crate::searchbot::normalize::split_tags;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// Booru API key (anonymous access when empty).
    #[serde(default)]
    api_key: String,
    /// Booru API hostname; an accidental scheme or trailing slash is fine.
    #[serde(default = "default_api_host")]
    api_host: String,
    /// Global default tags merged into searches for opted-in groups.
    #[serde(default = "default_tags")]
    default_tags: Vec<String>,
    /// New groups get search enabled by default.
    #[serde(default = "default_true")]
    enabled_by_default: bool,
    /// New groups merge global tags by default.
    #[serde(default = "default_true")]
    use_global_tags_by_default: bool,
    /// Content filter id applied server-side to every search.
    #[serde(default = "default_filter_id")]
    filter_id: u32,
    /// Log failed API calls at warn level.
    #[serde(default)]
    show_error_log: bool,
    /// Optional proxy URL for API requests.
    proxy: Option<String>,
    /// API request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    request_timeout_secs: u64,
    /// Groups the bot responds in. Empty = all groups.
    #[serde(default)]
    allowed_groups: Vec<i64>,
    /// Directory for state files (database, logs). Defaults to current directory.
    data_dir: Option<String>,
}

fn default_api_host() -> String {
    "derpibooru.org".to_string()
}

fn default_tags() -> Vec<String> {
    vec!["safe".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_filter_id() -> u32 {
    100073
}

fn default_timeout_secs() -> u64 {
    30
}

pub struct Config {
    pub telegram_bot_token: String,
    pub api_key: String,
    /// Hostname only, scheme and trailing slash stripped.
    pub api_host: String,
    /// Normalized global default tags.
    pub default_tags: Vec<String>,
    pub enabled_by_default: bool,
    pub use_global_tags_by_default: bool,
    pub filter_id: u32,
    pub show_error_log: bool,
    pub proxy: Option<String>,
    pub request_timeout: Duration,
    pub allowed_groups: HashSet<ChatId>,
    /// Directory for state files (database, logs).
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        // Validate required fields
        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }

        let api_host = normalize_host(&file.api_host);
        if api_host.is_empty() {
            return Err(ConfigError::Validation("api_host must not be empty".into()));
        }

        // Run configured tags through the same normalization as user input.
        let default_tags = split_tags(&file.default_tags.join(","));

        let allowed_groups = file.allowed_groups.into_iter().map(ChatId).collect();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            telegram_bot_token: file.telegram_bot_token,
            api_key: file.api_key,
            api_host,
            default_tags,
            enabled_by_default: file.enabled_by_default,
            use_global_tags_by_default: file.use_global_tags_by_default,
            filter_id: file.filter_id,
            show_error_log: file.show_error_log,
            proxy: file.proxy,
            request_timeout: Duration::from_secs(file.request_timeout_secs),
            allowed_groups,
            data_dir,
        })
    }

    pub fn is_group_allowed(&self, chat_id: ChatId) -> bool {
        self.allowed_groups.is_empty() || self.allowed_groups.contains(&chat_id)
    }
}

/// Strip an accidental scheme and trailing slash from the configured host.
fn normalize_host(host: &str) -> String {
    let scheme = Regex::new(r"^https?://").unwrap();
    scheme.replace(host.trim(), "").trim_end_matches('/').to_string()
}
