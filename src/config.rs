use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teloxide::types::{ChatId, UserId};

use crate::ledger::RequestLimits;

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
    operator_ids: Vec<u64>,
    /// Public channels a player must join, e.g. ["@tas_news"].
    #[serde(default)]
    required_channels: Vec<String>,
    /// Directory for the ledger database, logs and legacy JSON. Defaults to current directory.
    data_dir: Option<String>,
    log_chat_id: Option<i64>,
    #[serde(default = "default_support_url")]
    support_url: String,
    #[serde(default = "default_min_stake")]
    min_stake: i64,
    #[serde(default = "default_min_deposit")]
    min_deposit: i64,
    #[serde(default = "default_min_withdrawal")]
    min_withdrawal: i64,
    /// Idle seconds before an open flow falls back to idle. Unset means never.
    session_timeout_secs: Option<u64>,
    /// Import user.json, deposit.json and withdrawal.json when the database is new.
    #[serde(default = "default_true")]
    import_legacy_json: bool,
}

fn default_support_url() -> String {
    "https://t.me/TopTasSupportBot".to_string()
}

fn default_min_stake() -> i64 {
    5_000
}

fn default_min_deposit() -> i64 {
    RequestLimits::default().min_deposit
}

fn default_min_withdrawal() -> i64 {
    RequestLimits::default().min_withdrawal
}

fn default_true() -> bool {
    true
}

pub struct Config {
    pub operator_ids: Vec<UserId>,
    /// Path to the config file.
    pub config_path: PathBuf,
    pub telegram_bot_token: String,
    pub required_channels: Vec<String>,
    pub log_chat_id: Option<ChatId>,
    /// Directory for state files (database, logs).
    pub data_dir: PathBuf,
    pub support_url: String,
    pub min_stake: i64,
    pub limits: RequestLimits,
    pub session_timeout: Option<Duration>,
    pub import_legacy_json: bool,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        // Validate required fields
        if file.operator_ids.is_empty() {
            return Err(ConfigError::Validation("operator_ids must contain at least one operator ID".into()));
        }
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

        let channel_re = Regex::new(r"^@[A-Za-z0-9_]{5,32}$").map_err(|e| ConfigError::Validation(e.to_string()))?;
        if let Some(bad) = file.required_channels.iter().find(|c| !channel_re.is_match(c)) {
            return Err(ConfigError::Validation(format!(
                "required_channels entry '{bad}' must be a public @username"
            )));
        }

        for (name, value) in [
            ("min_stake", file.min_stake),
            ("min_deposit", file.min_deposit),
            ("min_withdrawal", file.min_withdrawal),
        ] {
            if value <= 0 {
                return Err(ConfigError::Validation(format!("{name} must be positive, got {value}")));
            }
        }
        if file.session_timeout_secs == Some(0) {
            return Err(ConfigError::Validation("session_timeout_secs must be positive; omit it to disable".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            operator_ids: file.operator_ids.into_iter().map(UserId).collect(),
            config_path,
            telegram_bot_token: file.telegram_bot_token,
            required_channels: file.required_channels,
            log_chat_id: file.log_chat_id.map(ChatId),
            data_dir,
            support_url: file.support_url,
            min_stake: file.min_stake,
            limits: RequestLimits { min_deposit: file.min_deposit, min_withdrawal: file.min_withdrawal },
            session_timeout: file.session_timeout_secs.map(Duration::from_secs),
            import_legacy_json: file.import_legacy_json,
        })
    }
}
