//! Runtime configuration — fixed tunable defaults, an optional JSON override
//! file, and secrets resolved from the process environment.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

pub const BOT_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
pub const CHAT_ID_VAR: &str = "TELEGRAM_CHAT_ID";

const DEFAULT_CHECK_INTERVAL_SECS: u64 = 5;
const DEFAULT_PIXEL_DIFF_THRESHOLD: u64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between capture cycles.
    #[serde(default = "default_interval")]
    pub check_interval_secs: u64,
    /// Changed-pixel count at which a notification fires (inclusive).
    /// Raw pixel units, so tune against the capture resolution.
    #[serde(default = "default_threshold")]
    pub pixel_diff_threshold: u64,
}

fn default_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL_SECS
}

fn default_threshold() -> u64 {
    DEFAULT_PIXEL_DIFF_THRESHOLD
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            pixel_diff_threshold: DEFAULT_PIXEL_DIFF_THRESHOLD,
        }
    }
}

/// Load tunables from disk, falling back to defaults when the file is
/// missing or unparsable.
pub fn load_config(path: &Path) -> MonitorConfig {
    match std::fs::read_to_string(path) {
        Ok(json) => match serde_json::from_str(&json) {
            Ok(config) => {
                info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("failed to parse {}: {e} (using defaults)", path.display());
                MonitorConfig::default()
            }
        },
        Err(_) => MonitorConfig::default(),
    }
}

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{0} is not a valid chat id: {1}")]
    InvalidChatId(&'static str, std::num::ParseIntError),
}

/// The bot token and destination chat id. Never logged.
#[cfg_attr(test, derive(Debug))]
#[derive(Clone)]
pub struct Secrets {
    pub bot_token: String,
    pub chat_id: i64,
}

impl Secrets {
    pub fn from_env() -> Result<Self, SecretsError> {
        Self::resolve(|var| std::env::var(var).ok())
    }

    fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SecretsError> {
        let bot_token = lookup(BOT_TOKEN_VAR)
            .filter(|v| !v.is_empty())
            .ok_or(SecretsError::Missing(BOT_TOKEN_VAR))?;

        let raw_chat_id = lookup(CHAT_ID_VAR)
            .filter(|v| !v.is_empty())
            .ok_or(SecretsError::Missing(CHAT_ID_VAR))?;
        let chat_id = raw_chat_id
            .trim()
            .parse()
            .map_err(|e| SecretsError::InvalidChatId(CHAT_ID_VAR, e))?;

        Ok(Self { bot_token, chat_id })
    }
}
