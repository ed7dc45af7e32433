//! Configuration module for the swipe feed engine.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{FeedError, FeedResult};
use crate::models::UserId;

/// Default queue length at or below which consumption triggers a refill.
pub const DEFAULT_LOW_WATER: usize = 3;

/// Default cap on consecutive pages whose items were all already seen.
pub const DEFAULT_MAX_EMPTY_PAGES: u32 = 5;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote catalog service
    pub api_url: String,
    /// Timeout applied to every catalog request
    pub api_timeout: Duration,
    /// Path to the SQLite key-value store
    pub db_path: PathBuf,
    /// User whose feed the console driver browses
    pub user_id: UserId,
    /// Queue tuning
    pub queue: QueueSettings,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Tuning knobs for the feed queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    /// Refill when the queue length drops to or below this value
    pub low_water: usize,
    /// Give up after this many consecutive pages filtered down to nothing
    pub max_empty_pages: u32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            low_water: DEFAULT_LOW_WATER,
            max_empty_pages: DEFAULT_MAX_EMPTY_PAGES,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> FeedResult<Self> {
        dotenvy::dotenv().ok();

        let api_url = env::var("SWIPE_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
            .trim_end_matches('/')
            .to_string();

        let api_timeout = Duration::from_secs(parse_var("SWIPE_API_TIMEOUT_SECS", 10)?);

        let db_path = env::var("SWIPE_DB_PATH")
            .unwrap_or_else(|_| "./data/swipe.sqlite".to_string())
            .into();

        let user_id = UserId(parse_var("SWIPE_USER_ID", 1)?);

        let queue = QueueSettings {
            low_water: parse_var("SWIPE_LOW_WATER", DEFAULT_LOW_WATER)?,
            max_empty_pages: parse_var("SWIPE_MAX_EMPTY_PAGES", DEFAULT_MAX_EMPTY_PAGES)?,
        };

        let log_level = env::var("SWIPE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            api_url,
            api_timeout,
            db_path,
            user_id,
            queue,
            log_level,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> FeedResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| FeedError::Config(format!("Invalid {} value: {:?}", name, raw))),
        Err(_) => Ok(default),
    }
}
