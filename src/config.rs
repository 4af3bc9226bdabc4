//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the tunables shared by the transport, backend and delivery layers.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Application settings loaded from files and environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Gemini API key used for the Files API and `generateContent`
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    /// Comma-separated list of allowed user IDs; empty means open access
    #[serde(rename = "allowed_users")]
    pub allowed_users_str: Option<String>,

    /// How many bot messages stay visible when the menu is shown
    #[serde(default = "default_keep_messages")]
    pub keep_messages: usize,

    /// Maximum characters per outgoing Telegram message
    #[serde(default = "default_message_limit")]
    pub message_limit: usize,

    /// Maximum characters per translation request
    #[serde(default = "default_translate_chunk_size")]
    pub translate_chunk_size: usize,

    /// Pause between the language confirmation and the menu
    #[serde(default = "default_language_confirm_delay_ms")]
    pub language_confirm_delay_ms: u64,

    /// Timeout for requests to the AI backend and translator
    #[serde(default = "default_llm_http_timeout_secs")]
    pub llm_http_timeout_secs: u64,
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

const fn default_keep_messages() -> usize {
    DEFAULT_KEEP_MESSAGES
}

const fn default_message_limit() -> usize {
    TELEGRAM_MESSAGE_LIMIT
}

const fn default_translate_chunk_size() -> usize {
    TRANSLATE_CHUNK_SIZE
}

const fn default_language_confirm_delay_ms() -> u64 {
    LANGUAGE_CONFIRM_DELAY_MS
}

const fn default_llm_http_timeout_secs() -> u64 {
    LLM_HTTP_TIMEOUT_SECS
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pdf_analyst::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Not checked into git
            .add_source(File::with_name("config/local").required(false))
            // `APP__MESSAGE_LIMIT=3500` sets `message_limit`
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Plain UPPER_SNAKE_CASE variables, empty values treated as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        if settings.gemini_api_key.is_none() {
            if let Ok(val) = std::env::var("GEMINI_API_KEY") {
                if !val.is_empty() {
                    settings.gemini_api_key = Some(val);
                }
            }
        }

        Ok(settings)
    }

    /// Returns a set of Telegram IDs that are allowed to use the bot
    #[must_use]
    pub fn allowed_users(&self) -> HashSet<i64> {
        self.allowed_users_str
            .as_ref()
            .map(|s| {
                s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                    .filter(|token| !token.is_empty())
                    .filter_map(|id| id.parse::<i64>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delivery
// ─────────────────────────────────────────────────────────────────────────────

/// Telegram hard limit is 4096; the remainder is headroom for markup growth
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;
/// Bot messages kept visible after a cleanup pass
pub const DEFAULT_KEEP_MESSAGES: usize = 3;

/// Initial delay for Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Upper bound for a single Telegram API retry delay
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 8_000;
/// Retries on transient Telegram failures (network, flood wait)
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;

// ─────────────────────────────────────────────────────────────────────────────
// Backend and translation
// ─────────────────────────────────────────────────────────────────────────────

/// Model used when `GEMINI_MODEL` is not set
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
/// Default HTTP timeout for backend and translator calls
pub const LLM_HTTP_TIMEOUT_SECS: u64 = 120;
/// Interval between Files API state checks while a document is processing
pub const GEMINI_FILE_POLL_INTERVAL_MS: u64 = 2_000;
/// Maximum number of state checks before the upload is declared failed
pub const GEMINI_FILE_POLL_ATTEMPTS: usize = 30;
/// Google Translate rejects requests much above 5000 characters
pub const TRANSLATE_CHUNK_SIZE: usize = 4500;
/// Pause that lets the language confirmation render before the menu
pub const LANGUAGE_CONFIRM_DELAY_MS: u64 = 1_000;

// ─────────────────────────────────────────────────────────────────────────────
// Access control
// ─────────────────────────────────────────────────────────────────────────────

/// Seconds between two "access denied" replies to the same user
pub const UNAUTHORIZED_COOLDOWN_SECS: u64 = 1_200;
/// Capacity of the access-denied cache
pub const UNAUTHORIZED_CACHE_MAX_SIZE: u64 = 10_000;

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn bare_settings() -> Settings {
        Settings {
            telegram_token: "dummy".to_string(),
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            allowed_users_str: None,
            keep_messages: DEFAULT_KEEP_MESSAGES,
            message_limit: TELEGRAM_MESSAGE_LIMIT,
            translate_chunk_size: TRANSLATE_CHUNK_SIZE,
            language_confirm_delay_ms: LANGUAGE_CONFIRM_DELAY_MS,
            llm_http_timeout_secs: LLM_HTTP_TIMEOUT_SECS,
        }
    }

    // Single test touching the process environment to avoid races
    #[test]
    fn test_config_env_loading() -> Result<(), Box<dyn std::error::Error>> {
        env::set_var("TELEGRAM_TOKEN", "dummy_token");
        env::set_var("GEMINI_API_KEY", "gemini-key");
        env::set_var("KEEP_MESSAGES", "5");

        let settings = Settings::new()?;
        assert_eq!(settings.telegram_token, "dummy_token");
        assert_eq!(settings.gemini_api_key.as_deref(), Some("gemini-key"));
        assert_eq!(settings.keep_messages, 5);
        assert_eq!(settings.message_limit, TELEGRAM_MESSAGE_LIMIT);
        assert_eq!(settings.gemini_model, DEFAULT_GEMINI_MODEL);

        env::remove_var("KEEP_MESSAGES");
        env::set_var("GEMINI_API_KEY", "");

        let settings = Settings::new()?;
        assert_eq!(settings.gemini_api_key, None);
        assert_eq!(settings.keep_messages, DEFAULT_KEEP_MESSAGES);

        env::remove_var("GEMINI_API_KEY");
        env::remove_var("TELEGRAM_TOKEN");
        Ok(())
    }

    #[test]
    fn test_list_parsing() {
        let mut settings = bare_settings();

        settings.allowed_users_str = Some("123,456".to_string());
        let allowed = settings.allowed_users();
        assert!(allowed.contains(&123));
        assert!(allowed.contains(&456));
        assert_eq!(allowed.len(), 2);

        settings.allowed_users_str = Some("333; 444 555".to_string());
        assert_eq!(settings.allowed_users().len(), 3);

        settings.allowed_users_str = Some("abc, 777".to_string());
        let allowed = settings.allowed_users();
        assert!(allowed.contains(&777));
        assert_eq!(allowed.len(), 1);

        settings.allowed_users_str = None;
        assert!(settings.allowed_users().is_empty());
    }
}
