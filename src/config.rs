//! Configuration file parser for ~/.config/linkvault/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as a warning, since they
//! usually indicate a typo.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified; missing keys fall back to `Default::default()`.
///
/// Custom Debug impl masks `api_key` and `access_token` so secrets never
/// land in logs or error output.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL (e.g. "https://xyzcompany.supabase.co").
    pub backend_url: String,

    /// Project API key sent as the `apikey` header.
    pub api_key: Option<String>,

    /// User access token sent as the bearer credential.
    /// The LINKVAULT_ACCESS_TOKEN env var takes precedence.
    pub access_token: Option<String>,

    /// Path the engine redirects to when no session exists.
    pub login_path: String,

    /// Polling interval in seconds for the change feed fallback.
    pub poll_interval_secs: u64,

    /// Total notification visibility window in milliseconds.
    pub notification_ms: u64,

    /// Resubscribe attempts before the change feed is declared degraded.
    pub feed_retry_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            api_key: None,
            access_token: None,
            login_path: "/".to_string(),
            poll_interval_secs: 5,
            notification_ms: crate::notify::DISPLAY_MS + crate::notify::EXIT_GRACE_MS,
            feed_retry_attempts: 5,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("backend_url", &self.backend_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("login_path", &self.login_path)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("notification_ms", &self.notification_ms)
            .field("feed_retry_attempts", &self.feed_retry_attempts)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as a warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to avoid slurping a corrupted or
        // maliciously large file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to detect unknown keys.
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "backend_url",
                "api_key",
                "access_token",
                "login_path",
                "poll_interval_secs",
                "notification_ms",
                "feed_retry_attempts",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), backend_url = %config.backend_url, "Loaded configuration");
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
