//! # Back Office Configuration
//!
//! Settings for the database, order limits and conflict retries.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BACKOFFICE_DB_PATH=/srv/backoffice/backoffice.db                   │
//! │     BACKOFFICE_RETURN_WINDOW_DAYS=14                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/backoffice/backoffice.toml (Linux)                       │
//! │     ~/Library/Application Support/com.retail.backoffice/... (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "backoffice.db"
//! max_connections = 8
//! busy_timeout_ms = 5000
//!
//! [orders]
//! max_items_per_order = 100
//! max_item_quantity = 999
//! return_window_days = 30
//!
//! [retry]
//! max_retries = 3
//! initial_backoff_ms = 50
//! max_backoff_ms = 1000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use backoffice_core::{DEFAULT_RETURN_WINDOW_DAYS, MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS};

use crate::pool::DbConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Relative paths resolve against the working directory.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Wait for a pooled connection (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Wait for a locked database before failing with a retryable
    /// conflict (milliseconds).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("backoffice.db")
}

fn default_max_connections() -> u32 {
    8
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

// =============================================================================
// Order Settings
// =============================================================================

/// Limits applied by the lifecycle services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSettings {
    #[serde(default = "default_max_items")]
    pub max_items_per_order: usize,

    #[serde(default = "default_max_quantity")]
    pub max_item_quantity: i64,

    /// Days after the invoice date during which returns are accepted.
    #[serde(default = "default_return_window")]
    pub return_window_days: i64,
}

fn default_max_items() -> usize {
    MAX_ORDER_ITEMS
}

fn default_max_quantity() -> i64 {
    MAX_ITEM_QUANTITY
}

fn default_return_window() -> i64 {
    DEFAULT_RETURN_WINDOW_DAYS
}

impl Default for OrderSettings {
    fn default() -> Self {
        OrderSettings {
            max_items_per_order: default_max_items(),
            max_item_quantity: default_max_quantity(),
            return_window_days: default_return_window(),
        }
    }
}

// =============================================================================
// Retry Settings
// =============================================================================

/// Bounded retry of transactions that hit a lock conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Retries after the first attempt. 0 disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    50
}

fn default_max_backoff() -> u64 {
    1000
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete back office configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackofficeConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub orders: OrderSettings,

    #[serde(default)]
    pub retry: RetrySettings,
}

impl BackofficeConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (backoffice.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading back office config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load back office config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Back office config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid(
                "database.min_connections cannot exceed max_connections".into(),
            ));
        }
        if self.orders.max_items_per_order == 0 {
            return Err(ConfigError::Invalid(
                "orders.max_items_per_order must be greater than 0".into(),
            ));
        }
        if self.orders.max_item_quantity <= 0 {
            return Err(ConfigError::Invalid(
                "orders.max_item_quantity must be greater than 0".into(),
            ));
        }
        if self.orders.return_window_days < 0 {
            return Err(ConfigError::Invalid(
                "orders.return_window_days cannot be negative".into(),
            ));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.initial_backoff_ms cannot exceed max_backoff_ms".into(),
            ));
        }

        Ok(())
    }

    /// Applies `BACKOFFICE_*` overrides read through `lookup`.
    ///
    /// Unparseable numbers are logged and ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("BACKOFFICE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        override_number(&lookup, "BACKOFFICE_DB_MAX_CONNECTIONS", &mut self.database.max_connections);
        override_number(&lookup, "BACKOFFICE_DB_BUSY_TIMEOUT_MS", &mut self.database.busy_timeout_ms);
        override_number(&lookup, "BACKOFFICE_MAX_ITEMS_PER_ORDER", &mut self.orders.max_items_per_order);
        override_number(&lookup, "BACKOFFICE_MAX_ITEM_QUANTITY", &mut self.orders.max_item_quantity);
        override_number(&lookup, "BACKOFFICE_RETURN_WINDOW_DAYS", &mut self.orders.return_window_days);
        override_number(&lookup, "BACKOFFICE_RETRY_MAX", &mut self.retry.max_retries);
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "retail", "backoffice")
            .map(|dirs| dirs.config_dir().join("backoffice.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Pool settings for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }
}

fn override_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.parse::<T>() {
            Ok(value) => {
                debug!(key, "Overriding setting from environment");
                *target = value;
            }
            Err(_) => warn!(key, value = %raw, "Ignoring non-numeric environment override"),
        }
    }
}
