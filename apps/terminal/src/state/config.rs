//! # Configuration State
//!
//! Engine configuration loaded once at startup and read-only afterwards.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TILL_DB_PATH=/var/lib/till/till.db                                 │
//! │     TILL_SYNC_MAX_ATTEMPTS=5                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/till/terminal.toml (Linux)                               │
//! │     ~/Library/Application Support/com.till.terminal/terminal.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # terminal.toml
//! [database]
//! path = "/var/lib/till/till.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [sync]
//! max_attempts = 10        # 0 = never give up
//! retry_interval_secs = 30
//! stale_after_secs = 120
//! scan_page_size = 50
//!
//! [queue]
//! epoch = "daily"          # daily | manual
//! utc_offset_minutes = 60
//!
//! [reset]
//! business_data = ["categories", "locations", "payment_methods",
//!                  "product_groups", "transaction_types"]
//! ```
//!
//! The retry values are only exposed to the external scheduler through the
//! ledger queries; nothing in this process retries on its own.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use till_core::{CatalogKind, EpochPolicy, Ledger, ResetScope, SyncPolicy};
use till_db::{DbConfig, DEFAULT_SCAN_PAGE_SIZE};

/// Largest UTC offset any time zone uses, in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for the SQLite lock before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// `[sync]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Failed attempts after which an entity is no longer offered for retry.
    /// 0 means unlimited.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,

    /// A SYNCING entity untouched this long is reported as stale.
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,

    /// Rows per page for status scans.
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: u32,
}

fn default_max_attempts() -> u32 {
    10
}

fn default_retry_interval() -> u64 {
    30
}

fn default_stale_after() -> u64 {
    120
}

fn default_scan_page_size() -> u32 {
    DEFAULT_SCAN_PAGE_SIZE
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            max_attempts: default_max_attempts(),
            retry_interval_secs: default_retry_interval(),
            stale_after_secs: default_stale_after(),
            scan_page_size: default_scan_page_size(),
        }
    }
}

/// When queue numbering starts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpochMode {
    /// Every local calendar day.
    #[default]
    Daily,
    /// Only when an operator begins a new epoch.
    Manual,
}

impl std::str::FromStr for EpochMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(EpochMode::Daily),
            "manual" => Ok(EpochMode::Manual),
            other => Err(ConfigError::Invalid(format!(
                "Unknown queue epoch: '{}'. Valid options: daily, manual",
                other
            ))),
        }
    }
}

/// `[queue]`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueueSettings {
    #[serde(default)]
    pub epoch: EpochMode,

    /// Offset of the store's local time from UTC, used by daily epochs.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

/// `[reset]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetSettings {
    /// Ledgers emptied by `clear_resync_data`.
    #[serde(default = "default_business_data")]
    pub business_data: Vec<Ledger>,
}

fn default_business_data() -> Vec<Ledger> {
    CatalogKind::ALL.into_iter().map(Ledger::catalog).collect()
}

impl Default for ResetSettings {
    fn default() -> Self {
        ResetSettings {
            business_data: default_business_data(),
        }
    }
}

// =============================================================================
// Config State
// =============================================================================

/// Terminal configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigState {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub queue: QueueSettings,

    #[serde(default)]
    pub reset: ResetSettings,
}

impl ConfigState {
    /// Loads configuration from file and environment.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading terminal config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration, falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load terminal config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.sync.scan_page_size == 0 {
            return Err(ConfigError::Invalid(
                "sync.scan_page_size must be greater than 0".into(),
            ));
        }

        if self.queue.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "queue.utc_offset_minutes must be within ±{}, got {}",
                MAX_UTC_OFFSET_MINUTES, self.queue.utc_offset_minutes
            )));
        }

        // Re-sync must never drop orders that have not been uploaded
        // or the identity they would be uploaded under.
        for ledger in [Ledger::Tickets, Ledger::DeviceProfiles] {
            if self.reset.business_data.contains(&ledger) {
                return Err(ConfigError::Invalid(format!(
                    "reset.business_data cannot include {}",
                    ledger
                )));
            }
        }

        Ok(())
    }

    /// Applies `TILL_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("TILL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        override_parsed(&var, "TILL_DB_MAX_CONNECTIONS", &mut self.database.max_connections);
        override_parsed(&var, "TILL_DB_BUSY_TIMEOUT_MS", &mut self.database.busy_timeout_ms);
        override_parsed(&var, "TILL_SYNC_MAX_ATTEMPTS", &mut self.sync.max_attempts);
        override_parsed(&var, "TILL_SYNC_RETRY_INTERVAL_SECS", &mut self.sync.retry_interval_secs);
        override_parsed(&var, "TILL_SYNC_STALE_AFTER_SECS", &mut self.sync.stale_after_secs);
        override_parsed(&var, "TILL_SCAN_PAGE_SIZE", &mut self.sync.scan_page_size);
        override_parsed(&var, "TILL_QUEUE_EPOCH", &mut self.queue.epoch);
        override_parsed(&var, "TILL_QUEUE_UTC_OFFSET_MINUTES", &mut self.queue.utc_offset_minutes);

        if let Some(list) = var("TILL_RESET_BUSINESS_DATA") {
            let parsed: Result<Vec<Ledger>, _> = list
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect();
            match parsed {
                Ok(ledgers) => self.reset.business_data = ledgers,
                Err(e) => warn!(value = %list, error = %e, "Ignoring TILL_RESET_BUSINESS_DATA"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "till", "terminal")
            .map(|dirs| dirs.config_dir().join("terminal.toml"))
    }

    // =========================================================================
    // Derived Settings
    // =========================================================================

    /// Retry parameters for the ledger queries the scheduler uses.
    pub fn sync_policy(&self) -> SyncPolicy {
        SyncPolicy {
            max_attempts: self.sync.max_attempts,
            retry_interval: Duration::from_secs(self.sync.retry_interval_secs),
            stale_after: Duration::from_secs(self.sync.stale_after_secs),
        }
    }

    pub fn epoch_policy(&self) -> EpochPolicy {
        match self.queue.epoch {
            EpochMode::Daily => EpochPolicy::Daily {
                utc_offset_minutes: self.queue.utc_offset_minutes,
            },
            EpochMode::Manual => EpochPolicy::Manual,
        }
    }

    /// Scope of `clear_resync_data`.
    pub fn business_data_scope(&self) -> ResetScope {
        ResetScope::of(self.reset.business_data.iter().copied())
    }

    /// Database settings for a file at `path`.
    pub fn db_config(&self, path: impl Into<PathBuf>) -> DbConfig {
        DbConfig::new(path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
            .epoch_policy(self.epoch_policy())
            .scan_page_size(self.sync.scan_page_size)
    }
}

fn override_parsed<T>(var: &impl Fn(&str) -> Option<String>, key: &str, target: &mut T)
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = var(key) {
        match raw.trim().parse() {
            Ok(value) => {
                debug!(key, value = %raw, "Overriding config from environment");
                *target = value;
            }
            Err(e) => warn!(key, value = %raw, error = %e, "Ignoring unparseable override"),
        }
    }
}
