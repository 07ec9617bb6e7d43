//! # Till Terminal Library
//!
//! The call boundary a terminal UI links against: configuration, state and
//! one async command per operation.
//!
//! ## Module Organization
//! ```text
//! till_terminal/
//! ├── lib.rs          ◄─── You are here (startup)
//! ├── state/
//! │   ├── db.rs       ◄─── Database handle
//! │   ├── config.rs   ◄─── TOML + environment configuration
//! │   └── session.rs  ◄─── Signed-in tenant, selected location
//! ├── commands/       ◄─── One module per ledger
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use till_terminal::{bootstrap, commands, state::ConfigState};
//!
//! let terminal = bootstrap(ConfigState::load(None)?).await?;
//! commands::draft::save_cart_draft(&terminal.db, cart_json).await?;
//! ```

pub mod commands;
pub mod error;
pub mod state;

use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use error::ApiError;
use state::{ConfigError, ConfigState, DbState, SessionState};
use till_db::Database;

/// Everything a running terminal holds.
#[derive(Debug)]
pub struct Terminal {
    pub db: DbState,
    pub config: ConfigState,
    pub session: SessionState,
}

/// Opens the ledgers described by `config` and builds the state objects.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Terminal Startup                                  │
/// │                                                                         │
/// │  1. Determine Database Path ──────────────────────────────────────────► │
/// │     • [database] path or TILL_DB_PATH, if set                           │
/// │     • macOS: ~/Library/Application Support/com.till.terminal/till.db    │
/// │     • Windows: %APPDATA%/till/terminal/data/till.db                     │
/// │     • Linux: ~/.local/share/terminal/till.db                            │
/// │                                                                         │
/// │  2. Connect to Database ──────────────────────────────────────────────► │
/// │     • SQLite with WAL mode                                              │
/// │     • Run pending migrations                                            │
/// │                                                                         │
/// │  3. Initialize State Objects ─────────────────────────────────────────► │
/// │     • DbState: wraps the Database                                       │
/// │     • SessionState: signed out until init_session                       │
/// │     • ConfigState: as loaded                                            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn bootstrap(config: ConfigState) -> Result<Terminal, ApiError> {
    let db_path = database_path(&config)?;
    info!(?db_path, "Database path determined");

    let db = Database::new(config.db_config(db_path)).await?;
    info!("Database connected and migrations applied");

    Ok(Terminal {
        db: DbState::new(db),
        config,
        session: SessionState::new(),
    })
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=till=trace` - Show trace for till crates only
/// - Default: INFO, DEBUG for till crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,till=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .init();
}

/// Determines the database file path.
///
/// An explicit path (config file or `TILL_DB_PATH`) wins; otherwise the
/// platform data directory is created if needed.
pub fn database_path(config: &ConfigState) -> Result<PathBuf, ConfigError> {
    if let Some(path) = &config.database.path {
        return Ok(path.clone());
    }

    let proj_dirs = ProjectDirs::from("com", "till", "terminal").ok_or_else(|| {
        ConfigError::Invalid("Could not determine app data directory".to_string())
    })?;

    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::Io {
        path: data_dir.to_path_buf(),
        source,
    })?;

    Ok(data_dir.join("till.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::draft;

    #[tokio::test]
    async fn test_bootstrap_opens_configured_database() {
        let mut config = ConfigState::default();
        config.database.path = Some(PathBuf::from(":memory:"));
        config.database.max_connections = 1;

        let terminal = bootstrap(config).await.unwrap();
        assert!(terminal.session.current().is_none());
        assert!(terminal.db.inner().health_check().await);

        draft::save_cart_draft(&terminal.db, "{}".to_string())
            .await
            .unwrap();
        assert_eq!(
            draft::get_cart_draft(&terminal.db).await.unwrap().as_deref(),
            Some("{}")
        );
    }

    #[test]
    fn test_explicit_path_wins() {
        let mut config = ConfigState::default();
        config.database.path = Some(PathBuf::from("/srv/till/till.db"));
        assert_eq!(
            database_path(&config).unwrap(),
            PathBuf::from("/srv/till/till.db")
        );
    }
}
