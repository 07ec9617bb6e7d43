//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Terminal startup                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← pool settings + ledger settings                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.tickets() / db.queue_tokens() / db.teardown() ...                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL mode lets readers proceed while one writer holds the lock.
//! Writers queue on the busy timeout instead of failing immediately.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use till_core::{CartSlot, CatalogKind, EpochPolicy, WorkShiftSlot};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::catalog::CatalogRepository;
use crate::repository::device::DeviceRepository;
use crate::repository::draft::DraftSlotStore;
use crate::repository::kitchen::KitchenTicketRepository;
use crate::repository::queue::QueueTokenRepository;
use crate::repository::reset::TeardownCoordinator;
use crate::repository::ticket::TicketRepository;

/// Default number of rows a status scan fetches per page.
pub const DEFAULT_SCAN_PAGE_SIZE: u32 = 50;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/till.db")
///     .max_connections(5)
///     .epoch_policy(EpochPolicy::Manual);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// How long to wait for a free connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// How long a writer waits for the SQLite write lock.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// When queue token numbering starts over.
    /// Default: daily, UTC
    pub epoch_policy: EpochPolicy,

    /// Rows fetched per page by status scans.
    /// Default: 50
    pub scan_page_size: u32,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
            epoch_policy: EpochPolicy::default(),
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection acquire timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the SQLite busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets the queue numbering epoch policy.
    pub fn epoch_policy(mut self, policy: EpochPolicy) -> Self {
        self.epoch_policy = policy;
        self
    }

    /// Sets the status scan page size (at least 1).
    pub fn scan_page_size(mut self, size: u32) -> Self {
        self.scan_page_size = size.max(1);
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
            epoch_policy: EpochPolicy::default(),
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cloning is cheap: clones share the pool.
///
/// ## Usage in Commands
/// ```rust,ignore
/// pub async fn get_cart_draft(db: &DbState) -> Result<Option<String>, ApiError> {
///     let draft = db.inner().cart_draft().get().await?;
///     Ok(draft.map(|d| d.payload.into_inner()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    epoch_policy: EpochPolicy,
    scan_page_size: u32,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite: WAL journal, NORMAL synchronous, busy timeout
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError)` - Connection or migration failed
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        // sqlite://path creates file if not exists
        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout)
            .foreign_keys(true)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            epoch_policy: config.epoch_policy,
            scan_page_size: config.scan_page_size.max(1),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Called by `new()` when `run_migrations` is true.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// Prefer repository methods when available.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the cart draft slot.
    pub fn cart_draft(&self) -> DraftSlotStore<CartSlot> {
        DraftSlotStore::new(self.pool.clone())
    }

    /// Returns the work-shift draft slot.
    pub fn work_shift_draft(&self) -> DraftSlotStore<WorkShiftSlot> {
        DraftSlotStore::new(self.pool.clone())
    }

    /// Returns the ticket ledger.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let ticket = db.tickets().mark_syncing(&id).await?;
    /// ```
    pub fn tickets(&self) -> TicketRepository {
        TicketRepository::new(self.pool.clone(), self.scan_page_size)
    }

    /// Returns the device registry.
    pub fn devices(&self) -> DeviceRepository {
        DeviceRepository::new(self.pool.clone())
    }

    /// Returns the queue token ledger.
    pub fn queue_tokens(&self) -> QueueTokenRepository {
        QueueTokenRepository::new(self.pool.clone(), self.epoch_policy)
    }

    /// Returns the kitchen ticket ledger.
    pub fn kitchen_tickets(&self) -> KitchenTicketRepository {
        KitchenTicketRepository::new(self.pool.clone(), self.scan_page_size)
    }

    /// Returns the mirror for one server catalog.
    pub fn catalog(&self, kind: CatalogKind) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone(), kind)
    }

    /// Returns the reset/teardown coordinator.
    pub fn teardown(&self) -> TeardownCoordinator {
        TeardownCoordinator::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_closed_pool_reports_storage_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);

        let err = db.tickets().list_all().await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Storage);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .scan_page_size(0)
            .epoch_policy(EpochPolicy::Manual);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.scan_page_size, 1);
        assert_eq!(config.epoch_policy, EpochPolicy::Manual);
    }
}
