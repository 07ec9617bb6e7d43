//! # till-db: Database Layer for Till
//!
//! Durable ledgers for a point-of-sale terminal that keeps working offline.
//! Everything the terminal must not lose (placed orders, its own identity,
//! queue numbering, kitchen progress, cached catalogs) lives in one SQLite
//! file accessed through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Data Flow                                   │
//! │                                                                         │
//! │  Terminal command (mark_ticket_syncing)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     till-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ TicketRepo    │    │ 001_ledgers  │  │   │
//! │  │   │ SqlitePool    │◄───│ QueueTokenRepo│    │ 002_catalog  │  │   │
//! │  │   │ Epoch policy  │    │ Teardown ...  │    │  _mirrors    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types and their five kinds
//! - [`repository`] - One repository per ledger, plus teardown
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/till.db")).await?;
//!
//! let ticket = db.tickets().create(new_ticket).await?;
//! db.tickets().mark_syncing(&ticket.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, ErrorKind};
pub use pool::{Database, DbConfig, DEFAULT_SCAN_PAGE_SIZE};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::device::DeviceRepository;
pub use repository::draft::DraftSlotStore;
pub use repository::kitchen::{KitchenScan, KitchenTicketRepository};
pub use repository::queue::QueueTokenRepository;
pub use repository::reset::{ResetReport, TeardownCoordinator};
pub use repository::scan::{LedgerScan, Scannable};
pub use repository::ticket::{TicketRepository, TicketScan};
