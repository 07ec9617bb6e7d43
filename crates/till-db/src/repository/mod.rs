//! # Repository Module
//!
//! One repository per ledger. Each repository owns the SQL for its tables.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Ledger Repositories                                  │
//! │                                                                         │
//! │  Terminal command                                                      │
//! │       │                                                                 │
//! │       │  db.tickets().mark_syncing(&id)                                │
//! │       ▼                                                                 │
//! │  TicketRepository                                                      │
//! │  ├── BEGIN                                                             │
//! │  ├── UPDATE tickets SET id = id WHERE id = ?   ← takes the write lock  │
//! │  ├── SELECT ... WHERE id = ?                   ← read current state    │
//! │  ├── SyncState::apply(...)                     ← pure rule (till-core) │
//! │  ├── UPDATE tickets SET ...                    ← write new state       │
//! │  └── COMMIT                                                            │
//! │                                                                         │
//! │  Every read-modify-write runs in one transaction that starts with a    │
//! │  write, so two calls on the same entity never interleave.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`DraftSlotStore`](draft::DraftSlotStore) - Cart and work-shift scratch slots
//! - [`TicketRepository`](ticket::TicketRepository) - Tickets and their sync state
//! - [`DeviceRepository`](device::DeviceRepository) - The terminal's device profile
//! - [`QueueTokenRepository`](queue::QueueTokenRepository) - Queue numbering and calls
//! - [`KitchenTicketRepository`](kitchen::KitchenTicketRepository) - Kitchen display items
//! - [`CatalogRepository`](catalog::CatalogRepository) - Server catalog mirrors
//! - [`TeardownCoordinator`](reset::TeardownCoordinator) - Atomic multi-ledger wipes
//! - [`LedgerScan`](scan::LedgerScan) - Lazy paged status scans

pub mod catalog;
pub mod device;
pub mod draft;
pub mod kitchen;
pub mod queue;
pub mod reset;
pub mod scan;
pub mod ticket;

use sqlx::SqliteConnection;

use crate::error::DbResult;

/// Takes the write lock on one row before it is read.
///
/// Returns `false` when no row has that id.
pub(crate) async fn lock_row(conn: &mut SqliteConnection, table: &'static str, id: &str) -> DbResult<bool> {
    let sql = format!("UPDATE {table} SET id = id WHERE id = ?1");
    let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;
    Ok(result.rows_affected() > 0)
}
