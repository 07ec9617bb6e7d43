//! # Database State
//!
//! Wraps the `Database` connection for use in commands.
//!
//! The `Database` from `till-db` holds a `SqlitePool`, which is shareable
//! across tasks. Per-entity ordering is enforced inside the repositories, so
//! commands need no extra locking.

use till_db::Database;

/// Wrapper around `Database` for command state.
#[derive(Debug)]
pub struct DbState {
    db: Database,
}

impl DbState {
    /// Creates a new DbState wrapping the database connection.
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let draft = db_state.inner().cart_draft().get().await?;
    /// ```
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
