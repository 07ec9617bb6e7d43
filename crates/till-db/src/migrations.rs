//! # Database Migrations
//!
//! Embedded SQL migrations for the Till ledgers.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Migration Process                                  │
//! │                                                                         │
//! │  Terminal startup                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Check _sqlx_migrations table                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Compare embedded migrations vs applied                                │
//! │       │                                                                 │
//! │       ├── 001_ledgers.sql          ✓ (already applied)                 │
//! │       └── 002_catalog_mirrors.sql  ⬜ (NEW - needs to run)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Run pending migrations in order, record in _sqlx_migrations           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql`
//! 3. Write idempotent SQL (use `IF NOT EXISTS` where possible)
//! 4. **NEVER** modify existing migrations - always add new ones

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from the workspace `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// ## Safety
/// - Idempotent: safe to run multiple times
/// - Transactional: each migration runs in a transaction
/// - Ordered: migrations run in filename order (001, 002, ...)
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)` for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    use super::*;

    #[tokio::test]
    async fn test_all_migrations_applied() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (total, applied) = migration_status(db.pool()).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(applied, total);

        // Re-running is a no-op
        run_migrations(db.pool()).await.unwrap();
        let (_, applied_again) = migration_status(db.pool()).await.unwrap();
        assert_eq!(applied_again, applied);
    }
}
