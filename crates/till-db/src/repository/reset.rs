//! # Teardown Coordinator
//!
//! Empties a set of ledgers in one transaction: either every ledger in the
//! scope is cleared or none is.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  logout        → clear(ResetScope::everything())                       │
//! │                   then the caller resets its session                   │
//! │                                                                         │
//! │  re-sync       → clear(ResetScope::business_data())                    │
//! │                   catalogs only; tickets awaiting upload survive       │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    DELETE FROM <ledger table> ...   for each ledger in scope           │
//! │  COMMIT        (any failure → ROLLBACK, nothing changed)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{info, warn};

use till_core::{Ledger, ResetScope};

use crate::error::{DbError, DbResult};

/// Rows removed per ledger by a successful teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    pub cleared: Vec<(Ledger, u64)>,
}

impl ResetReport {
    pub fn total_rows(&self) -> u64 {
        self.cleared.iter().map(|(_, rows)| rows).sum()
    }

    pub fn rows_for(&self, ledger: Ledger) -> Option<u64> {
        self.cleared
            .iter()
            .find(|(l, _)| *l == ledger)
            .map(|(_, rows)| *rows)
    }
}

/// The statements that empty one ledger. The first one removes its entities;
/// any others remove bookkeeping that only makes sense alongside them.
fn statements(ledger: Ledger) -> &'static [&'static str] {
    match ledger {
        Ledger::CartDraft => &["DELETE FROM draft_slots WHERE slot = 'CART'"],
        Ledger::WorkShiftDraft => &["DELETE FROM draft_slots WHERE slot = 'WORK_SHIFT'"],
        Ledger::Tickets => &["DELETE FROM tickets"],
        Ledger::DeviceProfiles => &["DELETE FROM device_profiles"],
        Ledger::QueueTokens => &[
            "DELETE FROM queue_tokens",
            "DELETE FROM queue_counters",
            "DELETE FROM queue_epochs",
        ],
        Ledger::KitchenTickets => &["DELETE FROM kitchen_tickets"],
        Ledger::Categories => &["DELETE FROM categories"],
        Ledger::Locations => &["DELETE FROM locations"],
        Ledger::PaymentMethods => &["DELETE FROM payment_methods"],
        Ledger::ProductGroups => &["DELETE FROM product_groups"],
        Ledger::TransactionTypes => &["DELETE FROM transaction_types"],
    }
}

/// Clears ledgers atomically.
#[derive(Debug, Clone)]
pub struct TeardownCoordinator {
    pool: SqlitePool,
}

impl TeardownCoordinator {
    pub fn new(pool: SqlitePool) -> Self {
        TeardownCoordinator { pool }
    }

    /// Empties every ledger in `scope`, or none of them.
    ///
    /// ## Returns
    /// * `Ok(ResetReport)` - all ledgers in scope are empty
    /// * `Err(DbError::TransactionFailed)` - rolled back; every ledger is as it was
    pub async fn clear(&self, scope: &ResetScope) -> DbResult<ResetReport> {
        if scope.is_empty() {
            return Ok(ResetReport::default());
        }

        info!(ledgers = scope.len(), "Clearing ledgers");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(format!("could not begin teardown: {e}")))?;

        let report = match clear_in(&mut tx, scope).await {
            Ok(report) => report,
            Err((ledger, err)) => {
                warn!(ledger = %ledger, error = %err, "Teardown failed, rolling back");
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Teardown rollback reported an error");
                }
                return Err(DbError::TransactionFailed(format!("clearing {ledger}: {err}")));
            }
        };

        tx.commit().await.map_err(|e| {
            warn!(error = %e, "Teardown commit failed");
            DbError::TransactionFailed(format!("could not commit teardown: {e}"))
        })?;

        info!(rows = report.total_rows(), "Teardown complete");
        Ok(report)
    }

    /// Logout: empties every ledger.
    pub async fn clear_all(&self) -> DbResult<ResetReport> {
        self.clear(&ResetScope::everything()).await
    }

    /// Re-sync: empties the server-owned catalogs only.
    pub async fn clear_business_data(&self) -> DbResult<ResetReport> {
        self.clear(&ResetScope::business_data()).await
    }
}

async fn clear_in(
    tx: &mut Transaction<'_, Sqlite>,
    scope: &ResetScope,
) -> Result<ResetReport, (Ledger, sqlx::Error)> {
    let mut report = ResetReport::default();

    for ledger in scope.ledgers() {
        let mut removed = None;
        for statement in statements(ledger) {
            let result = sqlx::query(statement)
                .execute(&mut **tx)
                .await
                .map_err(|e| (ledger, e))?;
            removed.get_or_insert(result.rows_affected());
        }
        report.cleared.push((ledger, removed.unwrap_or(0)));
    }

    Ok(report)
}

// =============================================================================
// Unit Tests
// =============================================================================
