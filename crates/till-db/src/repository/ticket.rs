//! # Ticket Repository
//!
//! Orders placed on this terminal and their upload state.
//!
//! ## Sync Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Ticket Upload Lifecycle                              │
//! │                                                                         │
//! │  create(payload)            → PENDING, attempts = 0                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  uploader: list_by_status(PENDING) / list_retryable(policy)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  mark_syncing(id)           → SYNCING                                  │
//! │       │                                                                 │
//! │       ├── server accepted → mark_synced(id)  → SYNCED, synced_at set   │
//! │       │                                                                 │
//! │       └── error           → mark_failed(id)  → FAILED, attempts += 1   │
//! │                                                                         │
//! │  A ticket is never lost: every state is durable before the next        │
//! │  remote call starts.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use till_core::{
    NewTicket, SyncEvent, SyncFlow, SyncPolicy, SyncState, SyncStats, SyncStatus, Ticket,
};

use super::lock_row;
use super::scan::{LedgerScan, Scannable};
use crate::error::{DbError, DbResult};

const TICKET_COLUMNS: &str = "id, ticket_data, sync_status, sync_attempts, sync_error, synced_at, \
     location_id, order_mode_name, amount_cents, item_count, queue_number, ticket_number, \
     created_at, updated_at";

impl Scannable for Ticket {
    const TABLE: &'static str = "tickets";
    const COLUMNS: &'static str = TICKET_COLUMNS;
    const STATUS_COLUMN: &'static str = "sync_status";

    fn scan_key(&self) -> (DateTime<Utc>, &str) {
        (self.created_at, &self.id)
    }
}

/// Lazy scan over tickets in one sync status.
pub type TicketScan = LedgerScan<Ticket>;

/// Repository for ticket operations.
#[derive(Debug, Clone)]
pub struct TicketRepository {
    pool: SqlitePool,
    page_size: u32,
}

impl TicketRepository {
    /// Creates a new TicketRepository.
    pub fn new(pool: SqlitePool, page_size: u32) -> Self {
        TicketRepository { pool, page_size }
    }

    /// Stores a new ticket in PENDING with no attempts.
    ///
    /// The amount and item count are read from the payload's
    /// `ticket.ticket_amount` and `orders` fields. The payload itself is
    /// stored verbatim.
    pub async fn create(&self, new: NewTicket) -> DbResult<Ticket> {
        let summary = new.validate()?;
        let now = Utc::now();

        let ticket = Ticket {
            id: Uuid::new_v4().to_string(),
            payload: new.payload,
            sync: SyncState::new(),
            location_id: new.location_id.trim().to_string(),
            order_mode_name: new.order_mode_name.trim().to_string(),
            amount_cents: summary.amount.cents(),
            item_count: summary.item_count,
            queue_number: new.queue_number,
            ticket_number: new.ticket_number,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO tickets (
                id, ticket_data, sync_status, sync_attempts, sync_error, synced_at,
                location_id, order_mode_name, amount_cents, item_count,
                queue_number, ticket_number, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14
            )
            "#,
        )
        .bind(&ticket.id)
        .bind(&ticket.payload)
        .bind(ticket.sync.status)
        .bind(ticket.sync.attempts)
        .bind(&ticket.sync.last_error)
        .bind(ticket.sync.synced_at)
        .bind(&ticket.location_id)
        .bind(&ticket.order_mode_name)
        .bind(ticket.amount_cents)
        .bind(ticket.item_count)
        .bind(ticket.queue_number)
        .bind(ticket.ticket_number)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await?;

        info!(
            ticket_id = %ticket.id,
            amount = %ticket.amount(),
            items = ticket.item_count,
            "Ticket created"
        );

        Ok(ticket)
    }

    /// Gets a ticket by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Ticket>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1");
        let ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    /// PENDING or FAILED → SYNCING.
    pub async fn mark_syncing(&self, id: &str) -> DbResult<Ticket> {
        self.transition(id, SyncEvent::Start).await
    }

    /// SYNCING → SYNCED. Stamps `synced_at` and clears the last error.
    pub async fn mark_synced(&self, id: &str) -> DbResult<Ticket> {
        self.transition(id, SyncEvent::Succeed).await
    }

    /// SYNCING → FAILED. Increments the attempt count and records `error`.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<Ticket> {
        let event = SyncEvent::fail(error)?;
        self.transition(id, event).await
    }

    /// FAILED → PENDING. The attempt count and last error are kept.
    pub async fn requeue(&self, id: &str) -> DbResult<Ticket> {
        self.transition(id, SyncEvent::Requeue).await
    }

    /// Lazily yields every ticket in `status`, oldest first.
    pub fn list_by_status(&self, status: SyncStatus) -> TicketScan {
        LedgerScan::new(self.pool.clone(), status.as_str(), self.page_size)
    }

    /// Every ticket, oldest first.
    pub async fn list_all(&self) -> DbResult<Vec<Ticket>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at ASC, id ASC");
        let tickets = sqlx::query_as::<_, Ticket>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }

    /// Ticket counts per sync status.
    pub async fn sync_stats(&self) -> DbResult<SyncStats> {
        let rows = sqlx::query_as::<_, (SyncStatus, i64)>(
            "SELECT sync_status, COUNT(*) FROM tickets GROUP BY sync_status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = SyncStats::default();
        for (status, count) in rows {
            stats.record(status, count);
        }
        Ok(stats)
    }

    /// FAILED tickets that still have attempts left and whose retry interval
    /// has elapsed, oldest first.
    pub async fn list_retryable(&self, policy: &SyncPolicy) -> DbResult<Vec<Ticket>> {
        let cutoff = policy.retry_cutoff(Utc::now());
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets \
             WHERE sync_status = 'FAILED' \
               AND (?1 = 0 OR sync_attempts < ?1) \
               AND updated_at <= ?2 \
             ORDER BY created_at ASC, id ASC"
        );

        let tickets = sqlx::query_as::<_, Ticket>(&sql)
            .bind(i64::from(policy.max_attempts))
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }

    /// SYNCING tickets untouched for longer than the policy's stale age.
    ///
    /// These are attempts whose outcome was never recorded, typically because
    /// the process stopped mid-upload.
    pub async fn list_stale_syncing(&self, policy: &SyncPolicy) -> DbResult<Vec<Ticket>> {
        let cutoff = policy.stale_cutoff(Utc::now());
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets \
             WHERE sync_status = 'SYNCING' AND updated_at <= ?1 \
             ORDER BY created_at ASC, id ASC"
        );

        let tickets = sqlx::query_as::<_, Ticket>(&sql)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }

    async fn transition(&self, id: &str, event: SyncEvent) -> DbResult<Ticket> {
        let mut tx = self.pool.begin().await?;

        if !lock_row(&mut tx, "tickets", id).await? {
            return Err(DbError::not_found("Ticket", id));
        }

        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1");
        let mut ticket = sqlx::query_as::<_, Ticket>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        let requested = event.requested_status();
        let now = Utc::now();
        if let Err(err) = ticket.sync.apply("Ticket", SyncFlow::Staged, event, now) {
            warn!(
                ticket_id = %id,
                from = %ticket.sync.status,
                to = %requested,
                "Rejected ticket sync transition"
            );
            return Err(err.into());
        }
        ticket.touch(now);

        sqlx::query(
            r#"
            UPDATE tickets SET
                sync_status = ?2,
                sync_attempts = ?3,
                sync_error = ?4,
                synced_at = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(ticket.sync.status)
        .bind(ticket.sync.attempts)
        .bind(&ticket.sync.last_error)
        .bind(ticket.sync.synced_at)
        .bind(ticket.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(
            ticket_id = %id,
            status = %ticket.sync.status,
            attempts = ticket.sync.attempts,
            "Ticket sync state updated"
        );

        Ok(ticket)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::{Database, DbConfig};
    use std::time::Duration;
    use till_core::Payload;

    fn new_ticket(amount: &str, items: usize) -> NewTicket {
        let orders = vec!["{}"; items].join(",");
        NewTicket {
            payload: Payload::parse(
                "ticket_data",
                format!(r#"{{"ticket":{{"ticket_amount":{amount}}},"orders":[{orders}]}}"#),
            )
            .unwrap(),
            location_id: "L1".to_string(),
            order_mode_name: "dine-in".to_string(),
            queue_number: None,
            ticket_number: Some(100),
        }
    }

    async fn set_updated_at(db: &Database, id: &str, at: DateTime<Utc>) {
        sqlx::query("UPDATE tickets SET updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(at)
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_lifecycle_with_one_failure() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tickets();

        let ticket = repo.create(new_ticket("42.50", 3)).await.unwrap();
        assert_eq!(ticket.sync.status, SyncStatus::Pending);
        assert_eq!(ticket.sync.attempts, 0);
        assert_eq!(ticket.amount_cents, 4250);
        assert_eq!(ticket.item_count, 3);

        let t = repo.mark_syncing(&ticket.id).await.unwrap();
        assert_eq!(t.sync.status, SyncStatus::Syncing);

        let t = repo.mark_failed(&ticket.id, "network timeout").await.unwrap();
        assert_eq!(t.sync.status, SyncStatus::Failed);
        assert_eq!(t.sync.attempts, 1);
        assert_eq!(t.sync.last_error.as_deref(), Some("network timeout"));

        let t = repo.mark_syncing(&ticket.id).await.unwrap();
        assert_eq!(t.sync.status, SyncStatus::Syncing);

        let t = repo.mark_synced(&ticket.id).await.unwrap();
        assert_eq!(t.sync.status, SyncStatus::Synced);
        assert!(t.sync.synced_at.is_some());
        assert!(t.sync.last_error.is_none());
        assert_eq!(t.sync.attempts, 1);

        let stored = repo.get_by_id(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.sync, t.sync);
        assert_eq!(stored.payload, ticket.payload);
        assert!(stored.updated_at >= stored.created_at);
    }

    #[tokio::test]
    async fn test_synced_ticket_rejects_every_transition() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tickets();
        let ticket = repo.create(new_ticket("5", 1)).await.unwrap();
        repo.mark_syncing(&ticket.id).await.unwrap();
        let synced = repo.mark_synced(&ticket.id).await.unwrap();

        let errors = [
            repo.mark_syncing(&ticket.id).await.unwrap_err(),
            repo.mark_synced(&ticket.id).await.unwrap_err(),
            repo.mark_failed(&ticket.id, "late").await.unwrap_err(),
            repo.requeue(&ticket.id).await.unwrap_err(),
        ];
        for err in errors {
            assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        }

        let stored = repo.get_by_id(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.sync, synced.sync);
    }

    #[tokio::test]
    async fn test_pending_cannot_skip_syncing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tickets();
        let ticket = repo.create(new_ticket("5", 1)).await.unwrap();

        let err = repo.mark_synced(&ticket.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        let err = repo.mark_failed(&ticket.id, "boom").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        let stored = repo.get_by_id(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.status, SyncStatus::Pending);
        assert_eq!(stored.sync.attempts, 0);
    }

    #[tokio::test]
    async fn test_unknown_ticket_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.tickets().mark_syncing("missing").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(db.tickets().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_input() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tickets();

        let mut missing_amount = new_ticket("1", 1);
        missing_amount.payload = Payload::parse("ticket_data", r#"{"orders":[]}"#).unwrap();
        assert_eq!(
            repo.create(missing_amount).await.unwrap_err().kind(),
            ErrorKind::Validation
        );

        let mut blank_location = new_ticket("1", 1);
        blank_location.location_id = "  ".to_string();
        assert_eq!(
            repo.create(blank_location).await.unwrap_err().kind(),
            ErrorKind::Validation
        );

        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_message_is_required() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tickets();
        let ticket = repo.create(new_ticket("1", 1)).await.unwrap();
        repo.mark_syncing(&ticket.id).await.unwrap();

        let err = repo.mark_failed(&ticket.id, "   ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let stored = repo.get_by_id(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.status, SyncStatus::Syncing);
    }

    #[tokio::test]
    async fn test_requeue_keeps_attempts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tickets();
        let ticket = repo.create(new_ticket("1", 1)).await.unwrap();
        repo.mark_syncing(&ticket.id).await.unwrap();
        repo.mark_failed(&ticket.id, "503").await.unwrap();

        let t = repo.requeue(&ticket.id).await.unwrap();
        assert_eq!(t.sync.status, SyncStatus::Pending);
        assert_eq!(t.sync.attempts, 1);
        assert_eq!(t.sync.last_error.as_deref(), Some("503"));
    }

    #[tokio::test]
    async fn test_scan_pages_through_status_in_creation_order() {
        let db = Database::new(DbConfig::in_memory().scan_page_size(2))
            .await
            .unwrap();
        let repo = db.tickets();

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(repo.create(new_ticket("1", 1)).await.unwrap().id);
        }
        repo.mark_syncing(&ids[2]).await.unwrap();

        let mut scan = repo.list_by_status(SyncStatus::Pending);
        let mut seen = Vec::new();
        while let Some(ticket) = scan.next().await.unwrap() {
            seen.push(ticket.id);
        }
        let expected: Vec<String> = ids
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 2)
            .map(|(_, id)| id.clone())
            .collect();
        assert_eq!(seen, expected);

        // Exhausted scans stay exhausted until restarted
        assert!(scan.next().await.unwrap().is_none());
        scan.restart();
        assert_eq!(scan.collect_all().await.unwrap().len(), 4);

        let syncing = repo
            .list_by_status(SyncStatus::Syncing)
            .collect_all()
            .await
            .unwrap();
        assert_eq!(syncing.len(), 1);
        assert!(repo
            .list_by_status(SyncStatus::Synced)
            .collect_all()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_sync_stats() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tickets();
        let a = repo.create(new_ticket("1", 1)).await.unwrap();
        let b = repo.create(new_ticket("2", 1)).await.unwrap();
        repo.create(new_ticket("3", 1)).await.unwrap();

        repo.mark_syncing(&a.id).await.unwrap();
        repo.mark_synced(&a.id).await.unwrap();
        repo.mark_syncing(&b.id).await.unwrap();
        repo.mark_failed(&b.id, "offline").await.unwrap();

        let stats = repo.sync_stats().await.unwrap();
        assert_eq!(
            stats,
            SyncStats {
                pending: 1,
                syncing: 0,
                synced: 1,
                failed: 1,
            }
        );
        assert_eq!(stats.outstanding(), 2);
    }

    #[tokio::test]
    async fn test_retryable_respects_interval_and_budget() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tickets();
        let policy = SyncPolicy {
            max_attempts: 2,
            retry_interval: Duration::from_secs(60),
            stale_after: Duration::from_secs(120),
        };

        let ticket = repo.create(new_ticket("1", 1)).await.unwrap();
        repo.mark_syncing(&ticket.id).await.unwrap();
        repo.mark_failed(&ticket.id, "offline").await.unwrap();

        // Just failed: not due yet
        assert!(repo.list_retryable(&policy).await.unwrap().is_empty());

        let earlier = Utc::now() - chrono::Duration::minutes(5);
        sqlx::query("UPDATE tickets SET created_at = ?2 WHERE id = ?1")
            .bind(&ticket.id)
            .bind(earlier)
            .execute(db.pool())
            .await
            .unwrap();
        set_updated_at(&db, &ticket.id, earlier).await;
        assert_eq!(repo.list_retryable(&policy).await.unwrap().len(), 1);

        // Second failure spends the budget
        repo.mark_syncing(&ticket.id).await.unwrap();
        repo.mark_failed(&ticket.id, "offline").await.unwrap();
        set_updated_at(&db, &ticket.id, earlier).await;
        assert!(repo.list_retryable(&policy).await.unwrap().is_empty());

        let unlimited = SyncPolicy {
            max_attempts: 0,
            ..policy
        };
        assert_eq!(repo.list_retryable(&unlimited).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_syncing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tickets();
        let policy = SyncPolicy::default();

        let ticket = repo.create(new_ticket("1", 1)).await.unwrap();
        repo.mark_syncing(&ticket.id).await.unwrap();
        assert!(repo.list_stale_syncing(&policy).await.unwrap().is_empty());

        let earlier = Utc::now() - chrono::Duration::hours(1);
        sqlx::query("UPDATE tickets SET created_at = ?2, updated_at = ?2 WHERE id = ?1")
            .bind(&ticket.id)
            .bind(earlier)
            .execute(db.pool())
            .await
            .unwrap();

        let stale = repo.list_stale_syncing(&policy).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, ticket.id);
    }

    #[tokio::test]
    async fn test_concurrent_transitions_on_one_ticket() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tickets();
        let ticket = repo.create(new_ticket("1", 1)).await.unwrap();

        let (a, b) = tokio::join!(repo.mark_syncing(&ticket.id), repo.mark_syncing(&ticket.id));

        // Exactly one wins; the loser sees SYNCING and is refused
        assert!(a.is_ok() != b.is_ok());
        let stored = repo.get_by_id(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.sync.status, SyncStatus::Syncing);
    }
}
