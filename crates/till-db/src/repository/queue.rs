//! # Queue Token Repository
//!
//! Issues numbered tokens and moves them through WAITING → CALLED → SERVED.
//!
//! ## Numbering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Token Number Allocation                              │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │  1. queue_epochs      upsert (location)        → generation            │
//! │                        (first write: takes the SQLite write lock)      │
//! │  2. epoch key         EpochPolicy::epoch_key(now, generation)          │
//! │                        e.g. "2026-10-15#0"                              │
//! │  3. queue_counters    upsert (location, epoch) → last_number + 1       │
//! │  4. queue_tokens      INSERT new token                                 │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Counter and token commit together: a number is never handed out      │
//! │  twice within a (location, epoch), even under concurrent issues.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use till_core::validation::validate_label;
use till_core::{EpochPolicy, NewQueueToken, QueueStatus, QueueToken, TransitionError};

use super::lock_row;
use crate::error::{DbError, DbResult};

const TOKEN_COLUMNS: &str = "id, ticket_id, ticket_number, token_number, status, source, \
     location_id, order_mode, epoch, created_at, called_at, served_at";

/// Repository for queue tokens.
#[derive(Debug, Clone)]
pub struct QueueTokenRepository {
    pool: SqlitePool,
    epoch_policy: EpochPolicy,
}

impl QueueTokenRepository {
    /// Creates a new QueueTokenRepository.
    pub fn new(pool: SqlitePool, epoch_policy: EpochPolicy) -> Self {
        QueueTokenRepository { pool, epoch_policy }
    }

    pub fn epoch_policy(&self) -> EpochPolicy {
        self.epoch_policy
    }

    /// Issues the next token number for the location's current epoch.
    pub async fn issue(&self, new: NewQueueToken) -> DbResult<QueueToken> {
        new.validate()?;
        let now = Utc::now();
        let location_id = new.location_id.trim().to_string();

        let mut tx = self.pool.begin().await?;

        let generation: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO queue_epochs (location_id, generation) VALUES (?1, 0)
            ON CONFLICT (location_id) DO UPDATE SET generation = generation
            RETURNING generation
            "#,
        )
        .bind(&location_id)
        .fetch_one(&mut *tx)
        .await?;

        let epoch = self.epoch_policy.epoch_key(now, generation);
        let token_number = next_number(&mut tx, &location_id, &epoch).await?;

        let token = QueueToken {
            id: Uuid::new_v4().to_string(),
            ticket_id: new.ticket_id.trim().to_string(),
            ticket_number: new.ticket_number.trim().to_string(),
            token_number,
            status: QueueStatus::Waiting,
            source: new.source,
            location_id,
            order_mode: new.order_mode.trim().to_string(),
            epoch,
            created_at: now,
            called_at: None,
            served_at: None,
        };

        insert_token(&mut tx, &token).await?;
        tx.commit().await?;

        info!(
            token_id = %token.id,
            token_number = token.token_number,
            location = %token.location_id,
            epoch = %token.epoch,
            "Queue token issued"
        );

        Ok(token)
    }

    /// Moves the most recent WAITING token with this number to CALLED.
    pub async fn call_by_number(&self, token_number: i64, location_id: &str) -> DbResult<QueueToken> {
        self.advance_by_number(token_number, location_id, QueueStatus::Called)
            .await
    }

    /// Moves the most recent CALLED token with this number to SERVED.
    pub async fn serve_by_number(&self, token_number: i64, location_id: &str) -> DbResult<QueueToken> {
        self.advance_by_number(token_number, location_id, QueueStatus::Served)
            .await
    }

    /// Generic form of call/serve. Asking for WAITING is always refused.
    pub async fn update_status(
        &self,
        token_number: i64,
        location_id: &str,
        status: QueueStatus,
    ) -> DbResult<QueueToken> {
        self.advance_by_number(token_number, location_id, status)
            .await
    }

    /// Stores a token received from elsewhere (another terminal, the server).
    ///
    /// Unknown ids are inserted as given. Known ids may only move forward; a
    /// re-save in the same status is a no-op that returns the stored token.
    pub async fn save(&self, token: QueueToken) -> DbResult<QueueToken> {
        token.validate()?;
        let mut tx = self.pool.begin().await?;

        if !lock_row(&mut tx, "queue_tokens", &token.id).await? {
            insert_token(&mut tx, &token).await?;
            tx.commit().await?;
            debug!(token_id = %token.id, status = %token.status, "Queue token stored");
            return Ok(token);
        }

        let sql = format!("SELECT {TOKEN_COLUMNS} FROM queue_tokens WHERE id = ?1");
        let mut stored = sqlx::query_as::<_, QueueToken>(&sql)
            .bind(&token.id)
            .fetch_one(&mut *tx)
            .await?;

        if token.status == stored.status {
            return Ok(stored);
        }
        if token.status < stored.status {
            warn!(
                token_id = %token.id,
                from = %stored.status,
                to = %token.status,
                "Rejected backwards queue token save"
            );
            return Err(TransitionError::new("QueueToken", stored.status, token.status).into());
        }

        let now = Utc::now();
        while stored.status < token.status {
            let Some(step) = stored.status.next() else {
                break;
            };
            let stamp = match step {
                QueueStatus::Called => token.called_at,
                QueueStatus::Served => token.served_at,
                QueueStatus::Waiting => None,
            };
            stored.advance_to(step, stamp.unwrap_or(now))?;
        }

        update_stamps(&mut tx, &stored).await?;
        tx.commit().await?;

        debug!(token_id = %stored.id, status = %stored.status, "Queue token advanced by save");
        Ok(stored)
    }

    /// Tokens not yet SERVED, in calling order.
    pub async fn list_active(&self) -> DbResult<Vec<QueueToken>> {
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM queue_tokens \
             WHERE status != 'SERVED' \
             ORDER BY token_number ASC, created_at ASC, id ASC"
        );
        let tokens = sqlx::query_as::<_, QueueToken>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(tokens)
    }

    /// Every token, oldest first.
    pub async fn list_all(&self) -> DbResult<Vec<QueueToken>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM queue_tokens ORDER BY created_at ASC, id ASC");
        let tokens = sqlx::query_as::<_, QueueToken>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(tokens)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<QueueToken>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM queue_tokens WHERE id = ?1");
        let token = sqlx::query_as::<_, QueueToken>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(token)
    }

    /// Tokens issued for a ticket. The ticket itself may no longer exist.
    pub async fn find_by_ticket(&self, ticket_id: &str) -> DbResult<Vec<QueueToken>> {
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM queue_tokens WHERE ticket_id = ?1 \
             ORDER BY created_at ASC, id ASC"
        );
        let tokens = sqlx::query_as::<_, QueueToken>(&sql)
            .bind(ticket_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(tokens)
    }

    /// Restarts numbering at 1 for a location. Returns the new epoch key.
    ///
    /// Existing tokens keep their numbers and epochs.
    pub async fn begin_new_epoch(&self, location_id: &str) -> DbResult<String> {
        validate_label("location_id", location_id)?;
        let location_id = location_id.trim();

        let generation: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO queue_epochs (location_id, generation) VALUES (?1, 1)
            ON CONFLICT (location_id) DO UPDATE SET generation = generation + 1
            RETURNING generation
            "#,
        )
        .bind(location_id)
        .fetch_one(&self.pool)
        .await?;

        let epoch = self.epoch_policy.epoch_key(Utc::now(), generation);
        info!(location = %location_id, epoch = %epoch, "Queue numbering restarted");
        Ok(epoch)
    }

    async fn advance_by_number(
        &self,
        token_number: i64,
        location_id: &str,
        target: QueueStatus,
    ) -> DbResult<QueueToken> {
        validate_label("location_id", location_id)?;
        let location_id = location_id.trim();
        let lookup = format!("{token_number}@{location_id}");

        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query(
            "UPDATE queue_tokens SET id = id WHERE location_id = ?1 AND token_number = ?2",
        )
        .bind(location_id)
        .bind(token_number)
        .execute(&mut *tx)
        .await?;
        if locked.rows_affected() == 0 {
            return Err(DbError::not_found("QueueToken", lookup));
        }

        let candidate = match target.previous() {
            Some(source) => {
                let sql = format!(
                    "SELECT {TOKEN_COLUMNS} FROM queue_tokens \
                     WHERE location_id = ?1 AND token_number = ?2 AND status = ?3 \
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                );
                sqlx::query_as::<_, QueueToken>(&sql)
                    .bind(location_id)
                    .bind(token_number)
                    .bind(source)
                    .fetch_optional(&mut *tx)
                    .await?
            }
            None => None,
        };

        let mut token = match candidate {
            Some(token) => token,
            None => {
                let sql = format!(
                    "SELECT {TOKEN_COLUMNS} FROM queue_tokens \
                     WHERE location_id = ?1 AND token_number = ?2 \
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                );
                let latest = sqlx::query_as::<_, QueueToken>(&sql)
                    .bind(location_id)
                    .bind(token_number)
                    .fetch_one(&mut *tx)
                    .await?;

                warn!(
                    token = %lookup,
                    from = %latest.status,
                    to = %target,
                    "Rejected queue token transition"
                );
                return Err(TransitionError::new("QueueToken", latest.status, target).into());
            }
        };

        token.advance_to(target, Utc::now())?;
        update_stamps(&mut tx, &token).await?;
        tx.commit().await?;

        info!(
            token_id = %token.id,
            token = %lookup,
            status = %token.status,
            "Queue token updated"
        );

        Ok(token)
    }
}

/// Allocates the next number for `(location, epoch)`.
///
/// Numbers already taken by saved tokens are skipped.
async fn next_number(tx: &mut Transaction<'_, Sqlite>, location_id: &str, epoch: &str) -> DbResult<i64> {
    let number: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO queue_counters (location_id, epoch, last_number)
        VALUES (
            ?1, ?2,
            (SELECT COALESCE(MAX(token_number), 0) + 1 FROM queue_tokens
             WHERE location_id = ?1 AND epoch = ?2)
        )
        ON CONFLICT (location_id, epoch) DO UPDATE SET
            last_number = MAX(
                last_number,
                (SELECT COALESCE(MAX(token_number), 0) FROM queue_tokens
                 WHERE location_id = ?1 AND epoch = ?2)
            ) + 1
        RETURNING last_number
        "#,
    )
    .bind(location_id)
    .bind(epoch)
    .fetch_one(&mut **tx)
    .await?;

    Ok(number)
}

async fn insert_token(tx: &mut Transaction<'_, Sqlite>, token: &QueueToken) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO queue_tokens (
            id, ticket_id, ticket_number, token_number, status, source,
            location_id, order_mode, epoch, created_at, called_at, served_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&token.id)
    .bind(&token.ticket_id)
    .bind(&token.ticket_number)
    .bind(token.token_number)
    .bind(token.status)
    .bind(token.source)
    .bind(&token.location_id)
    .bind(&token.order_mode)
    .bind(&token.epoch)
    .bind(token.created_at)
    .bind(token.called_at)
    .bind(token.served_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn update_stamps(tx: &mut Transaction<'_, Sqlite>, token: &QueueToken) -> DbResult<()> {
    sqlx::query("UPDATE queue_tokens SET status = ?2, called_at = ?3, served_at = ?4 WHERE id = ?1")
        .bind(&token.id)
        .bind(token.status)
        .bind(token.called_at)
        .bind(token.served_at)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::{Database, DbConfig};
    use till_core::DeviceRole;

    fn new_token(ticket_id: &str, location: &str) -> NewQueueToken {
        NewQueueToken {
            ticket_id: ticket_id.to_string(),
            ticket_number: "A-100".to_string(),
            location_id: location.to_string(),
            order_mode: "dine-in".to_string(),
            source: DeviceRole::Pos,
        }
    }

    #[tokio::test]
    async fn test_issue_call_serve() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.queue_tokens();

        let token = repo.issue(new_token("t1", "L1")).await.unwrap();
        assert_eq!(token.token_number, 1);
        assert_eq!(token.status, QueueStatus::Waiting);

        let called = repo.call_by_number(1, "L1").await.unwrap();
        assert_eq!(called.status, QueueStatus::Called);
        let called_at = called.called_at.unwrap();

        let served = repo.serve_by_number(1, "L1").await.unwrap();
        assert_eq!(served.status, QueueStatus::Served);
        let served_at = served.served_at.unwrap();

        assert!(served.created_at <= called_at);
        assert!(called_at <= served_at);

        let stored = repo.get_by_id(&token.id).await.unwrap().unwrap();
        assert_eq!(stored, served);
    }

    #[tokio::test]
    async fn test_numbers_count_up_per_location() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.queue_tokens();

        let a1 = repo.issue(new_token("t1", "L1")).await.unwrap();
        let a2 = repo.issue(new_token("t2", "L1")).await.unwrap();
        let b1 = repo.issue(new_token("t3", "L2")).await.unwrap();

        assert_eq!(a1.token_number, 1);
        assert_eq!(a2.token_number, 2);
        assert_eq!(b1.token_number, 1);
    }

    #[tokio::test]
    async fn test_concurrent_issues_get_distinct_numbers() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.queue_tokens();

        let (a, b, c) = tokio::join!(
            repo.issue(new_token("t1", "L1")),
            repo.issue(new_token("t2", "L1")),
            repo.issue(new_token("t3", "L1")),
        );
        let mut numbers = vec![
            a.unwrap().token_number,
            b.unwrap().token_number,
            c.unwrap().token_number,
        ];
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_backward_and_repeated_moves_are_refused() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.queue_tokens();
        repo.issue(new_token("t1", "L1")).await.unwrap();

        // WAITING cannot be served directly
        let err = repo.serve_by_number(1, "L1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        repo.call_by_number(1, "L1").await.unwrap();
        let err = repo.call_by_number(1, "L1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        let err = repo
            .update_status(1, "L1", QueueStatus::Waiting)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        repo.serve_by_number(1, "L1").await.unwrap();
        for status in QueueStatus::ALL {
            let err = repo.update_status(1, "L1", status).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        }
    }

    #[tokio::test]
    async fn test_unknown_number_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.queue_tokens();
        repo.issue(new_token("t1", "L1")).await.unwrap();

        let err = repo.call_by_number(7, "L1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = repo.call_by_number(1, "L2").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_new_epoch_restarts_numbering() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.queue_tokens();

        let first = repo.issue(new_token("t1", "L1")).await.unwrap();
        repo.issue(new_token("t2", "L1")).await.unwrap();

        let epoch = repo.begin_new_epoch("L1").await.unwrap();
        assert!(epoch.ends_with("#1"));

        let fresh = repo.issue(new_token("t3", "L1")).await.unwrap();
        assert_eq!(fresh.token_number, 1);
        assert_eq!(fresh.epoch, epoch);
        assert_ne!(fresh.epoch, first.epoch);

        // Both number-1 tokens are waiting; the most recent one is called
        let called = repo.call_by_number(1, "L1").await.unwrap();
        assert_eq!(called.id, fresh.id);
        let old = repo.get_by_id(&first.id).await.unwrap().unwrap();
        assert_eq!(old.status, QueueStatus::Waiting);
    }

    #[tokio::test]
    async fn test_save_inserts_and_only_moves_forward() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.queue_tokens();

        let now = Utc::now();
        let remote = QueueToken {
            id: "remote-1".to_string(),
            ticket_id: "t9".to_string(),
            ticket_number: "B-7".to_string(),
            token_number: 3,
            status: QueueStatus::Waiting,
            source: DeviceRole::Kiosk,
            location_id: "L1".to_string(),
            order_mode: "takeaway".to_string(),
            epoch: repo.epoch_policy().epoch_key(now, 0),
            created_at: now,
            called_at: None,
            served_at: None,
        };

        let stored = repo.save(remote.clone()).await.unwrap();
        assert_eq!(stored, remote);
        assert_eq!(repo.save(remote.clone()).await.unwrap(), remote);

        // Served elsewhere: both steps are applied
        let mut served = remote.clone();
        served.status = QueueStatus::Served;
        served.called_at = Some(now);
        served.served_at = Some(now);
        let advanced = repo.save(served).await.unwrap();
        assert_eq!(advanced.status, QueueStatus::Served);
        assert!(advanced.called_at.is_some());
        assert!(advanced.served_at >= advanced.called_at);

        let err = repo.save(remote.clone()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        // Local numbering continues past the saved number
        let next = repo.issue(new_token("t1", "L1")).await.unwrap();
        assert_eq!(next.token_number, 4);
    }

    #[tokio::test]
    async fn test_save_rejects_number_collision() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.queue_tokens();
        let issued = repo.issue(new_token("t1", "L1")).await.unwrap();

        let mut clash = issued.clone();
        clash.id = "other".to_string();
        let err = repo.save(clash).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_save_rejects_inconsistent_token() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.queue_tokens();
        let issued = repo.issue(new_token("t1", "L1")).await.unwrap();

        let mut bad = issued.clone();
        bad.status = QueueStatus::Called;
        let err = repo.save(bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_listing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.queue_tokens();
        repo.issue(new_token("t1", "L1")).await.unwrap();
        repo.issue(new_token("t2", "L1")).await.unwrap();
        repo.issue(new_token("t2", "L1")).await.unwrap();
        repo.call_by_number(1, "L1").await.unwrap();
        repo.serve_by_number(1, "L1").await.unwrap();

        let active = repo.list_active().await.unwrap();
        let numbers: Vec<i64> = active.iter().map(|t| t.token_number).collect();
        assert_eq!(numbers, vec![2, 3]);

        assert_eq!(repo.list_all().await.unwrap().len(), 3);
        assert_eq!(repo.find_by_ticket("t2").await.unwrap().len(), 2);
        assert!(repo.find_by_ticket("gone").await.unwrap().is_empty());
    }
}
