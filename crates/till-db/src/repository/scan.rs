//! # Lazy Status Scans
//!
//! A [`LedgerScan`] walks every row of one ledger in a given status, oldest
//! first, fetching a page at a time with a keyset cursor on
//! `(created_at, id)`.
//!
//! ```text
//! page 1: WHERE status = ?            ORDER BY created_at, id LIMIT n
//! page 2: WHERE status = ? AND (created_at, id) > last seen   LIMIT n
//! ...     until a page comes back short
//! ```
//!
//! The scan holds no transaction between pages. Rows that change status while
//! a scan is open may or may not be yielded, but every row is yielded at most
//! once and the scan always ends.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, SqlitePool};
use std::collections::VecDeque;
use tracing::debug;

use crate::error::DbResult;

/// A ledger row type that can be scanned by status.
pub trait Scannable: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    const TABLE: &'static str;
    const COLUMNS: &'static str;
    const STATUS_COLUMN: &'static str;

    /// The keyset cursor position of this row.
    fn scan_key(&self) -> (DateTime<Utc>, &str);
}

/// A finite, restartable, lazily paged sequence of rows in one status.
///
/// ## Example
/// ```rust,ignore
/// let mut pending = db.tickets().list_by_status(SyncStatus::Pending);
/// while let Some(ticket) = pending.next().await? {
///     upload(&ticket).await;
/// }
/// ```
#[derive(Debug)]
pub struct LedgerScan<T> {
    pool: SqlitePool,
    status: &'static str,
    page_size: u32,
    after: Option<(DateTime<Utc>, String)>,
    buffer: VecDeque<T>,
    exhausted: bool,
}

impl<T: Scannable> LedgerScan<T> {
    pub(crate) fn new(pool: SqlitePool, status: &'static str, page_size: u32) -> Self {
        LedgerScan {
            pool,
            status,
            page_size: page_size.max(1),
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Yields the next row, fetching a new page when the buffer runs dry.
    pub async fn next(&mut self) -> DbResult<Option<T>> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }
        Ok(self.buffer.pop_front())
    }

    /// Starts over from the oldest row.
    pub fn restart(&mut self) {
        self.after = None;
        self.buffer.clear();
        self.exhausted = false;
    }

    /// Drains the rest of the scan into a vector.
    pub async fn collect_all(mut self) -> DbResult<Vec<T>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    async fn fetch_page(&mut self) -> DbResult<()> {
        let sql = format!(
            "SELECT {} FROM {} \
             WHERE {} = ?1 \
               AND (?2 IS NULL OR created_at > ?2 OR (created_at = ?2 AND id > ?3)) \
             ORDER BY created_at ASC, id ASC \
             LIMIT ?4",
            T::COLUMNS,
            T::TABLE,
            T::STATUS_COLUMN,
        );

        let (after_created, after_id) = match &self.after {
            Some((created_at, id)) => (Some(*created_at), Some(id.clone())),
            None => (None, None),
        };

        let rows = sqlx::query_as::<_, T>(&sql)
            .bind(self.status)
            .bind(after_created)
            .bind(after_id)
            .bind(i64::from(self.page_size))
            .fetch_all(&self.pool)
            .await?;

        debug!(
            table = T::TABLE,
            status = self.status,
            rows = rows.len(),
            "Fetched scan page"
        );

        if rows.len() < self.page_size as usize {
            self.exhausted = true;
        }
        if let Some(last) = rows.last() {
            let (created_at, id) = last.scan_key();
            self.after = Some((created_at, id.to_string()));
        }
        self.buffer.extend(rows);
        Ok(())
    }
}
