//! # Ticket Commands
//!
//! Orders placed on this terminal and their upload lifecycle.
//!
//! ## Upload Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create_ticket ──► PENDING ──mark_ticket_syncing──► SYNCING             │
//! │                       ▲                               │     │           │
//! │                       │                   mark_ticket_│     │mark_ticket│
//! │                requeue_ticket                 failed  │     │_synced    │
//! │                       │                               ▼     ▼           │
//! │                       └──────────────────────────── FAILED  SYNCED      │
//! │                                                                         │
//! │  FAILED ──mark_ticket_syncing──► SYNCING (retry)                        │
//! │  SYNCED is final.                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed upload is not an error of `mark_ticket_failed`; it is recorded on
//! the ticket and shows up later in `get_ticket_sync_stats` and
//! `list_retryable_tickets`.

use tracing::debug;

use till_core::{NewTicket, SyncStats, SyncStatus, Ticket};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};

/// Stores a new order in PENDING.
pub async fn create_ticket(db: &DbState, ticket: NewTicket) -> Result<Ticket, ApiError> {
    debug!(location_id = %ticket.location_id, "create_ticket command");
    Ok(db.inner().tickets().create(ticket).await?)
}

pub async fn get_ticket(db: &DbState, id: String) -> Result<Ticket, ApiError> {
    db.inner()
        .tickets()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket", &id))
}

pub async fn mark_ticket_syncing(db: &DbState, id: String) -> Result<Ticket, ApiError> {
    debug!(ticket_id = %id, "mark_ticket_syncing command");
    Ok(db.inner().tickets().mark_syncing(&id).await?)
}

pub async fn mark_ticket_synced(db: &DbState, id: String) -> Result<Ticket, ApiError> {
    debug!(ticket_id = %id, "mark_ticket_synced command");
    Ok(db.inner().tickets().mark_synced(&id).await?)
}

/// Records a failed upload attempt with the server's error message.
pub async fn mark_ticket_failed(db: &DbState, id: String, error: String) -> Result<Ticket, ApiError> {
    debug!(ticket_id = %id, "mark_ticket_failed command");
    Ok(db.inner().tickets().mark_failed(&id, &error).await?)
}

/// Puts a FAILED ticket back in line. Its attempt count is kept.
pub async fn requeue_ticket(db: &DbState, id: String) -> Result<Ticket, ApiError> {
    debug!(ticket_id = %id, "requeue_ticket command");
    Ok(db.inner().tickets().requeue(&id).await?)
}

/// Every ticket in `status`, oldest first.
pub async fn list_tickets_by_status(db: &DbState, status: SyncStatus) -> Result<Vec<Ticket>, ApiError> {
    Ok(db.inner().tickets().list_by_status(status).collect_all().await?)
}

pub async fn list_tickets(db: &DbState) -> Result<Vec<Ticket>, ApiError> {
    Ok(db.inner().tickets().list_all().await?)
}

pub async fn get_ticket_sync_stats(db: &DbState) -> Result<SyncStats, ApiError> {
    Ok(db.inner().tickets().sync_stats().await?)
}

/// FAILED tickets the configured retry policy says are due again.
pub async fn list_retryable_tickets(db: &DbState, config: &ConfigState) -> Result<Vec<Ticket>, ApiError> {
    let policy = config.sync_policy();
    Ok(db.inner().tickets().list_retryable(&policy).await?)
}

/// SYNCING tickets nobody has touched for longer than the configured limit.
pub async fn list_stale_tickets(db: &DbState, config: &ConfigState) -> Result<Vec<Ticket>, ApiError> {
    let policy = config.sync_policy();
    Ok(db.inner().tickets().list_stale_syncing(&policy).await?)
}
