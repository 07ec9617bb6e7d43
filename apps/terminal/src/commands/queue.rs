//! # Queue Commands
//!
//! Customer-facing order numbers.
//!
//! ## Token Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  issue_queue_token ──► #7 WAITING ──CALLED──► #7 CALLED ──SERVED──► #7  │
//! │                                                                SERVED   │
//! │                                                                         │
//! │  update_queue_token_status(7, 'CALLED')   addressed by number           │
//! │  save_queue_token(token)                  token made on another device  │
//! │                                                                         │
//! │  Numbers are per location and start at 1 in every numbering epoch.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands that address a token by number use the session's selected
//! location unless the caller names one.

use tracing::debug;

use till_core::{NewQueueToken, QueueStatus, QueueToken};

use crate::error::ApiError;
use crate::state::{DbState, SessionState};

fn resolve_location(session: &SessionState, location_id: Option<String>) -> Result<String, ApiError> {
    match location_id {
        Some(location) => Ok(location),
        None => session.location(),
    }
}

/// Hands out the next number at the token's location.
pub async fn issue_queue_token(db: &DbState, token: NewQueueToken) -> Result<QueueToken, ApiError> {
    debug!(ticket_id = %token.ticket_id, location_id = %token.location_id, "issue_queue_token command");
    Ok(db.inner().queue_tokens().issue(token).await?)
}

/// Stores a token produced elsewhere. Known tokens only move forward.
pub async fn save_queue_token(db: &DbState, token: QueueToken) -> Result<QueueToken, ApiError> {
    debug!(token_id = %token.id, status = %token.status, "save_queue_token command");
    Ok(db.inner().queue_tokens().save(token).await?)
}

/// Tokens not yet served, lowest number first.
pub async fn get_active_queue_tokens(db: &DbState) -> Result<Vec<QueueToken>, ApiError> {
    Ok(db.inner().queue_tokens().list_active().await?)
}

/// Calls or serves the token with `token_number`.
///
/// ## Errors
/// * `NOT_FOUND` - no token with that number at the location
/// * `INVALID_TRANSITION` - the token is not in the preceding status, or
///   `status` is WAITING
/// * `SESSION_ERROR` - no location given and none selected
pub async fn update_queue_token_status(
    db: &DbState,
    session: &SessionState,
    token_number: i64,
    status: QueueStatus,
    location_id: Option<String>,
) -> Result<QueueToken, ApiError> {
    let location = resolve_location(session, location_id)?;
    debug!(token_number, status = %status, location_id = %location, "update_queue_token_status command");

    Ok(db
        .inner()
        .queue_tokens()
        .update_status(token_number, &location, status)
        .await?)
}

/// Restarts numbering at 1. Returns the new epoch key.
pub async fn begin_queue_epoch(
    db: &DbState,
    session: &SessionState,
    location_id: Option<String>,
) -> Result<String, ApiError> {
    let location = resolve_location(session, location_id)?;
    debug!(location_id = %location, "begin_queue_epoch command");
    Ok(db.inner().queue_tokens().begin_new_epoch(&location).await?)
}

/// Tokens issued for a ticket. Empty if there are none.
pub async fn find_queue_tokens_for_ticket(
    db: &DbState,
    ticket_id: String,
) -> Result<Vec<QueueToken>, ApiError> {
    Ok(db.inner().queue_tokens().find_by_ticket(&ticket_id).await?)
}

pub async fn list_queue_tokens(db: &DbState) -> Result<Vec<QueueToken>, ApiError> {
    Ok(db.inner().queue_tokens().list_all().await?)
}
