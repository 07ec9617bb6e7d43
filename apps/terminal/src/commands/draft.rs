//! # Draft Commands
//!
//! The cart and the work shift in progress each live in a single durable
//! slot: saving replaces, clearing an empty slot is fine.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save_cart_draft(data) ──► slot = data                                  │
//! │  get_cart_draft()      ──► data | null                                  │
//! │  clear_cart_draft()    ──► slot empty (also when it already was)        │
//! │                                                                         │
//! │  save_work_shift_draft / get_work_shift_draft / clear_work_shift_draft  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::debug;

use till_core::{Draft, Payload};

use crate::error::ApiError;
use crate::state::DbState;

/// Replaces the cart draft with `data`, a JSON document.
pub async fn save_cart_draft(db: &DbState, data: String) -> Result<Draft, ApiError> {
    debug!(bytes = data.len(), "save_cart_draft command");
    let payload = Payload::parse("data", data)?;
    Ok(db.inner().cart_draft().save(payload).await?)
}

/// Returns the cart draft exactly as it was saved.
pub async fn get_cart_draft(db: &DbState) -> Result<Option<String>, ApiError> {
    let draft = db.inner().cart_draft().get().await?;
    Ok(draft.map(|d| d.payload.into_inner()))
}

pub async fn clear_cart_draft(db: &DbState) -> Result<(), ApiError> {
    debug!("clear_cart_draft command");
    db.inner().cart_draft().clear().await?;
    Ok(())
}

/// Replaces the work-shift draft with `data`, a JSON document.
pub async fn save_work_shift_draft(db: &DbState, data: String) -> Result<Draft, ApiError> {
    debug!(bytes = data.len(), "save_work_shift_draft command");
    let payload = Payload::parse("data", data)?;
    Ok(db.inner().work_shift_draft().save(payload).await?)
}

pub async fn get_work_shift_draft(db: &DbState) -> Result<Option<String>, ApiError> {
    let draft = db.inner().work_shift_draft().get().await?;
    Ok(draft.map(|d| d.payload.into_inner()))
}

pub async fn clear_work_shift_draft(db: &DbState) -> Result<(), ApiError> {
    debug!("clear_work_shift_draft command");
    db.inner().work_shift_draft().clear().await?;
    Ok(())
}
