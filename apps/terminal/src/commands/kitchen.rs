//! # Kitchen Commands
//!
//! Work items on the kitchen display: PENDING → IN_PROGRESS → READY, then
//! dismissed from the screen. Kitchen progress is separate from uploads.

use tracing::debug;

use till_core::{KitchenStatus, KitchenTicket, NewKitchenTicket};

use crate::error::ApiError;
use crate::state::DbState;

pub async fn create_kitchen_ticket(
    db: &DbState,
    ticket: NewKitchenTicket,
) -> Result<KitchenTicket, ApiError> {
    debug!(ticket_number = %ticket.ticket_number, "create_kitchen_ticket command");
    Ok(db.inner().kitchen_tickets().create(ticket).await?)
}

/// Bumps a ticket one step. A READY ticket is returned unchanged.
pub async fn advance_kitchen_ticket(db: &DbState, id: String) -> Result<KitchenTicket, ApiError> {
    debug!(kitchen_ticket_id = %id, "advance_kitchen_ticket command");
    Ok(db.inner().kitchen_tickets().advance(&id).await?)
}

/// Removes a READY ticket from the display.
pub async fn dismiss_kitchen_ticket(db: &DbState, id: String) -> Result<KitchenTicket, ApiError> {
    debug!(kitchen_ticket_id = %id, "dismiss_kitchen_ticket command");
    Ok(db.inner().kitchen_tickets().dismiss(&id).await?)
}

/// Everything still being worked on, oldest first.
pub async fn get_active_kitchen_tickets(db: &DbState) -> Result<Vec<KitchenTicket>, ApiError> {
    Ok(db.inner().kitchen_tickets().list_active().await?)
}

pub async fn list_kitchen_tickets_by_status(
    db: &DbState,
    status: KitchenStatus,
) -> Result<Vec<KitchenTicket>, ApiError> {
    Ok(db
        .inner()
        .kitchen_tickets()
        .list_by_status(status)
        .collect_all()
        .await?)
}
