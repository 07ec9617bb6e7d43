//! # Kitchen Ticket Repository
//!
//! Work items for the kitchen display. Progress is PENDING → IN_PROGRESS →
//! READY and is independent of any upload state.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use till_core::{KitchenStatus, KitchenTicket, NewKitchenTicket, TransitionError};
use till_core::validation::validate_json;

use super::lock_row;
use super::scan::{LedgerScan, Scannable};
use crate::error::{DbError, DbResult};

const KITCHEN_COLUMNS: &str = "id, ticket_number, order_id, location_id, order_mode_name, status, \
     items, total_amount_cents, token_number, created_at, updated_at";

impl Scannable for KitchenTicket {
    const TABLE: &'static str = "kitchen_tickets";
    const COLUMNS: &'static str = KITCHEN_COLUMNS;
    const STATUS_COLUMN: &'static str = "status";

    fn scan_key(&self) -> (DateTime<Utc>, &str) {
        (self.created_at, &self.id)
    }
}

/// Lazy scan over kitchen tickets in one status.
pub type KitchenScan = LedgerScan<KitchenTicket>;

/// Repository for kitchen tickets.
#[derive(Debug, Clone)]
pub struct KitchenTicketRepository {
    pool: SqlitePool,
    page_size: u32,
}

impl KitchenTicketRepository {
    /// Creates a new KitchenTicketRepository.
    pub fn new(pool: SqlitePool, page_size: u32) -> Self {
        KitchenTicketRepository { pool, page_size }
    }

    /// Stores a new kitchen ticket in PENDING.
    pub async fn create(&self, new: NewKitchenTicket) -> DbResult<KitchenTicket> {
        new.validate()?;
        validate_json("items", new.items.as_str())?;
        let now = Utc::now();

        let ticket = KitchenTicket {
            id: Uuid::new_v4().to_string(),
            ticket_number: new.ticket_number.trim().to_string(),
            order_id: new.order_id,
            location_id: new.location_id.trim().to_string(),
            order_mode_name: new.order_mode_name.trim().to_string(),
            status: KitchenStatus::Pending,
            items: new.items,
            total_amount_cents: new.total_amount_cents,
            token_number: new.token_number,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO kitchen_tickets (
                id, ticket_number, order_id, location_id, order_mode_name, status,
                items, total_amount_cents, token_number, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&ticket.id)
        .bind(&ticket.ticket_number)
        .bind(&ticket.order_id)
        .bind(&ticket.location_id)
        .bind(&ticket.order_mode_name)
        .bind(ticket.status)
        .bind(&ticket.items)
        .bind(ticket.total_amount_cents)
        .bind(ticket.token_number)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await?;

        info!(
            kitchen_ticket_id = %ticket.id,
            ticket_number = %ticket.ticket_number,
            "Kitchen ticket created"
        );

        Ok(ticket)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<KitchenTicket>> {
        let sql = format!("SELECT {KITCHEN_COLUMNS} FROM kitchen_tickets WHERE id = ?1");
        let ticket = sqlx::query_as::<_, KitchenTicket>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    /// Moves one step along PENDING → IN_PROGRESS → READY.
    ///
    /// Advancing a READY ticket leaves it unchanged and is not an error.
    pub async fn advance(&self, id: &str) -> DbResult<KitchenTicket> {
        let mut tx = self.pool.begin().await?;
        if !lock_row(&mut tx, "kitchen_tickets", id).await? {
            return Err(DbError::not_found("KitchenTicket", id));
        }

        let sql = format!("SELECT {KITCHEN_COLUMNS} FROM kitchen_tickets WHERE id = ?1");
        let mut ticket = sqlx::query_as::<_, KitchenTicket>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if !ticket.advance(Utc::now()) {
            debug!(kitchen_ticket_id = %id, "Kitchen ticket already ready");
            return Ok(ticket);
        }

        sqlx::query("UPDATE kitchen_tickets SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(ticket.status)
            .bind(ticket.updated_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(kitchen_ticket_id = %id, status = %ticket.status, "Kitchen ticket advanced");
        Ok(ticket)
    }

    /// Removes a READY ticket from the display.
    pub async fn dismiss(&self, id: &str) -> DbResult<KitchenTicket> {
        let mut tx = self.pool.begin().await?;
        if !lock_row(&mut tx, "kitchen_tickets", id).await? {
            return Err(DbError::not_found("KitchenTicket", id));
        }

        let sql = format!("SELECT {KITCHEN_COLUMNS} FROM kitchen_tickets WHERE id = ?1");
        let ticket = sqlx::query_as::<_, KitchenTicket>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if ticket.status != KitchenStatus::Ready {
            warn!(kitchen_ticket_id = %id, status = %ticket.status, "Refused to dismiss unfinished ticket");
            return Err(TransitionError::new("KitchenTicket", ticket.status, "DISMISSED").into());
        }

        sqlx::query("DELETE FROM kitchen_tickets WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(kitchen_ticket_id = %id, "Kitchen ticket dismissed");
        Ok(ticket)
    }

    /// Lazily yields every kitchen ticket in `status`, oldest first.
    pub fn list_by_status(&self, status: KitchenStatus) -> KitchenScan {
        LedgerScan::new(self.pool.clone(), status.as_str(), self.page_size)
    }

    /// Tickets not yet READY, oldest first.
    pub async fn list_active(&self) -> DbResult<Vec<KitchenTicket>> {
        let sql = format!(
            "SELECT {KITCHEN_COLUMNS} FROM kitchen_tickets \
             WHERE status != 'READY' ORDER BY created_at ASC, id ASC"
        );
        let tickets = sqlx::query_as::<_, KitchenTicket>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }

    pub async fn list_all(&self) -> DbResult<Vec<KitchenTicket>> {
        let sql = format!("SELECT {KITCHEN_COLUMNS} FROM kitchen_tickets ORDER BY created_at ASC, id ASC");
        let tickets = sqlx::query_as::<_, KitchenTicket>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(tickets)
    }
}
