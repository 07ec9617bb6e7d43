//! # Tickets
//!
//! Orders placed locally and awaiting (or done with) upload.
//!
//! The order payload belongs to the ordering UI. The engine reads exactly two
//! things out of it at creation time, the amount and the item count, and
//! never looks at it again:
//!
//! ```text
//! {
//!   "ticket": { "ticket_amount": 42.5, ... },   → amount_cents = 4250
//!   "orders": [ {...}, {...}, {...} ],          → item_count   = 3
//!   ...                                         → ignored
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::sync::SyncState;
use crate::types::Payload;
use crate::validation::{validate_label, validate_positive_number, ValidationResult};

// =============================================================================
// Ticket
// =============================================================================

/// A locally created order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Ticket {
    pub id: String,

    /// The order exactly as the UI serialized it.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ticket_data"))]
    pub payload: Payload,

    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub sync: SyncState,

    pub location_id: String,
    pub order_mode_name: String,

    /// Derived from the payload when the ticket was created.
    pub amount_cents: i64,

    /// Derived from the payload when the ticket was created.
    pub item_count: i64,

    pub queue_number: Option<i64>,
    pub ticket_number: Option<i64>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Returns the amount as a Money type.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Stamps `updated_at`, never moving it before `created_at` or backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.updated_at).max(self.created_at);
    }
}

/// Caller input for a new ticket.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTicket {
    pub payload: Payload,
    pub location_id: String,
    pub order_mode_name: String,
    #[serde(default)]
    pub queue_number: Option<i64>,
    #[serde(default)]
    pub ticket_number: Option<i64>,
}

impl NewTicket {
    /// Validates the fields and derives the payload summary.
    pub fn validate(&self) -> ValidationResult<TicketSummary> {
        validate_label("location_id", &self.location_id)?;
        validate_label("order_mode_name", &self.order_mode_name)?;
        validate_positive_number("queue_number", self.queue_number)?;
        validate_positive_number("ticket_number", self.ticket_number)?;
        TicketSummary::from_payload(&self.payload)
    }
}

// =============================================================================
// Payload Summary
// =============================================================================

/// The two values the ledger derives from an order payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketSummary {
    pub amount: Money,
    pub item_count: i64,
}

#[derive(Deserialize)]
struct OrderProjection {
    ticket: TicketHeader,
    orders: Vec<IgnoredAny>,
}

#[derive(Deserialize)]
struct TicketHeader {
    ticket_amount: AmountValue,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountValue {
    Number(serde_json::Number),
    Text(String),
}

impl TicketSummary {
    /// Reads `ticket.ticket_amount` and the length of `orders`.
    ///
    /// The amount may be a JSON number or a decimal string. It is parsed from
    /// its decimal text, never through a float.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::{Payload, TicketSummary};
    ///
    /// let payload = Payload::parse(
    ///     "ticket_data",
    ///     r#"{"ticket":{"ticket_amount":42.5},"orders":[{},{},{}]}"#,
    /// ).unwrap();
    /// let summary = TicketSummary::from_payload(&payload).unwrap();
    /// assert_eq!(summary.amount.cents(), 4250);
    /// assert_eq!(summary.item_count, 3);
    /// ```
    pub fn from_payload(payload: &Payload) -> ValidationResult<Self> {
        let projection: OrderProjection = serde_json::from_str(payload.as_str()).map_err(|e| {
            ValidationError::invalid_format(
                "ticket_data",
                format!("expected ticket.ticket_amount and orders[]: {e}"),
            )
        })?;

        let amount = match projection.ticket.ticket_amount {
            AmountValue::Number(n) => Money::parse_decimal(&n.to_string())?,
            AmountValue::Text(s) => Money::parse_decimal(&s)?,
        };

        Ok(TicketSummary {
            amount,
            item_count: projection.orders.len() as i64,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
