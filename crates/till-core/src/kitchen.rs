//! # Kitchen Tickets
//!
//! Work items on the kitchen display. Their progress is driven only by the
//! kitchen operator and is independent of ticket sync and queue token status.
//!
//! ```text
//! PENDING ── advance ──► IN_PROGRESS ── advance ──► READY ── advance ──► READY
//!                                                          (no-op)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::Payload;
use crate::validation::{validate_label, validate_non_negative, validate_positive_number, ValidationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KitchenStatus {
    Pending,
    InProgress,
    Ready,
}

impl KitchenStatus {
    pub const ALL: [KitchenStatus; 3] = [
        KitchenStatus::Pending,
        KitchenStatus::InProgress,
        KitchenStatus::Ready,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KitchenStatus::Pending => "PENDING",
            KitchenStatus::InProgress => "IN_PROGRESS",
            KitchenStatus::Ready => "READY",
        }
    }

    /// Next status in the strict sequence. READY stays READY.
    pub fn advanced(&self) -> KitchenStatus {
        match self {
            KitchenStatus::Pending => KitchenStatus::InProgress,
            KitchenStatus::InProgress | KitchenStatus::Ready => KitchenStatus::Ready,
        }
    }
}

impl fmt::Display for KitchenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KitchenStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KitchenStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: KitchenStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

/// A kitchen display work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct KitchenTicket {
    pub id: String,
    pub ticket_number: String,
    pub order_id: Option<String>,
    pub location_id: String,
    pub order_mode_name: String,
    pub status: KitchenStatus,

    /// Item list as the POS serialized it.
    pub items: Payload,

    pub total_amount_cents: i64,

    /// Queue token number, copied by value. Not checked against the queue.
    pub token_number: Option<i64>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl KitchenTicket {
    /// Moves one step along the sequence.
    ///
    /// Returns `false` when the ticket was already READY and nothing changed.
    pub fn advance(&mut self, now: DateTime<Utc>) -> bool {
        let next = self.status.advanced();
        if next == self.status {
            return false;
        }
        self.status = next;
        self.updated_at = now.max(self.updated_at).max(self.created_at);
        true
    }
}

/// Caller input for `create`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewKitchenTicket {
    pub ticket_number: String,
    #[serde(default)]
    pub order_id: Option<String>,
    pub location_id: String,
    pub order_mode_name: String,
    pub items: Payload,
    pub total_amount_cents: i64,
    #[serde(default)]
    pub token_number: Option<i64>,
}

impl NewKitchenTicket {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_label("ticket_number", &self.ticket_number)?;
        validate_label("location_id", &self.location_id)?;
        validate_label("order_mode_name", &self.order_mode_name)?;
        if let Some(order_id) = &self.order_id {
            validate_label("order_id", order_id)?;
        }
        validate_non_negative("total_amount_cents", self.total_amount_cents)?;
        validate_positive_number("token_number", self.token_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket() -> KitchenTicket {
        let now = Utc::now();
        KitchenTicket {
            id: "k1".to_string(),
            ticket_number: "A-100".to_string(),
            order_id: None,
            location_id: "L1".to_string(),
            order_mode_name: "takeaway".to_string(),
            status: KitchenStatus::Pending,
            items: Payload::parse("items", "[]").unwrap(),
            total_amount_cents: 1250,
            token_number: Some(7),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_advance_sequence_and_idempotent_ready() {
        let mut k = ticket();
        assert!(k.advance(Utc::now()));
        assert_eq!(k.status, KitchenStatus::InProgress);
        assert!(k.advance(Utc::now()));
        assert_eq!(k.status, KitchenStatus::Ready);

        let before = k.clone();
        assert!(!k.advance(Utc::now()));
        assert_eq!(k, before);
    }

    #[test]
    fn test_new_kitchen_ticket_validation() {
        let mut new = NewKitchenTicket {
            ticket_number: "A-1".to_string(),
            order_id: Some("o-1".to_string()),
            location_id: "L1".to_string(),
            order_mode_name: "dine-in".to_string(),
            items: Payload::parse("items", r#"[{"name":"Burger"}]"#).unwrap(),
            total_amount_cents: 0,
            token_number: None,
        };
        assert!(new.validate().is_ok());

        new.total_amount_cents = -1;
        assert!(new.validate().is_err());
    }

    #[test]
    fn test_status_tags() {
        assert_eq!(
            serde_json::to_string(&KitchenStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert_eq!(
            "in_progress".parse::<KitchenStatus>().unwrap(),
            KitchenStatus::InProgress
        );
    }
}
