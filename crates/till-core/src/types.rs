//! # Domain Types
//!
//! Shared value types used across every ledger.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Shared Types                                    │
//! │                                                                         │
//! │  Payload        Opaque JSON text owned by the caller's schema          │
//! │  DeviceRole     POS | KIOSK | QUEUE | KDS                              │
//! │  DraftSlotKind  CART | WORK_SHIFT  (+ typed markers CartSlot, ...)     │
//! │  Draft          The single live value of a slot                        │
//! │  CatalogKind    Which server catalog a mirror row belongs to           │
//! │  CatalogItem    One mirrored catalog row                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::{validate_json, validate_label, ValidationResult};

// =============================================================================
// Payload
// =============================================================================

/// Serialized JSON owned by the caller.
///
/// The engine checks only that the text is non-empty, syntactically valid JSON
/// and otherwise stores and returns it byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Payload(String);

impl Payload {
    /// Wraps caller-provided JSON text after a syntax check.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::Payload;
    ///
    /// assert!(Payload::parse("data", r#"{"items":[]}"#).is_ok());
    /// assert!(Payload::parse("data", "{oops").is_err());
    /// ```
    pub fn parse(field: &str, text: impl Into<String>) -> ValidationResult<Self> {
        let text = text.into();
        validate_json(field, &text)?;
        Ok(Payload(text))
    }

    /// The empty JSON object, used for device config when none is supplied.
    pub fn empty_object() -> Self {
        Payload("{}".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Device Role
// =============================================================================

/// What kind of terminal a device is. Also records which kind of terminal
/// produced a queue token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceRole {
    /// Staffed point-of-sale till.
    Pos,
    /// Self-service ordering kiosk.
    Kiosk,
    /// Customer-facing queue display.
    Queue,
    /// Kitchen display system.
    Kds,
}

impl DeviceRole {
    pub const ALL: [DeviceRole; 4] = [
        DeviceRole::Pos,
        DeviceRole::Kiosk,
        DeviceRole::Queue,
        DeviceRole::Kds,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceRole::Pos => "POS",
            DeviceRole::Kiosk => "KIOSK",
            DeviceRole::Queue => "QUEUE",
            DeviceRole::Kds => "KDS",
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceRole::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: DeviceRole::ALL.iter().map(|r| r.to_string()).collect(),
            })
    }
}

// =============================================================================
// Draft Slots
// =============================================================================

/// The single-value scratch slots a terminal keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftSlotKind {
    /// Cart being built at the till.
    Cart,
    /// Cash-drawer shift in progress.
    WorkShift,
}

impl DraftSlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftSlotKind::Cart => "CART",
            DraftSlotKind::WorkShift => "WORK_SHIFT",
        }
    }
}

impl fmt::Display for DraftSlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compile-time slot selector, so a store handle is bound to exactly one slot.
pub trait Slot: Send + Sync + 'static {
    const KIND: DraftSlotKind;
}

/// Marker for the cart draft slot.
#[derive(Debug, Clone, Copy)]
pub struct CartSlot;

impl Slot for CartSlot {
    const KIND: DraftSlotKind = DraftSlotKind::Cart;
}

/// Marker for the work-shift draft slot.
#[derive(Debug, Clone, Copy)]
pub struct WorkShiftSlot;

impl Slot for WorkShiftSlot {
    const KIND: DraftSlotKind = DraftSlotKind::WorkShift;
}

/// The live value of a draft slot.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Draft {
    #[cfg_attr(feature = "sqlx", sqlx(rename = "slot"))]
    pub kind: DraftSlotKind,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "data"))]
    pub payload: Payload,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Catalog Mirrors
// =============================================================================

/// Server catalogs mirrored locally for offline lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Categories,
    Locations,
    PaymentMethods,
    ProductGroups,
    TransactionTypes,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 5] = [
        CatalogKind::Categories,
        CatalogKind::Locations,
        CatalogKind::PaymentMethods,
        CatalogKind::ProductGroups,
        CatalogKind::TransactionTypes,
    ];

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            CatalogKind::Categories => "categories",
            CatalogKind::Locations => "locations",
            CatalogKind::PaymentMethods => "payment_methods",
            CatalogKind::ProductGroups => "product_groups",
            CatalogKind::TransactionTypes => "transaction_types",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// One mirrored catalog row.
///
/// `data` keeps the server's full record; the other columns exist for
/// ordering and filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub sort_order: i64,
    pub data: Payload,
}

fn default_active() -> bool {
    true
}

impl CatalogItem {
    /// Checks the columns the mirror relies on.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_label("id", &self.id)?;
        validate_label("name", &self.name)?;
        validate_json("data", self.data.as_str())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
