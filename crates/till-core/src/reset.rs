//! # Reset Scopes
//!
//! Names every ledger the engine owns so a teardown can say exactly which
//! ones it empties. Logout clears everything; the re-sync flow clears only
//! the server-owned business data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::{CatalogKind, DraftSlotKind};

/// One durable ledger (or draft slot) owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Ledger {
    CartDraft,
    WorkShiftDraft,
    Tickets,
    DeviceProfiles,
    QueueTokens,
    KitchenTickets,
    Categories,
    Locations,
    PaymentMethods,
    ProductGroups,
    TransactionTypes,
}

impl Ledger {
    pub const ALL: [Ledger; 11] = [
        Ledger::CartDraft,
        Ledger::WorkShiftDraft,
        Ledger::Tickets,
        Ledger::DeviceProfiles,
        Ledger::QueueTokens,
        Ledger::KitchenTickets,
        Ledger::Categories,
        Ledger::Locations,
        Ledger::PaymentMethods,
        Ledger::ProductGroups,
        Ledger::TransactionTypes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ledger::CartDraft => "cart_draft",
            Ledger::WorkShiftDraft => "work_shift_draft",
            Ledger::Tickets => "tickets",
            Ledger::DeviceProfiles => "device_profiles",
            Ledger::QueueTokens => "queue_tokens",
            Ledger::KitchenTickets => "kitchen_tickets",
            Ledger::Categories => "categories",
            Ledger::Locations => "locations",
            Ledger::PaymentMethods => "payment_methods",
            Ledger::ProductGroups => "product_groups",
            Ledger::TransactionTypes => "transaction_types",
        }
    }

    pub fn draft(kind: DraftSlotKind) -> Ledger {
        match kind {
            DraftSlotKind::Cart => Ledger::CartDraft,
            DraftSlotKind::WorkShift => Ledger::WorkShiftDraft,
        }
    }

    pub fn catalog(kind: CatalogKind) -> Ledger {
        match kind {
            CatalogKind::Categories => Ledger::Categories,
            CatalogKind::Locations => Ledger::Locations,
            CatalogKind::PaymentMethods => Ledger::PaymentMethods,
            CatalogKind::ProductGroups => Ledger::ProductGroups,
            CatalogKind::TransactionTypes => Ledger::TransactionTypes,
        }
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ledger {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ledger::ALL
            .into_iter()
            .find(|ledger| ledger.as_str() == s.trim())
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "ledger".to_string(),
                allowed: Ledger::ALL.iter().map(|l| l.to_string()).collect(),
            })
    }
}

/// The set of ledgers a teardown empties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetScope {
    ledgers: BTreeSet<Ledger>,
}

impl ResetScope {
    /// Every ledger. Used by logout.
    pub fn everything() -> Self {
        ResetScope::of(Ledger::ALL)
    }

    /// The server-owned catalog mirrors. Used before re-syncing from the server.
    pub fn business_data() -> Self {
        ResetScope::of(CatalogKind::ALL.into_iter().map(Ledger::catalog))
    }

    pub fn of(ledgers: impl IntoIterator<Item = Ledger>) -> Self {
        ResetScope {
            ledgers: ledgers.into_iter().collect(),
        }
    }

    /// Ledgers in a fixed order.
    pub fn ledgers(&self) -> impl Iterator<Item = Ledger> + '_ {
        self.ledgers.iter().copied()
    }

    pub fn contains(&self, ledger: Ledger) -> bool {
        self.ledgers.contains(&ledger)
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ledgers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everything_covers_all_ledgers() {
        let scope = ResetScope::everything();
        assert_eq!(scope.len(), Ledger::ALL.len());
        assert!(scope.contains(Ledger::DeviceProfiles));
        assert!(scope.contains(Ledger::CartDraft));
    }

    #[test]
    fn test_business_data_is_catalogs_only() {
        let scope = ResetScope::business_data();
        assert_eq!(scope.len(), CatalogKind::ALL.len());
        assert!(scope.contains(Ledger::PaymentMethods));
        assert!(!scope.contains(Ledger::Tickets));
        assert!(!scope.contains(Ledger::DeviceProfiles));
    }

    #[test]
    fn test_ledger_names_round_trip_through_from_str() {
        for ledger in Ledger::ALL {
            assert_eq!(ledger.as_str().parse::<Ledger>().unwrap(), ledger);
        }
        assert!("products".parse::<Ledger>().is_err());
    }

    #[test]
    fn test_scope_deduplicates() {
        let scope = ResetScope::of([Ledger::Tickets, Ledger::Tickets, Ledger::QueueTokens]);
        assert_eq!(scope.len(), 2);
    }
}
