//! # till-core: Pure Domain Logic for Till
//!
//! This crate holds every rule of the local persistence engine that can be
//! expressed without touching storage: which status edges exist, how queue
//! numbering epochs are derived, what counts as a well-formed payload and
//! which ledgers a teardown covers.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Till Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │        Terminal UI / remote API client (outside workspace)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ named operations                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 till-terminal (commands)                        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   sync    │  │   queue   │  │  kitchen  │  │   reset   │  │   │
//! │  │   │ SyncState │  │QueueToken │  │ KdsTicket │  │ResetScope │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Opaque payloads, device roles, draft slots, catalog entries
//! - [`sync`] - The shared sync status machine
//! - [`ticket`] - Locally placed orders awaiting upload
//! - [`device`] - The terminal's own registered identity
//! - [`queue`] - Numbered service tokens and numbering epochs
//! - [`kitchen`] - Kitchen display work items
//! - [`reset`] - Ledgers and teardown scopes
//! - [`money`] - Integer cents and decimal amount parsing
//! - [`error`] - Domain error types
//! - [`validation`] - Field validators

pub mod device;
pub mod error;
pub mod kitchen;
pub mod money;
pub mod queue;
pub mod reset;
pub mod sync;
pub mod ticket;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use device::{DeviceProfile, NewDeviceProfile};
pub use error::{CoreError, TransitionError, ValidationError};
pub use kitchen::{KitchenStatus, KitchenTicket, NewKitchenTicket};
pub use money::Money;
pub use queue::{EpochPolicy, NewQueueToken, QueueStatus, QueueToken};
pub use reset::{Ledger, ResetScope};
pub use sync::{SyncEvent, SyncFlow, SyncPolicy, SyncState, SyncStats, SyncStatus};
pub use ticket::{NewTicket, Ticket, TicketSummary};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of names, location ids and order mode labels.
pub const MAX_LABEL_LEN: usize = 200;

/// Sync error messages longer than this are truncated before they are recorded.
pub const MAX_SYNC_ERROR_LEN: usize = 2000;
