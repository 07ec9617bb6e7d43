//! # Commands Module
//!
//! Every operation the terminal UI can call.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── draft.rs    ◄─── Cart and work-shift draft slots
//! ├── ticket.rs   ◄─── Ticket ledger and its sync lifecycle
//! ├── device.rs   ◄─── Device registration and config
//! ├── queue.rs    ◄─── Queue token numbering and calling
//! ├── kitchen.rs  ◄─── Kitchen display progress
//! ├── catalog.rs  ◄─── Server-owned catalog mirrors
//! ├── reset.rs    ◄─── Logout and re-sync teardown
//! ├── session.rs  ◄─── Session lifecycle
//! └── config.rs   ◄─── Configuration retrieval
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Terminal UI                                                            │
//! │  ───────────                                                            │
//! │  await call('update_queue_token_status', { tokenNumber: 7,              │
//! │                                            status: 'CALLED' });         │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  async fn update_queue_token_status(                                    │
//! │      db: &DbState,             ◄── only the state it needs              │
//! │      session: &SessionState,                                            │
//! │      token_number: i64,                                                 │
//! │      status: QueueStatus,                                               │
//! │      location_id: Option<String>,                                       │
//! │  ) -> Result<QueueToken, ApiError>                                      │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  JSON result, or { code, message }                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod config;
pub mod device;
pub mod draft;
pub mod kitchen;
pub mod queue;
pub mod reset;
pub mod session;
pub mod ticket;
