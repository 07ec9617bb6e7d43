//! # State Module
//!
//! Separate state types instead of one `AppState`, so every command
//! declares exactly what it touches.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────┐          │
//! │  │   DbState    │  │   SessionState   │  │   ConfigState    │          │
//! │  │              │  │                  │  │                  │          │
//! │  │  Database    │  │  Arc<RwLock<     │  │  [database]      │          │
//! │  │  (SQLite     │  │    Option<       │  │  [sync]          │          │
//! │  │   pool)      │  │   SessionContext │  │  [queue]         │          │
//! │  │              │  │  >>>             │  │  [reset]         │          │
//! │  └──────────────┘  └──────────────────┘  └──────────────────┘          │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DbState: pool is shareable; ordering is enforced per row in SQL     │
//! │  • SessionState: RwLock, many readers, writes on login/logout only     │
//! │  • ConfigState: read-only after startup                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod session;

pub use config::{
    ConfigError, ConfigState, DatabaseSettings, EpochMode, QueueSettings, ResetSettings,
    SyncSettings,
};
pub use db::DbState;
pub use session::{SessionContext, SessionState};
