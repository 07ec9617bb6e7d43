//! # API Error Type
//!
//! Unified error type for terminal commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Till                                   │
//! │                                                                         │
//! │  Terminal UI                 Rust Backend                               │
//! │  ───────────                 ────────────                               │
//! │                                                                         │
//! │  call('mark_ticket_synced')                                             │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  DbError ──── kind() ──┬── Validation ─────── VALIDATION_ERROR  │  │
//! │  │                        ├── NotFound ───────── NOT_FOUND         │  │
//! │  │                        ├── InvalidTransition ─ INVALID_TRANSITION│  │
//! │  │                        ├── Conflict ───────── CONFLICT          │  │
//! │  │                        └── Storage ────────── STORAGE_ERROR     │  │
//! │  │                             (logged, generic message)           │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  catch (e) {                                                            │
//! │    // e.code = "INVALID_TRANSITION"                                     │
//! │    // e.message = "Ticket cannot move from SYNCED to SYNCING"           │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Storage failures keep their detail in the log; the caller only learns
//! that the storage layer failed.

use serde::Serialize;
use till_core::{CoreError, ValidationError};
use till_db::{DbError, ErrorKind};

use crate::state::ConfigError;

/// API error returned from terminal commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "QueueToken not found: 7 at L1"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed input, nothing was written
    ValidationError,

    /// The addressed id or number does not exist
    NotFound,

    /// The requested status edge is not declared
    InvalidTransition,

    /// The call contradicts existing state
    Conflict,

    /// The storage layer failed
    StorageError,

    /// No session, or the session lacks what the command needs
    SessionError,

    /// Configuration could not be loaded
    ConfigError,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates a session error.
    pub fn session(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::SessionError, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err.kind() {
            ErrorKind::Validation => ApiError::validation(err.to_string()),
            ErrorKind::NotFound => ApiError::new(ErrorCode::NotFound, err.to_string()),
            ErrorKind::InvalidTransition => {
                ApiError::new(ErrorCode::InvalidTransition, err.to_string())
            }
            ErrorKind::Conflict => ApiError::new(ErrorCode::Conflict, err.to_string()),
            ErrorKind::Storage => {
                // Log the actual error but return a generic message
                tracing::error!(error = %err, "Storage operation failed");
                let message = match err {
                    DbError::ConnectionFailed(_) => "Database connection failed",
                    DbError::MigrationFailed(_) => "Database migration failed",
                    DbError::TransactionFailed(_) => "Database transaction failed",
                    DbError::PoolExhausted => "Database pool exhausted",
                    _ => "Database operation failed",
                };
                ApiError::new(ErrorCode::StorageError, message)
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
            CoreError::Transition(e) => ApiError::new(ErrorCode::InvalidTransition, e.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
