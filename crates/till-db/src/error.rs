//! # Database Error Types
//!
//! Error types for ledger operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError / TransitionError (till-core)                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       │  kind() → Validation | NotFound | InvalidTransition            │
//! │       │           | Conflict | Storage                                 │
//! │       ▼                                                                 │
//! │  ApiError (till-terminal) ← Serialized for the UI                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only `Storage` errors come from the store itself. The other four kinds are
//! expected outcomes of a well-formed call and are never retried internally.

use thiserror::Error;
use till_core::{CoreError, TransitionError, ValidationError};

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Input rejected before anything was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Entity not found in the state the operation expected.
    ///
    /// ## When This Occurs
    /// - Unknown ticket, device or kitchen ticket id
    /// - No queue token with that number at the location
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A status edge that is not declared was requested.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// The operation contradicts existing state.
    ///
    /// ## When This Occurs
    /// - `register` while an active device profile exists
    #[error("{entity} conflict: {reason}")]
    Conflict { entity: String, reason: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - A saved queue token reuses a number already taken in its epoch
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed and was rolled back.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (no connection became free before the acquire timeout).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

/// The five error kinds a caller has to distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidTransition,
    Conflict,
    Storage,
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        DbError::Conflict {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Validation(_) => ErrorKind::Validation,
            DbError::NotFound { .. } => ErrorKind::NotFound,
            DbError::InvalidTransition(_) => ErrorKind::InvalidTransition,
            DbError::Conflict { .. } | DbError::UniqueViolation { .. } => ErrorKind::Conflict,
            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::TransactionFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => ErrorKind::Storage,
        }
    }
}

impl From<CoreError> for DbError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => DbError::Validation(e),
            CoreError::Transition(e) => DbError::InvalidTransition(e),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// sqlx::Error::PoolClosed     → DbError::ConnectionFailed
/// Other                       → DbError::Internal
/// ```
///
/// `RowNotFound` is not special-cased: repositories use `fetch_optional` and
/// build their own `NotFound` with the entity and id.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite: "UNIQUE constraint failed: <table>.<column>, ..."
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(DbError::not_found("Ticket", "t1").kind(), ErrorKind::NotFound);
        assert_eq!(
            DbError::conflict("DeviceProfile", "already registered").kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            DbError::from(TransitionError::new("Ticket", "SYNCED", "SYNCING")).kind(),
            ErrorKind::InvalidTransition
        );
        assert_eq!(DbError::PoolExhausted.kind(), ErrorKind::Storage);
        assert_eq!(
            DbError::from(sqlx::Error::PoolTimedOut).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_core_error_is_split_by_kind() {
        let err: DbError = CoreError::Validation(ValidationError::Required {
            field: "name".to_string(),
        })
        .into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
