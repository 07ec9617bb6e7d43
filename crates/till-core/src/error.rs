//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── ValidationError  - Malformed input, rejected before persistence   │
//! │  ├── TransitionError  - A status edge that is not declared             │
//! │  └── CoreError        - Either of the above                            │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Adds NotFound, Conflict and storage failures   │
//! │                                                                         │
//! │  till-terminal errors (in app)                                         │
//! │  └── ApiError         - What the UI sees (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised by pure domain rules.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Transition error (wraps TransitionError).
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// They are raised before anything is written.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., payload that is not JSON, unparseable amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Two fields contradict each other (e.g., a served token without `served_at`).
    #[error("{field} is inconsistent: {reason}")]
    Inconsistent { field: String, reason: String },
}

impl ValidationError {
    /// Creates an InvalidFormat error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an Inconsistent error.
    pub fn inconsistent(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::Inconsistent {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Transition Error
// =============================================================================

/// A status change was requested along an edge that does not exist.
///
/// ## When This Occurs
/// - `markSynced` on a ticket that never entered SYNCING
/// - Any sync edge out of SYNCED
/// - Calling a token that was already served
/// - A device profile asked to enter SYNCING
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub entity: String,
    pub from: String,
    pub to: String,
}

impl TransitionError {
    pub fn new(entity: impl Into<String>, from: impl ToString, to: impl ToString) -> Self {
        TransitionError {
            entity: entity.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_message() {
        let err = TransitionError::new("Ticket", "SYNCED", "SYNCING");
        assert_eq!(err.to_string(), "Ticket cannot move from SYNCED to SYNCING");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "location_id".to_string(),
        };
        assert_eq!(err.to_string(), "location_id is required");

        let err = ValidationError::invalid_format("payload", "expected JSON");
        assert_eq!(
            err.to_string(),
            "payload has invalid format: expected JSON"
        );
    }

    #[test]
    fn test_errors_convert_to_core_error() {
        let core_err: CoreError = ValidationError::Required {
            field: "name".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));

        let core_err: CoreError = TransitionError::new("QueueToken", "SERVED", "CALLED").into();
        assert!(matches!(core_err, CoreError::Transition(_)));
    }
}
