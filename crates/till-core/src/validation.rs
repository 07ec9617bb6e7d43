//! # Validation Module
//!
//! Input validation utilities shared by every ledger.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command boundary (till-terminal)                             │
//! │  ├── Type validation (deserialization, status tag parsing)             │
//! │  └── THIS MODULE: field rules                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Domain records (till-core)                                   │
//! │  └── Cross-field invariants (timestamps vs status)                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  ├── CHECK constraints on status tags                                  │
//! │  └── UNIQUE constraints                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::de::IgnoredAny;

use crate::error::ValidationError;
use crate::{MAX_LABEL_LEN, MAX_SYNC_ERROR_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a short required label (names, location ids, order modes).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most `MAX_LABEL_LEN` characters
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_label;
///
/// assert!(validate_label("location_id", "L1").is_ok());
/// assert!(validate_label("location_id", "   ").is_err());
/// ```
pub fn validate_label(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_LABEL_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_LABEL_LEN,
        });
    }

    Ok(())
}

/// Validates that a text blob is well-formed JSON without interpreting it.
///
/// The document is walked with `IgnoredAny`, so nothing is allocated for its
/// contents and no shape is imposed.
pub fn validate_json(field: &str, text: &str) -> ValidationResult<()> {
    if text.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    serde_json::from_str::<IgnoredAny>(text)
        .map(|_| ())
        .map_err(|e| ValidationError::invalid_format(field, e.to_string()))
}

/// Bounds a sync error message before it is recorded.
///
/// Empty messages are rejected: a FAILED entity always says why.
pub fn normalize_sync_error(message: &str) -> ValidationResult<String> {
    let message = message.trim();

    if message.is_empty() {
        return Err(ValidationError::Required {
            field: "error".to_string(),
        });
    }

    Ok(message.chars().take(MAX_SYNC_ERROR_LEN).collect())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an integer that must be zero or greater (amounts, counts).
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an optional number that, when present, must be at least 1.
pub fn validate_positive_number(field: &str, value: Option<i64>) -> ValidationResult<()> {
    match value {
        Some(n) if n < 1 => Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: i64::MAX,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_label() {
        assert!(validate_label("name", "Till-1").is_ok());
        assert!(matches!(
            validate_label("name", ""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_label("name", &"x".repeat(MAX_LABEL_LEN + 1)),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_validate_json_accepts_any_shape() {
        assert!(validate_json("data", "{}").is_ok());
        assert!(validate_json("data", "[1, 2, 3]").is_ok());
        assert!(validate_json("data", r#"{"nested": {"deep": [null, true]}}"#).is_ok());
        assert!(validate_json("data", "\"just a string\"").is_ok());
    }

    #[test]
    fn test_validate_json_rejects_malformed() {
        assert!(matches!(
            validate_json("data", ""),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_json("data", "{not json"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(validate_json("data", "{} trailing").is_err());
    }

    #[test]
    fn test_normalize_sync_error() {
        assert_eq!(
            normalize_sync_error("network timeout").unwrap(),
            "network timeout"
        );
        assert!(normalize_sync_error("  ").is_err());

        let long = "e".repeat(MAX_SYNC_ERROR_LEN + 50);
        assert_eq!(
            normalize_sync_error(&long).unwrap().chars().count(),
            MAX_SYNC_ERROR_LEN
        );
    }

    #[test]
    fn test_numeric_validators() {
        assert!(validate_non_negative("amount", 0).is_ok());
        assert!(validate_non_negative("amount", -1).is_err());
        assert!(validate_positive_number("token_number", None).is_ok());
        assert!(validate_positive_number("token_number", Some(1)).is_ok());
        assert!(validate_positive_number("token_number", Some(0)).is_err());
    }
}
