//! # Error Types
//!
//! Domain-specific error types for quoter-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  quoter-core errors (this file)                                        │
//! │  ├── CoreError        - Pricing, totals and serial failures            │
//! │  └── ValidationError  - Field-level input validation failures          │
//! │                                                                         │
//! │  quoter-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller / UI             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, year, rate)
//! 3. Errors are enum variants, never String
//! 4. Malformed *required* inputs fail fast; only a malformed historical
//!    serial degrades gracefully (see [`crate::serial::SerialAnomaly`])

use rust_decimal::Decimal;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These propagate to the caller, who owns user-facing messaging.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A line item cannot be priced.
    ///
    /// ## When This Occurs
    /// - Unit-pricing mode not recognized
    /// - Negative quantity, dimension or price
    /// - `width` mode without a width, `length` mode without a height,
    ///   `area` mode without both
    #[error("Invalid line input: {0}")]
    InvalidLineInput(ValidationError),

    /// A discount (line or header) is malformed.
    ///
    /// ## When This Occurs
    /// - Negative discount value
    /// - Discount mode other than percent/fixed
    #[error("Invalid discount: {0}")]
    InvalidDiscount(ValidationError),

    /// Tax rate is negative.
    #[error("Invalid tax rate: {rate}")]
    InvalidTaxRate { rate: Decimal },

    /// A computation left the representable decimal range.
    ///
    /// Raised instead of silently truncating.
    #[error("Arithmetic overflow during {operation}")]
    ArithmeticOverflow { operation: &'static str },

    /// A string does not have the `Q-YYYY-NNNNNN` shape.
    #[error("Invalid serial: '{0}'")]
    InvalidSerial(String),

    /// Serial year outside 2000..=9999.
    #[error("Serial year {year} is outside 2000..=9999")]
    InvalidSerialYear { year: i32 },

    /// Every sequence number of the year has been issued.
    #[error("Serial sequence exhausted for year {year}")]
    SerialSpaceExhausted { year: i32 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an ArithmeticOverflow error for the named operation.
    pub fn overflow(operation: &'static str) -> Self {
        CoreError::ArithmeticOverflow { operation }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., an unparseable decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Creates a Required error for the given field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates a Negative error for the given field.
    pub fn negative(field: impl Into<String>) -> Self {
        ValidationError::Negative {
            field: field.into(),
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
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidLineInput(ValidationError::required("width"));
        assert_eq!(err.to_string(), "Invalid line input: width is required");

        let err = CoreError::InvalidTaxRate { rate: dec!(-0.15) };
        assert_eq!(err.to_string(), "Invalid tax rate: -0.15");

        let err = CoreError::SerialSpaceExhausted { year: 2025 };
        assert_eq!(err.to_string(), "Serial sequence exhausted for year 2025");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::negative("quantity").to_string(),
            "quantity must not be negative"
        );

        let err = ValidationError::NotAllowed {
            field: "discount_type".to_string(),
            allowed: vec!["percent".to_string(), "fixed".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "discount_type must be one of: [\"percent\", \"fixed\"]"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("customer_name").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
