//! # Validation Module
//!
//! Input validation utilities for Curtain Quoter.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Forms (presentation layer)                                   │
//! │  ├── Basic format checks (empty, numeric)                              │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Calculators (pricing / totals)                               │
//! │  └── THIS MODULE: Business rule validation, fail fast                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE(serial_number)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use quoter_core::validation::{validate_customer_name, validate_quantity};
//!
//! validate_customer_name("Al Noor Interiors").unwrap();
//! validate_quantity(0).unwrap(); // zero is valid, prices to zero
//! assert!(validate_quantity(-1).is_err());
//! ```

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult, ValidationError};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a customer name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("customer_name"));
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "customer_name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a quote item description (product, color, notes).
///
/// ## Rules
/// - Can be empty
/// - At most 500 characters
pub fn validate_description(description: &str) -> ValidationResult<()> {
    if description.chars().count() > 500 {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: 500,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an item quantity.
///
/// ## Rules
/// - Must not be negative
/// - Zero is allowed and prices to zero
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::negative("quantity"));
    }

    Ok(())
}

/// Validates an optional dimension in meters.
///
/// ## Rules
/// - Absent is allowed here; whether the unit mode needs it is decided by
///   the pricing calculator
/// - Present values must not be negative
pub fn validate_dimension(field: &str, value: Option<Decimal>) -> ValidationResult<()> {
    match value {
        Some(v) if v < Decimal::ZERO => Err(ValidationError::negative(field)),
        _ => Ok(()),
    }
}

/// Validates a unit price or override.
///
/// ## Rules
/// - Must not be negative
/// - Zero is allowed (free items)
///
/// ## Example
/// ```rust
/// use quoter_core::validation::validate_price;
/// use rust_decimal::Decimal;
///
/// assert!(validate_price("base_unit_price", Decimal::new(15000, 2)).is_ok());
/// assert!(validate_price("base_unit_price", Decimal::ZERO).is_ok());
/// assert!(validate_price("base_unit_price", Decimal::new(-1, 0)).is_err());
/// ```
pub fn validate_price(field: &str, price: Decimal) -> ValidationResult<()> {
    if price < Decimal::ZERO {
        return Err(ValidationError::negative(field));
    }

    Ok(())
}

/// Validates a payment amount.
///
/// ## Rules
/// - Must be positive (> 0)
pub fn validate_payment_amount(amount: Decimal) -> ValidationResult<()> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a tax rate expressed as a fraction (0.15 = 15%).
///
/// ## Rules
/// - Must not be negative
pub fn validate_tax_rate(rate: Decimal) -> CoreResult<()> {
    if rate < Decimal::ZERO {
        return Err(CoreError::InvalidTaxRate { rate });
    }

    Ok(())
}

/// Parses a decimal typed into a form or read from configuration.
pub fn parse_decimal(field: &str, raw: &str) -> ValidationResult<Decimal> {
    let raw = raw.trim();

    if raw.is_empty() {
        return Err(ValidationError::required(field));
    }

    Decimal::from_str(raw).map_err(|e| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
