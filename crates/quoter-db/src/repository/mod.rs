//! # Repository Module
//!
//! Database repository implementations for Curtain Quoter.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Caller (forms, seed tool)                                             │
//! │       │                                                                 │
//! │       │  db.quotations().add_item(&id, item)                           │
//! │       ▼                                                                 │
//! │  QuotationRepository                                                   │
//! │  ├── prices the line with quoter-core                                  │
//! │  ├── stores inputs + results                                           │
//! │  └── recomputes and stores the quotation totals (same transaction)     │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Decimal Storage
//! Decimals are written with `to_string()` and read back with
//! [`stored_decimal`]; a value that no longer parses surfaces as
//! [`DbError::Corrupt`] rather than a silent zero.
//!
//! ## Available Repositories
//!
//! - [`QuotationRepository`](quotation::QuotationRepository) - Quotations, items, serial minting
//! - [`PaymentRepository`](payment::PaymentRepository) - Payments and balances

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};

pub mod payment;
pub mod quotation;

/// Parses a decimal read from a TEXT column.
pub(crate) fn stored_decimal(
    entity: &'static str,
    field: &'static str,
    raw: &str,
) -> DbResult<Decimal> {
    Decimal::from_str(raw).map_err(|_| DbError::Corrupt {
        entity,
        field,
        value: raw.to_string(),
    })
}

/// Parses a nullable decimal read from a TEXT column.
pub(crate) fn stored_optional_decimal(
    entity: &'static str,
    field: &'static str,
    raw: Option<&str>,
) -> DbResult<Option<Decimal>> {
    raw.map(|r| stored_decimal(entity, field, r)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_stored_decimal_keeps_scale() {
        let value = stored_decimal("quotation", "grand_total", "1750.00").unwrap();
        assert_eq!(value, dec!(1750));
        assert_eq!(value.to_string(), "1750.00");
    }

    #[test]
    fn test_unparseable_decimal_is_corrupt() {
        let err = stored_decimal("quotation", "tax_rate", "15%").unwrap_err();
        assert!(matches!(
            err,
            DbError::Corrupt { entity: "quotation", field: "tax_rate", .. }
        ));
    }

    #[test]
    fn test_optional_decimal() {
        assert_eq!(stored_optional_decimal("quote_item", "width", None).unwrap(), None);
        assert_eq!(
            stored_optional_decimal("quote_item", "width", Some("2.350")).unwrap(),
            Some(dec!(2.350))
        );
    }
}
