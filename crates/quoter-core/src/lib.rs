//! # quoter-core: Pricing and Serial Numbering for Curtain Quoter
//!
//! This crate is the **heart** of Curtain Quoter. It prices curtain and
//! blind line items, aggregates them into quotation totals, and computes
//! quotation serial numbers, as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Curtain Quoter Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Presentation (forms, PDF)                      │   │
//! │  │    Quote form ──► Item editor ──► Preview ──► Payments          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ quoter-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐       │   │
//! │  │   │ rounding │  │ pricing  │  │  totals  │  │  serial  │       │   │
//! │  │   │ half-up  │  │ one line │  │ document │  │ Q-YYYY-N │       │   │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └──────────┘       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO LOGGING • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                   quoter-db (Database Layer)                    │   │
//! │  │        SQLite, migrations, repositories, unique serials         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`rounding`] - Half-up rounding to 2 dp (money) and 3 dp (area)
//! - [`pricing`] - Price one line item
//! - [`totals`] - Aggregate lines into quotation totals
//! - [`serial`] - Serial format, validation and next-number computation
//! - [`payment`] - Paid total and balance
//! - [`types`] - Domain types (LineInput, Quotation, Payment, etc.)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, safe to call from any thread
//! 2. **Exact Decimals**: `rust_decimal` everywhere, never `f64`
//! 3. **Round Once**: intermediates stay exact; only reported figures round
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use quoter_core::{compute_line, compute_quotation_totals, Discount, LineInput, UnitType};
//! use quoter_core::QuotationLine;
//! use rust_decimal::Decimal;
//!
//! // 2 m × 3 m blackout, two windows, 150/m², 50 off
//! let input = LineInput::new(UnitType::Area, Decimal::from(150))
//!     .dimensions(Decimal::from(2), Decimal::from(3))
//!     .quantity(2)
//!     .discount(Discount::fixed(Decimal::from(50)));
//!
//! let line = compute_line(&input).unwrap();
//! assert_eq!(line.line_total_ex_tax.to_string(), "1750.00");
//!
//! let totals = compute_quotation_totals(
//!     &[QuotationLine::from(&line)],
//!     &Discount::none(),
//!     input.tax_rate,
//! )
//! .unwrap();
//! assert_eq!(totals.grand_total.to_string(), "2012.50");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod payment;
pub mod pricing;
pub mod rounding;
pub mod serial;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use quoter_core::compute_line` instead of
// `use quoter_core::pricing::compute_line`

pub use error::{CoreError, CoreResult, ValidationError};
pub use payment::PaymentSummary;
pub use pricing::compute_line;
pub use serial::{
    is_valid_serial, next_serial, Serial, SerialAllocation, SerialAnomaly, SerialAnomalyKind,
};
pub use totals::compute_quotation_totals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

use rust_decimal::Decimal;

/// Default VAT rate (15%) applied when a quotation does not set one.
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);
