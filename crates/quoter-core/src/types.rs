//! # Domain Types
//!
//! Core domain types used throughout Curtain Quoter.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Transient (built from editable state, never stored themselves)        │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   LineInput     │──►│   LineResult    │──►│  QuotationLine  │       │
//! │  │  width/height   │   │  area, totals   │   │  ex-tax, disc.  │       │
//! │  │  unit_type      │   │  tax, inc-tax   │   └────────┬────────┘       │
//! │  │  discount       │   └─────────────────┘            ▼                │
//! │  └─────────────────┘                         ┌─────────────────┐       │
//! │                                              │ QuotationTotals │       │
//! │                                              └─────────────────┘       │
//! │                                                                         │
//! │  Persisted (owned by quoter-db, passed by value)                       │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Quotation     │   │   QuoteItem     │   │    Payment      │       │
//! │  │  id (UUID)      │   │  quotation_id   │   │  quotation_id   │       │
//! │  │  serial         │   │  input + result │   │  amount, method │       │
//! │  │  status         │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every persisted entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: the quotation [`Serial`] - human-readable, minted once

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::rounding::exact_mul;
use crate::serial::Serial;
use crate::DEFAULT_TAX_RATE;

// =============================================================================
// Unit Type
// =============================================================================

/// How a product's unit price is applied to an item.
///
/// ## Billable Quantity
/// ```text
/// Area    → total area (width × height × quantity, m²)
/// Width   → width × quantity (linear meters along the rail)
/// Length  → height × quantity (the drop; see below)
/// Pieces  → quantity
/// ```
///
/// `Length` keys off the *height* axis. That pairing is how the shop prices
/// drops and is kept on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Priced per square meter.
    Area,
    /// Priced per linear meter of width.
    Width,
    /// Priced per linear meter of height.
    Length,
    /// Priced per piece.
    Pieces,
}

impl UnitType {
    /// All accepted modes, in display order.
    pub const ALL: [UnitType; 4] = [
        UnitType::Area,
        UnitType::Width,
        UnitType::Length,
        UnitType::Pieces,
    ];

    /// Returns the canonical lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            UnitType::Area => "area",
            UnitType::Width => "width",
            UnitType::Length => "length",
            UnitType::Pieces => "pieces",
        }
    }
}

impl Default for UnitType {
    fn default() -> Self {
        UnitType::Area
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a unit-pricing mode.
///
/// Accepts the legacy spelling `pcs`. Anything else is an
/// [`CoreError::InvalidLineInput`].
impl FromStr for UnitType {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "area" => Ok(UnitType::Area),
            "width" => Ok(UnitType::Width),
            "length" => Ok(UnitType::Length),
            "pieces" | "pcs" => Ok(UnitType::Pieces),
            _ => Err(CoreError::InvalidLineInput(ValidationError::NotAllowed {
                field: "unit_type".to_string(),
                allowed: UnitType::ALL.iter().map(|u| u.as_str().to_string()).collect(),
            })),
        }
    }
}

/// Deserializes through [`FromStr`], so `pcs` is accepted here too.
impl<'de> Deserialize<'de> for UnitType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Whether a discount value is a percentage or an absolute amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a percentage of the amount (10 = 10%).
    Percent,
    /// `value` is subtracted as-is.
    Fixed,
}

impl DiscountType {
    /// Returns the canonical lowercase name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percent => "percent",
            DiscountType::Fixed => "fixed",
        }
    }
}

impl Default for DiscountType {
    fn default() -> Self {
        DiscountType::Fixed
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountType {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" => Ok(DiscountType::Percent),
            "fixed" => Ok(DiscountType::Fixed),
            _ => Err(CoreError::InvalidDiscount(ValidationError::NotAllowed {
                field: "discount_type".to_string(),
                allowed: vec!["percent".to_string(), "fixed".to_string()],
            })),
        }
    }
}

/// 1% as a factor (0.01).
const PERCENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// A discount selection, used both per line and on the quotation header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Discount {
    pub kind: DiscountType,
    #[ts(as = "String")]
    pub value: Decimal,
}

impl Discount {
    /// No discount (fixed 0).
    pub const fn none() -> Self {
        Discount {
            kind: DiscountType::Fixed,
            value: Decimal::ZERO,
        }
    }

    /// A percentage discount (`10` = 10%).
    pub const fn percent(value: Decimal) -> Self {
        Discount {
            kind: DiscountType::Percent,
            value,
        }
    }

    /// A fixed-amount discount.
    pub const fn fixed(value: Decimal) -> Self {
        Discount {
            kind: DiscountType::Fixed,
            value,
        }
    }

    /// Rejects negative values with [`CoreError::InvalidDiscount`].
    pub fn validate(&self) -> CoreResult<()> {
        if self.value < Decimal::ZERO {
            return Err(CoreError::InvalidDiscount(ValidationError::negative(
                "discount_value",
            )));
        }
        Ok(())
    }

    /// The amount this discount takes off `base`, at full precision.
    ///
    /// Not clamped: a fixed discount larger than `base` returns the full
    /// value, and the caller clamps the *difference* at zero.
    ///
    /// ## Example
    /// ```rust
    /// use quoter_core::Discount;
    /// use rust_decimal::Decimal;
    ///
    /// let ten_percent = Discount::percent(Decimal::from(10));
    /// let amount = ten_percent.amount_on(Decimal::from(2070)).unwrap();
    /// assert_eq!(amount, Decimal::from(207));
    /// ```
    pub fn amount_on(&self, base: Decimal) -> CoreResult<Decimal> {
        self.validate()?;
        match self.kind {
            DiscountType::Percent => exact_mul(base, self.value)
                .and_then(|v| exact_mul(v, PERCENT))
                .ok_or(CoreError::overflow("percent discount")),
            DiscountType::Fixed => Ok(self.value),
        }
    }
}

impl Default for Discount {
    fn default() -> Self {
        Discount::none()
    }
}

// =============================================================================
// Line Input / Result
// =============================================================================

/// Raw inputs for pricing one quotation item.
///
/// ## Example
/// ```rust
/// use quoter_core::{Discount, LineInput, UnitType};
/// use rust_decimal::Decimal;
///
/// let input = LineInput::new(UnitType::Area, Decimal::from(150))
///     .dimensions(Decimal::from(2), Decimal::from(3))
///     .quantity(2)
///     .discount(Discount::fixed(Decimal::from(50)));
/// assert_eq!(input.quantity, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineInput {
    /// Width in meters.
    #[ts(as = "Option<String>")]
    pub width: Option<Decimal>,
    /// Height (drop) in meters.
    #[ts(as = "Option<String>")]
    pub height: Option<Decimal>,
    /// Number of identical items. Zero is valid and prices to zero.
    pub quantity: i64,
    pub unit_type: UnitType,
    /// Product base price per unit.
    #[ts(as = "String")]
    pub base_unit_price: Decimal,
    /// Variation or manual price. `Some(0)` is a deliberate zero price.
    #[ts(as = "Option<String>")]
    pub price_override: Option<Decimal>,
    pub discount: Discount,
    /// VAT rate as a fraction (0.15 = 15%).
    #[ts(as = "String")]
    pub tax_rate: Decimal,
}

impl LineInput {
    /// Creates an input with quantity 1, no dimensions, no discount and
    /// the default tax rate.
    pub fn new(unit_type: UnitType, base_unit_price: Decimal) -> Self {
        LineInput {
            width: None,
            height: None,
            quantity: 1,
            unit_type,
            base_unit_price,
            price_override: None,
            discount: Discount::none(),
            tax_rate: DEFAULT_TAX_RATE,
        }
    }

    /// Sets width and height.
    pub fn dimensions(mut self, width: Decimal, height: Decimal) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Sets only the width.
    pub fn width(mut self, width: Decimal) -> Self {
        self.width = Some(width);
        self
    }

    /// Sets only the height.
    pub fn height(mut self, height: Decimal) -> Self {
        self.height = Some(height);
        self
    }

    /// Sets the quantity.
    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    /// Sets the price override.
    pub fn price_override(mut self, price: Decimal) -> Self {
        self.price_override = Some(price);
        self
    }

    /// Sets the line discount.
    pub fn discount(mut self, discount: Discount) -> Self {
        self.discount = discount;
        self
    }

    /// Sets the tax rate.
    pub fn tax_rate(mut self, rate: Decimal) -> Self {
        self.tax_rate = rate;
        self
    }
}

/// Derived figures for one item. See [`crate::pricing::compute_line`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineResult {
    /// width × height, 3 dp.
    #[ts(as = "String")]
    pub area: Decimal,
    /// area × quantity, 3 dp.
    #[ts(as = "String")]
    pub total_area: Decimal,
    /// Quantity basis actually priced (unrounded).
    #[ts(as = "String")]
    pub billable_quantity: Decimal,
    /// Effective unit price, 2 dp.
    #[ts(as = "String")]
    pub unit_price: Decimal,
    /// billable × unit price, 2 dp.
    #[ts(as = "String")]
    pub pre_discount_amount: Decimal,
    /// What the line discount took off, 2 dp. Display only.
    #[ts(as = "String")]
    pub discount_amount: Decimal,
    #[ts(as = "String")]
    pub line_total_ex_tax: Decimal,
    #[ts(as = "String")]
    pub tax_amount: Decimal,
    #[ts(as = "String")]
    pub line_total_inc_tax: Decimal,
}

// =============================================================================
// Quotation Totals
// =============================================================================

/// The per-line figures the aggregator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuotationLine {
    #[ts(as = "String")]
    pub line_total_ex_tax: Decimal,
    #[ts(as = "String")]
    pub discount_amount: Decimal,
}

impl QuotationLine {
    pub const fn new(line_total_ex_tax: Decimal, discount_amount: Decimal) -> Self {
        QuotationLine {
            line_total_ex_tax,
            discount_amount,
        }
    }
}

impl From<&LineResult> for QuotationLine {
    fn from(result: &LineResult) -> Self {
        QuotationLine::new(result.line_total_ex_tax, result.discount_amount)
    }
}

/// Document-level totals. See [`crate::totals::compute_quotation_totals`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuotationTotals {
    #[ts(as = "String")]
    pub items_subtotal: Decimal,
    /// Sum of line discounts. Reconciliation figure; never feeds the total.
    #[ts(as = "String")]
    pub total_item_discounts: Decimal,
    #[ts(as = "String")]
    pub header_discount_amount: Decimal,
    #[ts(as = "String")]
    pub discounted_subtotal: Decimal,
    #[ts(as = "String")]
    pub tax_amount: Decimal,
    #[ts(as = "String")]
    pub grand_total: Decimal,
}

// =============================================================================
// Quotation Status
// =============================================================================

/// Status label recorded on a quotation. No transitions are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    /// Being edited.
    Draft,
    /// Sent to the customer.
    Sent,
    /// Customer accepted.
    Accepted,
    /// Customer declined or went elsewhere.
    Lost,
}

impl Default for QuotationStatus {
    fn default() -> Self {
        QuotationStatus::Draft
    }
}

impl QuotationStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            QuotationStatus::Draft => "draft",
            QuotationStatus::Sent => "sent",
            QuotationStatus::Accepted => "accepted",
            QuotationStatus::Lost => "lost",
        }
    }
}

impl fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    /// Bank transfer.
    Transfer,
    Other,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Quotation
// =============================================================================

/// A quotation with its stored totals.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Quotation {
    pub id: String,
    /// Minted once at creation, immutable afterwards.
    #[ts(as = "String")]
    pub serial: Serial,
    pub customer_name: String,
    pub status: QuotationStatus,
    pub header_discount: Discount,
    #[ts(as = "String")]
    pub tax_rate: Decimal,
    /// Last computed totals (stored for listing and audit).
    pub totals: QuotationTotals,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Set by soft delete. The serial stays reserved.
    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Quotation {
    /// Whether the quotation has been soft-deleted.
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

// =============================================================================
// Quote Item
// =============================================================================

/// A priced line on a quotation.
/// Stores both the inputs and the results computed at insert time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuoteItem {
    pub id: String,
    pub quotation_id: String,
    /// Product name, color and other free text.
    pub description: String,
    pub input: LineInput,
    pub result: LineResult,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl QuoteItem {
    /// Returns the figures the aggregator needs.
    #[inline]
    pub fn quotation_line(&self) -> QuotationLine {
        QuotationLine::from(&self.result)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment towards a quotation. A quotation can have many.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub quotation_id: String,
    #[ts(as = "String")]
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[ts(as = "String")]
    pub paid_on: NaiveDate,
    /// Cheque number, transfer id, etc.
    pub reference: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
