//! # Line Pricing
//!
//! Turns one item's raw inputs into its derived figures.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LineInput                                                              │
//! │     │                                                                   │
//! │     ├── area        = round_area(width × height)                        │
//! │     ├── total_area  = round_area(area × quantity)                       │
//! │     ├── billable    = by unit type (total_area / width×q / height×q / q)│
//! │     ├── unit_price  = override ?? base                                  │
//! │     ├── pre         = billable × unit_price          (full precision)   │
//! │     ├── post        = max(pre − discount, 0)         (full precision)   │
//! │     ├── tax         = round_money(post × tax_rate)                      │
//! │     └── inc_tax     = round_money(post + tax)                           │
//! │                                                                         │
//! │  Reported: post and inc_tax are rounded independently.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust
//! use quoter_core::pricing::compute_line;
//! use quoter_core::{Discount, LineInput, UnitType};
//! use rust_decimal::Decimal;
//!
//! let input = LineInput::new(UnitType::Area, Decimal::from(150))
//!     .dimensions(Decimal::from(2), Decimal::from(3))
//!     .quantity(2)
//!     .discount(Discount::fixed(Decimal::from(50)));
//!
//! let line = compute_line(&input).unwrap();
//! assert_eq!(line.total_area.to_string(), "12.000");
//! assert_eq!(line.line_total_inc_tax.to_string(), "2012.50");
//! ```

use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::rounding::{clamp_non_negative, exact_add, exact_mul, exact_sub, round_area, round_money};
use crate::types::{Discount, LineInput, LineResult, UnitType};
use crate::validation::{validate_dimension, validate_price, validate_quantity, validate_tax_rate};

/// Computes every derived figure for one line.
///
/// Pure and deterministic: identical input gives identical output.
///
/// ## Errors
/// - [`CoreError::InvalidLineInput`] for negative quantity, dimensions or
///   prices, or a dimension the unit type needs but was not supplied
/// - [`CoreError::InvalidDiscount`] for a negative discount value
/// - [`CoreError::InvalidTaxRate`] for a negative tax rate
/// - [`CoreError::ArithmeticOverflow`] when a product leaves the decimal range
///   or would need more than 28 decimal places
pub fn compute_line(input: &LineInput) -> CoreResult<LineResult> {
    validate_line(input)?;

    let quantity = Decimal::from(input.quantity);

    let area = match (input.width, input.height) {
        (Some(w), Some(h)) if w > Decimal::ZERO && h > Decimal::ZERO => {
            round_area(mul(w, h, "area")?)
        }
        _ => round_area(Decimal::ZERO),
    };
    let total_area = round_area(mul(area, quantity, "total area")?);

    let billable_quantity = billable_quantity(input, total_area)?;
    let unit_price = effective_unit_price(input);

    let pre_discount = mul(billable_quantity, unit_price, "line amount")?;
    let post_discount = apply_discount(pre_discount, &input.discount)?;
    let discount_amount =
        exact_sub(pre_discount, post_discount).ok_or(CoreError::overflow("line discount"))?;

    let tax_amount = round_money(mul(post_discount, input.tax_rate, "line tax")?);
    let total_inc_tax =
        exact_add(post_discount, tax_amount).ok_or(CoreError::overflow("line total"))?;

    Ok(LineResult {
        area,
        total_area,
        billable_quantity,
        unit_price: round_money(unit_price),
        pre_discount_amount: round_money(pre_discount),
        discount_amount: round_money(discount_amount),
        line_total_ex_tax: round_money(post_discount),
        tax_amount,
        line_total_inc_tax: round_money(total_inc_tax),
    })
}

/// The quantity the unit price is multiplied by.
///
/// `total_area` must already be `round_area(area × quantity)`.
pub fn billable_quantity(input: &LineInput, total_area: Decimal) -> CoreResult<Decimal> {
    let quantity = Decimal::from(input.quantity);

    match input.unit_type {
        // total_area already carries the quantity
        UnitType::Area => Ok(total_area),
        UnitType::Width => {
            let width = required_dimension("width", input.width)?;
            mul(width, quantity, "billable width")
        }
        // "length" pricing runs along the height axis
        UnitType::Length => {
            let height = required_dimension("height", input.height)?;
            mul(height, quantity, "billable length")
        }
        UnitType::Pieces => Ok(quantity),
    }
}

/// Override when present (even zero), else the base price.
#[inline]
pub fn effective_unit_price(input: &LineInput) -> Decimal {
    input.price_override.unwrap_or(input.base_unit_price)
}

/// Applies `discount` to `amount`, clamping the result at zero.
///
/// ## Example
/// ```rust
/// use quoter_core::pricing::apply_discount;
/// use quoter_core::Discount;
/// use rust_decimal::Decimal;
///
/// let after = apply_discount(Decimal::from(40), &Discount::fixed(Decimal::from(100))).unwrap();
/// assert_eq!(after, Decimal::ZERO);
/// ```
pub fn apply_discount(amount: Decimal, discount: &Discount) -> CoreResult<Decimal> {
    let off = discount.amount_on(amount)?;
    let remaining = exact_sub(amount, off).ok_or(CoreError::overflow("discount"))?;
    Ok(clamp_non_negative(remaining))
}

fn validate_line(input: &LineInput) -> CoreResult<()> {
    validate_quantity(input.quantity).map_err(CoreError::InvalidLineInput)?;
    validate_dimension("width", input.width).map_err(CoreError::InvalidLineInput)?;
    validate_dimension("height", input.height).map_err(CoreError::InvalidLineInput)?;
    validate_price("base_unit_price", input.base_unit_price).map_err(CoreError::InvalidLineInput)?;
    if let Some(price) = input.price_override {
        validate_price("price_override", price).map_err(CoreError::InvalidLineInput)?;
    }

    if input.unit_type == UnitType::Area {
        required_dimension("width", input.width)?;
        required_dimension("height", input.height)?;
    }

    input.discount.validate()?;
    validate_tax_rate(input.tax_rate)
}

fn required_dimension(field: &str, value: Option<Decimal>) -> CoreResult<Decimal> {
    value.ok_or_else(|| CoreError::InvalidLineInput(ValidationError::required(field)))
}

#[inline]
fn mul(a: Decimal, b: Decimal, operation: &'static str) -> CoreResult<Decimal> {
    exact_mul(a, b).ok_or(CoreError::overflow(operation))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn curtain(width: Decimal, height: Decimal) -> LineInput {
        LineInput::new(UnitType::Area, dec!(150.00)).dimensions(width, height)
    }

    #[test]
    fn test_area_scenario_with_fixed_discount() {
        let input = curtain(dec!(2.000), dec!(3.000))
            .quantity(2)
            .discount(Discount::fixed(dec!(50.00)))
            .tax_rate(dec!(0.15));

        let line = compute_line(&input).unwrap();

        assert_eq!(line.area.to_string(), "6.000");
        assert_eq!(line.total_area.to_string(), "12.000");
        assert_eq!(line.billable_quantity, dec!(12));
        assert_eq!(line.unit_price.to_string(), "150.00");
        assert_eq!(line.pre_discount_amount.to_string(), "1800.00");
        assert_eq!(line.discount_amount.to_string(), "50.00");
        assert_eq!(line.line_total_ex_tax.to_string(), "1750.00");
        assert_eq!(line.tax_amount.to_string(), "262.50");
        assert_eq!(line.line_total_inc_tax.to_string(), "2012.50");
    }

    #[test]
    fn test_width_mode_ignores_height() {
        let input = LineInput::new(UnitType::Width, dec!(40))
            .dimensions(dec!(2.5), dec!(9.9))
            .quantity(3);

        let line = compute_line(&input).unwrap();
        assert_eq!(line.billable_quantity, dec!(7.5));
        assert_eq!(line.line_total_ex_tax, dec!(300.00));
        // area is still reported for display
        assert_eq!(line.area, dec!(24.750));
    }

    #[test]
    fn test_length_mode_prices_off_height() {
        let input = LineInput::new(UnitType::Length, dec!(20))
            .dimensions(dec!(9.9), dec!(2.8))
            .quantity(2);

        let line = compute_line(&input).unwrap();
        assert_eq!(line.billable_quantity, dec!(5.6));
        assert_eq!(line.line_total_ex_tax, dec!(112.00));
    }

    #[test]
    fn test_length_mode_without_width() {
        let input = LineInput::new(UnitType::Length, dec!(20)).height(dec!(2.5));

        let line = compute_line(&input).unwrap();
        assert_eq!(line.area, dec!(0.000));
        assert_eq!(line.billable_quantity, dec!(2.5));
        assert_eq!(line.line_total_ex_tax, dec!(50.00));
    }

    #[test]
    fn test_pieces_mode_ignores_dimensions() {
        let input = LineInput::new(UnitType::Pieces, dec!(35.50))
            .dimensions(dec!(1.2), dec!(2.0))
            .quantity(4);

        let line = compute_line(&input).unwrap();
        assert_eq!(line.billable_quantity, dec!(4));
        assert_eq!(line.line_total_ex_tax, dec!(142.00));
        assert_eq!(line.tax_amount, dec!(21.30));
        assert_eq!(line.line_total_inc_tax, dec!(163.30));
    }

    #[test]
    fn test_pieces_mode_needs_no_dimensions() {
        let input = LineInput::new(UnitType::Pieces, dec!(12));
        assert_eq!(compute_line(&input).unwrap().line_total_ex_tax, dec!(12.00));
    }

    #[test]
    fn test_zero_override_is_a_real_price() {
        let input = curtain(dec!(2), dec!(2)).price_override(dec!(0));
        let line = compute_line(&input).unwrap();
        assert_eq!(line.unit_price, dec!(0.00));
        assert_eq!(line.line_total_inc_tax, dec!(0.00));
    }

    #[test]
    fn test_override_replaces_base_price() {
        let input = curtain(dec!(1), dec!(1)).price_override(dec!(99.99));
        let line = compute_line(&input).unwrap();
        assert_eq!(line.unit_price, dec!(99.99));
        assert_eq!(line.line_total_ex_tax, dec!(99.99));
    }

    #[test]
    fn test_percent_discount() {
        let input = curtain(dec!(2), dec!(1)).discount(Discount::percent(dec!(12.5)));
        let line = compute_line(&input).unwrap();
        assert_eq!(line.pre_discount_amount, dec!(300.00));
        assert_eq!(line.discount_amount, dec!(37.50));
        assert_eq!(line.line_total_ex_tax, dec!(262.50));
    }

    #[test]
    fn test_discount_larger_than_amount_clamps_to_zero() {
        let input = curtain(dec!(0.5), dec!(0.5)).discount(Discount::fixed(dec!(1000)));
        let line = compute_line(&input).unwrap();
        assert_eq!(line.line_total_ex_tax, dec!(0.00));
        assert_eq!(line.tax_amount, dec!(0.00));
        assert_eq!(line.line_total_inc_tax, dec!(0.00));
        assert_eq!(line.discount_amount, line.pre_discount_amount);
    }

    #[test]
    fn test_zero_quantity_computes_zero() {
        let line = compute_line(&curtain(dec!(2), dec!(3)).quantity(0)).unwrap();
        assert_eq!(line.area, dec!(6.000));
        assert_eq!(line.total_area, dec!(0.000));
        assert_eq!(line.line_total_inc_tax, dec!(0.00));
    }

    #[test]
    fn test_zero_dimension_gives_zero_area() {
        let line = compute_line(&curtain(dec!(0), dec!(3))).unwrap();
        assert_eq!(line.area, dec!(0.000));
        assert_eq!(line.line_total_ex_tax, dec!(0.00));
    }

    #[test]
    fn test_tax_uses_unrounded_post_discount() {
        // pre = 0.333 × 10.05 = 3.34665, tax = 0.5019975 → 0.50
        let input = LineInput::new(UnitType::Width, dec!(10.05)).width(dec!(0.333));
        let line = compute_line(&input).unwrap();
        assert_eq!(line.line_total_ex_tax, dec!(3.35));
        assert_eq!(line.tax_amount, dec!(0.50));
        // 3.34665 + 0.50 = 3.84665 → 3.85, same as 3.35 + 0.50 here
        assert_eq!(line.line_total_inc_tax, dec!(3.85));
    }

    #[test]
    fn test_inc_tax_rounds_from_unrounded_post() {
        // post = 0.335 → reported 0.34
        // tax  = round(0.0335) = 0.03
        // inc  = round(0.335 + 0.03) = round(0.365) = 0.37
        let input = LineInput::new(UnitType::Width, dec!(1))
            .width(dec!(0.335))
            .tax_rate(dec!(0.10));
        let line = compute_line(&input).unwrap();
        assert_eq!(line.line_total_ex_tax, dec!(0.34));
        assert_eq!(line.tax_amount, dec!(0.03));
        assert_eq!(line.line_total_inc_tax, dec!(0.37));
        assert_eq!(line.line_total_inc_tax, line.line_total_ex_tax + line.tax_amount);
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        let err = compute_line(&curtain(dec!(1), dec!(1)).quantity(-1)).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidLineInput(ValidationError::negative("quantity"))
        );
    }

    #[test]
    fn test_negative_dimension_is_rejected() {
        let err = compute_line(&curtain(dec!(-1), dec!(1))).unwrap_err();
        assert!(matches!(err, CoreError::InvalidLineInput(_)));
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let err = compute_line(&LineInput::new(UnitType::Pieces, dec!(-5))).unwrap_err();
        assert!(matches!(err, CoreError::InvalidLineInput(_)));

        let err = compute_line(&LineInput::new(UnitType::Pieces, dec!(5)).price_override(dec!(-1)))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidLineInput(_)));
    }

    #[test]
    fn test_missing_required_dimension_is_rejected() {
        let err = compute_line(&LineInput::new(UnitType::Width, dec!(10))).unwrap_err();
        assert_eq!(err, CoreError::InvalidLineInput(ValidationError::required("width")));

        let err = compute_line(&LineInput::new(UnitType::Length, dec!(10)).width(dec!(2)))
            .unwrap_err();
        assert_eq!(err, CoreError::InvalidLineInput(ValidationError::required("height")));

        let err = compute_line(&LineInput::new(UnitType::Area, dec!(10)).width(dec!(2)))
            .unwrap_err();
        assert_eq!(err, CoreError::InvalidLineInput(ValidationError::required("height")));
    }

    #[test]
    fn test_negative_discount_is_rejected() {
        let input = curtain(dec!(1), dec!(1)).discount(Discount::percent(dec!(-5)));
        assert!(matches!(
            compute_line(&input).unwrap_err(),
            CoreError::InvalidDiscount(_)
        ));
    }

    #[test]
    fn test_negative_tax_rate_is_rejected() {
        let input = curtain(dec!(1), dec!(1)).tax_rate(dec!(-0.15));
        assert_eq!(
            compute_line(&input).unwrap_err(),
            CoreError::InvalidTaxRate { rate: dec!(-0.15) }
        );
    }

    #[test]
    fn test_overflow_fails_instead_of_truncating() {
        let input = LineInput::new(UnitType::Pieces, Decimal::MAX).quantity(2);
        assert!(matches!(
            compute_line(&input).unwrap_err(),
            CoreError::ArithmeticOverflow { .. }
        ));
    }

    #[test]
    fn test_product_beyond_28_places_fails_instead_of_rounding() {
        // width × height is 0.000499...9 (30 places); rounding it to 28
        // places first would carry it up to an area of 0.001
        let input = curtain(dec!(0.499999999999999999999999999), dec!(0.001));
        assert!(matches!(
            compute_line(&input).unwrap_err(),
            CoreError::ArithmeticOverflow { operation: "area" }
        ));

        let input = LineInput::new(UnitType::Pieces, dec!(10))
            .tax_rate(dec!(0.0000000000000000000000000001))
            .discount(Discount::percent(dec!(0.0000000000000000000000000001)));
        assert!(matches!(
            compute_line(&input).unwrap_err(),
            CoreError::ArithmeticOverflow { .. }
        ));
    }

    fn arb_discount() -> impl Strategy<Value = Discount> {
        prop_oneof![
            (0i64..=20_000).prop_map(|v| Discount::percent(Decimal::new(v, 2))),
            (0i64..=10_000_000).prop_map(|v| Discount::fixed(Decimal::new(v, 2))),
        ]
    }

    proptest! {
        // widths in cm and heights in dm keep width × height exact at 3 dp
        #[test]
        fn prop_total_area_matches_direct_product(
            w_cm in 0i64..1_000,
            h_dm in 0i64..100,
            q in 0i64..50,
        ) {
            let (w, h) = (Decimal::new(w_cm, 2), Decimal::new(h_dm, 1));
            let qd = Decimal::from(q);
            let line = compute_line(&curtain(w, h).quantity(q)).unwrap();
            prop_assert_eq!(line.total_area, round_area(w * h * qd));
            prop_assert_eq!(line.total_area, round_area(qd * h * w));
            prop_assert_eq!(line.billable_quantity, line.total_area);
        }

        #[test]
        fn prop_compute_line_is_idempotent(
            w_mm in 0i64..10_000,
            h_mm in 0i64..10_000,
            q in 0i64..20,
            price_cents in 0i64..100_000,
            discount in arb_discount(),
        ) {
            let input = curtain(Decimal::new(w_mm, 3), Decimal::new(h_mm, 3))
                .quantity(q)
                .price_override(Decimal::new(price_cents, 2))
                .discount(discount);
            prop_assert_eq!(compute_line(&input).unwrap(), compute_line(&input).unwrap());
        }

        #[test]
        fn prop_post_discount_never_negative(
            mode in prop::sample::select(UnitType::ALL.to_vec()),
            w_mm in 0i64..5_000,
            h_mm in 0i64..5_000,
            q in 0i64..20,
            price_cents in 0i64..50_000,
            discount in arb_discount(),
        ) {
            let input = LineInput::new(mode, Decimal::new(price_cents, 2))
                .dimensions(Decimal::new(w_mm, 3), Decimal::new(h_mm, 3))
                .quantity(q)
                .discount(discount);
            let line = compute_line(&input).unwrap();
            prop_assert!(line.line_total_ex_tax >= Decimal::ZERO);
            prop_assert!(line.tax_amount >= Decimal::ZERO);
            prop_assert!(line.line_total_inc_tax >= line.line_total_ex_tax);
            prop_assert!(line.discount_amount <= line.pre_discount_amount);
        }
    }
}
