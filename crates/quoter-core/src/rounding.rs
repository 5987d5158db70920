//! # Rounding Module
//!
//! Exact decimal rounding helpers used by every calculation.
//!
//! ## Why Exact Decimals?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Summing 40 curtain lines in f64 drifts by cents.                      │
//! │                                                                         │
//! │  OUR SOLUTION: rust_decimal                                             │
//! │    Intermediates keep full precision                                    │
//! │    Only reported figures are rounded, half-up:                          │
//! │      money → 2 dp      2.345  → 2.35                                   │
//! │      area  → 3 dp      0.0005 → 0.001                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use quoter_core::rounding::{round_area, round_money};
//! use rust_decimal::Decimal;
//! use std::str::FromStr;
//!
//! let tax = Decimal::from_str("262.505").unwrap();
//! assert_eq!(round_money(tax).to_string(), "262.51");
//!
//! let area = Decimal::from_str("1.2345").unwrap();
//! assert_eq!(round_area(area).to_string(), "1.235");
//! ```

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places for monetary values.
pub const MONEY_DP: u32 = 2;

/// Decimal places for areas (square meters).
pub const AREA_DP: u32 = 3;

/// Rounds to money precision (2 dp), half-up.
///
/// The result always carries scale 2, so `Decimal::from(6)` renders as
/// `6.00`.
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    round_half_up(value, MONEY_DP)
}

/// Rounds to area precision (3 dp), half-up.
#[inline]
pub fn round_area(value: Decimal) -> Decimal {
    round_half_up(value, AREA_DP)
}

/// Rounds half away from zero and pins the scale to `dp`.
///
/// Every value this crate rounds is non-negative, where away-from-zero and
/// half-up coincide.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded
}

/// Returns `value`, or zero when it is negative.
#[inline]
pub fn clamp_non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

// =============================================================================
// Exact Arithmetic
// =============================================================================

/// Multiplies without losing digits.
///
/// `Decimal::checked_mul` only returns `None` on overflow; a product that
/// needs more than 28 decimal places (or 96 bits of mantissa) comes back
/// rounded. This returns `None` for those too.
///
/// ```rust
/// use quoter_core::rounding::exact_mul;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let d = |s: &str| Decimal::from_str(s).unwrap();
/// assert_eq!(exact_mul(d("2.5"), d("0.15")), Some(d("0.375")));
/// assert_eq!(exact_mul(d("0.499999999999999999999999999"), d("0.001")), None);
/// ```
pub fn exact_mul(a: Decimal, b: Decimal) -> Option<Decimal> {
    let product = a.checked_mul(b)?;
    let scale = a.scale() + b.scale();
    if product.scale() >= scale {
        return Some(product);
    }

    let expected = a.mantissa().checked_mul(b.mantissa())?;
    (aligned_mantissa(product, scale)? == expected).then_some(product)
}

/// Adds without losing digits. See [`exact_mul`].
pub fn exact_add(a: Decimal, b: Decimal) -> Option<Decimal> {
    let sum = a.checked_add(b)?;
    let scale = a.scale().max(b.scale());
    if sum.scale() >= scale {
        return Some(sum);
    }

    let expected = aligned_mantissa(a, scale)?.checked_add(aligned_mantissa(b, scale)?)?;
    (aligned_mantissa(sum, scale)? == expected).then_some(sum)
}

/// Subtracts without losing digits. See [`exact_mul`].
#[inline]
pub fn exact_sub(a: Decimal, b: Decimal) -> Option<Decimal> {
    exact_add(a, -b)
}

/// The mantissa of `value` expressed at `scale` (>= its own scale).
fn aligned_mantissa(value: Decimal, scale: u32) -> Option<i128> {
    let shift = scale.checked_sub(value.scale())?;
    value.mantissa().checked_mul(10i128.checked_pow(shift)?)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(0.005)), dec!(0.01));
        assert_eq!(round_money(dec!(0.004)), dec!(0.00));
        assert_eq!(round_money(dec!(2.345)), dec!(2.35));
        // Bankers rounding would give 2.34 here
        assert_eq!(round_money(dec!(2.345)).to_string(), "2.35");
        assert_eq!(round_money(dec!(279.45)), dec!(279.45));
    }

    #[test]
    fn test_round_area_half_up() {
        assert_eq!(round_area(dec!(0.0005)), dec!(0.001));
        assert_eq!(round_area(dec!(1.2344)), dec!(1.234));
        assert_eq!(round_area(dec!(1.2345)), dec!(1.235));
    }

    #[test]
    fn test_fixed_scale_display() {
        assert_eq!(round_money(dec!(1750)).to_string(), "1750.00");
        assert_eq!(round_money(Decimal::ZERO).to_string(), "0.00");
        assert_eq!(round_area(dec!(6)).to_string(), "6.000");
        assert_eq!(round_area(dec!(12.00000)).to_string(), "12.000");
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(clamp_non_negative(dec!(-0.01)), Decimal::ZERO);
        assert_eq!(clamp_non_negative(dec!(3.50)), dec!(3.50));
    }

    #[test]
    fn test_exact_mul_keeps_representable_products() {
        assert_eq!(exact_mul(dec!(2.000), dec!(3.000)), Some(dec!(6.000000)));
        assert_eq!(exact_mul(dec!(1750.00), dec!(0.15)), Some(dec!(262.5)));
        assert_eq!(exact_mul(Decimal::ZERO, dec!(0.15)), Some(Decimal::ZERO));
        // 28 places exactly still fits
        assert_eq!(
            exact_mul(dec!(0.00000000000001), dec!(0.00000000000001)),
            Some(dec!(0.0000000000000000000000000001))
        );
    }

    #[test]
    fn test_exact_mul_rejects_rounded_products() {
        // Exact value has 30 places; checked_mul would round it to 0.0005
        let width = dec!(0.499999999999999999999999999);
        assert!(width.checked_mul(dec!(0.001)).is_some());
        assert_eq!(exact_mul(width, dec!(0.001)), None);

        // Mantissa would need more than 96 bits
        assert_eq!(exact_mul(Decimal::MAX, dec!(0.5)), None);
        assert_eq!(exact_mul(Decimal::MAX, dec!(2)), None);
    }

    #[test]
    fn test_exact_add_and_sub() {
        assert_eq!(exact_add(dec!(1750.00), dec!(262.50)), Some(dec!(2012.50)));
        assert_eq!(exact_sub(dec!(40), dec!(100)), Some(dec!(-60)));

        // 1e20 + 1e-10 needs 31 significant digits
        assert_eq!(exact_add(dec!(100000000000000000000), dec!(0.0000000001)), None);
        assert_eq!(exact_add(Decimal::MAX, Decimal::ONE), None);
    }

    proptest! {
        #[test]
        fn prop_exact_mul_matches_checked_mul_for_money(
            a in 0i64..100_000_000,
            b in 0i64..100_000,
        ) {
            let a = Decimal::new(a, 2);
            let b = Decimal::new(b, 3);
            prop_assert_eq!(exact_mul(a, b), a.checked_mul(b));
        }

        #[test]
        fn prop_round_money_is_idempotent(cents in 0i64..10_000_000_000, extra in 0i64..1000) {
            let value = Decimal::new(cents * 1000 + extra, 5);
            let once = round_money(value);
            prop_assert_eq!(round_money(once), once);
            prop_assert!((once - value).abs() <= dec!(0.005));
        }
    }
}
