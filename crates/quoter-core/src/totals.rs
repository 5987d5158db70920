//! # Quotation Totals
//!
//! Reduces a quotation's lines to its document totals.
//!
//! ## Where Tax Is Computed
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line 1 ex-tax ─┐                                                       │
//! │  line 2 ex-tax ─┼─► items_subtotal ─► − header discount ─► discounted   │
//! │  line N ex-tax ─┘                         (clamped ≥ 0)        │        │
//! │                                                                 ▼        │
//! │                                           tax = round(discounted × rate)│
//! │                                                                         │
//! │  Per-line taxes are NOT summed: the header discount changes the taxable │
//! │  base, and summing rounded line taxes would double-count rounding.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Line discounts are summed into `total_item_discounts` for display; that
//! figure never feeds the total.

use rust_decimal::Decimal;

use crate::error::{CoreError, CoreResult};
use crate::rounding::{clamp_non_negative, exact_add, exact_mul, exact_sub, round_money};
use crate::types::{Discount, QuotationLine, QuotationTotals};
use crate::validation::validate_tax_rate;

/// Computes the document totals for `lines`.
///
/// Summation order is irrelevant: any permutation of `lines` gives the same
/// result. An empty slice yields all-zero totals.
///
/// ## Errors
/// - [`CoreError::InvalidTaxRate`] for a negative rate
/// - [`CoreError::InvalidDiscount`] for a negative header discount
/// - [`CoreError::ArithmeticOverflow`] when a sum leaves the decimal range or
///   the tax would need more than 28 decimal places
///
/// ## Example
/// ```rust
/// use quoter_core::totals::compute_quotation_totals;
/// use quoter_core::{Discount, QuotationLine};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let d = |s: &str| Decimal::from_str(s).unwrap();
/// let lines = [
///     QuotationLine::new(d("1750.00"), d("50.00")),
///     QuotationLine::new(d("320.00"), d("0.00")),
/// ];
/// let totals = compute_quotation_totals(&lines, &Discount::percent(d("10")), d("0.15")).unwrap();
/// assert_eq!(totals.grand_total.to_string(), "2142.45");
/// ```
pub fn compute_quotation_totals(
    lines: &[QuotationLine],
    header_discount: &Discount,
    tax_rate: Decimal,
) -> CoreResult<QuotationTotals> {
    validate_tax_rate(tax_rate)?;
    header_discount.validate()?;

    let items_subtotal = round_money(sum(lines.iter().map(|l| l.line_total_ex_tax))?);
    let total_item_discounts = round_money(sum(lines.iter().map(|l| l.discount_amount))?);

    // Fixed header discounts are used verbatim, unrounded
    let header_discount_amount = header_discount.amount_on(items_subtotal)?;

    let discounted_subtotal = round_money(clamp_non_negative(
        exact_sub(items_subtotal, header_discount_amount)
            .ok_or(CoreError::overflow("header discount"))?,
    ));

    let tax_amount = round_money(
        exact_mul(discounted_subtotal, tax_rate).ok_or(CoreError::overflow("quotation tax"))?,
    );

    let grand_total = round_money(
        exact_add(discounted_subtotal, tax_amount).ok_or(CoreError::overflow("grand total"))?,
    );

    Ok(QuotationTotals {
        items_subtotal,
        total_item_discounts,
        header_discount_amount: round_money(header_discount_amount),
        discounted_subtotal,
        tax_amount,
        grand_total,
    })
}

fn sum(mut values: impl Iterator<Item = Decimal>) -> CoreResult<Decimal> {
    values.try_fold(Decimal::ZERO, |acc, v| {
        exact_add(acc, v).ok_or(CoreError::overflow("line sum"))
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::compute_line;
    use crate::types::{LineInput, UnitType};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn line(ex_tax: Decimal) -> QuotationLine {
        QuotationLine::new(ex_tax, Decimal::ZERO)
    }

    #[test]
    fn test_percent_header_discount_scenario() {
        let lines = [line(dec!(1750.00)), line(dec!(320.00))];
        let totals =
            compute_quotation_totals(&lines, &Discount::percent(dec!(10)), dec!(0.15)).unwrap();

        assert_eq!(totals.items_subtotal.to_string(), "2070.00");
        assert_eq!(totals.header_discount_amount.to_string(), "207.00");
        assert_eq!(totals.discounted_subtotal.to_string(), "1863.00");
        assert_eq!(totals.tax_amount.to_string(), "279.45");
        assert_eq!(totals.grand_total.to_string(), "2142.45");
    }

    #[test]
    fn test_empty_quotation_is_all_zero() {
        let totals = compute_quotation_totals(&[], &Discount::none(), dec!(0.15)).unwrap();

        assert_eq!(totals.items_subtotal.to_string(), "0.00");
        assert_eq!(totals.total_item_discounts, Decimal::ZERO);
        assert_eq!(totals.header_discount_amount, Decimal::ZERO);
        assert_eq!(totals.discounted_subtotal, Decimal::ZERO);
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.grand_total.to_string(), "0.00");
    }

    #[test]
    fn test_header_discount_larger_than_subtotal_floors_at_zero() {
        let lines = [line(dec!(100.00)), line(dec!(50.00))];
        let totals =
            compute_quotation_totals(&lines, &Discount::fixed(dec!(500)), dec!(0.15)).unwrap();

        assert_eq!(totals.header_discount_amount, dec!(500.00));
        assert_eq!(totals.discounted_subtotal, Decimal::ZERO);
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.grand_total, totals.tax_amount);
        assert_eq!(totals.grand_total, Decimal::ZERO);
    }

    #[test]
    fn test_fixed_header_discount_used_unrounded() {
        // 100.00 − 0.005 = 99.995 → 100.00 (half-up); a pre-rounded 0.01
        // discount would give 99.99
        let totals =
            compute_quotation_totals(&[line(dec!(100.00))], &Discount::fixed(dec!(0.005)), dec!(0))
                .unwrap();
        assert_eq!(totals.discounted_subtotal, dec!(100.00));
        assert_eq!(totals.header_discount_amount, dec!(0.01));
    }

    #[test]
    fn test_item_discounts_are_display_only() {
        let lines = [
            QuotationLine::new(dec!(1750.00), dec!(50.00)),
            QuotationLine::new(dec!(320.00), dec!(80.00)),
        ];
        let with = compute_quotation_totals(&lines, &Discount::none(), dec!(0.15)).unwrap();
        let without = compute_quotation_totals(
            &[line(dec!(1750.00)), line(dec!(320.00))],
            &Discount::none(),
            dec!(0.15),
        )
        .unwrap();

        assert_eq!(with.total_item_discounts, dec!(130.00));
        assert_eq!(with.grand_total, without.grand_total);
        assert_eq!(with.tax_amount, without.tax_amount);
    }

    #[test]
    fn test_tax_is_not_the_sum_of_line_taxes() {
        // Each line taxes 0.05 × 0.15 = 0.0075 → 0.01; three lines sum to 0.03.
        // The quotation taxes 0.15 × 0.15 = 0.0225 → 0.02.
        let inputs: Vec<LineInput> = (0..3)
            .map(|_| LineInput::new(UnitType::Pieces, dec!(0.05)))
            .collect();
        let results: Vec<_> = inputs.iter().map(|i| compute_line(i).unwrap()).collect();
        let summed_line_tax: Decimal = results.iter().map(|r| r.tax_amount).sum();

        let lines: Vec<QuotationLine> = results.iter().map(QuotationLine::from).collect();
        let totals = compute_quotation_totals(&lines, &Discount::none(), dec!(0.15)).unwrap();

        assert_eq!(summed_line_tax, dec!(0.03));
        assert_eq!(totals.tax_amount, dec!(0.02));
        assert_eq!(totals.grand_total, dec!(0.17));
    }

    #[test]
    fn test_negative_tax_rate_is_rejected() {
        let err = compute_quotation_totals(&[], &Discount::none(), dec!(-0.01)).unwrap_err();
        assert_eq!(err, CoreError::InvalidTaxRate { rate: dec!(-0.01) });
    }

    #[test]
    fn test_negative_header_discount_is_rejected() {
        let err = compute_quotation_totals(&[], &Discount::fixed(dec!(-10)), dec!(0.15))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDiscount(_)));
    }

    #[test]
    fn test_tax_beyond_28_places_fails_instead_of_rounding() {
        let lines = [QuotationLine::new(dec!(0.01), Decimal::ZERO)];
        let rate = dec!(0.0000000000000000000000000001);
        let err = compute_quotation_totals(&lines, &Discount::none(), rate).unwrap_err();
        assert_eq!(err, CoreError::ArithmeticOverflow { operation: "quotation tax" });
    }

    fn arb_line() -> impl Strategy<Value = QuotationLine> {
        (0i64..100_000_000, 0i64..1_000_000).prop_map(|(ex, disc)| {
            QuotationLine::new(Decimal::new(ex, 2), Decimal::new(disc, 2))
        })
    }

    fn arb_header() -> impl Strategy<Value = Discount> {
        prop_oneof![
            (0i64..=10_000).prop_map(|v| Discount::percent(Decimal::new(v, 2))),
            (0i64..=100_000_000).prop_map(|v| Discount::fixed(Decimal::new(v, 2))),
        ]
    }

    proptest! {
        #[test]
        fn prop_permutation_does_not_change_totals(
            (lines, shuffled) in prop::collection::vec(arb_line(), 0..20)
                .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
            header in arb_header(),
            rate_bps in 0i64..3_000,
        ) {
            let rate = Decimal::new(rate_bps, 4);
            let original = compute_quotation_totals(&lines, &header, rate).unwrap();
            let permuted = compute_quotation_totals(&shuffled, &header, rate).unwrap();
            prop_assert_eq!(original, permuted);
        }

        #[test]
        fn prop_discounted_subtotal_never_negative(
            lines in prop::collection::vec(arb_line(), 0..10),
            header in arb_header(),
        ) {
            let totals = compute_quotation_totals(&lines, &header, dec!(0.15)).unwrap();
            prop_assert!(totals.discounted_subtotal >= Decimal::ZERO);
            prop_assert!(totals.grand_total >= totals.discounted_subtotal);
            prop_assert_eq!(totals.grand_total, totals.discounted_subtotal + totals.tax_amount);
        }
    }
}
