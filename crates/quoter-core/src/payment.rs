//! # Payment Summary
//!
//! Paid-versus-owed figures for a quotation.
//!
//! A quotation can collect any number of payments. The balance is simply
//! `grand_total − Σ payments`; it goes negative when the customer overpays
//! (a credit), and that is reported as-is rather than clamped.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::rounding::{exact_add, exact_sub, round_money};
use crate::types::Payment;

/// What has been paid against a quotation and what remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentSummary {
    #[ts(as = "String")]
    pub grand_total: Decimal,
    #[ts(as = "String")]
    pub paid_total: Decimal,
    /// Negative when overpaid.
    #[ts(as = "String")]
    pub balance: Decimal,
}

impl PaymentSummary {
    /// Sums `amounts` against `grand_total`.
    ///
    /// ## Example
    /// ```rust
    /// use quoter_core::PaymentSummary;
    /// use rust_decimal::Decimal;
    ///
    /// let summary = PaymentSummary::from_amounts(
    ///     Decimal::new(214245, 2),
    ///     [Decimal::new(100000, 2), Decimal::new(50000, 2)],
    /// )
    /// .unwrap();
    /// assert_eq!(summary.balance.to_string(), "642.45");
    /// ```
    pub fn from_amounts<I>(grand_total: Decimal, amounts: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = Decimal>,
    {
        let paid_total = amounts.into_iter().try_fold(Decimal::ZERO, |acc, a| {
            exact_add(acc, a).ok_or(CoreError::overflow("payment sum"))
        })?;

        let balance =
            exact_sub(grand_total, paid_total).ok_or(CoreError::overflow("payment balance"))?;

        Ok(PaymentSummary {
            grand_total: round_money(grand_total),
            paid_total: round_money(paid_total),
            balance: round_money(balance),
        })
    }

    /// Sums the amounts of `payments` against `grand_total`.
    pub fn from_payments(grand_total: Decimal, payments: &[Payment]) -> CoreResult<Self> {
        Self::from_amounts(grand_total, payments.iter().map(|p| p.amount))
    }

    /// True once nothing is left to pay.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.balance <= Decimal::ZERO
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
