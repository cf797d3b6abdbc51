//! Fixed-precision monetary arithmetic.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every amount is a `rust_decimal::Decimal` held at [`MONEY_SCALE`] places.
//! Splits always hand the rounding remainder to the LAST share, so the parts
//! of a split sum exactly to the whole (no cents created or lost).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::accounts::error::AccountsError;

/// Number of decimal places kept for stored amounts.
pub const MONEY_SCALE: u32 = 2;

/// Exclusive upper bound of a stored amount; `NUMERIC(19, 2)` keeps 17
/// integer digits. Sums of a handful of bounded amounts stay far below
/// `Decimal::MAX`.
pub const AMOUNT_LIMIT: Decimal = Decimal::from_parts(1_569_325_056, 23_283_064, 0, false, 0);

/// Rounds an amount to the money scale using banker's rounding.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

fn truncate_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero)
}

fn too_large(name: &str) -> AccountsError {
    AccountsError::validation(format!("{name} exceeds the largest storable amount"))
}

/// Fails when `amount` cannot be stored in an amount column.
///
/// # Errors
///
/// `Validation` naming the offending amount.
pub fn ensure_storable(name: &str, amount: Decimal) -> Result<Decimal, AccountsError> {
    if amount.abs() >= AMOUNT_LIMIT {
        return Err(too_large(name));
    }
    Ok(amount)
}

/// `a + b`, failing with `Validation` instead of overflowing.
///
/// # Errors
///
/// `Validation` when the sum is not storable.
pub fn checked_sum(name: &str, a: Decimal, b: Decimal) -> Result<Decimal, AccountsError> {
    let sum = a.checked_add(b).ok_or_else(|| too_large(name))?;
    ensure_storable(name, sum)
}

/// Rounds a caller-supplied amount and checks it is non-negative and storable.
///
/// # Errors
///
/// `Validation` naming the offending amount.
pub fn parse_amount(name: &str, amount: Decimal) -> Result<Decimal, AccountsError> {
    let rounded = round_money(amount);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        return Err(AccountsError::validation(format!(
            "{name} cannot be negative"
        )));
    }
    ensure_storable(name, rounded)
}

/// Returns true when `amount` is above `limit` by more than `tolerance`.
#[must_use]
pub fn exceeds_with_tolerance(amount: Decimal, limit: Decimal, tolerance: Decimal) -> bool {
    amount > limit + tolerance
}

/// The amount components fixed at creation time.
///
/// `net = original - discount + interest + fine`, never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountBreakdown {
    /// Face value of the document.
    pub original: Decimal,
    /// Discount granted at creation.
    pub discount: Decimal,
    /// Interest charged at creation.
    pub interest: Decimal,
    /// Fine charged at creation.
    pub fine: Decimal,
}

impl AmountBreakdown {
    /// Validates and rounds the components.
    ///
    /// # Errors
    ///
    /// `Validation` if any component is negative or too large, the original
    /// amount is not positive, or the resulting net amount would be negative.
    pub fn new(
        original: Decimal,
        discount: Decimal,
        interest: Decimal,
        fine: Decimal,
    ) -> Result<Self, AccountsError> {
        let breakdown = Self {
            original: parse_amount("original amount", original)?,
            discount: parse_amount("discount amount", discount)?,
            interest: parse_amount("interest amount", interest)?,
            fine: parse_amount("fine amount", fine)?,
        };
        ensure_storable("net amount", breakdown.net())?;

        if breakdown.original.is_zero() {
            return Err(AccountsError::validation("original amount must be positive"));
        }
        if breakdown.net().is_sign_negative() && !breakdown.net().is_zero() {
            return Err(AccountsError::validation(format!(
                "net amount cannot be negative (discount {} exceeds original plus charges)",
                breakdown.discount
            )));
        }

        Ok(breakdown)
    }

    /// The net amount derived from the components.
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.original - self.discount + self.interest + self.fine
    }
}

/// Payment-time adjustments. They raise or lower the effective due amount of
/// a payment event without ever touching the record's net amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustments {
    /// Additional interest charged at payment time.
    pub interest: Decimal,
    /// Additional fine charged at payment time.
    pub fine: Decimal,
    /// Additional discount granted at payment time.
    pub discount: Decimal,
}

impl Adjustments {
    /// Validates and rounds the adjustments; absent values count as zero.
    ///
    /// # Errors
    ///
    /// `Validation` if any adjustment is negative or too large.
    pub fn new(
        interest: Option<Decimal>,
        fine: Option<Decimal>,
        discount: Option<Decimal>,
    ) -> Result<Self, AccountsError> {
        Ok(Self {
            interest: parse_amount("additional interest", interest.unwrap_or_default())?,
            fine: parse_amount("additional fine", fine.unwrap_or_default())?,
            discount: parse_amount("additional discount", discount.unwrap_or_default())?,
        })
    }

    /// Signed effect on the amount due: `interest + fine - discount`.
    #[must_use]
    pub fn net_effect(&self) -> Decimal {
        self.interest + self.fine - self.discount
    }

    /// Running total after applying `other` on top of `self`.
    ///
    /// # Errors
    ///
    /// `Validation` when a running total is no longer storable.
    pub fn accumulate(&self, other: &Self) -> Result<Self, AccountsError> {
        Ok(Self {
            interest: checked_sum("accumulated interest", self.interest, other.interest)?,
            fine: checked_sum("accumulated fine", self.fine, other.fine)?,
            discount: checked_sum("accumulated discount", self.discount, other.discount)?,
        })
    }
}

/// Splits `total` into `count` shares truncated to the money scale; the last
/// share absorbs the remainder so the shares sum exactly to the rounded total.
///
/// ```
/// use rust_decimal_macros::dec;
/// use ledgerly_core::accounts::money::split_with_last_remainder;
///
/// assert_eq!(
///     split_with_last_remainder(dec!(100), 3),
///     vec![dec!(33.33), dec!(33.33), dec!(33.34)]
/// );
/// ```
#[must_use]
pub fn split_with_last_remainder(total: Decimal, count: u32) -> Vec<Decimal> {
    if count == 0 {
        return vec![];
    }
    let total = round_money(total);
    let base = truncate_money(total / Decimal::from(count));
    let head = base * Decimal::from(count - 1);

    (0..count)
        .map(|i| if i + 1 == count { total - head } else { base })
        .collect()
}

/// Rounds each exact amount to the money scale, except the last one which
/// takes whatever makes the parts sum to the rounded exact total.
#[must_use]
pub fn round_with_last_remainder(exact: &[Decimal]) -> Vec<Decimal> {
    let Some((_, head)) = exact.split_last() else {
        return vec![];
    };
    let target = round_money(exact.iter().copied().sum());
    let mut rounded: Vec<Decimal> = head.iter().map(|a| round_money(*a)).collect();
    let head_sum: Decimal = rounded.iter().copied().sum();
    rounded.push(target - head_sum);
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_bankers() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.00));
        assert_eq!(round_money(dec!(1.015)), dec!(1.02));
        assert_eq!(round_money(dec!(2.499)), dec!(2.50));
    }

    #[test]
    fn test_breakdown_net() {
        let amounts = AmountBreakdown::new(dec!(1000), dec!(50), dec!(20), dec!(10)).unwrap();
        assert_eq!(amounts.net(), dec!(980));
    }

    #[test]
    fn test_amount_limit_is_column_capacity() {
        assert_eq!(AMOUNT_LIMIT, Decimal::from(100_000_000_000_000_000_i64));
    }

    #[test]
    fn test_breakdown_accepts_largest_storable_amount() {
        let largest = AMOUNT_LIMIT - dec!(0.01);
        let amounts = AmountBreakdown::new(largest, dec!(0), dec!(0), dec!(0)).unwrap();
        assert_eq!(amounts.net(), largest);
    }

    #[test]
    fn test_breakdown_rejects_unstorable_amounts() {
        let result = AmountBreakdown::new(AMOUNT_LIMIT, dec!(0), dec!(0), dec!(0));
        assert!(matches!(result, Err(AccountsError::Validation(msg)) if msg.contains("original")));

        let result = AmountBreakdown::new(Decimal::MAX, dec!(0), Decimal::MAX, dec!(0));
        assert!(matches!(result, Err(AccountsError::Validation(_))));
    }

    #[test]
    fn test_breakdown_rejects_net_above_limit() {
        let half = AMOUNT_LIMIT / dec!(2);
        let result = AmountBreakdown::new(half, dec!(0), half, dec!(1));
        assert!(matches!(result, Err(AccountsError::Validation(msg)) if msg.contains("net amount")));
    }

    #[test]
    fn test_breakdown_rejects_negative_component() {
        let result = AmountBreakdown::new(dec!(100), dec!(-1), dec!(0), dec!(0));
        assert!(matches!(result, Err(AccountsError::Validation(msg)) if msg.contains("discount")));
    }

    #[test]
    fn test_breakdown_rejects_zero_original() {
        assert!(AmountBreakdown::new(dec!(0), dec!(0), dec!(0), dec!(0)).is_err());
    }

    #[test]
    fn test_breakdown_rejects_negative_net() {
        let result = AmountBreakdown::new(dec!(100), dec!(150), dec!(10), dec!(0));
        assert!(matches!(result, Err(AccountsError::Validation(_))));
    }

    #[test]
    fn test_breakdown_allows_zero_net() {
        let amounts = AmountBreakdown::new(dec!(100), dec!(100), dec!(0), dec!(0)).unwrap();
        assert_eq!(amounts.net(), dec!(0));
    }

    #[test]
    fn test_adjustments_net_effect_and_accumulate() {
        let first = Adjustments::new(Some(dec!(10)), Some(dec!(5)), None).unwrap();
        let second = Adjustments::new(None, None, Some(dec!(3))).unwrap();
        assert_eq!(first.net_effect(), dec!(15));
        assert_eq!(first.accumulate(&second).unwrap().net_effect(), dec!(12));
    }

    #[test]
    fn test_adjustments_reject_negative_and_unstorable() {
        assert!(Adjustments::new(Some(dec!(-0.01)), None, None).is_err());
        assert!(Adjustments::new(None, Some(Decimal::MAX), None).is_err());
    }

    #[test]
    fn test_accumulate_stops_at_limit() {
        let large = Adjustments::new(Some(AMOUNT_LIMIT - dec!(1)), None, None).unwrap();
        let result = large.accumulate(&large);
        assert!(matches!(result, Err(AccountsError::Validation(_))));
    }

    #[test]
    fn test_checked_sum_never_panics() {
        assert_eq!(checked_sum("total", dec!(1.50), dec!(2.25)).unwrap(), dec!(3.75));
        assert!(checked_sum("total", Decimal::MAX, Decimal::MAX).is_err());
    }

    #[test]
    fn test_split_even() {
        assert_eq!(
            split_with_last_remainder(dec!(300.00), 3),
            vec![dec!(100.00), dec!(100.00), dec!(100.00)]
        );
    }

    #[test]
    fn test_split_remainder_goes_last() {
        let shares = split_with_last_remainder(dec!(100.00), 3);
        assert_eq!(shares, vec![dec!(33.33), dec!(33.33), dec!(33.34)]);
        assert_eq!(shares.iter().copied().sum::<Decimal>(), dec!(100.00));
    }

    #[test]
    fn test_split_small_total() {
        let shares = split_with_last_remainder(dec!(0.05), 10);
        assert_eq!(shares.iter().copied().sum::<Decimal>(), dec!(0.05));
        assert_eq!(shares[9], dec!(0.05));
    }

    #[test]
    fn test_split_zero_count() {
        assert!(split_with_last_remainder(dec!(10), 0).is_empty());
    }

    #[test]
    fn test_round_with_last_remainder() {
        let parts = round_with_last_remainder(&[dec!(0.333), dec!(0.333), dec!(0.334)]);
        assert_eq!(parts, vec![dec!(0.33), dec!(0.33), dec!(0.34)]);
        assert!(round_with_last_remainder(&[]).is_empty());
    }

    #[test]
    fn test_exceeds_with_tolerance() {
        assert!(!exceeds_with_tolerance(dec!(100.01), dec!(100), dec!(0.01)));
        assert!(exceeds_with_tolerance(dec!(100.02), dec!(100), dec!(0.01)));
    }
}
