//! Fixed-point money arithmetic
//!
//! All monetary values are scale-2 decimals. Every intermediate result is
//! rounded with banker's rounding (midpoint-nearest-even) before it is
//! stored or compared, so repeated settle/refund cycles cannot drift.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round to two fractional digits, banker's rounding.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Round to an integer and return the i64 value.
///
/// Used for reputation-score deltas. Unlike monetary stores, score deltas
/// round midpoints away from zero, so `round0(2.5) == 3`.
pub fn round0(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Split an order amount into `(fee, merchant_amount)`.
///
/// `fee = round2(amount × fee_rate)`; the merchant receives the remainder.
pub fn split_fee(amount: Decimal, fee_rate: Decimal) -> (Decimal, Decimal) {
    let fee = round2(amount * fee_rate);
    (fee, amount - fee)
}

/// Format an amount as a scale-2 string (`"%.2f"`), the wire format of the
/// merchant callback's `money` parameter.
pub fn money_string(value: Decimal) -> String {
    format!("{:.2}", value.trunc_with_scale(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round2_bankers() {
        assert_eq!(round2(dec!(1.005)), dec!(1.00));
        assert_eq!(round2(dec!(1.015)), dec!(1.02));
        assert_eq!(round2(dec!(1.025)), dec!(1.02));
        assert_eq!(round2(dec!(2.675)), dec!(2.68));
    }

    #[test]
    fn test_round0() {
        assert_eq!(round0(dec!(50)), 50);
        assert_eq!(round0(dec!(2.5)), 3);
        assert_eq!(round0(dec!(3.5)), 4);
        assert_eq!(round0(dec!(2.49)), 2);
        assert_eq!(round0(dec!(-1.5)), -2);
    }

    #[test]
    fn test_split_fee() {
        // 50.00 at 3% -> fee 1.50, merchant 48.50
        let (fee, merchant) = split_fee(dec!(50.00), dec!(0.03));
        assert_eq!(fee, dec!(1.50));
        assert_eq!(merchant, dec!(48.50));

        // zero rate keeps the full amount
        let (fee, merchant) = split_fee(dec!(10.00), dec!(0));
        assert_eq!(fee, dec!(0.00));
        assert_eq!(merchant, dec!(10.00));
    }

    #[test]
    fn test_fee_plus_merchant_is_amount() {
        let amount = dec!(33.33);
        let (fee, merchant) = split_fee(amount, dec!(0.07));
        assert_eq!(fee + merchant, amount);
        assert!(fee >= Decimal::ZERO);
    }

    #[test]
    fn test_money_string() {
        assert_eq!(money_string(dec!(50)), "50.00");
        assert_eq!(money_string(dec!(48.5)), "48.50");
        assert_eq!(money_string(dec!(0.1)), "0.10");
    }
}
