//! Fixed-precision money and quantity arithmetic.
//!
//! Every monetary value in the engine is a `rust_decimal::Decimal` and every
//! arithmetic step on money goes through these helpers, which round to 2
//! decimal places (midpoint away from zero). Nothing else in the crate may
//! apply raw `+`/`*` to currency fields.

use rust_decimal::{Decimal, RoundingStrategy};

/// Minor-unit precision for currency values.
pub const MONEY_SCALE: u32 = 2;

fn round(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

pub fn add(a: Decimal, b: Decimal) -> Decimal {
    round(a + b)
}

pub fn sub(a: Decimal, b: Decimal) -> Decimal {
    round(a - b)
}

pub fn multiply(a: Decimal, b: Decimal) -> Decimal {
    round(a * b)
}

/// `rate` is a percentage in `[0, 100]`.
pub fn percent(amount: Decimal, rate: Decimal) -> Decimal {
    round(amount * rate / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn tenth_plus_two_tenths_is_exact() {
        assert_eq!(add(dec("0.1"), dec("0.2")), dec("0.3"));
    }

    #[test]
    fn add_sub_round_trip() {
        for (a, b) in [
            ("19.99", "0.01"),
            ("100.00", "33.33"),
            ("0.10", "0.20"),
            ("123456.78", "0.99"),
        ] {
            let (a, b) = (dec(a), dec(b));
            assert_eq!(sub(add(a, b), b), a);
        }
    }

    #[test]
    fn multiply_rounds_to_cents() {
        assert_eq!(multiply(dec("3"), dec("0.333")), dec("1.00"));
        assert_eq!(multiply(dec("2"), dec("50")), dec("100.00"));
    }

    #[test]
    fn percent_of_subtotal() {
        assert_eq!(percent(dec("100"), dec("10")), dec("10.00"));
        assert_eq!(percent(dec("99.99"), dec("18")), dec("18.00"));
        assert_eq!(percent(dec("100"), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn midpoint_rounds_away_from_zero() {
        assert_eq!(multiply(dec("0.5"), dec("0.05")), dec("0.03"));
    }
}
