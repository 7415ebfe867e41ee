//! Solver configuration.
//!
//! A `Config` is an immutable snapshot of all tunable constants, captured
//! once at solver entry and threaded through every component. Tests can pass
//! distinct configurations without ordering hazards.

use crate::num::DisplayRatio;
use num::{BigInt, BigRational, One};

#[derive(Clone, Debug)]
pub struct Config {
    /// Minimum amount bought or sold in an executed order.
    pub min_tradable_amount: BigInt,

    /// Price of the fee token (1e18).
    pub fee_token_price: BigInt,

    /// Maximum number of executed orders in a solution.
    pub max_nr_exec_orders: usize,

    /// Minimum average fee paid per executed order on an admissible solution.
    pub min_average_order_fee: BigInt,

    /// Minimum absolute fee paid per executed order on an admissible
    /// solution.
    pub min_absolute_order_fee: BigInt,

    /// The rational solver enforces tradable amounts of at least
    /// `min_tradable_amount * (1 + min_tradable_amount_rounding_tol)` so the
    /// constraint survives rounding the solution to integers.
    pub min_tradable_amount_rounding_tol: BigRational,

    /// Maximum amount, in fee token, that a single order may need to absorb
    /// when the solution is rounded to integers.
    pub max_rounding_volume: BigInt,

    /// Assumed error factor of estimated prices; larger values lead to
    /// larger rounding buffers.
    pub price_estimation_error: u32,

    /// Log rational quantities exactly instead of as floats.
    pub log_rationals: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_tradable_amount: BigInt::from(10_000),
            fee_token_price: BigInt::from(1_000_000_000_000_000_000u64),
            max_nr_exec_orders: 30,
            min_average_order_fee: BigInt::from(0),
            min_absolute_order_fee: BigInt::from(0),
            min_tradable_amount_rounding_tol: BigRational::new(
                BigInt::from(1),
                BigInt::from(1000),
            ),
            max_rounding_volume: BigInt::from(100_000_000_000u64),
            price_estimation_error: 10,
            log_rationals: false,
        }
    }
}

impl Config {
    /// The effective minimum tradable amount during rational execution:
    /// `⌊min_tradable_amount * (1 + tol)⌋`.
    pub fn min_rational_tradable_amount(&self) -> BigInt {
        let min = BigRational::from_integer(self.min_tradable_amount.clone());
        let factor = BigRational::one() + &self.min_tradable_amount_rounding_tol;
        (min * factor).floor().to_integer()
    }

    /// Wraps a rational for logging, honoring the `log_rationals` flag.
    pub fn display_ratio<'a>(&self, ratio: &'a BigRational) -> DisplayRatio<'a> {
        DisplayRatio::new(ratio, self.log_rationals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_min_tradable_amount_includes_tolerance() {
        let config = Config::default();
        assert_eq!(config.min_rational_tradable_amount(), BigInt::from(10_010));
    }

    #[test]
    fn zero_tolerance_keeps_plain_minimum() {
        let config = Config {
            min_tradable_amount_rounding_tol: BigRational::from_integer(0.into()),
            ..Config::default()
        };
        assert_eq!(config.min_rational_tradable_amount(), BigInt::from(10_000));
    }
}
