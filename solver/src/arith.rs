//! Alternative-arithmetic order utility functions.
//!
//! The same utility formulas exist in two renditions: exact rational
//! arithmetic, used while optimizing, and integer-truncating arithmetic
//! matching the smart contract, used for scoring and for the final rounded
//! amounts. Call sites select the rendition by type parameter, so the hot
//! loops monomorphize and pay nothing for the abstraction.
//!
//! `xrate` and `max_xrate` are in `sell_token / buy_token` units throughout.

use crate::models::{Fee, Order};
use num::{BigRational, One, Zero};

pub trait Arithmetic {
    /// The sell amount implied by a buy amount at the given exchange rate,
    /// fee included.
    fn sell_from_buy(
        buy_amount: &BigRational,
        xrate: &BigRational,
        buy_token_price: &BigRational,
        fee: &Fee,
    ) -> BigRational;

    /// The utility `u` of an order at its current executed buy amount.
    fn utility_term(
        order: &Order,
        xrate: &BigRational,
        buy_token_price: &BigRational,
        fee: &Fee,
    ) -> BigRational;

    /// The maximum utility `u_max` the order could achieve;
    /// `balance_updated` is the account's remaining sell-token balance after
    /// trade execution (only the smart-contract rendition looks at it).
    fn max_utility_term(
        order: &Order,
        xrate: &BigRational,
        buy_token_price: &BigRational,
        fee: &Fee,
        balance_updated: &BigRational,
    ) -> BigRational;

    /// The order's contribution to the objective, `2u - u_max`.
    fn objective_term(
        order: &Order,
        xrate: &BigRational,
        buy_token_price: &BigRational,
        fee: &Fee,
        balance_updated: &BigRational,
    ) -> BigRational {
        let u = Self::utility_term(order, xrate, buy_token_price, fee);
        let umax = Self::max_utility_term(order, xrate, buy_token_price, fee, balance_updated);
        BigRational::from_integer(2.into()) * u - umax
    }
}

/// Exact rational arithmetic.
pub struct Rational;

impl Rational {
    fn utility_at(
        order: &Order,
        buy_amount: &BigRational,
        xrate: &BigRational,
        buy_token_price: &BigRational,
        fee: &Fee,
    ) -> BigRational {
        let sell_amount = Self::sell_from_buy(buy_amount, xrate, buy_token_price, fee);
        buy_token_price * (buy_amount - sell_amount / order.max_xrate())
    }
}

impl Arithmetic for Rational {
    fn sell_from_buy(
        buy_amount: &BigRational,
        xrate: &BigRational,
        _buy_token_price: &BigRational,
        fee: &Fee,
    ) -> BigRational {
        buy_amount * xrate / fee.factor()
    }

    fn utility_term(
        order: &Order,
        xrate: &BigRational,
        buy_token_price: &BigRational,
        fee: &Fee,
    ) -> BigRational {
        Self::utility_at(order, &order.buy_amount, xrate, buy_token_price, fee)
    }

    fn max_utility_term(
        order: &Order,
        xrate: &BigRational,
        buy_token_price: &BigRational,
        fee: &Fee,
        _balance_updated: &BigRational,
    ) -> BigRational {
        // The buy amount whose implied sell amount exactly saturates
        // max_sell_amount; also the zero-rounding limit of the integer
        // formula below.
        let min_buy_amount = order.max_sell_amount() * fee.factor() / xrate;
        Self::utility_at(order, &min_buy_amount, xrate, buy_token_price, fee)
            .max(BigRational::zero())
    }
}

/// Integer-truncating arithmetic following the smart contract semantics.
///
/// Requires integral token prices: `buy_token_price` and
/// `buy_token_price / xrate` must both have denominator one.
pub struct SmartContract;

impl SmartContract {
    /// The extra utility the order could have achieved had the remaining
    /// account balance not constrained it.
    pub fn disregarded_utility_term(
        order: &Order,
        xrate: &BigRational,
        buy_token_price: &BigRational,
        fee: &Fee,
        balance_updated: &BigRational,
    ) -> BigRational {
        let max_sell_amount = order.original_max_sell_amount();
        if max_sell_amount.is_zero() {
            return BigRational::zero();
        }
        let min_buy_amount = max_sell_amount / order.max_xrate();
        let fee_denom = BigRational::from_integer(fee.ratio.denom().clone());
        debug_assert!(fee_denom > BigRational::one());
        let sell_token_price = buy_token_price / xrate;
        let sell_amount =
            Self::sell_from_buy(&order.buy_amount, xrate, buy_token_price, fee);

        let remaining_amount = max_sell_amount - sell_amount;
        let leftover_sell_amount = remaining_amount.min(balance_updated.clone());

        let limit_term_left = &sell_token_price * max_sell_amount;
        let limit_term_right = (min_buy_amount * buy_token_price * &fee_denom
            / (fee_denom - BigRational::one()))
        .floor();
        let limit_term = (limit_term_left - limit_term_right).max(BigRational::zero());

        (leftover_sell_amount * limit_term / max_sell_amount).floor()
    }
}

impl Arithmetic for SmartContract {
    fn sell_from_buy(
        buy_amount: &BigRational,
        xrate: &BigRational,
        buy_token_price: &BigRational,
        fee: &Fee,
    ) -> BigRational {
        debug_assert!(buy_token_price.is_integer());
        let sell_token_price = buy_token_price / xrate;
        debug_assert!(sell_token_price.is_integer());
        ((buy_amount * buy_token_price / fee.factor()).floor() / sell_token_price).floor()
    }

    fn utility_term(
        order: &Order,
        xrate: &BigRational,
        buy_token_price: &BigRational,
        fee: &Fee,
    ) -> BigRational {
        let max_sell_amount = order.original_max_sell_amount();
        if max_sell_amount.is_zero() {
            return BigRational::zero();
        }
        let min_buy_amount = max_sell_amount / order.max_xrate();
        debug_assert!(min_buy_amount.is_integer());
        let sell_amount =
            Self::sell_from_buy(&order.buy_amount, xrate, buy_token_price, fee);

        let a = sell_amount * min_buy_amount;
        let a_quot = (&a / max_sell_amount).floor();
        let a_rem = &a - &a_quot * max_sell_amount;
        let rounded_utility = (&order.buy_amount - a_quot) * buy_token_price;
        let utility_error = (a_rem * buy_token_price / max_sell_amount).floor();
        rounded_utility - utility_error
    }

    fn max_utility_term(
        order: &Order,
        xrate: &BigRational,
        buy_token_price: &BigRational,
        fee: &Fee,
        balance_updated: &BigRational,
    ) -> BigRational {
        Self::disregarded_utility_term(order, xrate, buy_token_price, fee, balance_updated)
            + Self::utility_term(order, xrate, buy_token_price, fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::test_util::order;
    use num::BigInt;

    fn fee() -> Fee {
        Fee {
            token: "F".into(),
            ratio: BigRational::new(1.into(), 1000.into()),
        }
    }

    fn rat(numer: i128, denom: i128) -> BigRational {
        BigRational::new(BigInt::from(numer), BigInt::from(denom))
    }

    #[test]
    fn rational_utility_is_price_weighted_surplus() {
        // Order buying T0 for T1 at up to 2 T1 per T0, rate 3/2.
        let mut order = order(0, "T0", "T1", 200_000, (2, 1));
        order.buy_amount = rat(10_000, 1);

        let xrate = rat(3, 2);
        let price = rat(1, 1);
        let sell = Rational::sell_from_buy(&order.buy_amount, &xrate, &price, &fee());
        assert_eq!(sell, rat(10_000, 1) * rat(3, 2) / rat(999, 1000));

        let utility = Rational::utility_term(&order, &xrate, &price, &fee());
        assert_eq!(utility, &order.buy_amount - sell / rat(2, 1));
    }

    #[test]
    fn rational_max_utility_saturates_max_sell_amount() {
        let order = order(0, "T0", "T1", 200_000, (2, 1));
        let xrate = rat(3, 2);
        let min_buy = rat(200_000, 1) * rat(999, 1000) / rat(3, 2);
        let sell = Rational::sell_from_buy(&min_buy, &xrate, &rat(1, 1), &fee());
        // Exactly the full max sell amount is consumed.
        assert_eq!(sell, rat(200_000, 1));
    }

    #[test]
    fn rational_max_utility_is_never_negative() {
        let order = order(0, "T0", "T1", 200_000, (2, 1));
        // A rate worse than the limit yields zero, not negative, utility.
        let xrate = rat(5, 2);
        let umax = Rational::max_utility_term(
            &order,
            &xrate,
            &rat(1, 1),
            &fee(),
            &BigRational::zero(),
        );
        assert_eq!(umax, BigRational::zero());
    }

    #[test]
    fn contract_sell_amount_truncates_like_the_chain() {
        // 20000 * 1000000 / 0.999 = 20020020020.02..., floored then divided
        // by the sell price 500000 and floored again.
        let xrate = rat(2, 1);
        let price = rat(1_000_000, 1);
        let sell = SmartContract::sell_from_buy(&rat(20_000, 1), &xrate, &price, &fee());
        assert_eq!(sell, rat(40_040, 1));
    }

    #[test]
    fn contract_and_rational_sell_agree_in_the_limit() {
        // The integer formula stays within two units below the rational one.
        let xrate = rat(2, 1);
        let price = rat(1_000_000, 1);
        let buy = rat(12_345, 1);
        let rational = Rational::sell_from_buy(&buy, &xrate, &price, &fee());
        let integer = SmartContract::sell_from_buy(&buy, &xrate, &price, &fee());
        assert!(&integer <= &rational && &rational - &integer < rat(2, 1));
    }

    #[test]
    fn contract_utility_matches_hand_computation() {
        // max_sell = 20000, max_xrate = 2 => min_buy = 10000.
        let mut order = order(0, "T0", "T1", 20_000, (2, 1));
        order.buy_amount = rat(10_000, 1);
        let xrate = rat(2, 1);
        let price = rat(1_000_000, 1);

        let sell = SmartContract::sell_from_buy(&order.buy_amount, &xrate, &price, &fee());
        assert_eq!(sell, rat(20_020, 1));

        // a = 20020 * 10000; a / 20000 = 10010 exactly, no error term.
        let utility = SmartContract::utility_term(&order, &xrate, &price, &fee());
        assert_eq!(utility, (rat(10_000, 1) - rat(10_010, 1)) * price);
    }

    #[test]
    fn disregarded_utility_is_zero_without_leftover_balance() {
        let mut order = order(0, "T0", "T1", 20_000, (4, 1));
        order.buy_amount = rat(5_000, 1);
        let du = SmartContract::disregarded_utility_term(
            &order,
            &rat(2, 1),
            &rat(1_000_000, 1),
            &fee(),
            &BigRational::zero(),
        );
        assert_eq!(du, BigRational::zero());
    }

    #[test]
    fn disregarded_utility_counts_leftover_balance() {
        // Order could still sell 10000 more and the balance allows it; the
        // limit leaves room at this rate, so some utility was disregarded.
        let mut order = order(0, "T0", "T1", 20_000, (4, 1));
        order.buy_amount = rat(5_000, 1);
        let du = SmartContract::disregarded_utility_term(
            &order,
            &rat(2, 1),
            &rat(1_000_000, 1),
            &fee(),
            &rat(1_000_000_000, 1),
        );
        assert!(du > BigRational::zero());
        let umax = SmartContract::max_utility_term(
            &order,
            &rat(2, 1),
            &rat(1_000_000, 1),
            &fee(),
            &rat(1_000_000_000, 1),
        );
        let u = SmartContract::utility_term(&order, &rat(2, 1), &rat(1_000_000, 1), &fee());
        assert_eq!(umax, du + u);
    }
}
