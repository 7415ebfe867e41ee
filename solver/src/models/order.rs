//! The order entity mutated by the execution and rounding engines.

use crate::arith::Arithmetic;
use crate::models::{AccountId, Fee, Prices, TokenId};
use num::{BigRational, Zero};
use std::fmt;

/// An offer to sell up to `max_sell_amount` units of `sell_token` in
/// exchange for `buy_token`, at a rate no worse than
/// `max_xrate = sell_token / buy_token`.
///
/// Invariants held between engine calls:
/// * `0 <= buy_amount` and `0 <= sell_amount <= max_sell_amount`,
/// * `buy_amount == 0` or `sell_amount / buy_amount <= max_xrate`.
#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    /// Position of the order in the instance; `None` for synthetic orders.
    pub index: Option<usize>,
    pub account_id: Option<AccountId>,
    pub buy_token: TokenId,
    pub sell_token: TokenId,
    max_sell_amount: BigRational,
    original_max_sell_amount: BigRational,
    max_xrate: BigRational,
    pub buy_amount: BigRational,
    pub sell_amount: BigRational,
}

impl Order {
    pub fn new(
        index: Option<usize>,
        account_id: Option<AccountId>,
        buy_token: TokenId,
        sell_token: TokenId,
        max_sell_amount: BigRational,
        max_xrate: BigRational,
    ) -> Self {
        Order {
            index,
            account_id,
            buy_token,
            sell_token,
            original_max_sell_amount: max_sell_amount.clone(),
            max_sell_amount,
            max_xrate,
            buy_amount: BigRational::zero(),
            sell_amount: BigRational::zero(),
        }
    }

    pub fn max_sell_amount(&self) -> &BigRational {
        &self.max_sell_amount
    }

    /// The maximum sell amount as loaded, before balance capping and
    /// rounding buffers; the smart-contract utility formulas are defined in
    /// terms of it.
    pub fn original_max_sell_amount(&self) -> &BigRational {
        &self.original_max_sell_amount
    }

    pub fn max_xrate(&self) -> &BigRational {
        &self.max_xrate
    }

    /// Reduces the maximum sell amount.
    ///
    /// # Panics
    ///
    /// If the new amount exceeds the current one; use
    /// `force_set_max_sell_amount` to restore a buffered amount.
    pub fn set_max_sell_amount(&mut self, amount: BigRational) {
        assert!(amount <= self.max_sell_amount);
        self.max_sell_amount = amount;
    }

    /// Sets the maximum sell amount without the decrease check. Used to
    /// restore the original amount when a rounding-buffer scope ends.
    pub fn force_set_max_sell_amount(&mut self, amount: BigRational) {
        self.max_sell_amount = amount;
    }

    pub fn reset_amounts(&mut self) {
        self.buy_amount = BigRational::zero();
        self.sell_amount = BigRational::zero();
    }

    /// True if the order is touched by the current solution.
    pub fn is_executed(&self) -> bool {
        self.buy_amount > BigRational::zero()
    }

    /// Computes the executed sell amount implied by the executed buy amount
    /// at the uniform clearing prices.
    pub fn sell_amount_from_buy_amount<A: Arithmetic>(
        &self,
        prices: &Prices,
        fee: &Fee,
    ) -> BigRational {
        self.sell_amount_for_buy_amount::<A>(&self.buy_amount, prices, fee)
    }

    /// Same as `sell_amount_from_buy_amount` for a hypothetical buy amount.
    pub fn sell_amount_for_buy_amount<A: Arithmetic>(
        &self,
        buy_amount: &BigRational,
        prices: &Prices,
        fee: &Fee,
    ) -> BigRational {
        match (prices.get(&self.buy_token), prices.get(&self.sell_token)) {
            (Some(buy_token_price), Some(sell_token_price)) => {
                let buy_token_price = BigRational::from_integer(buy_token_price.clone());
                let sell_token_price = BigRational::from_integer(sell_token_price.clone());
                let xrate = &buy_token_price / &sell_token_price;
                A::sell_from_buy(buy_amount, &xrate, &buy_token_price, fee)
            }
            _ => {
                debug_assert!(buy_amount.is_zero());
                BigRational::zero()
            }
        }
    }

    pub fn set_sell_amount_from_buy_amount<A: Arithmetic>(&mut self, prices: &Prices, fee: &Fee) {
        self.sell_amount = self.sell_amount_from_buy_amount::<A>(prices, fee);
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.buy_token, self.sell_token, self.max_sell_amount, self.max_xrate
        )?;
        if self.sell_amount > BigRational::zero() {
            write!(f, " [{}, {}]", self.buy_amount, self.sell_amount)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod test_util {
    use super::*;
    use num::BigInt;

    /// Builds an order the way the unit tests like to write them: integer
    /// max sell amount and a `(numerator, denominator)` limit rate.
    pub fn order(
        index: usize,
        buy_token: &str,
        sell_token: &str,
        max_sell_amount: u128,
        max_xrate: (i64, i64),
    ) -> Order {
        Order::new(
            Some(index),
            Some("A".to_string()),
            buy_token.into(),
            sell_token.into(),
            BigRational::from_integer(BigInt::from(max_sell_amount)),
            BigRational::new(max_xrate.0.into(), max_xrate.1.into()),
        )
    }
}
