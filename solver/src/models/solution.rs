//! The result of a token-pair solve.

use crate::models::{Order, TokenId};
use num::BigInt;
use std::collections::BTreeMap;

/// token => integer clearing price. The fee token always has the fixed
/// price `Config::fee_token_price`.
pub type Prices = BTreeMap<TokenId, BigInt>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Solution {
    /// All orders considered by the solve, with their executed amounts;
    /// untouched orders carry zero amounts and are dropped on output.
    pub orders: Vec<Order>,
    pub prices: Prices,
}

impl Solution {
    /// The trivial solution: no orders, no prices. Always feasible.
    pub fn trivial() -> Self {
        Solution::default()
    }

    /// Returns true if the solution executes at least one order.
    pub fn is_non_trivial(&self) -> bool {
        self.orders.iter().any(Order::is_executed)
    }
}
