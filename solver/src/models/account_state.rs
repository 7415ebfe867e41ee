//! Per-account token balances.

use crate::models::{AccountId, Order, TokenId};
use num::{BigInt, Zero};
use std::collections::BTreeMap;

/// account id => token => balance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccountState(pub BTreeMap<AccountId, BTreeMap<TokenId, BigInt>>);

impl AccountState {
    pub fn read_balance(&self, account_id: &str, token: &TokenId) -> BigInt {
        self.0
            .get(account_id)
            .and_then(|balances| balances.get(token))
            .cloned()
            .unwrap_or_else(BigInt::zero)
    }

    /// Applies an executed order to the account balances: the buy amount is
    /// credited, the sell amount debited. Amounts must already be integral.
    pub fn apply_trade(&mut self, order: &Order) {
        let account_id = match &order.account_id {
            Some(account_id) => account_id.clone(),
            None => return,
        };
        debug_assert!(order.buy_amount.is_integer() && order.sell_amount.is_integer());
        let balances = self.0.entry(account_id).or_default();
        *balances.entry(order.buy_token.clone()).or_default() +=
            order.buy_amount.to_integer();
        *balances.entry(order.sell_token.clone()).or_default() -=
            order.sell_amount.to_integer();
    }

    /// The state after executing all given orders.
    pub fn updated_for<'a>(&self, orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut updated = self.clone();
        for order in orders {
            updated.apply_trade(order);
        }
        updated
    }
}
