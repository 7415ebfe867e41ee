//! Final solution validator. Any violation found here is a programmer
//! error: the solve is aborted instead of degrading to the trivial
//! solution.

use crate::config::Config;
use crate::models::{AccountState, Fee, Order, Prices, TokenId};
use crate::orderbook::count_nr_exec_orders;
use anyhow::{ensure, Result};
use num::{BigInt, BigRational, Signed, Zero};
use std::collections::BTreeMap;

fn validate_order_constraints(order: &Order, config: &Config) -> Result<()> {
    let buy_amount = &order.buy_amount;
    let sell_amount = &order.sell_amount;

    // Limit exchange rate constraint.
    ensure!(
        buy_amount.is_zero() || &(sell_amount / buy_amount) <= order.max_xrate(),
        "order {:?} violates its limit exchange rate",
        order.index,
    );

    // Maximum sell amount constraint.
    ensure!(
        sell_amount <= order.max_sell_amount(),
        "order {:?} exceeds its maximum sell amount",
        order.index,
    );

    // Minimum tradable amount constraint.
    let min_tradable = BigRational::from_integer(config.min_tradable_amount.clone());
    ensure!(
        buy_amount.is_zero() || buy_amount >= &min_tradable,
        "order {:?} buys less than the minimum tradable amount",
        order.index,
    );
    ensure!(
        sell_amount.is_zero() || sell_amount >= &min_tradable,
        "order {:?} sells less than the minimum tradable amount",
        order.index,
    );

    Ok(())
}

/// Validates a complete solution: integral positive prices, per-order
/// constraints, token balances, the average-fee constraint and non-negative
/// post-trade account balances.
pub fn validate(
    accounts: &AccountState,
    orders: &[Order],
    prices: &Prices,
    fee: &Fee,
    config: &Config,
) -> Result<()> {
    ensure!(
        prices.values().all(|price| price > &BigInt::zero()),
        "price vector contains non-positive prices",
    );

    let nr_exec_orders = count_nr_exec_orders(orders);
    if nr_exec_orders == 0 {
        return Ok(());
    }

    // Maximum number of executed orders constraint.
    ensure!(
        nr_exec_orders <= config.max_nr_exec_orders,
        "solution touches {} orders, more than the maximum of {}",
        nr_exec_orders,
        config.max_nr_exec_orders,
    );

    let mut token_balances: BTreeMap<TokenId, BigRational> = prices
        .keys()
        .map(|token| (token.clone(), BigRational::zero()))
        .collect();
    let mut account_balances: BTreeMap<(String, TokenId), BigRational> = BTreeMap::new();

    for order in orders {
        validate_order_constraints(order, config)?;

        if let Some(balance) = token_balances.get_mut(&order.buy_token) {
            *balance -= &order.buy_amount;
        }
        if let Some(balance) = token_balances.get_mut(&order.sell_token) {
            *balance += &order.sell_amount;
        }

        if let Some(account_id) = &order.account_id {
            for token in &[&order.buy_token, &order.sell_token] {
                account_balances
                    .entry((account_id.clone(), (*token).clone()))
                    .or_insert_with(|| {
                        BigRational::from_integer(accounts.read_balance(account_id, token))
                    });
            }
            *account_balances
                .get_mut(&(account_id.clone(), order.buy_token.clone()))
                .unwrap() += &order.buy_amount;
            *account_balances
                .get_mut(&(account_id.clone(), order.sell_token.clone()))
                .unwrap() -= &order.sell_amount;
        }
    }

    // Token balance constraint: the fee token may only be over-sold, every
    // other token must net out exactly.
    for (token, balance) in &token_balances {
        if token == &fee.token {
            ensure!(
                !balance.is_negative(),
                "fee token nets to a negative amount",
            );
        } else {
            ensure!(balance.is_zero(), "token {} does not net to zero", token);
        }
    }

    // Economic viability constraint.
    let total_fees = token_balances
        .get(&fee.token)
        .cloned()
        .unwrap_or_else(BigRational::zero);
    ensure!(
        total_fees / BigRational::from_integer(nr_exec_orders.into())
            >= BigRational::from_integer(config.min_average_order_fee.clone()),
        "average fee per order below the minimum",
    );

    // Account balance constraint.
    for ((account_id, token), balance) in &account_balances {
        ensure!(
            !balance.is_negative(),
            "account {} ends up with a negative balance of {}",
            account_id,
            token,
        );
    }

    Ok(())
}
