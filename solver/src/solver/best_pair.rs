//! Best-token-pair enumeration: solve every eligible pair and keep the one
//! with the highest objective.

use crate::config::Config;
use crate::models::{AccountState, Fee, Order, Solution, TokenId};
use crate::orderbook::{compute_connected_tokens, compute_objective_value};
use anyhow::Result;
use num::{BigRational, Zero};

/// Ordered token pairs `(b_buy_token, s_buy_token)` worth solving: the b
/// token is the fee token itself or is directly bought for fee token, and
/// the s token is neither the b token nor the fee token.
pub fn eligible_token_pairs(orders: &[Order], fee_token: &TokenId) -> Vec<(TokenId, TokenId)> {
    let connected = compute_connected_tokens(orders, fee_token);

    let mut pairs = Vec::new();
    for b_buy_token in &connected {
        let fee_reaches_b = b_buy_token == fee_token
            || orders.iter().any(|order| {
                &order.buy_token == b_buy_token && order.sell_token == *fee_token
            });
        if !fee_reaches_b {
            continue;
        }
        for s_buy_token in &connected {
            if s_buy_token == b_buy_token || s_buy_token == fee_token {
                continue;
            }
            pairs.push((b_buy_token.clone(), s_buy_token.clone()));
        }
    }
    pairs
}

/// Solves one eligible pair on cloned order state and returns the solution
/// together with its whole-solution objective value.
fn match_token_pair(
    token_pair: (&TokenId, &TokenId),
    accounts: &AccountState,
    orders: &[Order],
    fee: &Fee,
    config: &Config,
) -> Result<(BigRational, Solution)> {
    let (b_buy_token, s_buy_token) = token_pair;

    let mut b_orders: Vec<Order> = orders
        .iter()
        .filter(|order| &order.buy_token == b_buy_token && &order.sell_token == s_buy_token)
        .cloned()
        .collect();
    let mut s_orders: Vec<Order> = orders
        .iter()
        .filter(|order| &order.buy_token == s_buy_token && &order.sell_token == b_buy_token)
        .cloned()
        .collect();
    let mut f_orders: Vec<Order> = orders
        .iter()
        .filter(|order| &order.buy_token == b_buy_token && order.sell_token == fee.token)
        .cloned()
        .collect();

    let solution = if b_orders.is_empty() || s_orders.is_empty() {
        Solution::trivial()
    } else {
        crate::solver::token_pair::solve_token_pair_and_fee_token_economic_viable(
            token_pair,
            accounts,
            &mut b_orders,
            &mut s_orders,
            &mut f_orders,
            fee,
            config,
            None,
        )?
    };

    let accounts_updated = accounts.updated_for(&solution.orders);
    let objective =
        compute_objective_value(&solution.prices, &accounts_updated, &solution.orders, fee);

    Ok((objective, solution))
}

/// Enumerates all eligible token pairs and returns the solution with the
/// highest objective value (or the trivial solution if no pair achieves a
/// positive one).
pub fn solve_best_token_pair(
    accounts: &AccountState,
    orders: &[Order],
    fee: &Fee,
    config: &Config,
) -> Result<Solution> {
    let mut best_objective = BigRational::zero();
    let mut best_solution = Solution::trivial();

    for (b_buy_token, s_buy_token) in eligible_token_pairs(orders, &fee.token) {
        let (objective, solution) =
            match_token_pair((&b_buy_token, &s_buy_token), accounts, orders, fee, config)?;
        log::debug!(
            "pair ({}, {}) objective: {}",
            b_buy_token,
            s_buy_token,
            config.display_ratio(&objective),
        );
        if objective > best_objective {
            best_objective = objective;
            best_solution = solution;
        }
    }

    Ok(best_solution)
}
