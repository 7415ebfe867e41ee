//! Token-pair + fee-token coordinator.
//!
//! Couples the exchange-rate optimizer and the execution engine with the
//! orderbook selling fee token for the b token, sweeps the feasible counts
//! of executed fee orders, rounds the winner to integers, and wraps the
//! whole pipeline in the economic-viability loop.

use crate::arith::{Rational, SmartContract};
use crate::config::Config;
use crate::error::SolverError;
use crate::execution::compute_buy_amounts;
use crate::models::{AccountState, Fee, Order, Prices, Solution, TokenId};
use crate::orderbook::{
    compute_approx_economic_viable_subset, compute_b_buy_token_imbalance, count_nr_exec_orders,
    count_orders_satisfying_xrate, compute_pair_objective_rational, is_economic_viable,
    is_trivial, prune_unrealizable_orders, sort_by_exec_priority,
};
use crate::price::compute_token_price_to_cover_imbalance;
use crate::rounding::{round_solution, with_rounding_buffer};
use crate::validation::validate;
use crate::xrate::find_best_xrate;
use anyhow::Result;
use num::{BigInt, BigRational, Zero};

/// Chooses the integer s price so the adjusted rate keeps as many order
/// limits satisfiable as possible.
fn compute_s_buy_token_price(
    b_buy_token_price: &BigInt,
    xrate: &BigRational,
    b_orders: &[Order],
    s_orders: &[Order],
    fee: &Fee,
) -> BigInt {
    let exact = BigRational::from_integer(b_buy_token_price.clone()) / xrate;
    let price_up = exact.ceil().to_integer();
    let price_down = exact.floor().to_integer();
    if price_down.is_zero() {
        return price_up;
    }

    let count_at = |s_price: &BigInt| {
        let xrate = BigRational::new(b_buy_token_price.clone(), s_price.clone());
        count_orders_satisfying_xrate(b_orders, &xrate, fee)
            + count_orders_satisfying_xrate(s_orders, &xrate.recip(), fee)
    };
    if count_at(&price_up) > count_at(&price_down) {
        price_up
    } else {
        price_down
    }
}

/// Finds the optimal execution of `b_orders` and `s_orders`.
///
/// Sets the orders' buy amounts and returns the exchange rate used. If
/// `b_buy_token_price` is known, the rate is adjusted so both token prices
/// are integers.
#[allow(clippy::too_many_arguments)]
pub fn solve_token_pair(
    token_pair: (&TokenId, &TokenId),
    b_orders: &mut [Order],
    s_orders: &mut [Order],
    fee: &Fee,
    config: &Config,
    xrate: Option<BigRational>,
    b_buy_token_price: Option<BigInt>,
    max_nr_exec_orders: Option<usize>,
) -> Option<BigRational> {
    let max_nr_exec_orders = max_nr_exec_orders.unwrap_or(config.max_nr_exec_orders);

    if b_orders.is_empty() || s_orders.is_empty() {
        return None;
    }

    let (b_buy_token, s_buy_token) = token_pair;
    let b_buy_token_price = if b_buy_token == &fee.token {
        Some(config.fee_token_price.clone())
    } else {
        b_buy_token_price
    };

    // Compute the optimal exchange rate if not given.
    let mut xrate = match xrate {
        Some(xrate) => xrate,
        None => {
            let (xrate, _) = find_best_xrate(b_orders, s_orders, fee, config)?;
            log::debug!(
                "p({}) / p({}) = {} (precise arithmetic)",
                b_buy_token,
                s_buy_token,
                config.display_ratio(&xrate),
            );
            xrate
        }
    };

    // With a fixed b price, adjust the rate so that
    // xrate = b_buy_token_price / s_buy_token_price with both integers.
    if let Some(b_buy_token_price) = b_buy_token_price {
        let s_buy_token_price =
            compute_s_buy_token_price(&b_buy_token_price, &xrate, b_orders, s_orders, fee);
        xrate = BigRational::new(b_buy_token_price, s_buy_token_price);
        log::debug!("adjusted xrate: {}", config.display_ratio(&xrate));
    }

    compute_buy_amounts(&xrate, b_orders, s_orders, fee, config, max_nr_exec_orders);

    Some(xrate)
}

/// Finds the price of the b token at which its fee-induced imbalance can be
/// bought by `f_orders`, and executes them against a synthetic order
/// selling that imbalance.
fn solve_b_buy_token_and_fee_token(
    b_buy_token_imbalance: &BigRational,
    b_buy_token: &TokenId,
    f_orders: &mut [Order],
    fee: &Fee,
    config: &Config,
) -> Result<BigInt, SolverError> {
    // Fix the final b price so that the imbalance due to fee (plus a
    // rounding estimate) can be sold for fee token.
    let b_buy_token_price = compute_token_price_to_cover_imbalance(
        b_buy_token,
        fee,
        b_buy_token_imbalance,
        f_orders,
        config,
    )?;

    // Execute the f orders against an artificial order selling the
    // imbalance at the fixed price.
    let mut fee_debt_order = [crate::price::create_market_order(
        fee.token.clone(),
        b_buy_token.clone(),
        b_buy_token_imbalance.clone(),
        f_orders,
    )];
    let fee_xrate = BigRational::new(config.fee_token_price.clone(), b_buy_token_price.clone());
    let executed_xrate = solve_token_pair(
        (&fee.token, b_buy_token),
        &mut fee_debt_order,
        f_orders,
        fee,
        config,
        Some(fee_xrate),
        None,
        None,
    );
    debug_assert!(executed_xrate.is_some());

    Ok(b_buy_token_price)
}

/// The interval of fee-order counts compatible with the maximum number of
/// executed orders.
fn compute_nr_f_orders_to_execute(
    b_orders: &[Order],
    s_orders: &[Order],
    f_orders: &[Order],
    config: &Config,
) -> (usize, usize) {
    let max_nr_exec_b_orders = count_nr_exec_orders(b_orders);
    let max_nr_exec_s_orders = count_nr_exec_orders(s_orders);
    debug_assert!(max_nr_exec_b_orders + max_nr_exec_s_orders <= config.max_nr_exec_orders);

    // Executing this many f orders is compatible with any number of
    // executed b/s orders seen so far.
    let min_max_nr_exec_f_orders = config.max_nr_exec_orders
        - max_nr_exec_b_orders
        - max_nr_exec_s_orders
        + 1;

    // At least one b order and one s order must be matched.
    let max_nr_exec_f_orders = f_orders
        .len()
        .min(config.max_nr_exec_orders.saturating_sub(2));

    // Do not constrain the number of f orders unless really necessary, and
    // execute at least one.
    let min_nr_exec_f_orders = min_max_nr_exec_f_orders.min(max_nr_exec_f_orders).max(1);

    (min_nr_exec_f_orders, max_nr_exec_f_orders)
}

/// One iteration of the f-order sweep: match the fee token against the b
/// token assuming at most `nr_exec_f_orders` executed f orders, then
/// re-execute the token pair with the resulting integer b price under a
/// rounding buffer.
///
/// Returns the objective value, the adjusted rate and the b price (`None`
/// if it was not possible to connect to the fee token).
#[allow(clippy::too_many_arguments)]
fn solve_given_exec_f_orders(
    nr_exec_f_orders: usize,
    approx_b_buy_token_imbalance: &BigRational,
    token_pair: (&TokenId, &TokenId),
    b_orders: &mut [Order],
    s_orders: &mut [Order],
    f_orders: &mut [Order],
    xrate: &BigRational,
    fee: &Fee,
    config: &Config,
) -> (BigRational, BigRational, Option<BigInt>) {
    let (b_buy_token, s_buy_token) = token_pair;

    let b_buy_token_price = match solve_b_buy_token_and_fee_token(
        approx_b_buy_token_imbalance,
        b_buy_token,
        &mut f_orders[..nr_exec_f_orders],
        fee,
        config,
    ) {
        Ok(price) => price,
        Err(err) => {
            log::debug!("could not price {}: {}", b_buy_token, err);
            return (BigRational::zero(), xrate.clone(), None);
        }
    };

    // Side constraints may have reduced the number of f orders actually
    // executed.
    let nr_exec_f_orders = count_nr_exec_orders(&f_orders[..nr_exec_f_orders]);
    if nr_exec_f_orders == 0 {
        return (BigRational::zero(), xrate.clone(), None);
    }

    let max_nr_bs_exec_orders = config.max_nr_exec_orders - nr_exec_f_orders;
    log::debug!(
        "re-solving {} -- {} with price {} and at most {} orders",
        b_buy_token,
        s_buy_token,
        b_buy_token_price,
        max_nr_bs_exec_orders,
    );

    // Execute with slightly decreased max sell amounts so the solution can
    // later be rounded without violating the max sell amount constraint.
    let adjusted_xrate = with_rounding_buffer(
        b_orders,
        s_orders,
        xrate,
        &b_buy_token_price,
        config,
        |b_orders, s_orders| {
            solve_token_pair(
                token_pair,
                b_orders,
                s_orders,
                fee,
                config,
                Some(xrate.clone()),
                Some(b_buy_token_price.clone()),
                Some(max_nr_bs_exec_orders),
            )
            .expect("pair with a fixed rate always solves")
        },
    );

    let objective = compute_pair_objective_rational(
        b_orders,
        s_orders,
        f_orders,
        &adjusted_xrate,
        &BigRational::from_integer(b_buy_token_price.clone()),
        fee,
        config,
    );

    (objective, adjusted_xrate, Some(b_buy_token_price))
}

/// Snapshot of the executed buy amounts of all three order lists, so that
/// the best f-prefix found by the sweep can be restored into the caller's
/// vectors without deep-copying whole orders.
struct AmountsSnapshot {
    b_buy_amounts: Vec<BigRational>,
    s_buy_amounts: Vec<BigRational>,
    f_buy_amounts: Vec<BigRational>,
}

impl AmountsSnapshot {
    fn capture(b_orders: &[Order], s_orders: &[Order], f_orders: &[Order]) -> Self {
        let amounts = |orders: &[Order]| orders.iter().map(|o| o.buy_amount.clone()).collect();
        AmountsSnapshot {
            b_buy_amounts: amounts(b_orders),
            s_buy_amounts: amounts(s_orders),
            f_buy_amounts: amounts(f_orders),
        }
    }

    fn restore(&self, b_orders: &mut [Order], s_orders: &mut [Order], f_orders: &mut [Order]) {
        let restore = |orders: &mut [Order], amounts: &[BigRational]| {
            for (order, amount) in orders.iter_mut().zip(amounts) {
                order.buy_amount = amount.clone();
            }
        };
        restore(b_orders, &self.b_buy_amounts);
        restore(s_orders, &self.s_buy_amounts);
        restore(f_orders, &self.f_buy_amounts);
    }
}

/// Matches orders between a token pair and the fee token, honoring all side
/// constraints except economic viability.
///
/// Sets the integral executed amounts on the given order vectors and
/// returns the solution. Every non-fatal failure degrades to the trivial
/// solution.
pub fn solve_token_pair_and_fee_token(
    token_pair: (&TokenId, &TokenId),
    b_orders: &mut Vec<Order>,
    s_orders: &mut Vec<Order>,
    f_orders: &mut Vec<Order>,
    fee: &Fee,
    config: &Config,
    xrate: Option<BigRational>,
) -> Solution {
    match solve_token_pair_and_fee_token_inner(
        token_pair, b_orders, s_orders, f_orders, fee, config, xrate,
    ) {
        Ok(solution) => solution,
        Err(err) => {
            log::info!("returning the trivial solution: {}", err);
            Solution::trivial()
        }
    }
}

fn solve_token_pair_and_fee_token_inner(
    token_pair: (&TokenId, &TokenId),
    b_orders: &mut Vec<Order>,
    s_orders: &mut Vec<Order>,
    f_orders: &mut Vec<Order>,
    fee: &Fee,
    config: &Config,
    xrate: Option<BigRational>,
) -> Result<Solution, SolverError> {
    for order in b_orders
        .iter_mut()
        .chain(s_orders.iter_mut())
        .chain(f_orders.iter_mut())
    {
        order.reset_amounts();
    }

    // This function does not support s_buy_token == fee token.
    let (token_pair, b_orders, s_orders) = if token_pair.1 == &fee.token {
        ((token_pair.1, token_pair.0), s_orders, b_orders)
    } else {
        (token_pair, b_orders, s_orders)
    };
    let (b_buy_token, s_buy_token) = token_pair;

    // Remove trivially infeasible orders.
    let (nr_b, nr_s) = prune_unrealizable_orders(b_orders, s_orders, fee);
    if nr_b == 0 || nr_s == 0 {
        return Err(SolverError::NoMatch);
    }
    let b_orders = &mut b_orders[..nr_b];
    let s_orders = &mut s_orders[..nr_s];

    log::debug!("=== order matching on token pair + fee token ===");
    log::debug!("b_buy_token: {}", b_buy_token);
    log::debug!("s_buy_token: {}", s_buy_token);
    log::debug!("fee_token  : {}", fee.token);

    // Find the optimal execution between the two tokens of the pair.
    let xrate = match solve_token_pair(
        (b_buy_token, s_buy_token),
        b_orders,
        s_orders,
        fee,
        config,
        xrate,
        None,
        None,
    ) {
        Some(xrate) => xrate,
        None => return Err(SolverError::NoMatch),
    };

    if count_nr_exec_orders(b_orders.iter()) == 0 {
        log::debug!(
            "no matching orders between {} and {}",
            b_buy_token,
            s_buy_token,
        );
        return Err(SolverError::NoMatch);
    }

    let (xrate, b_buy_token_price) = if b_buy_token == &fee.token {
        // There are only two order sets in this case; the b price is fixed
        // and no f orders are needed.
        f_orders.clear();
        (xrate, config.fee_token_price.clone())
    } else {
        // Orders buying b token for fee must be executed so the b token
        // imbalance due to fee and rounding can be bought.
        if f_orders.is_empty() {
            return Err(SolverError::FeeUnreachable(b_buy_token.clone()));
        }

        // Imbalance due to fee of the b token (the s token is exactly
        // balanced).
        let b_buy_token_imbalance = compute_b_buy_token_imbalance::<Rational>(
            b_orders,
            s_orders,
            &xrate,
            &BigRational::from_integer(1.into()),
            fee,
        );
        log::debug!(
            "imbalance of {}: {} (due to fee)",
            b_buy_token,
            config.display_ratio(&b_buy_token_imbalance),
        );

        let (min_nr_exec_f_orders, max_nr_exec_f_orders) =
            compute_nr_f_orders_to_execute(b_orders, s_orders, f_orders, config);
        if min_nr_exec_f_orders > max_nr_exec_f_orders {
            return Err(SolverError::FeeUnreachable(b_buy_token.clone()));
        }

        log::debug!(
            "=== solving {} -- {} (nr_exec_f_orders in [{}, {}]) ===",
            b_buy_token,
            fee.token,
            min_nr_exec_f_orders,
            max_nr_exec_f_orders,
        );

        // Find the number of f orders that leads to the best objective.
        sort_by_exec_priority(f_orders);
        let mut best: Option<(BigRational, BigRational, BigInt, AmountsSnapshot)> = None;
        for nr_exec_f_orders in min_nr_exec_f_orders..=max_nr_exec_f_orders {
            for f_order in f_orders.iter_mut() {
                f_order.reset_amounts();
            }

            let (objective, adjusted_xrate, b_buy_token_price) = solve_given_exec_f_orders(
                nr_exec_f_orders,
                &b_buy_token_imbalance,
                (b_buy_token, s_buy_token),
                b_orders,
                s_orders,
                f_orders,
                &xrate,
                fee,
                config,
            );

            // Skip the iteration if it was not possible to connect to the
            // fee token.
            let b_buy_token_price = match b_buy_token_price {
                Some(price) => price,
                None => continue,
            };

            log::debug!(
                "objective: {} [best={}]",
                config.display_ratio(&objective),
                best.as_ref()
                    .map(|(best_objective, ..)| config.display_ratio(best_objective).to_string())
                    .unwrap_or_else(|| "none".to_string()),
            );

            // Since f orders are sorted by limit rate, the objective is
            // unimodal in the prefix length: stop once it degrades.
            if let Some((best_objective, ..)) = &best {
                if &objective < best_objective {
                    break;
                }
            }

            best = Some((
                objective,
                adjusted_xrate,
                b_buy_token_price,
                AmountsSnapshot::capture(b_orders, s_orders, f_orders),
            ));
        }

        let (_, adjusted_xrate, b_buy_token_price, snapshot) = match best {
            Some(best) => best,
            // It was never possible to connect to the fee token, for
            // example because the f orders violate the minimum tradable
            // amount.
            None => {
                log::debug!("could not execute f_orders");
                return Err(SolverError::FeeUnreachable(b_buy_token.clone()));
            }
        };
        snapshot.restore(b_orders, s_orders, f_orders);

        log::debug!("price of {}: {}", b_buy_token, b_buy_token_price);
        (adjusted_xrate, b_buy_token_price)
    };

    // Aggregate prices; the adjusted rate guarantees integrality.
    let s_buy_token_price = BigRational::from_integer(b_buy_token_price.clone()) / &xrate;
    debug_assert!(s_buy_token_price.is_integer());
    let mut prices = Prices::new();
    prices.insert(fee.token.clone(), config.fee_token_price.clone());
    prices.insert(b_buy_token.clone(), b_buy_token_price);
    prices.insert(s_buy_token.clone(), s_buy_token_price.to_integer());

    // Integerize amounts and neutralize the rounding residuals.
    log::debug!("=== rounding ===");
    let mut orders: Vec<Order> = b_orders
        .iter()
        .chain(s_orders.iter())
        .chain(f_orders.iter())
        .cloned()
        .collect();
    if !round_solution(&prices, &mut orders, fee, config) {
        log::warn!("could not round solution");
        return Err(SolverError::RoundingFailure);
    }

    // Copy the rounded amounts back so the caller's vectors agree with the
    // returned solution.
    let (rounded_b, rest) = orders.split_at(b_orders.len());
    let (rounded_s, rounded_f) = rest.split_at(s_orders.len());
    for (order, rounded) in b_orders
        .iter_mut()
        .zip(rounded_b)
        .chain(s_orders.iter_mut().zip(rounded_s))
        .chain(f_orders.iter_mut().zip(rounded_f))
    {
        order.buy_amount = rounded.buy_amount.clone();
        order.sell_amount = rounded.sell_amount.clone();
    }

    Ok(Solution { orders, prices })
}

/// Matches orders between a token pair and the fee token, honoring all side
/// constraints including economic viability.
///
/// While the solution collects too little fee on average, the touched order
/// paying the least fee is dropped and the pair is re-solved. The result is
/// validated before being returned; a validation failure is a programmer
/// error and aborts the solve.
#[allow(clippy::too_many_arguments)]
pub fn solve_token_pair_and_fee_token_economic_viable(
    token_pair: (&TokenId, &TokenId),
    accounts: &AccountState,
    b_orders: &mut Vec<Order>,
    s_orders: &mut Vec<Order>,
    f_orders: &mut Vec<Order>,
    fee: &Fee,
    config: &Config,
    xrate: Option<BigRational>,
) -> Result<Solution> {
    let mut solution = Solution::trivial();

    while !b_orders.is_empty() || !s_orders.is_empty() {
        solution = solve_token_pair_and_fee_token(
            token_pair,
            b_orders,
            s_orders,
            f_orders,
            fee,
            config,
            xrate.clone(),
        );

        // In the large majority of cases this exits in the first iteration.
        if is_trivial(&solution.orders)
            || is_economic_viable::<SmartContract>(
                &solution.orders,
                &solution.prices,
                fee,
                config,
            )
        {
            break;
        }

        // If the solution cannot be made viable at these prices, give up.
        if compute_approx_economic_viable_subset::<SmartContract>(
            &solution.orders,
            &solution.prices,
            fee,
            config,
        )
        .is_empty()
        {
            solution = Solution::trivial();
            break;
        }

        // Find and remove the touched order paying the least fee.
        let min_fee_volume = |orders: &[Order]| {
            orders
                .iter()
                .filter(|order| order.is_executed())
                .map(|order| {
                    let price = solution
                        .prices
                        .get(&order.buy_token)
                        .cloned()
                        .unwrap_or_else(BigInt::zero);
                    (
                        &order.buy_amount * BigRational::from_integer(price),
                        order.index,
                    )
                })
                .fold(None::<(BigRational, Option<usize>)>, |best, item| {
                    match best {
                        Some(best) if best.0 <= item.0 => Some(best),
                        _ => Some(item),
                    }
                })
        };

        let b_min = min_fee_volume(b_orders);
        let s_min = min_fee_volume(s_orders);
        let index_to_remove = match (b_min, s_min) {
            (Some((b_volume, b_index)), Some((s_volume, s_index))) => {
                if b_volume < s_volume {
                    b_index
                } else {
                    s_index
                }
            }
            (Some((_, index)), None) | (None, Some((_, index))) => index,
            (None, None) => break,
        };
        log::debug!(
            "removing order {:?} to reach economic viability",
            index_to_remove,
        );
        b_orders.retain(|order| order.index != index_to_remove);
        s_orders.retain(|order| order.index != index_to_remove);
    }

    validate(accounts, &solution.orders, &solution.prices, fee, config)?;
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::test_util::order;

    fn fee() -> Fee {
        Fee {
            token: "F".into(),
            ratio: BigRational::new(1.into(), 1000.into()),
        }
    }

    fn accounts_covering(orders: &[&[Order]]) -> AccountState {
        let mut accounts = AccountState::default();
        let balances = accounts.0.entry("A".to_string()).or_default();
        for order in orders.iter().copied().flatten() {
            let entry = balances.entry(order.sell_token.clone()).or_default();
            *entry += order.max_sell_amount().to_integer();
        }
        accounts
    }

    fn solve(
        token_pair: (&str, &str),
        b_orders: &mut Vec<Order>,
        s_orders: &mut Vec<Order>,
        f_orders: &mut Vec<Order>,
        config: &Config,
    ) -> Solution {
        let accounts = accounts_covering(&[b_orders, s_orders, f_orders]);
        solve_token_pair_and_fee_token_economic_viable(
            (&token_pair.0.into(), &token_pair.1.into()),
            &accounts,
            b_orders,
            s_orders,
            f_orders,
            &fee(),
            config,
            None,
        )
        .unwrap()
    }

    #[test]
    fn empty_sides_give_the_trivial_solution() {
        let config = Config::default();
        let solution = solve(
            ("T0", "T1"),
            &mut vec![order(0, "T0", "T1", 100_000, (2, 1))],
            &mut Vec::new(),
            &mut Vec::new(),
            &config,
        );
        assert!(!solution.is_non_trivial());
    }

    #[test]
    fn missing_f_orders_give_the_trivial_solution() {
        // Both sides are matchable, but the b token cannot be connected to
        // the fee token.
        let config = Config::default();
        let solution = solve(
            ("T0", "T1"),
            &mut vec![order(0, "T0", "T1", 100_000, (2, 1))],
            &mut vec![order(1, "T1", "T0", 100_000, (2, 1))],
            &mut Vec::new(),
            &config,
        );
        assert!(!solution.is_non_trivial());
    }

    #[test]
    fn fee_adjacent_pair_solves_without_f_orders() {
        let config = Config::default();
        let mut b_orders = vec![order(0, "F", "T1", 100_000, (2, 1))];
        let mut s_orders = vec![order(1, "T1", "F", 100_000, (2, 1))];
        let solution = solve(
            ("F", "T1"),
            &mut b_orders,
            &mut s_orders,
            &mut Vec::new(),
            &config,
        );

        assert!(solution.is_non_trivial());
        assert_eq!(
            solution.prices.get(&"F".into()),
            Some(&config.fee_token_price),
        );
        // The caller's vectors carry the same amounts as the solution.
        assert_eq!(b_orders[0].buy_amount, solution.orders[0].buy_amount);
    }

    #[test]
    fn tiny_fee_imbalance_gives_the_trivial_solution() {
        let config = Config::default();
        let mut b_orders = vec![order(0, "T0", "T1", 11_109, (1, 1))];
        let mut s_orders = vec![order(1, "T1", "T0", 11_132, (17, 10))];
        let mut f_orders = vec![order(2, "T0", "F", 9_000, (228, 25))];

        let solution = solve(
            ("T0", "T1"),
            &mut b_orders,
            &mut s_orders,
            &mut f_orders,
            &config,
        );
        // The imbalance of T0 is tiny (fee volume of an 11k trade), far
        // below the minimum tradable amount, so the f order cannot execute
        // and the solution is trivial.
        assert!(!solution.is_non_trivial());
    }

    #[test]
    fn swapped_fee_pair_is_reversed() {
        let config = Config::default();
        // s_buy_token == fee: the pair is flipped internally.
        let mut b_orders = vec![order(0, "T1", "F", 100_000, (2, 1))];
        let mut s_orders = vec![order(1, "F", "T1", 100_000, (2, 1))];
        let solution = solve(
            ("T1", "F"),
            &mut b_orders,
            &mut s_orders,
            &mut Vec::new(),
            &config,
        );
        assert!(solution.is_non_trivial());
        assert_eq!(
            solution.prices.get(&"F".into()),
            Some(&config.fee_token_price),
        );
    }

    #[test]
    fn infeasible_min_average_fee_gives_the_trivial_solution() {
        let config = Config {
            min_average_order_fee: crate::num::pow10(19),
            ..Config::default()
        };
        let mut b_orders = vec![order(0, "T0", "T1", 100_000_000_000_000, (1, 2))];
        let mut s_orders = vec![order(1, "T1", "T0", 100_100_150_125_615, (21, 10))];
        let mut f_orders = vec![order(2, "T0", "F", 100_000_000_000_000, (1, 10))];

        let solution = solve(
            ("T0", "T1"),
            &mut b_orders,
            &mut s_orders,
            &mut f_orders,
            &config,
        );
        assert!(!solution.is_non_trivial());
    }
}
