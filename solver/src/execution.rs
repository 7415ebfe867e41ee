//! Execution engine: optimal buy amounts for two opposing order lists at a
//! fixed exchange rate.
//!
//! Convention: `xrate = p(b_token) / p(s_token) = (s_amount / b_amount) *
//! (1 - fee)`. The engine balances the s token exactly and leaves the fee
//! volume as an imbalance on the b token.

use crate::config::Config;
use crate::models::{Fee, Order};
use num::{BigRational, Signed, Zero};

// A b order buys b token: b_buy_amount = b_sell_amount / xrate * (1 - fee).
fn b_buy_amount_from_b_sell_amount(
    sell_amount: &BigRational,
    xrate: &BigRational,
    fee: &Fee,
) -> BigRational {
    sell_amount / xrate * fee.factor()
}

fn b_sell_amount_from_b_buy_amount(
    buy_amount: &BigRational,
    xrate: &BigRational,
    fee: &Fee,
) -> BigRational {
    buy_amount * xrate / fee.factor()
}

// An s order buys s token: s_buy_amount = s_sell_amount * xrate * (1 - fee).
fn s_buy_amount_from_s_sell_amount(
    sell_amount: &BigRational,
    xrate: &BigRational,
    fee: &Fee,
) -> BigRational {
    sell_amount * xrate * fee.factor()
}

fn s_sell_amount_from_s_buy_amount(
    buy_amount: &BigRational,
    xrate: &BigRational,
    fee: &Fee,
) -> BigRational {
    buy_amount / xrate / fee.factor()
}

// The engine balances the s token: b_sell_amount = s_buy_amount, which
// couples the two sides as follows.
fn b_buy_amount_from_s_buy_amount(
    s_buy_amount: &BigRational,
    xrate: &BigRational,
    fee: &Fee,
) -> BigRational {
    s_buy_amount / xrate * fee.factor()
}

fn s_buy_amount_from_b_buy_amount(
    b_buy_amount: &BigRational,
    xrate: &BigRational,
    fee: &Fee,
) -> BigRational {
    b_buy_amount * xrate / fee.factor()
}

/// Removes `amount` worth of buy volume from one or more orders, in
/// reversed execution order starting at `order_i`. Returns the new frontier
/// position.
fn remove_buy_amount(
    mut order_i: isize,
    orders: &mut [Order],
    index: &[usize],
    mut amount: BigRational,
) -> isize {
    while amount > BigRational::zero() {
        debug_assert!(order_i >= 0, "unwound more volume than was executed");
        let order = &mut orders[index[order_i as usize]];
        let delta = order.buy_amount.clone().min(amount.clone());
        order.buy_amount -= &delta;
        amount -= &delta;
        if order.buy_amount.is_zero() {
            order_i -= 1;
        }
    }
    order_i
}

/// Computes optimal buy amounts for two sets of orders between two tokens.
///
/// Resets all executed amounts, drops orders whose limit or minimum
/// tradable amount cannot be satisfied at `xrate`, fills the remaining
/// orders by limit-price priority, and rolls back orders that end up
/// violating the maximum-executed-orders cap or the minimum tradable
/// amount.
pub fn compute_buy_amounts(
    xrate: &BigRational,
    b_orders: &mut [Order],
    s_orders: &mut [Order],
    fee: &Fee,
    config: &Config,
    max_nr_exec_orders: usize,
) {
    for order in b_orders.iter_mut().chain(s_orders.iter_mut()) {
        order.reset_amounts();
    }

    // The effective lower bound is conservatively increased so that the
    // constraint survives rounding the solution to integers.
    let min_tradable = BigRational::from_integer(config.min_rational_tradable_amount());

    // Orders violating the limit rate (fee included) or the minimum
    // tradable amount at this rate can never fill.
    let mut b_index: Vec<usize> = (0..b_orders.len())
        .filter(|&i| {
            let order = &b_orders[i];
            xrate <= &(order.max_xrate() * fee.factor())
                && order.max_sell_amount() >= &min_tradable
                && b_buy_amount_from_b_sell_amount(order.max_sell_amount(), xrate, fee)
                    >= min_tradable
        })
        .collect();
    let mut s_index: Vec<usize> = (0..s_orders.len())
        .filter(|&i| {
            let order = &s_orders[i];
            xrate.recip() <= order.max_xrate() * fee.factor()
                && order.max_sell_amount() >= &min_tradable
                && s_buy_amount_from_s_sell_amount(order.max_sell_amount(), xrate, fee)
                    >= min_tradable
        })
        .collect();

    if b_index.is_empty() || s_index.is_empty() {
        return;
    }

    // Sort by optimal execution order, stable on the input order.
    b_index.sort_by(|&i, &j| b_orders[j].max_xrate().cmp(b_orders[i].max_xrate()));
    s_index.sort_by(|&i, &j| s_orders[j].max_xrate().cmp(s_orders[i].max_xrate()));

    let (nb, ns) = (b_index.len(), s_index.len());
    let mut b_i = 0;
    let mut s_i = 0;

    // State right before the most recent fill step, for undoing it if the
    // step broke the executed-orders cap.
    struct Step {
        b_i: usize,
        s_i: usize,
        b_buy_amount: BigRational,
        s_buy_amount: BigRational,
    }
    let mut last_step: Option<Step> = None;

    while b_i < nb && s_i < ns && b_i + s_i < max_nr_exec_orders {
        let b_order = &b_orders[b_index[b_i]];
        let s_order = &s_orders[s_index[s_i]];

        // Remaining buy capacity on both frontier orders.
        let b_buy_amount_ub =
            b_buy_amount_from_b_sell_amount(b_order.max_sell_amount(), xrate, fee)
                - &b_order.buy_amount;
        let s_buy_amount_ub =
            s_buy_amount_from_s_sell_amount(s_order.max_sell_amount(), xrate, fee)
                - &s_order.buy_amount;
        debug_assert!(!b_buy_amount_ub.is_negative() && !s_buy_amount_ub.is_negative());

        let b_buy_amount_from_s = b_buy_amount_from_s_buy_amount(&s_buy_amount_ub, xrate, fee);
        let s_buy_amount_from_b = s_buy_amount_from_b_buy_amount(&b_buy_amount_ub, xrate, fee);

        last_step = Some(Step {
            b_i,
            s_i,
            b_buy_amount: b_order.buy_amount.clone(),
            s_buy_amount: s_order.buy_amount.clone(),
        });

        // Whichever side is the tighter constraint is fully consumed.
        if b_buy_amount_ub < b_buy_amount_from_s {
            b_orders[b_index[b_i]].buy_amount += b_buy_amount_ub;
            s_orders[s_index[s_i]].buy_amount += s_buy_amount_from_b;
            b_i += 1;
        } else if b_buy_amount_ub > b_buy_amount_from_s {
            b_orders[b_index[b_i]].buy_amount += b_buy_amount_from_s;
            s_orders[s_index[s_i]].buy_amount += s_buy_amount_ub;
            s_i += 1;
        } else {
            b_orders[b_index[b_i]].buy_amount += b_buy_amount_ub;
            s_orders[s_index[s_i]].buy_amount += s_buy_amount_ub;
            b_i += 1;
            s_i += 1;
        }
    }

    // The final step can overshoot the cap by one touched order; undo it.
    let touched = |b_orders: &[Order], s_orders: &[Order]| {
        b_orders.iter().filter(|o| o.is_executed()).count()
            + s_orders.iter().filter(|o| o.is_executed()).count()
    };
    if touched(b_orders, s_orders) > max_nr_exec_orders {
        if let Some(step) = last_step {
            b_orders[b_index[step.b_i]].buy_amount = step.b_buy_amount;
            s_orders[s_index[step.s_i]].buy_amount = step.s_buy_amount;
            b_i = step.b_i;
            s_i = step.s_i;
        }
    }

    // The last touched order on either side may now violate the minimum
    // tradable amount; undoing it can push the opposing frontier below the
    // minimum in turn, hence the loop.
    let mut b_i = b_i.min(nb - 1) as isize;
    let mut s_i = s_i.min(ns - 1) as isize;
    loop {
        let mut undone = false;

        if b_i >= 0 {
            let order = &b_orders[b_index[b_i as usize]];
            let buy_amount = order.buy_amount.clone();
            let sell_amount = b_sell_amount_from_b_buy_amount(&buy_amount, xrate, fee);
            if !buy_amount.is_zero() && (buy_amount < min_tradable || sell_amount < min_tradable)
            {
                log::debug!(
                    "b_order {:?} violates minimum tradable amount constraint, undoing",
                    order.index,
                );
                b_orders[b_index[b_i as usize]].buy_amount = BigRational::zero();
                b_i -= 1;
                let s_buy_amount = s_buy_amount_from_b_buy_amount(&buy_amount, xrate, fee);
                s_i = remove_buy_amount(s_i, s_orders, &s_index, s_buy_amount);
                undone = true;
            }
        }

        if s_i >= 0 {
            let order = &s_orders[s_index[s_i as usize]];
            let buy_amount = order.buy_amount.clone();
            let sell_amount = s_sell_amount_from_s_buy_amount(&buy_amount, xrate, fee);
            if !buy_amount.is_zero() && (buy_amount < min_tradable || sell_amount < min_tradable)
            {
                log::debug!(
                    "s_order {:?} violates minimum tradable amount constraint, undoing",
                    order.index,
                );
                s_orders[s_index[s_i as usize]].buy_amount = BigRational::zero();
                s_i -= 1;
                let b_buy_amount = b_buy_amount_from_s_buy_amount(&buy_amount, xrate, fee);
                b_i = remove_buy_amount(b_i, b_orders, &b_index, b_buy_amount);
                undone = true;
            }
        }

        if !undone {
            break;
        }
    }

    // Token balance invariant for the s token.
    debug_assert_eq!(
        b_orders
            .iter()
            .map(|o| &o.buy_amount * xrate)
            .sum::<BigRational>(),
        s_orders
            .iter()
            .map(|o| &o.buy_amount * fee.factor())
            .sum::<BigRational>(),
    );
}
