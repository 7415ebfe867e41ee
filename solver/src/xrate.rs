//! Exchange-rate optimizer for one ordered token pair.
//!
//! Given an array YB of maximum sell amounts and an array PI of limit
//! exchange rates on both sides, finds
//!
//! ```text
//! xrate* = argmax_{X, xrate} F(X, xrate)
//! s.t.    x_i * xrate <= yb_i  for all x_i in X,
//!         xrate <= pi_i        for all pi_i in PI,
//! ```
//!
//! where `X` are the executed buy amounts. The objective `F` is
//! piecewise-rational in `xrate` with breakpoints only at the effective
//! limit rates of the orders; between two consecutive breakpoints it has
//! closed-form stationary points, which are enumerated per frontier
//! configuration and evaluated exactly through the execution engine.

use crate::config::Config;
use crate::execution::compute_buy_amounts;
use crate::models::{Fee, Order};
use crate::num::rational_sqrt;
use crate::orderbook::compute_pair_objective_rational;
use num::{BigRational, One, Signed, Zero};
use std::collections::{BTreeSet, VecDeque};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Side {
    B,
    S,
}

/// The order data the sweep needs: maximum sell amount and limit rate.
#[derive(Clone, Debug)]
struct OrderData {
    yb: BigRational,
    pi: BigRational,
}

struct Breakpoint {
    side: Side,
    rate: BigRational,
    data: OrderData,
}

/// Executes both sides at `xrate` and computes the rational objective with
/// a unit b-token price.
fn objective_value(
    xrate: &BigRational,
    b_orders: &mut [Order],
    s_orders: &mut [Order],
    fee: &Fee,
    config: &Config,
) -> BigRational {
    compute_buy_amounts(
        xrate,
        b_orders,
        s_orders,
        fee,
        config,
        config.max_nr_exec_orders,
    );
    compute_pair_objective_rational(
        b_orders,
        s_orders,
        &[],
        xrate,
        &BigRational::one(),
        fee,
        config,
    )
}

/// Finds the optimal exchange rate for executing a set of orders and
/// counter-orders, returning the rate and its objective value.
///
/// Convention: `xrate = p(b_buy_token) / p(s_buy_token) = s_buy_amount /
/// b_buy_amount`. The executed buy amounts are left at the last candidate
/// evaluated; callers re-execute at the returned rate.
pub fn find_best_xrate(
    b_orders: &mut [Order],
    s_orders: &mut [Order],
    fee: &Fee,
    config: &Config,
) -> Option<(BigRational, BigRational)> {
    if b_orders.is_empty() || s_orders.is_empty() {
        return None;
    }

    let mut best: Option<(BigRational, BigRational)> = None;
    let consider = |xrate: &BigRational,
                    objective: BigRational,
                    best: &mut Option<(BigRational, BigRational)>| {
        log::debug!(
            "xrate candidate ({}, {})",
            config.display_ratio(xrate),
            config.display_ratio(&objective),
        );
        match best {
            Some((_, best_objective)) if *best_objective >= objective => {}
            _ => *best = Some((xrate.clone(), objective)),
        }
    };

    // Local optima within each xrate interval.
    for (interval_lb, interval_ub, b_exec, s_exec) in xrate_intervals(b_orders, s_orders, fee) {
        let candidates =
            collect_interval_candidates(&b_exec, &s_exec, &interval_lb, &interval_ub, fee, config);
        for rate in candidates {
            let objective = objective_value(&rate, b_orders, s_orders, fee, config);
            consider(&rate, objective, &mut best);
        }
    }

    // Local optimum of the trivial (no-trade) candidate set: the pure
    // limit rates of all orders. The objective restricted to this set has
    // a unique local optimum, so it is located by binary search on the
    // derivative sign, memoizing evaluations.
    let factor = fee.factor();
    let rates: Vec<BigRational> = b_orders
        .iter()
        .map(|order| order.max_xrate() * &factor)
        .chain(
            s_orders
                .iter()
                .map(|order| (order.max_xrate() * &factor).recip()),
        )
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut memo: Vec<Option<BigRational>> = vec![None; rates.len()];
    let value = |i: usize,
                 memo: &mut Vec<Option<BigRational>>,
                 b_orders: &mut [Order],
                 s_orders: &mut [Order]|
     -> BigRational {
        if memo[i].is_none() {
            memo[i] = Some(objective_value(&rates[i], b_orders, s_orders, fee, config));
        }
        memo[i].clone().unwrap()
    };

    let mut lo = 0;
    let mut hi = rates.len() - 1;
    while hi - lo > 2 {
        let mid = (lo + hi) / 2;
        let left = value(mid - 1, &mut memo, b_orders, s_orders);
        let center = value(mid, &mut memo, b_orders, s_orders);
        let right = value(mid + 1, &mut memo, b_orders, s_orders);
        if center >= left && center >= right {
            lo = mid - 1;
            hi = mid + 1;
            break;
        } else if right > center {
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }
    for i in lo..=hi {
        let objective = value(i, &mut memo, b_orders, s_orders);
        consider(&rates[i], objective, &mut best);
    }

    best
}

type Interval = (BigRational, BigRational, Vec<OrderData>, Vec<OrderData>);

/// Sweeps the breakpoints from the highest rate down, yielding for each
/// interval between consecutive breakpoints the currently-fillable orders
/// on both sides, frontier (worst limit) first.
fn xrate_intervals(b_orders: &[Order], s_orders: &[Order], fee: &Fee) -> Vec<Interval> {
    let factor = fee.factor();

    let mut breakpoints: Vec<Breakpoint> = b_orders
        .iter()
        .map(|order| Breakpoint {
            side: Side::B,
            rate: order.max_xrate() * &factor,
            data: OrderData {
                yb: order.max_sell_amount().clone(),
                pi: order.max_xrate().clone(),
            },
        })
        .chain(s_orders.iter().map(|order| Breakpoint {
            side: Side::S,
            rate: (order.max_xrate() * &factor).recip(),
            data: OrderData {
                yb: order.max_sell_amount().clone(),
                pi: order.max_xrate().clone(),
            },
        }))
        .collect();
    breakpoints.sort_by(|a, b| b.rate.cmp(&a.rate));

    // A b order becomes fillable once the rate drops below its effective
    // limit; an s order stops being fillable at its breakpoint. The front
    // of each deque is the order filled last.
    let mut b_exec: VecDeque<OrderData> = VecDeque::new();
    let mut s_exec: VecDeque<OrderData> = breakpoints
        .iter()
        .filter(|breakpoint| breakpoint.side == Side::S)
        .map(|breakpoint| breakpoint.data.clone())
        .collect();

    let mut intervals = Vec::new();
    for i in 0..breakpoints.len().saturating_sub(1) {
        let breakpoint = &breakpoints[i];
        match breakpoint.side {
            Side::B => b_exec.push_front(breakpoint.data.clone()),
            Side::S => {
                s_exec.pop_front();
            }
        }

        // Above the first b breakpoint there can be no match.
        if b_exec.is_empty() {
            continue;
        }
        // Below the last s breakpoint there can be no more matches.
        if s_exec.is_empty() {
            break;
        }

        intervals.push((
            breakpoints[i + 1].rate.clone(),
            breakpoint.rate.clone(),
            b_exec.iter().cloned().collect(),
            s_exec.iter().cloned().collect(),
        ));
    }
    intervals
}

/// Enumerates the candidate stationary points of one interval.
///
/// Within an interval the fillable order sets are fixed, but which order on
/// each side is the partially-filled frontier still depends on the rate: a
/// prefix of the worst-limit orders may be skipped entirely. Frontier
/// configurations inconsistent with the interval (by interval arithmetic on
/// the balance identity `xrate = b_sell / (s_sell * (1 - fee))`) are
/// pruned, and for each surviving configuration the five candidate roots
/// are collected.
fn collect_interval_candidates(
    b_exec: &[OrderData],
    s_exec: &[OrderData],
    interval_lb: &BigRational,
    interval_ub: &BigRational,
    fee: &Fee,
    config: &Config,
) -> BTreeSet<BigRational> {
    let factor = fee.factor();
    let fee_token_price = BigRational::from_integer(config.fee_token_price.clone());
    let one = BigRational::one();
    let two = BigRational::from_integer(2.into());
    let four = BigRational::from_integer(4.into());

    // c = 2 + f + (1 - f^2) / (2 * f * fee_token_price)
    let c = &two + &factor + (&one - &factor * &factor) / (&two * &factor * &fee_token_price);

    let sums = |orders: &[OrderData], weighted: bool, suffix: bool| {
        let mut sums = vec![BigRational::zero(); orders.len() + 1];
        let term = |i: usize| {
            if weighted {
                &orders[i].yb / &orders[i].pi
            } else {
                orders[i].yb.clone()
            }
        };
        if suffix {
            for i in (0..orders.len()).rev() {
                sums[i] = &sums[i + 1] + term(i);
            }
        } else {
            for i in 0..orders.len() {
                sums[i + 1] = &sums[i] + term(i);
            }
        }
        sums
    };

    let b_suffix_yb = sums(b_exec, false, true);
    let b_prefix_yb = sums(b_exec, false, false);
    let s_suffix_yb = sums(s_exec, false, true);
    let s_suffix_ybp = sums(s_exec, true, true);
    let s_prefix_ybp = sums(s_exec, true, false);

    let mut candidates = BTreeSet::new();
    let push_open = |candidates: &mut BTreeSet<BigRational>, rate: BigRational| {
        if &rate > interval_lb && &rate < interval_ub {
            candidates.insert(rate);
        }
    };
    let push_closed = |candidates: &mut BTreeSet<BigRational>, rate: BigRational| {
        if &rate >= interval_lb && &rate <= interval_ub {
            candidates.insert(rate);
        }
    };

    for bi in 0..b_exec.len() {
        // Orders in front of the frontier are skipped, the frontier may be
        // partial, everything behind it fills fully.
        let b_total = &b_suffix_yb[bi];
        let b_frontier = &b_exec[bi];
        let b_skipped = &b_prefix_yb[bi];
        let b_vol_lb = b_total - &b_frontier.yb;

        for sj in 0..s_exec.len() {
            let s_total = &s_suffix_yb[sj];
            let s_frontier = &s_exec[sj];
            let s_skipped_weighted = &s_prefix_ybp[sj];
            let s_vol_lb = s_total - &s_frontier.yb;

            // Interval arithmetic on the balance identity.
            let implied_lb = &b_vol_lb / (s_total * &factor);
            if &implied_lb > interval_ub {
                // Skipping more s volume only raises the implied rate.
                break;
            }
            if s_vol_lb > BigRational::zero() {
                let implied_ub = b_total / (&s_vol_lb * &factor);
                if &implied_ub < interval_lb {
                    continue;
                }
            }

            // Root 1: the frontier b order fully saturates.
            push_closed(&mut candidates, &b_frontier.pi * &factor);
            // Root 2: the frontier s order fully saturates.
            push_closed(&mut candidates, (&s_frontier.pi * &factor).recip());

            // Root 3: b side fully filled, frontier s partial.
            let t = &two * &s_suffix_yb[sj + 1] - &s_frontier.pi * &s_suffix_ybp[sj + 1];
            debug_assert!(!t.is_negative());
            let denominator = &factor
                * (&c * &s_frontier.pi * b_total
                    + &s_frontier.yb
                    + t
                    + &s_frontier.pi * (s_skipped_weighted - &factor * b_skipped));
            if denominator > BigRational::zero() {
                push_open(&mut candidates, &four * b_total / denominator);
            }

            // Root 4: frontier b partial, s side fully filled. This is the
            // only irrational root; its approximation is admitted only
            // under strict interval membership in exact arithmetic.
            let radicand = &b_frontier.pi
                * (&factor * (b_total + b_skipped) + &s_suffix_ybp[sj] - s_skipped_weighted)
                / (&two * &factor * s_total);
            if let Some(root) = rational_sqrt(&radicand) {
                push_open(&mut candidates, root);
            }

            // Root 5: all orders on both sides fully filled.
            push_open(&mut candidates, b_total / (s_total * &factor));
        }
    }

    candidates
}
