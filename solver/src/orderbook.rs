//! Order-level operations shared by the solver components: balance capping,
//! execution priority, fee accounting, economic viability and solution
//! metrics.

use crate::arith::{Arithmetic, SmartContract};
use crate::config::Config;
use crate::models::{AccountState, Fee, Order, Prices, TokenId};
use num::{BigInt, BigRational, Signed, Zero};
use std::collections::{BTreeMap, BTreeSet};

/// Number of orders with a non-zero executed amount.
pub fn count_nr_exec_orders<'a>(orders: impl IntoIterator<Item = &'a Order>) -> usize {
    orders.into_iter().filter(|order| order.is_executed()).count()
}

pub fn is_trivial(orders: &[Order]) -> bool {
    count_nr_exec_orders(orders) == 0
}

/// Sorts orders by execution priority: best limit rate first, stable on the
/// original order for deterministic ties.
pub fn sort_by_exec_priority(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.max_xrate().cmp(a.max_xrate()));
}

/// Restricts order sell amounts to the available account balances.
///
/// Orders are visited by limit price (best first) per account and token
/// pair; each order is capped by the balance the better orders left behind.
/// Orders that end up with a zero sell amount are dropped.
pub fn restrict_order_sell_amounts_by_balances(
    mut orders: Vec<Order>,
    accounts: &AccountState,
) -> Vec<Order> {
    sort_by_exec_priority(&mut orders);

    let mut remaining_balances = BTreeMap::<(String, TokenId, TokenId), BigRational>::new();
    let mut orders_capped = Vec::with_capacity(orders.len());

    for mut order in orders {
        let account_id = order.account_id.clone().unwrap_or_default();
        let key = (
            account_id.clone(),
            order.sell_token.clone(),
            order.buy_token.clone(),
        );
        let remaining = remaining_balances.entry(key).or_insert_with(|| {
            BigRational::from_integer(accounts.read_balance(&account_id, &order.sell_token))
        });

        let sell_amount_new = order.max_sell_amount().clone().min(remaining.clone());
        if sell_amount_new.is_zero() || sell_amount_new.is_negative() {
            continue;
        }
        debug_assert!(order.max_sell_amount() > &BigRational::zero());

        *remaining -= &sell_amount_new;
        debug_assert!(!remaining.is_negative());

        order.set_max_sell_amount(sell_amount_new);
        orders_capped.push(order);
    }

    orders_capped
}

/// Moves orders that can never be matched against the opposing side (no
/// limit-rate overlap once the fee is deducted twice) to the back of each
/// list; returns how many realizable orders lead each list.
pub fn prune_unrealizable_orders(
    b_orders: &mut Vec<Order>,
    s_orders: &mut Vec<Order>,
    fee: &Fee,
) -> (usize, usize) {
    if b_orders.is_empty() || s_orders.is_empty() {
        return (0, 0);
    }

    let factor_squared = fee.factor() * fee.factor();
    let max_b_xrate = b_orders.iter().map(|o| o.max_xrate().clone()).max().unwrap();
    let max_s_xrate = s_orders.iter().map(|o| o.max_xrate().clone()).max().unwrap();

    // b and s limits overlap iff b_xrate * s_xrate * (1 - fee)^2 >= 1.
    let one = BigRational::from_integer(1.into());
    let realizable = |own_xrate: &BigRational, best_other: &BigRational| {
        own_xrate * best_other * &factor_squared >= one
    };

    let partition = |orders: &mut Vec<Order>, best_other: &BigRational| {
        orders.sort_by_key(|order| !realizable(order.max_xrate(), best_other));
        orders
            .iter()
            .take_while(|order| realizable(order.max_xrate(), best_other))
            .count()
    };

    let nr_b = partition(b_orders, &max_s_xrate);
    let nr_s = partition(s_orders, &max_b_xrate);
    (nr_b, nr_s)
}

/// Counts orders whose limit allows execution at the given rate.
pub fn count_orders_satisfying_xrate(orders: &[Order], xrate: &BigRational, fee: &Fee) -> usize {
    orders
        .iter()
        .filter(|order| xrate <= &(order.max_xrate() * fee.factor()))
        .count()
}

/// The list of tokens connected to the fee token, in breadth-first
/// discovery order.
///
/// Only tokens that are both sold and bought can sit on a path between two
/// other tokens.
pub fn compute_connected_tokens(orders: &[Order], fee_token: &TokenId) -> Vec<TokenId> {
    let tokens_sold: BTreeSet<_> = orders.iter().map(|o| o.sell_token.clone()).collect();
    let tokens_bought: BTreeSet<_> = orders.iter().map(|o| o.buy_token.clone()).collect();

    let mut adjacency = BTreeMap::<TokenId, BTreeSet<TokenId>>::new();
    for token in tokens_sold.intersection(&tokens_bought) {
        adjacency.insert(token.clone(), BTreeSet::new());
    }
    adjacency.entry(fee_token.clone()).or_default();

    for order in orders {
        if adjacency.contains_key(&order.sell_token) && adjacency.contains_key(&order.buy_token)
        {
            adjacency
                .get_mut(&order.buy_token)
                .unwrap()
                .insert(order.sell_token.clone());
            adjacency
                .get_mut(&order.sell_token)
                .unwrap()
                .insert(order.buy_token.clone());
        }
    }

    let mut connected = vec![fee_token.clone()];
    let mut cursor = 0;
    while cursor < connected.len() {
        let current = connected[cursor].clone();
        for adjacent in &adjacency[&current] {
            if !connected.contains(adjacent) {
                connected.push(adjacent.clone());
            }
        }
        cursor += 1;
    }
    connected
}

/// Net fee collected by the solution: fee sold minus fee bought.
pub fn compute_total_fee<A: Arithmetic>(
    orders: &[Order],
    prices: &Prices,
    fee: &Fee,
) -> BigRational {
    let sold_fee: BigRational = orders
        .iter()
        .filter(|order| order.sell_token == fee.token)
        .map(|order| order.sell_amount_from_buy_amount::<A>(prices, fee))
        .sum();
    let bought_fee: BigRational = orders
        .iter()
        .filter(|order| order.buy_token == fee.token)
        .map(|order| order.buy_amount.clone())
        .sum();
    sold_fee - bought_fee
}

pub fn compute_average_order_fee<A: Arithmetic>(
    orders: &[Order],
    prices: &Prices,
    fee: &Fee,
) -> BigRational {
    let nr_exec_orders = count_nr_exec_orders(orders);
    assert!(nr_exec_orders > 0, "average fee of an empty solution");
    compute_total_fee::<A>(orders, prices, fee)
        / BigRational::from_integer(BigInt::from(nr_exec_orders))
}

/// An executed order's fee contribution, its buy volume priced in fee-token
/// units times the fee ratio.
fn order_fee_contribution(
    order: &Order,
    prices: &Prices,
    fee: &Fee,
    config: &Config,
) -> BigRational {
    let buy_token_price = prices
        .get(&order.buy_token)
        .cloned()
        .unwrap_or_else(BigInt::zero);
    &order.buy_amount * BigRational::from_integer(buy_token_price) * &fee.ratio
        / BigRational::from_integer(config.fee_token_price.clone())
}

/// Checks the minimum-average-fee (and minimum-absolute-fee) constraints.
/// The trivial solution is always viable.
pub fn is_economic_viable<A: Arithmetic>(
    orders: &[Order],
    prices: &Prices,
    fee: &Fee,
    config: &Config,
) -> bool {
    if count_nr_exec_orders(orders) == 0 {
        return true;
    }

    // Shortcut to avoid computing fees.
    if config.min_average_order_fee.is_zero() && config.min_absolute_order_fee.is_zero() {
        return true;
    }

    let average = compute_average_order_fee::<A>(orders, prices, fee);
    if average < BigRational::from_integer(config.min_average_order_fee.clone()) {
        return false;
    }

    let min_absolute = BigRational::from_integer(config.min_absolute_order_fee.clone());
    orders
        .iter()
        .filter(|order| order.is_executed())
        .all(|order| order_fee_contribution(order, prices, fee, config) >= min_absolute)
}

/// A maximal subset of orders that can satisfy the minimum average fee
/// constraint, assuming prices stay fixed. This is an approximation: the
/// returned subset is not guaranteed to be feasible; only its emptiness is
/// meaningful to the caller.
pub fn compute_approx_economic_viable_subset<A: Arithmetic>(
    orders: &[Order],
    prices: &Prices,
    fee: &Fee,
    config: &Config,
) -> Vec<Order> {
    if config.min_average_order_fee.is_zero() {
        return orders.to_vec();
    }

    // Sort executed orders by decreasing volume.
    let mut by_dec_volume: Vec<Order> = orders
        .iter()
        .filter(|order| order.is_executed())
        .cloned()
        .collect();
    by_dec_volume.sort_by(|a, b| {
        let volume = |order: &Order| {
            let price = prices
                .get(&order.buy_token)
                .cloned()
                .unwrap_or_else(BigInt::zero);
            &order.buy_amount * BigRational::from_integer(price)
        };
        volume(b).cmp(&volume(a))
    });

    // The largest prefix of highest-volume orders whose average fee clears
    // the threshold.
    let min_average = BigRational::from_integer(config.min_average_order_fee.clone());
    let mut size = 0;
    while size < by_dec_volume.len()
        && compute_average_order_fee::<A>(&by_dec_volume[..size + 1], prices, fee)
            >= min_average
    {
        size += 1;
    }
    by_dec_volume.truncate(size);

    // A subset with only buy orders or only sell orders reduces further to
    // the trivial solution.
    let buy_tokens: BTreeSet<_> = by_dec_volume.iter().map(|o| o.buy_token.clone()).collect();
    if buy_tokens.len() == 1 {
        return Vec::new();
    }
    by_dec_volume
}

/// The imbalance of the b token caused by fees: total b sold by s-orders
/// minus total b bought by b-orders. The s token is exactly balanced by
/// construction of the execution engine.
pub fn compute_b_buy_token_imbalance<A: Arithmetic>(
    b_orders: &[Order],
    s_orders: &[Order],
    xrate: &BigRational,
    b_buy_token_price: &BigRational,
    fee: &Fee,
) -> BigRational {
    let s_xrate = xrate.recip();
    let s_buy_token_price = b_buy_token_price / xrate;
    let s_total_sell_amount: BigRational = s_orders
        .iter()
        .map(|order| A::sell_from_buy(&order.buy_amount, &s_xrate, &s_buy_token_price, fee))
        .sum();
    let b_total_buy_amount: BigRational =
        b_orders.iter().map(|order| order.buy_amount.clone()).sum();
    s_total_sell_amount - b_total_buy_amount
}

fn objective_for_orders<A: Arithmetic>(
    orders: &[Order],
    xrate: &BigRational,
    buy_token_price: &BigRational,
    fee: &Fee,
) -> BigRational {
    let zero_balance = BigRational::zero();
    orders
        .iter()
        .map(|order| A::objective_term(order, xrate, buy_token_price, fee, &zero_balance))
        .sum()
}

/// Objective value for a token pair plus fee token execution: the `2u -
/// u_max` terms of all three order lists plus half the fees paid.
pub fn compute_pair_objective<A: Arithmetic>(
    b_orders: &[Order],
    s_orders: &[Order],
    f_orders: &[Order],
    xrate: &BigRational,
    b_buy_token_price: &BigRational,
    fee: &Fee,
    config: &Config,
) -> BigRational {
    let fee_token_price = BigRational::from_integer(config.fee_token_price.clone());

    let t1 = objective_for_orders::<A>(b_orders, xrate, b_buy_token_price, fee);
    let t2 = objective_for_orders::<A>(
        s_orders,
        &xrate.recip(),
        &(b_buy_token_price / xrate),
        fee,
    );
    let t3 = objective_for_orders::<A>(
        f_orders,
        &(b_buy_token_price / &fee_token_price),
        b_buy_token_price,
        fee,
    );

    // The b imbalance priced in fee token is the total fee volume.
    let b_imbalance =
        compute_b_buy_token_imbalance::<A>(b_orders, s_orders, xrate, b_buy_token_price, fee);
    let fees_payed = b_imbalance * b_buy_token_price / fee_token_price;

    t1 + t2 + t3 + fees_payed / BigRational::from_integer(2.into())
}

pub fn compute_pair_objective_rational(
    b_orders: &[Order],
    s_orders: &[Order],
    f_orders: &[Order],
    xrate: &BigRational,
    b_buy_token_price: &BigRational,
    fee: &Fee,
    config: &Config,
) -> BigRational {
    compute_pair_objective::<crate::arith::Rational>(
        b_orders,
        s_orders,
        f_orders,
        xrate,
        b_buy_token_price,
        fee,
        config,
    )
}

fn updated_balance(accounts: &AccountState, order: &Order) -> BigRational {
    match &order.account_id {
        Some(account_id) => {
            BigRational::from_integer(accounts.read_balance(account_id, &order.sell_token))
        }
        None => BigRational::zero(),
    }
}

/// Whole-solution objective under smart-contract semantics, used to compare
/// token pairs: `2 * Σu - Σu_max` with `u_max` clamped from below by `u`.
pub fn compute_objective_value(
    prices: &Prices,
    accounts_updated: &AccountState,
    orders: &[Order],
    fee: &Fee,
) -> BigRational {
    let mut total_u = BigRational::zero();
    let mut total_umax = BigRational::zero();

    for order in orders {
        let (buy_token_price, sell_token_price) =
            match (prices.get(&order.buy_token), prices.get(&order.sell_token)) {
                (Some(buy), Some(sell)) => (
                    BigRational::from_integer(buy.clone()),
                    BigRational::from_integer(sell.clone()),
                ),
                _ => {
                    debug_assert!(!order.is_executed());
                    continue;
                }
            };
        let xrate = &buy_token_price / &sell_token_price;

        let u = SmartContract::utility_term(order, &xrate, &buy_token_price, fee);
        let balance = updated_balance(accounts_updated, order);
        let umax =
            SmartContract::max_utility_term(order, &xrate, &buy_token_price, fee, &balance)
                .max(u.clone());

        total_u += u;
        total_umax += umax;
    }

    BigRational::from_integer(2.into()) * total_u - total_umax
}

/// Objective function values and other metrics of a solved instance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjVals {
    pub volume: BigInt,
    pub utility: BigInt,
    pub utility_disreg: BigInt,
    pub utility_disreg_touched: BigInt,
    pub fees: BigInt,
    pub orders_touched: usize,
}

/// Computes the reported solution metrics under smart-contract semantics
/// against post-trade account balances.
pub fn compute_solution_metrics(
    prices: &Prices,
    accounts_updated: &AccountState,
    orders: &[Order],
    fee: &Fee,
) -> ObjVals {
    let mut obj = ObjVals::default();

    for order in orders {
        let (buy_token_price, sell_token_price) =
            match (prices.get(&order.buy_token), prices.get(&order.sell_token)) {
                (Some(buy), Some(sell)) => (
                    BigRational::from_integer(buy.clone()),
                    BigRational::from_integer(sell.clone()),
                ),
                _ => {
                    debug_assert!(!order.is_executed());
                    continue;
                }
            };

        obj.volume += (&order.sell_amount * &sell_token_price).to_integer();

        let xrate = &buy_token_price / &sell_token_price;
        let u = SmartContract::utility_term(order, &xrate, &buy_token_price, fee);
        let balance = updated_balance(accounts_updated, order);
        let umax =
            SmartContract::max_utility_term(order, &xrate, &buy_token_price, fee, &balance);

        if u > umax {
            log::warn!(
                "computed utility of <{:?}> larger than maximum utility: u = {}, umax = {}",
                order.index,
                u,
                umax,
            );
        }

        obj.utility += u.to_integer();
        obj.utility_disreg += (&umax - &u).max(BigRational::zero()).to_integer();

        if order.sell_amount > BigRational::zero() {
            obj.orders_touched += 1;
            obj.utility_disreg_touched += (&umax - &u).to_integer();
        }

        // Fee amount as net difference of fee token sold and bought.
        if order.sell_token == fee.token {
            obj.fees += order.sell_amount.to_integer();
        } else if order.buy_token == fee.token {
            obj.fees -= order.buy_amount.to_integer();
        }
    }

    obj
}
