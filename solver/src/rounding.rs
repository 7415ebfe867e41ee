//! Integer rounding: the scoped rounding buffer applied before the final
//! execution pass, and the spanning-arborescence rounder that snaps a
//! rational solution to integers and pushes every residual token imbalance
//! into the fee token.

use crate::arith::SmartContract;
use crate::config::Config;
use crate::models::{Fee, Order, Prices, TokenId};
use num::{BigInt, BigRational, One, Zero};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// The amount, in a token with the given price, that integer rounding may
/// move on a single order. Very cheap tokens are clamped to one unit.
fn max_rounding_amount(token_price: &BigRational, config: &Config) -> BigRational {
    let price_in_fee_token =
        token_price / BigRational::from_integer(config.fee_token_price.clone());
    let max_rounding_volume = BigRational::from_integer(config.max_rounding_volume.clone());
    (max_rounding_volume / price_in_fee_token).max(BigRational::one())
}

fn rounding_buffer(
    buy_token_price: &BigRational,
    xrate_estimate: &BigRational,
    config: &Config,
) -> BigRational {
    let error_squared = BigRational::from_integer(BigInt::from(
        u64::from(config.price_estimation_error) * u64::from(config.price_estimation_error),
    ));
    (max_rounding_amount(buy_token_price, config) * xrate_estimate * error_squared).ceil()
}

/// Runs `body` with every order's `max_sell_amount` conservatively shrunk
/// by its rounding buffer, so the later integer rounding cannot push an
/// order past its maximum sell amount. The original amounts are restored on
/// every exit path.
pub fn with_rounding_buffer<R>(
    b_orders: &mut [Order],
    s_orders: &mut [Order],
    xrate: &BigRational,
    b_buy_token_price: &BigInt,
    config: &Config,
    body: impl FnOnce(&mut [Order], &mut [Order]) -> R,
) -> R {
    let b_originals: Vec<BigRational> = b_orders
        .iter()
        .map(|order| order.max_sell_amount().clone())
        .collect();
    let s_originals: Vec<BigRational> = s_orders
        .iter()
        .map(|order| order.max_sell_amount().clone())
        .collect();

    let b_buy_token_price = BigRational::from_integer(b_buy_token_price.clone());
    let s_buy_token_price = &b_buy_token_price / xrate;

    // b orders buy the b token at an estimated rate of `xrate`; s orders
    // buy the s token at its inverse.
    let b_buffer = rounding_buffer(&b_buy_token_price, xrate, config);
    let s_buffer = rounding_buffer(&s_buy_token_price, &xrate.recip(), config);

    let apply = |orders: &mut [Order], buffer: &BigRational| {
        for order in orders.iter_mut() {
            let buffered = (order.max_sell_amount() - buffer).max(BigRational::zero());
            order.set_max_sell_amount(buffered);
        }
    };
    apply(b_orders, &b_buffer);
    apply(s_orders, &s_buffer);

    let result = body(b_orders, s_orders);

    for (order, original) in b_orders.iter_mut().zip(b_originals) {
        order.force_set_max_sell_amount(original);
    }
    for (order, original) in s_orders.iter_mut().zip(s_originals) {
        order.force_set_max_sell_amount(original);
    }

    result
}

/// The (im)balance of every token: amount sold minus amount bought.
fn compute_token_balances<'a>(
    tokens: impl IntoIterator<Item = &'a TokenId>,
    orders: &[Order],
) -> BTreeMap<TokenId, BigInt> {
    let mut balances: BTreeMap<TokenId, BigInt> = tokens
        .into_iter()
        .map(|token| (token.clone(), BigInt::zero()))
        .collect();

    for order in orders {
        if let Some(balance) = balances.get_mut(&order.buy_token) {
            *balance -= order.buy_amount.to_integer();
        }
        if let Some(balance) = balances.get_mut(&order.sell_token) {
            *balance += order.sell_amount.to_integer();
        }
    }
    balances
}

/// Computes a spanning arborescence of the touched-token graph with the fee
/// token as root, as a `child -> parent` map.
///
/// Arcs correspond to orders and point from sell token to buy token; arcs
/// into the fee token are excluded to force it to be the root. On the
/// deduplicated unit-weight digraph the optimum branching rooted at the fee
/// token is its directed spanning tree, so a breadth-first tree from the
/// fee token is taken. Tokens unreachable from the fee token can never get
/// their imbalance absorbed and make the rounding fail, signalled by
/// `None`.
fn compute_spanning_order_arborescence(
    orders: &[Order],
    fee: &Fee,
) -> Option<BTreeMap<TokenId, TokenId>> {
    // Deduplicate arcs, preserving insertion order.
    let mut graph = DiGraph::<TokenId, ()>::new();
    let mut nodes: HashMap<TokenId, NodeIndex> = HashMap::new();
    let mut node = |graph: &mut DiGraph<TokenId, ()>,
                    nodes: &mut HashMap<TokenId, NodeIndex>,
                    token: &TokenId| {
        *nodes
            .entry(token.clone())
            .or_insert_with(|| graph.add_node(token.clone()))
    };
    for order in orders {
        if order.buy_token == fee.token {
            continue;
        }
        let sell = node(&mut graph, &mut nodes, &order.sell_token);
        let buy = node(&mut graph, &mut nodes, &order.buy_token);
        graph.update_edge(sell, buy, ());
    }

    log::debug!(
        "directed edges: {:?}",
        graph
            .edge_indices()
            .filter_map(|e| graph.edge_endpoints(e))
            .map(|(a, b)| (graph[a].clone(), graph[b].clone()))
            .collect::<Vec<_>>(),
    );

    let mut tree = BTreeMap::new();
    let root = match nodes.get(&fee.token) {
        Some(&root) => root,
        // The fee token is not even part of the graph: only fine if the
        // graph is empty altogether.
        None => return if nodes.is_empty() { Some(tree) } else { None },
    };

    let mut queue = VecDeque::new();
    queue.push_back(root);
    let mut visited = vec![false; graph.node_count()];
    visited[root.index()] = true;
    while let Some(current) = queue.pop_front() {
        for next in graph.neighbors(current) {
            if !visited[next.index()] {
                visited[next.index()] = true;
                tree.insert(graph[next].clone(), graph[current].clone());
                queue.push_back(next);
            }
        }
    }

    if visited.iter().all(|&v| v) {
        Some(tree)
    } else {
        None
    }
}

/// Rounds the rational solution to integers: floors every buy amount,
/// recomputes sell amounts with smart-contract arithmetic at the uniform
/// clearing prices, and iteratively moves the residual imbalances along the
/// spanning arborescence towards the fee token.
///
/// Returns false if some non-fee token cannot be balanced; the caller then
/// discards the solution.
pub fn round_solution(prices: &Prices, orders: &mut [Order], fee: &Fee, config: &Config) -> bool {
    for order in orders.iter_mut() {
        order.buy_amount = order.buy_amount.floor();
        order.set_sell_amount_from_buy_amount::<SmartContract>(prices, fee);
    }

    let mut token_balances = compute_token_balances(prices.keys(), orders);
    for (token, balance) in &token_balances {
        log::debug!("token balance (initial) {} : {}", token, balance);
    }

    let executed: Vec<Order> = orders
        .iter()
        .filter(|order| order.sell_amount > BigRational::zero())
        .cloned()
        .collect();
    let mut tree = match compute_spanning_order_arborescence(&executed, fee) {
        Some(tree) => tree,
        None => return false,
    };

    while !tree.is_empty() {
        // Any node without children works as the next leaf to drain.
        let leaf_token = tree
            .keys()
            .find(|child| !tree.values().any(|parent| parent == *child))
            .cloned()
            .expect("non-empty arborescence has a leaf");
        let parent_token = tree[&leaf_token].clone();

        // Adjust orders selling the parent for the leaf, largest executed
        // amount first so the procedure touches as few orders as possible.
        let mut candidates: Vec<usize> = (0..orders.len())
            .filter(|&i| {
                orders[i].buy_token == leaf_token
                    && orders[i].sell_token == parent_token
                    && orders[i].is_executed()
            })
            .collect();
        candidates.sort_by(|&i, &j| orders[j].buy_amount.cmp(&orders[i].buy_amount));

        for i in candidates {
            let order = &orders[i];
            let min_tradable = BigRational::from_integer(config.min_tradable_amount.clone());

            let buy_amount_delta = (&order.buy_amount - &min_tradable)
                .min(BigRational::from_integer(-&token_balances[&leaf_token]));

            // Skip if the reduction violates the minimum tradable amount.
            if &order.buy_amount - &buy_amount_delta < min_tradable {
                continue;
            }
            // Skip if the recomputed sell amount violates the maximum.
            let new_buy_amount = &order.buy_amount - &buy_amount_delta;
            let new_sell_amount =
                order.sell_amount_for_buy_amount::<SmartContract>(&new_buy_amount, prices, fee);
            if &new_sell_amount > order.max_sell_amount() {
                continue;
            }

            *token_balances.get_mut(&leaf_token).unwrap() += buy_amount_delta.to_integer();
            let order = &mut orders[i];
            log::debug!(
                "adjusting order {:?}: buy {} -> {}, sell {} -> {}",
                order.index,
                order.buy_amount,
                new_buy_amount,
                order.sell_amount,
                new_sell_amount,
            );
            order.buy_amount = new_buy_amount;
            order.sell_amount = new_sell_amount;

            if token_balances[&leaf_token].is_zero() {
                break;
            }
        }

        token_balances = compute_token_balances(prices.keys(), orders);
        for (token, balance) in &token_balances {
            log::debug!("token balance (after {}) {} : {}", leaf_token, token, balance);
        }

        // Not enough adjustable volume between this leaf and its parent.
        if !token_balances[&leaf_token].is_zero() {
            return false;
        }

        tree.remove(&leaf_token);
    }

    // Every non-fee token must net out to zero by now.
    token_balances
        .iter()
        .all(|(token, balance)| token == &fee.token || balance.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::test_util::order;
    use num::Signed;

    fn fee() -> Fee {
        Fee {
            token: "F".into(),
            ratio: BigRational::new(1.into(), 1000.into()),
        }
    }

    fn rat(numer: i128, denom: i128) -> BigRational {
        BigRational::new(BigInt::from(numer), BigInt::from(denom))
    }

    fn prices(entries: &[(&str, u128)]) -> Prices {
        entries
            .iter()
            .map(|(token, price)| (TokenId::from(*token), BigInt::from(*price)))
            .collect()
    }

    #[test]
    fn buffer_is_restored_on_every_exit() {
        let config = Config::default();
        let mut b_orders = vec![order(0, "T0", "T1", 1_000_000_000, (2, 1))];
        let mut s_orders = vec![order(1, "T1", "T0", 1_000_000_000, (2, 1))];
        let price = BigInt::from(1_000_000_000_000_000_000u64);

        let buffered = with_rounding_buffer(
            &mut b_orders,
            &mut s_orders,
            &rat(1, 1),
            &price,
            &config,
            |b_orders, _| b_orders[0].max_sell_amount().clone(),
        );
        assert!(buffered < rat(1_000_000_000, 1));
        assert_eq!(b_orders[0].max_sell_amount(), &rat(1_000_000_000, 1));
        assert_eq!(s_orders[0].max_sell_amount(), &rat(1_000_000_000, 1));
    }

    #[test]
    fn buffer_never_goes_negative() {
        let config = Config::default();
        let mut b_orders = vec![order(0, "T0", "T1", 100, (2, 1))];
        let mut s_orders: Vec<Order> = Vec::new();
        let price = BigInt::from(1_000_000_000_000_000_000u64);

        with_rounding_buffer(
            &mut b_orders,
            &mut s_orders,
            &rat(1, 1),
            &price,
            &config,
            |b_orders, _| {
                assert_eq!(b_orders[0].max_sell_amount(), &BigRational::zero());
            },
        );
        assert_eq!(b_orders[0].max_sell_amount(), &rat(100, 1));
    }

    #[test]
    fn arborescence_roots_at_the_fee_token() {
        let mut orders = vec![
            // This order buys the fee token: its arc is excluded.
            order(0, "F", "T0", 100_000, (1, 1)),
            order(1, "T1", "T0", 100_000, (1, 1)),
            order(2, "T0", "F", 100_000, (1, 1)),
        ];
        for order in orders.iter_mut() {
            order.buy_amount = rat(50_000, 1);
            order.sell_amount = rat(50_000, 1);
        }

        let tree = compute_spanning_order_arborescence(&orders, &fee()).unwrap();
        assert_eq!(tree.get(&"T0".into()), Some(&TokenId::from("F")));
        assert_eq!(tree.get(&"T1".into()), Some(&TokenId::from("T0")));
        assert!(!tree.contains_key(&"F".into()));
    }

    #[test]
    fn unreachable_token_fails_the_arborescence() {
        let mut orders = vec![order(0, "T1", "T0", 100_000, (1, 1))];
        orders[0].buy_amount = rat(50_000, 1);
        orders[0].sell_amount = rat(50_000, 1);
        assert!(compute_spanning_order_arborescence(&orders, &fee()).is_none());
    }

    #[test]
    fn rounding_pushes_residuals_into_the_fee_token() {
        let config = Config::default();
        let prices = prices(&[("F", 1_000_000_000_000_000_000), ("T0", 1_000_000_000_000_000_000)]);

        // An f order sells fee for T0 and a counter order sells T0 for fee;
        // make the T0 side slightly imbalanced with a fractional amount.
        let mut orders = vec![
            order(0, "T0", "F", 10_000_000, (2, 1)),
            order(1, "F", "T0", 10_000_000, (2, 1)),
        ];
        orders[0].buy_amount = rat(2_000_001, 2); // 1000000.5
        orders[1].buy_amount = rat(1_000_000, 1);

        assert!(round_solution(&prices, &mut orders, &fee(), &config));

        // All amounts integral, all non-fee tokens balanced.
        for order in &orders {
            assert!(order.buy_amount.is_integer());
            assert!(order.sell_amount.is_integer());
        }
        let balances = compute_token_balances(prices.keys(), &orders);
        assert!(balances[&TokenId::from("T0")].is_zero());
        assert!(!balances[&TokenId::from("F")].is_negative());
    }

    #[test]
    fn rounding_fails_when_no_order_can_absorb_the_residual() {
        let config = Config::default();
        let prices = prices(&[("F", 1_000_000_000_000_000_000), ("T0", 1_000_000_000_000_000_000)]);

        // The only order buying T0 has no max-sell headroom left, so it
        // cannot grow to absorb the missing counter-volume.
        let mut orders = vec![
            order(0, "T0", "F", 10_010, (2, 1)),
            order(1, "F", "T0", 10_000_000, (2, 1)),
        ];
        orders[0].buy_amount = rat(10_000, 1);
        orders[1].buy_amount = rat(1_000_000, 1);

        assert!(!round_solution(&prices, &mut orders, &fee(), &config));
    }
}
