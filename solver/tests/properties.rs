//! Randomized invariant tests on small generated instances. All randomness
//! is seeded, so failures reproduce deterministically.

use num::{BigInt, BigRational, One, Signed, Zero};
use open_solver::execution::compute_buy_amounts;
use open_solver::models::order::Order;
use open_solver::orderbook::compute_pair_objective_rational;
use open_solver::solver::solve_token_pair_and_fee_token_economic_viable;
use open_solver::validation::validate;
use open_solver::xrate::find_best_xrate;
use open_solver::{AccountState, Config, Fee};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn fee() -> Fee {
    Fee {
        token: "F".into(),
        ratio: BigRational::new(1.into(), 1000.into()),
    }
}

fn random_order(
    rng: &mut StdRng,
    index: usize,
    buy_token: &str,
    sell_token: &str,
) -> Order {
    let max_sell_amount: u64 = rng.gen_range(9_000..=20_000);
    let numerator: i64 = rng.gen_range(1..=10);
    let denominator: i64 = rng.gen_range(1..=10);
    Order::new(
        Some(index),
        Some("A".to_string()),
        buy_token.into(),
        sell_token.into(),
        BigRational::from_integer(max_sell_amount.into()),
        BigRational::new(numerator.into(), denominator.into()),
    )
}

fn random_order_list(
    rng: &mut StdRng,
    first_index: usize,
    buy_token: &str,
    sell_token: &str,
) -> Vec<Order> {
    let len = rng.gen_range(1..=4);
    (0..len)
        .map(|i| random_order(rng, first_index + i, buy_token, sell_token))
        .collect()
}

/// One account holding enough of every sold token to cover all orders.
fn accounts_covering(orders: &[&[Order]]) -> AccountState {
    let mut accounts = AccountState::default();
    let balances = accounts.0.entry("A".to_string()).or_default();
    for order in orders.iter().copied().flatten() {
        let entry = balances.entry(order.sell_token.clone()).or_default();
        *entry += order.max_sell_amount().to_integer();
    }
    accounts
}

/// Every solution of a random instance satisfies all constraints: the
/// validator (which checks balances, limits, minimums and caps) must accept
/// it, and it must be accepted identically a second time.
#[test]
fn random_instances_solve_to_valid_solutions() {
    let mut rng = StdRng::seed_from_u64(0x1337);
    let config = Config::default();

    for _ in 0..40 {
        let mut b_orders = random_order_list(&mut rng, 0, "T0", "T1");
        let mut s_orders = random_order_list(&mut rng, 10, "T1", "T0");
        let mut f_orders = random_order_list(&mut rng, 20, "T0", "F");
        let accounts = accounts_covering(&[&b_orders, &s_orders, &f_orders]);

        let solution = solve_token_pair_and_fee_token_economic_viable(
            (&"T0".into(), &"T1".into()),
            &accounts,
            &mut b_orders,
            &mut s_orders,
            &mut f_orders,
            &fee(),
            &config,
            None,
        )
        .unwrap();

        // Touched-order cap.
        let touched = solution.orders.iter().filter(|o| o.is_executed()).count();
        assert!(touched <= config.max_nr_exec_orders);

        // All executed amounts are integral.
        for order in &solution.orders {
            assert!(order.buy_amount.is_integer());
            assert!(order.sell_amount.is_integer());
        }

        // Idempotent validation.
        validate(&accounts, &solution.orders, &solution.prices, &fee(), &config).unwrap();
        validate(&accounts, &solution.orders, &solution.prices, &fee(), &config).unwrap();
    }
}

/// Account balances can be tighter than the order sell amounts; the
/// capping at load time must keep every account non-negative after the
/// trade.
#[test]
fn tight_account_balances_stay_non_negative() {
    let mut rng = StdRng::seed_from_u64(0xacc0);
    let config = Config::default();

    for _ in 0..40 {
        let b_orders = random_order_list(&mut rng, 0, "T0", "T1");
        let s_orders = random_order_list(&mut rng, 10, "T1", "T0");
        let f_orders = random_order_list(&mut rng, 20, "T0", "F");

        // Balances at roughly half of what the orders would like to sell.
        let mut accounts = accounts_covering(&[&b_orders, &s_orders, &f_orders]);
        for balances in accounts.0.values_mut() {
            for balance in balances.values_mut() {
                *balance /= BigInt::from(2);
            }
        }

        let orders: Vec<Order> = b_orders
            .iter()
            .chain(s_orders.iter())
            .chain(f_orders.iter())
            .cloned()
            .collect();
        let capped =
            open_solver::orderbook::restrict_order_sell_amounts_by_balances(orders, &accounts);
        let mut b_orders: Vec<Order> = capped
            .iter()
            .filter(|o| o.buy_token == "T0".into() && o.sell_token == "T1".into())
            .cloned()
            .collect();
        let mut s_orders: Vec<Order> = capped
            .iter()
            .filter(|o| o.buy_token == "T1".into() && o.sell_token == "T0".into())
            .cloned()
            .collect();
        let mut f_orders: Vec<Order> = capped
            .iter()
            .filter(|o| o.sell_token == "F".into())
            .cloned()
            .collect();

        let solution = solve_token_pair_and_fee_token_economic_viable(
            (&"T0".into(), &"T1".into()),
            &accounts,
            &mut b_orders,
            &mut s_orders,
            &mut f_orders,
            &fee(),
            &config,
            None,
        )
        .unwrap();

        let updated = accounts.updated_for(&solution.orders);
        for balances in updated.0.values() {
            for balance in balances.values() {
                assert!(!balance.is_negative());
            }
        }
    }
}

/// No uniformly sampled rate in the feasible interval beats the rate the
/// optimizer returns.
#[test]
fn optimizer_dominates_random_rates() {
    let mut rng = StdRng::seed_from_u64(0x0b57);

    for _ in 0..10 {
        let mut b_orders = random_order_list(&mut rng, 0, "T0", "T1");
        let mut s_orders = random_order_list(&mut rng, 10, "T1", "T0");

        let config = Config {
            min_tradable_amount: BigInt::zero(),
            min_tradable_amount_rounding_tol: BigRational::zero(),
            max_nr_exec_orders: b_orders.len() + s_orders.len(),
            ..Config::default()
        };
        let factor = fee().factor();

        // Skip instances where no matching is possible at all.
        let xrate_ub = b_orders
            .iter()
            .map(|o| o.max_xrate() * &factor)
            .max()
            .unwrap();
        let xrate_lb = s_orders
            .iter()
            .map(|o| (o.max_xrate() * &factor).recip())
            .min()
            .unwrap();
        if xrate_lb > xrate_ub {
            continue;
        }

        let (_, best_objective) =
            find_best_xrate(&mut b_orders, &mut s_orders, &fee(), &config).unwrap();

        for _ in 0..100 {
            // A uniformly random rational rate within the feasible interval.
            let numerator: u64 = rng.gen_range(0..=1_000_000);
            let position = BigRational::new(numerator.into(), 1_000_000.into());
            let xrate = &xrate_lb + (&xrate_ub - &xrate_lb) * position;

            compute_buy_amounts(
                &xrate,
                &mut b_orders,
                &mut s_orders,
                &fee(),
                &config,
                config.max_nr_exec_orders,
            );
            let objective = compute_pair_objective_rational(
                &b_orders,
                &s_orders,
                &[],
                &xrate,
                &BigRational::one(),
                &fee(),
                &config,
            );
            assert!(
                objective <= best_objective,
                "objective at {} beats the optimizer",
                xrate,
            );
        }
    }
}

/// Loading then dumping a solved instance and reloading it yields identical
/// executed amounts.
#[test]
fn solution_files_round_trip() {
    use open_solver::instance::Instance;

    let config = Config::default();
    let json = serde_json::json!({
        "fee": {"token": "F", "ratio": 0.001},
        "accounts": {
            "A": {
                "F": "10000000000000000000000",
                "T0": "10000000000000000000000",
                "T1": "10000000000000000000000",
            },
        },
        "orders": [
            {"accountID": "A", "buyToken": "F", "sellToken": "T1",
             "buyAmount": "50000", "sellAmount": "100000"},
            {"accountID": "A", "buyToken": "T1", "sellToken": "F",
             "buyAmount": "50000", "sellAmount": "100000"},
        ],
    });
    let instance: Instance = serde_json::from_value(json).unwrap();
    let fee = instance.fee();

    let (accounts, mut b_orders, mut s_orders, mut f_orders) = instance
        .load_problem((&"F".into(), &"T1".into()), &config)
        .unwrap();
    let solution = solve_token_pair_and_fee_token_economic_viable(
        (&"F".into(), &"T1".into()),
        &accounts,
        &mut b_orders,
        &mut s_orders,
        &mut f_orders,
        &fee,
        &config,
        None,
    )
    .unwrap();
    assert!(solution.is_non_trivial());

    let output = instance.dump_solution(&solution);
    let reloaded: Instance =
        serde_json::from_str(&serde_json::to_string(&output).unwrap()).unwrap();

    assert_eq!(reloaded.orders.len(), output.orders.len());
    for (reloaded, original) in reloaded.orders.iter().zip(&output.orders) {
        assert_eq!(reloaded.exec_buy_amount, original.exec_buy_amount);
        assert_eq!(reloaded.exec_sell_amount, original.exec_sell_amount);
    }
    assert_eq!(reloaded.prices, output.prices);
}
