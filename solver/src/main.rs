use anyhow::Result;
use num::{BigInt, BigRational};
use open_solver::instance::Instance;
use open_solver::num::parse_ratio;
use open_solver::solver::{
    solve_best_token_pair, solve_token_pair_and_fee_token_economic_viable,
};
use open_solver::{logging, Config, TokenId};
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "gp_match", rename_all = "kebab")]
struct Options {
    /// File containing the instance to solve.
    #[structopt(parse(from_os_str))]
    instance: PathBuf,

    /// File where the solution is written.
    #[structopt(long, default_value = "solution.json", parse(from_os_str))]
    solution: PathBuf,

    /// The log filter, following the `slog-envlogger` syntax (e.g. `info`
    /// or `warn,open_solver=debug`).
    #[structopt(long, default_value = "info")]
    logging: String,

    /// Log all rational quantities in exact form instead of as floats.
    #[structopt(long)]
    log_rationals: bool,

    /// Minimum average fee, in fee token, an executed order must pay for a
    /// solution to be admissible.
    #[structopt(long)]
    min_avg_fee_per_order: Option<u128>,

    /// Accepted for driver compatibility; the solve is synchronous and is
    /// not budgeted.
    #[structopt(long)]
    time_limit: Option<u64>,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Matches orders on a given token pair.
    TokenPair {
        b_buy_token: String,
        s_buy_token: String,

        /// Exchange rate b/s to use, as a fraction or decimal, instead of
        /// optimizing it.
        #[structopt(long, parse(try_from_str = parse_ratio))]
        xrate: Option<BigRational>,
    },
    /// Matches orders on the token pair that leads to the highest
    /// objective.
    BestTokenPair,
}

fn main() -> Result<()> {
    let options = Options::from_args();
    let _guard = logging::init(&options.logging);
    log::debug!("running solver with options: {:?}", options);

    if let Some(time_limit) = options.time_limit {
        log::debug!("ignoring time limit of {}s", time_limit);
    }

    let config = Config {
        min_average_order_fee: options
            .min_avg_fee_per_order
            .map(BigInt::from)
            .unwrap_or_else(|| BigInt::from(0)),
        log_rationals: options.log_rationals,
        ..Config::default()
    };

    let instance = Instance::read_from(&options.instance)?;
    let fee = instance.fee();

    let solution = match &options.command {
        Command::TokenPair {
            b_buy_token,
            s_buy_token,
            xrate,
        } => {
            let token_pair = (
                TokenId(b_buy_token.clone()),
                TokenId(s_buy_token.clone()),
            );
            let (accounts, mut b_orders, mut s_orders, mut f_orders) =
                instance.load_problem((&token_pair.0, &token_pair.1), &config)?;
            solve_token_pair_and_fee_token_economic_viable(
                (&token_pair.0, &token_pair.1),
                &accounts,
                &mut b_orders,
                &mut s_orders,
                &mut f_orders,
                &fee,
                &config,
                xrate.clone(),
            )?
        }
        Command::BestTokenPair => {
            let (accounts, orders) = instance.load_orderbook(&config);
            solve_best_token_pair(&accounts, &orders, &fee, &config)?
        }
    };

    if !solution.is_non_trivial() {
        log::info!("returning the trivial solution");
    }

    instance.dump_solution(&solution).write_to(&options.solution)?;
    log::info!("solution file is '{}'", options.solution.display());

    Ok(())
}
