//! Solver entry points: the token-pair + fee coordinator and the
//! best-token-pair enumeration.

pub mod best_pair;
pub mod token_pair;

pub use self::best_pair::solve_best_token_pair;
pub use self::token_pair::{
    solve_token_pair, solve_token_pair_and_fee_token,
    solve_token_pair_and_fee_token_economic_viable,
};
