//! Batch-auction matching solver for a single token pair.
//!
//! Given a batch of limit orders and per-account balances, the solver assigns
//! an integer uniform clearing price to each touched token and integer
//! executed amounts to each touched order, maximizing a utility-based
//! objective subject to limit-price, balance, minimum-tradable-amount,
//! maximum-touched-order and fee-viability constraints.
//!
//! All arithmetic on the decision path is exact: amounts and exchange rates
//! are arbitrary-precision rationals, only converted to integers by the
//! rounding engine at the very end of a solve.

#![deny(clippy::unreadable_literal)]

pub mod arith;
pub mod config;
pub mod error;
pub mod execution;
pub mod instance;
pub mod logging;
pub mod models;
pub mod num;
pub mod orderbook;
pub mod price;
pub mod rounding;
pub mod serialization;
pub mod solver;
pub mod validation;
pub mod xrate;

pub use self::config::Config;
pub use self::error::SolverError;
pub use self::models::{AccountId, AccountState, Fee, Order, Prices, Solution, TokenId};
