//! Non-fatal solver errors.
//!
//! Every kind in here degrades gracefully to the trivial solution inside the
//! coordinator; none of them aborts a solve. Instance parse failures and
//! validator violations are fatal and surface as `anyhow` errors instead.

use crate::models::TokenId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    /// Either side of the token pair is empty or no feasible exchange rate
    /// exists.
    #[error("no matching orders on the token pair")]
    NoMatch,

    /// The arborescence rounder could not neutralize a token imbalance.
    #[error("unable to round solution to integers")]
    RoundingFailure,

    /// No fee-selling orders can absorb the buy-token imbalance.
    #[error("no orders can cover the fee imbalance of token {0}")]
    FeeUnreachable(TokenId),
}
