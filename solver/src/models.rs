//! Solver domain entities.

pub mod account_state;
pub mod order;
pub mod solution;

pub use self::account_state::AccountState;
pub use self::order::Order;
pub use self::solution::{Prices, Solution};

use num::{BigRational, One};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque token identifier, e.g. `"T0001"`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenId {
    fn from(token: &str) -> Self {
        TokenId(token.to_string())
    }
}

/// Account identifier as it appears in the instance file.
pub type AccountId = String;

/// The batch fee: a token and an exact ratio in `(0, 1)`.
#[derive(Clone, Debug)]
pub struct Fee {
    pub token: TokenId,
    pub ratio: BigRational,
}

impl Fee {
    /// The multiplicative fee factor `1 - ratio`.
    pub fn factor(&self) -> BigRational {
        BigRational::one() - &self.ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::BigInt;

    #[test]
    fn fee_factor() {
        let fee = Fee {
            token: "F".into(),
            ratio: BigRational::new(BigInt::from(1), BigInt::from(1000)),
        };
        assert_eq!(
            fee.factor(),
            BigRational::new(BigInt::from(999), BigInt::from(1000)),
        );
    }
}
