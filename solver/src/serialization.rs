//! Serde helpers for the JSON instance format.

use crate::num::parse_decimal;
use num::{BigRational, ToPrimitive};
use serde::de::{Deserializer, Error as _};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// A number wrapper type that serializes large integers to strings to avoid
/// precision loss.
///
/// The JSON standard specifies that all numbers are `f64`s, and amounts in
/// this format routinely exceed the 53 bits of mantissa an `f64` offers.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Num<T>(#[serde(with = "serde_with::rust::display_fromstr")] pub T)
where
    T: Display + FromStr,
    <T as FromStr>::Err: Display;

/// An exact decimal quantity.
///
/// Deserializes from either a decimal string (`"1000"`, `"0.5"`) or a bare
/// JSON number, without a lossy detour through `f64` (JSON numbers keep
/// their literal representation thanks to serde_json's arbitrary precision
/// support). Serializes back as a string: plain digits when integral, `p/q`
/// otherwise.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Decimal(pub BigRational);

impl Default for Decimal {
    fn default() -> Self {
        Decimal(num::Zero::zero())
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_integer() {
            write!(f, "{}", self.0.numer())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let ratio = decimal_from_value(&value).map_err(D::Error::custom)?;
        Ok(Decimal(ratio))
    }
}

fn decimal_from_value(value: &serde_json::Value) -> Result<BigRational, String> {
    let literal = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return Err(format!("expected a decimal string or number, got {}", value)),
    };
    // A fraction form is also accepted so that solution files written by
    // this solver (which may contain non-integral rationals) round-trip.
    BigRational::from_str(&literal)
        .or_else(|_| parse_decimal(&literal).map_err(|err| err.to_string()))
}

/// Serialization of the fee ratio: parsed exactly (string or number form),
/// written back as a float, as the output format demands.
pub mod exact_decimal {
    use super::*;

    pub fn serialize<S: Serializer>(
        ratio: &BigRational,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(ratio.to_f64().unwrap_or(f64::NAN))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BigRational, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        decimal_from_value(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::BigInt;
    use serde_json::json;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Fixture {
        #[serde(with = "exact_decimal")]
        ratio: BigRational,
        amount: Decimal,
    }

    fn ratio(numer: i64, denom: i64) -> BigRational {
        BigRational::new(numer.into(), denom.into())
    }

    #[test]
    fn parses_ratio_from_number_exactly() {
        let fixture: Fixture =
            serde_json::from_str(r#"{"ratio": 0.001, "amount": "100000000000000"}"#).unwrap();
        assert_eq!(fixture.ratio, ratio(1, 1000));
        assert_eq!(
            fixture.amount,
            Decimal(BigRational::from_integer(BigInt::from(
                100_000_000_000_000u64
            ))),
        );
    }

    #[test]
    fn parses_ratio_from_string() {
        let fixture: Fixture =
            serde_json::from_value(json!({"ratio": "0.001", "amount": "42"})).unwrap();
        assert_eq!(fixture.ratio, ratio(1, 1000));
    }

    #[test]
    fn writes_ratio_as_float_and_amounts_as_strings() {
        let fixture = Fixture {
            ratio: ratio(1, 1000),
            amount: Decimal(ratio(42, 1)),
        };
        assert_eq!(
            serde_json::to_value(&fixture).unwrap(),
            json!({"ratio": 0.001, "amount": "42"}),
        );
    }

    #[test]
    fn num_round_trips_large_integers() {
        let num = Num(BigInt::from(170_141_183_460_469_231_731_687_303_715_884_105_727u128));
        let json = serde_json::to_string(&num).unwrap();
        assert_eq!(json, "\"170141183460469231731687303715884105727\"");
        assert_eq!(serde_json::from_str::<Num<BigInt>>(&json).unwrap(), num);
    }
}
