//! Module implementing exact rational arithmetic helpers for the solver.

use num::{BigInt, BigRational, One, Signed, ToPrimitive, Zero};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal digits kept when rationalizing a square root. The
/// approximation is only ever used as a candidate exchange rate which is then
/// evaluated exactly, so the precision bounds the distance to the true local
/// optimum, not correctness.
const SQRT_PRECISION_DIGITS: usize = 30;

#[derive(Debug, Error, Eq, PartialEq)]
#[error("invalid decimal number: '{0}'")]
pub struct ParseDecimalError(String);

/// Parses a decimal string (optional sign, fraction and exponent, e.g.
/// `"1000"`, `"0.001"`, `"1.5e18"`) into an exact rational.
pub fn parse_decimal(value: &str) -> Result<BigRational, ParseDecimalError> {
    let err = || ParseDecimalError(value.to_string());
    let trimmed = value.trim();

    let (mantissa, exponent) = match trimmed.find(|c| c == 'e' || c == 'E') {
        Some(pos) => {
            let exponent = i64::from_str(&trimmed[pos + 1..]).map_err(|_| err())?;
            (&trimmed[..pos], exponent)
        }
        None => (trimmed, 0),
    };

    let (digits, scale) = match mantissa.find('.') {
        Some(pos) => {
            let fraction = &mantissa[pos + 1..];
            if fraction.contains(|c: char| !c.is_ascii_digit()) {
                return Err(err());
            }
            (
                format!("{}{}", &mantissa[..pos], fraction),
                fraction.len() as i64,
            )
        }
        None => (mantissa.to_string(), 0),
    };
    if digits.is_empty() || digits == "-" || digits == "+" {
        return Err(err());
    }

    let numerator = BigInt::from_str(&digits).map_err(|_| err())?;
    let shift = exponent - scale;
    let power = pow10(shift.abs() as usize);
    Ok(if shift >= 0 {
        BigRational::from_integer(numerator * power)
    } else {
        BigRational::new(numerator, power)
    })
}

/// Parses an exchange rate given either as a fraction (`"7/3"`) or as a
/// decimal (`"2.5"`).
pub fn parse_ratio(value: &str) -> Result<BigRational, ParseDecimalError> {
    if let Ok(ratio) = BigRational::from_str(value) {
        return Ok(ratio);
    }
    parse_decimal(value)
}

/// `10^exponent` as a big integer.
pub fn pow10(exponent: usize) -> BigInt {
    let mut result = BigInt::one();
    let ten = BigInt::from(10);
    for _ in 0..exponent {
        result *= &ten;
    }
    result
}

/// Integer square root: the largest `r` with `r * r <= n`.
///
/// # Panics
///
/// If `n` is negative.
pub fn isqrt(n: &BigInt) -> BigInt {
    assert!(!n.is_negative(), "integer square root of a negative number");
    if n.is_zero() {
        return BigInt::zero();
    }

    // Newton iteration starting from a power of two above the root.
    let mut x = BigInt::one() << ((n.bits() as usize + 1) / 2);
    loop {
        let y = (&x + n / &x) >> 1;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Rational approximation of `sqrt(value)` by truncating the decimal
/// expansion at a fixed precision. Returns `None` for negative values.
pub fn rational_sqrt(value: &BigRational) -> Option<BigRational> {
    if value.is_negative() {
        return None;
    }
    // sqrt(p/q) == sqrt(p*q)/q, so a single integer square root of the
    // scaled product suffices.
    let scale = pow10(SQRT_PRECISION_DIGITS);
    let scaled = value.numer() * value.denom() * (&scale * &scale);
    Some(BigRational::new(isqrt(&scaled), value.denom() * scale))
}

/// Display wrapper for rationals: exact `p/q` form when requested, `%.3e`
/// float form otherwise.
pub struct DisplayRatio<'a> {
    ratio: &'a BigRational,
    exact: bool,
}

impl<'a> DisplayRatio<'a> {
    pub fn new(ratio: &'a BigRational, exact: bool) -> Self {
        DisplayRatio { ratio, exact }
    }
}

impl fmt::Display for DisplayRatio<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.exact {
            write!(f, "{}", self.ratio)
        } else {
            write!(f, "{:.3e}", self.ratio.to_f64().unwrap_or(f64::NAN))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(numer: i64, denom: i64) -> BigRational {
        BigRational::new(numer.into(), denom.into())
    }

    #[test]
    fn parses_integers_and_decimals() {
        assert_eq!(parse_decimal("1000").unwrap(), ratio(1000, 1));
        assert_eq!(parse_decimal("0.001").unwrap(), ratio(1, 1000));
        assert_eq!(parse_decimal("-2.5").unwrap(), ratio(-5, 2));
        assert_eq!(parse_decimal("1.5e3").unwrap(), ratio(1500, 1));
        assert_eq!(parse_decimal("25E-2").unwrap(), ratio(1, 4));
        assert_eq!(
            parse_decimal("77012162024712840006").unwrap(),
            BigRational::from_integer(
                BigInt::from_str("77012162024712840006").unwrap()
            ),
        );
    }

    #[test]
    fn rejects_garbage() {
        for value in &["", "-", "1.2.3", "abc", "1e", "0x10"] {
            assert!(parse_decimal(value).is_err(), "accepted '{}'", value);
        }
    }

    #[test]
    fn parses_fractions_and_decimals_as_ratios() {
        assert_eq!(parse_ratio("7/3").unwrap(), ratio(7, 3));
        assert_eq!(parse_ratio("0.2").unwrap(), ratio(1, 5));
    }

    #[test]
    fn integer_square_roots() {
        for &(n, root) in &[(0u64, 0u64), (1, 1), (2, 1), (3, 1), (4, 2), (15, 3), (16, 4), (10_000, 100)] {
            assert_eq!(isqrt(&BigInt::from(n)), BigInt::from(root));
        }
        let big = BigInt::from_str("77012162024712840006").unwrap();
        let root = isqrt(&(&big * &big));
        assert_eq!(root, big);
    }

    #[test]
    fn sqrt_approximation_brackets_the_root() {
        let value = ratio(2, 1);
        let approx = rational_sqrt(&value).unwrap();
        assert!(&approx * &approx <= value);
        let step = BigRational::new(1.into(), pow10(SQRT_PRECISION_DIGITS - 1));
        let upper = &approx + &step;
        assert!(&upper * &upper > value);
    }

    #[test]
    fn sqrt_of_negative_is_none() {
        assert!(rational_sqrt(&ratio(-1, 2)).is_none());
    }
}
