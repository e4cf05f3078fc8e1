use std::cmp::Ordering;
use std::fmt;

use hashbrown::HashMap;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::VauError;

/// An exact rational number of arbitrary precision.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Number(BigRational);

impl Number {
    pub fn from_integer(n: i64) -> Self {
        Number(BigRational::from_integer(BigInt::from(n)))
    }

    pub fn from_bigint(n: BigInt) -> Self {
        Number(BigRational::from_integer(n))
    }

    pub fn zero() -> Self {
        Number(BigRational::zero())
    }

    pub fn add(&self, other: &Number) -> Number {
        Number(&self.0 + &other.0)
    }

    pub fn sub(&self, other: &Number) -> Number {
        Number(&self.0 - &other.0)
    }

    pub fn mul(&self, other: &Number) -> Number {
        Number(&self.0 * &other.0)
    }

    pub fn div(&self, other: &Number) -> Result<Number, VauError> {
        if other.0.is_zero() {
            return Err(VauError::eval("division by zero"));
        }
        Ok(Number(&self.0 / &other.0))
    }

    /// Truncating remainder: `a - trunc(a / b) * b`, so the sign follows the dividend.
    pub fn remainder(&self, other: &Number) -> Result<Number, VauError> {
        if other.0.is_zero() {
            return Err(VauError::eval("division by zero"));
        }
        let quotient = (&self.0 / &other.0).trunc();
        Ok(Number(&self.0 - quotient * &other.0))
    }

    pub fn compare(&self, other: &Number) -> Ordering {
        self.0.cmp(&other.0)
    }

    pub fn numerator(&self) -> Number {
        Number::from_bigint(self.0.numer().clone())
    }

    pub fn denominator(&self) -> Number {
        Number::from_bigint(self.0.denom().clone())
    }

    pub fn is_integer(&self) -> bool {
        self.0.is_integer()
    }

    pub fn to_i64(&self) -> Option<i64> {
        if self.is_integer() {
            self.0.numer().to_i64()
        } else {
            None
        }
    }

    /// The value as a `u32` codepoint candidate, if it is a non-negative integer in range.
    pub fn to_codepoint(&self) -> Option<u32> {
        if self.is_integer() {
            self.0.numer().to_u32()
        } else {
            None
        }
    }

    /// Parse number literal text: `17`, `-17`, `22/7`, `3.14`, `0.1(6)`.
    pub fn parse(text: &str) -> Result<Number, VauError> {
        let invalid = || VauError::eval(format!("invalid number: {text}"));
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        if body.is_empty() || !body.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let value = if let Some((numer, denom)) = body.split_once('/') {
            let numer = parse_digits(numer).ok_or_else(invalid)?;
            let denom = parse_digits(denom).ok_or_else(invalid)?;
            if denom.is_zero() {
                return Err(VauError::eval(format!("zero denominator in {text}")));
            }
            BigRational::new(numer, denom)
        } else if let Some((whole, fraction)) = body.split_once('.') {
            parse_decimal(whole, fraction).ok_or_else(invalid)?
        } else {
            BigRational::from_integer(parse_digits(body).ok_or_else(invalid)?)
        };

        Ok(Number(if negative { -value } else { value }))
    }
}

fn parse_digits(text: &str) -> Option<BigInt> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn pow10(exponent: usize) -> BigInt {
    num_traits::pow(BigInt::from(10), exponent)
}

/// `whole.fixed(repeating)` with an optional parenthesised repeating tail.
fn parse_decimal(whole: &str, fraction: &str) -> Option<BigRational> {
    let whole = parse_digits(whole)?;
    let (fixed, repeating) = match fraction.split_once('(') {
        Some((fixed, rest)) => (fixed, Some(rest.strip_suffix(')')?)),
        None => (fraction, None),
    };
    if fixed.is_empty() && repeating.is_none() {
        return None;
    }

    let mut value = BigRational::from_integer(whole);
    let scale = pow10(fixed.len());
    if !fixed.is_empty() {
        value += BigRational::new(parse_digits(fixed)?, scale.clone());
    }
    if let Some(repeating) = repeating {
        let period = parse_digits(repeating)?;
        let denom = scale * (pow10(repeating.len()) - BigInt::one());
        value += BigRational::new(period, denom);
    }
    Some(value)
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_integer() {
            return write!(f, "{}", self.0.numer());
        }

        let numer = self.0.numer().abs();
        let denom = self.0.denom();
        let (whole, mut rem) = numer.div_rem(denom);

        // Long division, remembering where each remainder first appeared so
        // the repeating period can be bracketed.
        let mut digits = String::new();
        let mut seen: HashMap<BigInt, usize> = HashMap::new();
        let mut period_start = None;
        while !rem.is_zero() {
            if let Some(&pos) = seen.get(&rem) {
                period_start = Some(pos);
                break;
            }
            seen.insert(rem.clone(), digits.len());
            let (digit, next) = (rem * BigInt::from(10u32)).div_rem(denom);
            digits.push_str(&digit.to_string());
            rem = next;
        }

        if self.0.is_negative() {
            write!(f, "-")?;
        }
        match period_start {
            Some(pos) => write!(f, "{whole}.{}({})", &digits[..pos], &digits[pos..]),
            None => write!(f, "{whole}.{digits}"),
        }
    }
}
