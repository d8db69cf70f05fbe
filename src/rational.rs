//! Exact rational arithmetic for EMC values
//!
//! Values are kept in lowest terms with a strictly positive denominator, so
//! structural equality is numeric equality. Numerator and denominator are
//! arbitrary precision; long derivation chains cannot overflow.

use std::cmp::Ordering;
use std::fmt;
use std::num::NonZeroU32;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};
use std::str::FromStr;
use std::sync::LazyLock;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use regex::Regex;

use crate::error::RationalError;

static LITERAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-?\d+)\s*(?:/\s*(-?\d+)\s*)?$").expect("rational literal pattern is valid")
});

/// An immutable fraction in lowest terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rational {
    numer: BigInt,
    denom: BigInt,
}

impl Rational {
    /// Build `numer / denom`, normalizing sign and reducing by the GCD.
    pub fn new(numer: impl Into<BigInt>, denom: impl Into<BigInt>) -> Result<Self, RationalError> {
        let denom = denom.into();
        if denom.is_zero() {
            return Err(RationalError::ZeroDenominator);
        }
        Ok(Self::reduce(numer.into(), denom))
    }

    pub fn from_integer(value: impl Into<BigInt>) -> Self {
        Self {
            numer: value.into(),
            denom: BigInt::one(),
        }
    }

    pub fn zero() -> Self {
        Self::from_integer(0)
    }

    pub fn one() -> Self {
        Self::from_integer(1)
    }

    // Caller guarantees denom != 0. gcd(0, d) == |d|, so zero lands on 0/1.
    fn reduce(mut numer: BigInt, mut denom: BigInt) -> Self {
        if denom.is_negative() {
            numer = -numer;
            denom = -denom;
        }
        let gcd = numer.gcd(&denom);
        if !gcd.is_one() {
            numer /= &gcd;
            denom /= &gcd;
        }
        Self { numer, denom }
    }

    pub fn numer(&self) -> &BigInt {
        &self.numer
    }

    pub fn denom(&self) -> &BigInt {
        &self.denom
    }

    pub fn is_zero(&self) -> bool {
        self.numer.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.numer.is_positive()
    }

    pub fn abs(&self) -> Self {
        Self {
            numer: self.numer.abs(),
            denom: self.denom.clone(),
        }
    }

    pub fn recip(&self) -> Result<Self, RationalError> {
        if self.is_zero() {
            return Err(RationalError::DivideByZero);
        }
        Ok(Self::reduce(self.denom.clone(), self.numer.clone()))
    }

    /// Division that reports a zero divisor instead of panicking.
    pub fn checked_div(&self, rhs: &Rational) -> Result<Self, RationalError> {
        if rhs.is_zero() {
            return Err(RationalError::DivideByZero);
        }
        Ok(Self::reduce(&self.numer * &rhs.denom, &self.denom * &rhs.numer))
    }

    /// `self * quantity`
    pub fn mul_quantity(&self, quantity: u32) -> Self {
        Self::reduce(&self.numer * quantity, self.denom.clone())
    }

    /// `self / quantity`; infallible since the quantity is non-zero.
    pub fn div_quantity(&self, quantity: NonZeroU32) -> Self {
        Self::reduce(self.numer.clone(), &self.denom * quantity.get())
    }

    /// Lossy conversion for display and logging.
    pub fn to_f64(&self) -> f64 {
        match (self.numer.to_f64(), self.denom.to_f64()) {
            (Some(n), Some(d)) => n / d,
            _ => f64::NAN,
        }
    }

    fn sum(&self, rhs: &Rational) -> Rational {
        Self::reduce(
            &self.numer * &rhs.denom + &rhs.numer * &self.denom,
            &self.denom * &rhs.denom,
        )
    }

    fn difference(&self, rhs: &Rational) -> Rational {
        Self::reduce(
            &self.numer * &rhs.denom - &rhs.numer * &self.denom,
            &self.denom * &rhs.denom,
        )
    }

    fn product(&self, rhs: &Rational) -> Rational {
        Self::reduce(&self.numer * &rhs.numer, &self.denom * &rhs.denom)
    }

    fn quotient(&self, rhs: &Rational) -> Rational {
        match self.checked_div(rhs) {
            Ok(q) => q,
            Err(e) => panic!("{e}: {self} / {rhs}"),
        }
    }
}

macro_rules! forward_binop {
    ($imp:ident, $method:ident, $inner:ident) => {
        impl $imp<&Rational> for &Rational {
            type Output = Rational;
            fn $method(self, rhs: &Rational) -> Rational {
                self.$inner(rhs)
            }
        }

        impl $imp<&Rational> for Rational {
            type Output = Rational;
            fn $method(self, rhs: &Rational) -> Rational {
                (&self).$inner(rhs)
            }
        }

        impl $imp for Rational {
            type Output = Rational;
            fn $method(self, rhs: Rational) -> Rational {
                (&self).$inner(&rhs)
            }
        }
    };
}

forward_binop!(Add, add, sum);
forward_binop!(Sub, sub, difference);
forward_binop!(Mul, mul, product);
// Panics on a zero divisor, like integer division. See `checked_div`.
forward_binop!(Div, div, quotient);

impl AddAssign<&Rational> for Rational {
    fn add_assign(&mut self, rhs: &Rational) {
        *self = self.sum(rhs);
    }
}

impl Neg for Rational {
    type Output = Rational;
    fn neg(self) -> Rational {
        Rational {
            numer: -self.numer,
            denom: self.denom,
        }
    }
}

impl Neg for &Rational {
    type Output = Rational;
    fn neg(self) -> Rational {
        -self.clone()
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        // Denominators are positive, so cross-multiplying keeps the sign.
        (&self.numer * &other.denom).cmp(&(&other.numer * &self.denom))
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Self::from_integer(value)
    }
}

impl From<i32> for Rational {
    fn from(value: i32) -> Self {
        Self::from_integer(value)
    }
}

impl From<u32> for Rational {
    fn from(value: u32) -> Self {
        Self::from_integer(value)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denom.is_one() {
            write!(f, "{}", self.numer)
        } else {
            write!(f, "{}/{}", self.numer, self.denom)
        }
    }
}

impl FromStr for Rational {
    type Err = RationalError;

    /// Accepts `N` or `N/D`, e.g. `"7"`, `"-3/2"`, `"1 / 300"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = LITERAL_RE
            .captures(s)
            .ok_or_else(|| RationalError::Parse(s.to_string()))?;
        let parse = |text: &str| {
            text.parse::<BigInt>()
                .map_err(|_| RationalError::Parse(s.to_string()))
        };
        let numer = parse(&caps[1])?;
        match caps.get(2) {
            Some(denom) => Rational::new(numer, parse(denom.as_str())?),
            None => Ok(Rational::from_integer(numer)),
        }
    }
}
