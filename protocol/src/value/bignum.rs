//! Unsigned and signed ledger integers.
//!
//! [`BigNum`] is an unsigned 64-bit quantity (lovelace, asset amounts,
//! slots, indices) whose arithmetic never wraps: every operation is
//! checked and reports [`ArithmeticError`] instead. [`Int`] covers the
//! ledger's signed integer range, `-2^64 ..= 2^64 - 1`, used for mint
//! deltas and metadata.

use std::fmt;
use std::str::FromStr;

use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::DeserializeError;

/// Checked-arithmetic failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("arithmetic underflow")]
    Underflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// Lovelace amount.
pub type Coin = BigNum;

/// Absolute slot number.
pub type Slot = BigNum;

/// Epoch number.
pub type Epoch = u32;

// ---------------------------------------------------------------------------
// BigNum
// ---------------------------------------------------------------------------

/// Unsigned 64-bit integer with checked arithmetic.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BigNum(u64);

impl BigNum {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn one() -> Self {
        Self(1)
    }

    pub const fn max_value() -> Self {
        Self(u64::MAX)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn checked_add(&self, other: &BigNum) -> Result<BigNum, ArithmeticError> {
        self.0
            .checked_add(other.0)
            .map(BigNum)
            .ok_or(ArithmeticError::Overflow)
    }

    pub fn checked_sub(&self, other: &BigNum) -> Result<BigNum, ArithmeticError> {
        self.0
            .checked_sub(other.0)
            .map(BigNum)
            .ok_or(ArithmeticError::Underflow)
    }

    pub fn checked_mul(&self, other: &BigNum) -> Result<BigNum, ArithmeticError> {
        self.0
            .checked_mul(other.0)
            .map(BigNum)
            .ok_or(ArithmeticError::Overflow)
    }

    pub fn checked_div(&self, other: &BigNum) -> Result<BigNum, ArithmeticError> {
        self.0
            .checked_div(other.0)
            .map(BigNum)
            .ok_or(ArithmeticError::DivisionByZero)
    }

    /// Division rounding towards positive infinity. Dividing by zero is an
    /// error, never zero.
    pub fn checked_div_ceil(&self, other: &BigNum) -> Result<BigNum, ArithmeticError> {
        if other.0 == 0 {
            return Err(ArithmeticError::DivisionByZero);
        }
        let quotient = self.0 / other.0;
        if self.0 % other.0 == 0 {
            Ok(BigNum(quotient))
        } else {
            Ok(BigNum(quotient + 1))
        }
    }

    /// Subtraction floored at zero.
    pub fn clamped_sub(&self, other: &BigNum) -> BigNum {
        BigNum(self.0.saturating_sub(other.0))
    }

    pub fn max(a: &BigNum, b: &BigNum) -> BigNum {
        if a >= b {
            *a
        } else {
            *b
        }
    }
}

impl From<u64> for BigNum {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<u32> for BigNum {
    fn from(value: u32) -> Self {
        Self(value as u64)
    }
}

impl From<BigNum> for u64 {
    fn from(value: BigNum) -> Self {
        value.0
    }
}

impl fmt::Display for BigNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BigNum {
    type Err = DeserializeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(BigNum)
            .map_err(|_| DeserializeError::InvalidNumber(s.to_string()))
    }
}

impl Encode<()> for BigNum {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.u64(self.0)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for BigNum {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        d.u64().map(BigNum)
    }
}

// ---------------------------------------------------------------------------
// Int
// ---------------------------------------------------------------------------

const INT_MIN: i128 = -(u64::MAX as i128) - 1;
const INT_MAX: i128 = u64::MAX as i128;

/// Signed ledger integer in `-2^64 ..= 2^64 - 1`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Int(i128);

impl Int {
    /// Non-negative integer from a `BigNum`.
    pub fn new(x: &BigNum) -> Self {
        Self(x.0 as i128)
    }

    /// The negation of `x`.
    pub fn new_negative(x: &BigNum) -> Self {
        Self(-(x.0 as i128))
    }

    pub fn new_i32(x: i32) -> Self {
        Self(x as i128)
    }

    /// `None` when `value` is outside the ledger range.
    pub fn from_i128(value: i128) -> Option<Self> {
        (INT_MIN..=INT_MAX).contains(&value).then_some(Self(value))
    }

    pub fn as_i128(&self) -> i128 {
        self.0
    }

    /// Zero counts as positive, matching the CBOR major type it encodes to.
    pub fn is_positive(&self) -> bool {
        self.0 >= 0
    }

    /// The value, if non-negative.
    pub fn as_positive(&self) -> Option<BigNum> {
        if self.0 >= 0 {
            u64::try_from(self.0).ok().map(BigNum)
        } else {
            None
        }
    }

    /// The magnitude, if negative.
    pub fn as_negative(&self) -> Option<BigNum> {
        if self.0 < 0 {
            u64::try_from(-self.0).ok().map(BigNum)
        } else {
            None
        }
    }

    pub fn as_i32_or_nothing(&self) -> Option<i32> {
        i32::try_from(self.0).ok()
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Int {
    type Err = DeserializeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i128>()
            .ok()
            .and_then(Int::from_i128)
            .ok_or_else(|| DeserializeError::InvalidNumber(s.to_string()))
    }
}

impl Serialize for Int {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i128(self.0)
    }
}

impl<'de> Deserialize<'de> for Int {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = i128::deserialize(d)?;
        Int::from_i128(value).ok_or_else(|| serde::de::Error::custom("integer out of range"))
    }
}

impl Encode<()> for Int {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        let int = minicbor::data::Int::try_from(self.0)
            .map_err(|_| encode::Error::message("integer outside the CBOR range"))?;
        e.int(int)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Int {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        Ok(Int(i128::from(d.int()?)))
    }
}
