//! # Error Taxonomy
//!
//! Every fallible operation in txforge returns one of a handful of error
//! enums, each owned by the module that produces it:
//!
//! - [`ArithmeticError`](crate::value::ArithmeticError) — checked `BigNum` / `Value` algebra.
//! - [`DeserializeError`] — anything parsed from bytes, JSON, hex, bech32 or base58.
//! - [`SelectionError`](crate::selection::SelectionError) — CIP-2 coin selection.
//! - [`BuilderError`](crate::builders::BuilderError) — item builders and the
//!   transaction balancer.
//! - [`WitnessError`](crate::builders::witness_builder::WitnessError) — witness-set assembly.
//!
//! [`TxForgeError`] folds them together so `?` works across module
//! boundaries. Nothing is retried and nothing is silently coerced; strategy
//! switching on failure is the caller's call.

use thiserror::Error;

use crate::builders::witness_builder::WitnessError;
use crate::builders::BuilderError;
use crate::selection::SelectionError;
use crate::value::ArithmeticError;

/// Failures while turning external representations into typed values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeserializeError {
    /// The CBOR did not match the expected ledger structure.
    #[error("malformed bytes: {0}")]
    MalformedBytes(String),

    /// JSON input did not follow the requested schema.
    #[error("malformed json: {0}")]
    MalformedJson(String),

    /// An address failed header, length or checksum validation.
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    /// A fixed-size value was given the wrong number of bytes.
    #[error("wrong length for {what}: expected {expected}, got {found}")]
    WrongLength {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Hex decoding failed.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// A textual number could not be parsed.
    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    /// A byte or text field exceeded the 64-byte ledger limit.
    #[error("{what} exceeds 64 bytes ({found})")]
    TooLong { what: &'static str, found: usize },
}

impl From<minicbor::decode::Error> for DeserializeError {
    fn from(err: minicbor::decode::Error) -> Self {
        DeserializeError::MalformedBytes(err.to_string())
    }
}

impl From<hex::FromHexError> for DeserializeError {
    fn from(err: hex::FromHexError) -> Self {
        DeserializeError::InvalidHex(err.to_string())
    }
}

impl From<serde_json::Error> for DeserializeError {
    fn from(err: serde_json::Error) -> Self {
        DeserializeError::MalformedJson(err.to_string())
    }
}

/// Crate-wide error umbrella.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxForgeError {
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error(transparent)]
    Deserialize(#[from] DeserializeError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error(transparent)]
    Witness(#[from] WitnessError),

    /// The wallet refused or failed a request.
    #[error("wallet: {0}")]
    Wallet(String),
}

/// Convenience alias used by operations that can fail in more than one way.
pub type Result<T> = std::result::Result<T, TxForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_errors_map_to_malformed_bytes() {
        let err: DeserializeError = minicbor::decode::<u64>(&[0x61, 0x41]).unwrap_err().into();
        assert!(matches!(err, DeserializeError::MalformedBytes(_)));
    }

    #[test]
    fn test_umbrella_is_transparent() {
        let err: TxForgeError = ArithmeticError::Overflow.into();
        assert_eq!(err.to_string(), ArithmeticError::Overflow.to_string());
    }
}
