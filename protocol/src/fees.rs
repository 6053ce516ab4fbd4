//! # Fees & Minimum ADA
//!
//! Two questions every builder keeps asking:
//!
//! 1. How much does this transaction cost? A linear function of its
//!    serialized size, plus a rational price per unit of script
//!    execution budget.
//! 2. How much ADA must this output carry? A function of *its* serialized
//!    size, which depends on the ADA it carries. Hence the fixpoint in
//!    [`min_ada_required`].
//!
//! Everything is checked arithmetic. A fee that overflows is an error, not
//! a wrap-around to a suspiciously cheap transaction.

use std::collections::BTreeSet;

use crate::codec::CborEncoding;
use crate::config::{ProtocolParams, MIN_ADA_OVERHEAD_BYTES};
use crate::ledger::{ExUnitPrices, ExUnits, Transaction, TransactionOutput};
use crate::value::{ArithmeticError, BigNum, Coin, Value};

/// `constant + coefficient * size_in_bytes`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinearFee {
    coefficient: Coin,
    constant: Coin,
}

impl LinearFee {
    pub fn new(coefficient: Coin, constant: Coin) -> Self {
        Self {
            coefficient,
            constant,
        }
    }

    pub fn coefficient(&self) -> Coin {
        self.coefficient
    }

    pub fn constant(&self) -> Coin {
        self.constant
    }

    pub fn fee_for_size(&self, size: usize) -> Result<Coin, ArithmeticError> {
        self.coefficient
            .checked_mul(&BigNum::new(size as u64))?
            .checked_add(&self.constant)
    }

    /// Fee for `tx` as serialized right now.
    pub fn fee(&self, tx: &Transaction) -> Result<Coin, ArithmeticError> {
        self.fee_for_size(tx.to_bytes().len())
    }
}

impl From<&ProtocolParams> for LinearFee {
    fn from(params: &ProtocolParams) -> Self {
        LinearFee::new(BigNum::new(params.min_fee_a), BigNum::new(params.min_fee_b))
    }
}

/// Size-only part of the fee.
pub fn min_no_script_fee(tx: &Transaction, linear_fee: &LinearFee) -> Result<Coin, ArithmeticError> {
    linear_fee.fee(tx)
}

/// `ceil(mem * mem_price + steps * step_price)`, computed exactly over a
/// common denominator.
pub fn calculate_ex_units_ceil_cost(
    ex_units: &ExUnits,
    prices: &ExUnitPrices,
) -> Result<Coin, ArithmeticError> {
    let (mn, md) = (
        prices.mem_price.numerator as u128,
        prices.mem_price.denominator as u128,
    );
    let (sn, sd) = (
        prices.step_price.numerator as u128,
        prices.step_price.denominator as u128,
    );
    if md == 0 || sd == 0 {
        return Err(ArithmeticError::DivisionByZero);
    }
    let mul = |a: u128, b: u128| a.checked_mul(b).ok_or(ArithmeticError::Overflow);

    let mem_part = mul(mul(ex_units.mem as u128, mn)?, sd)?;
    let step_part = mul(mul(ex_units.steps as u128, sn)?, md)?;
    let numerator = mem_part
        .checked_add(step_part)
        .ok_or(ArithmeticError::Overflow)?;
    let denominator = mul(md, sd)?;

    let cost = numerator.div_ceil(denominator);
    u64::try_from(cost)
        .map(BigNum::new)
        .map_err(|_| ArithmeticError::Overflow)
}

/// Execution fee: the ceiling cost of each redeemer's budget, summed.
pub fn min_script_fee(tx: &Transaction, prices: &ExUnitPrices) -> Result<Coin, ArithmeticError> {
    let Some(redeemers) = &tx.witness_set.redeemers else {
        return Ok(BigNum::zero());
    };
    redeemers.iter().try_fold(BigNum::zero(), |acc, r| {
        acc.checked_add(&calculate_ex_units_ceil_cost(&r.ex_units, prices)?)
    })
}

pub fn min_fee(
    tx: &Transaction,
    linear_fee: &LinearFee,
    prices: &ExUnitPrices,
) -> Result<Coin, ArithmeticError> {
    min_no_script_fee(tx, linear_fee)?.checked_add(&min_script_fee(tx, prices)?)
}

// ---------------------------------------------------------------------------
// Minimum ADA
// ---------------------------------------------------------------------------

fn byte_based_requirement(
    output: &TransactionOutput,
    coins_per_utxo_byte: &Coin,
) -> Result<Coin, ArithmeticError> {
    let size = BigNum::new(output.to_bytes().len() as u64);
    BigNum::new(MIN_ADA_OVERHEAD_BYTES)
        .checked_add(&size)?
        .checked_mul(coins_per_utxo_byte)
}

/// Minimum coin for `output` under the per-byte rule:
/// `coins_per_utxo_byte * (160 + serialized_size)`.
///
/// The size includes the coin field itself, and raising the coin can grow
/// its encoding (a 2-byte uint becomes 5, then 9). So the requirement is
/// recomputed with the output carrying the candidate coin until it stops
/// moving. Three rounds always suffice in practice; if not, the answer is
/// computed against the widest possible coin encoding, which is an upper
/// bound for any coin.
pub fn min_ada_required(
    output: &TransactionOutput,
    coins_per_utxo_byte: &Coin,
) -> Result<Coin, ArithmeticError> {
    let mut candidate = output.clone();
    for _ in 0..3 {
        let required = byte_based_requirement(&candidate, coins_per_utxo_byte)?;
        if candidate.amount.coin() >= required {
            return Ok(required);
        }
        candidate.amount.set_coin(required);
    }
    candidate.amount.set_coin(BigNum::max_value());
    byte_based_requirement(&candidate, coins_per_utxo_byte)
}

/// Words (8 bytes) needed for `n` bytes.
fn roundup_bytes_to_words(n: u64) -> u64 {
    n.div_ceil(8)
}

/// Alonzo's estimate of a value's size in words.
fn bundle_size_words(value: &Value) -> u64 {
    const COIN_SIZE: u64 = 2;
    const PID_SIZE: u64 = 28;

    let Some(ma) = value.multiasset().filter(|ma| !ma.is_empty()) else {
        return COIN_SIZE;
    };
    let num_assets = ma.num_assets() as u64;
    let num_policies = ma.len() as u64;
    let unique_names: BTreeSet<_> = ma.leaves().map(|(_, name, _)| name.clone()).collect();
    let name_bytes: u64 = unique_names.iter().map(|n| n.len() as u64).sum();

    6 + roundup_bytes_to_words(num_assets * 12 + name_bytes + num_policies * PID_SIZE)
}

/// The pre-Babbage per-word rule:
/// `coins_per_utxo_word * (27 + bundle_size + (10 if datum hash))`.
pub fn legacy_min_ada_required(
    output: &TransactionOutput,
    coins_per_utxo_word: &Coin,
) -> Result<Coin, ArithmeticError> {
    const UTXO_ENTRY_SIZE_WITHOUT_VAL: u64 = 27;
    const DATA_HASH_SIZE: u64 = 10;

    let datum_words = if output.datum.is_some() { DATA_HASH_SIZE } else { 0 };
    let words = UTXO_ENTRY_SIZE_WITHOUT_VAL + bundle_size_words(&output.amount) + datum_words;
    coins_per_utxo_word.checked_mul(&BigNum::new(words))
}

/// The larger of the per-byte and per-word minimums.
///
/// Around the Babbage hard fork both rules were live depending on which
/// node you asked, so a safe output satisfies both. Without a per-word
/// rate only the per-byte rule applies.
pub fn compatible_min_ada_required(
    output: &TransactionOutput,
    coins_per_utxo_byte: &Coin,
    coins_per_utxo_word: Option<&Coin>,
) -> Result<Coin, ArithmeticError> {
    let by_byte = min_ada_required(output, coins_per_utxo_byte)?;
    match coins_per_utxo_word {
        Some(word_rate) => Ok(BigNum::max(
            &by_byte,
            &legacy_min_ada_required(output, word_rate)?,
        )),
        None => Ok(by_byte),
    }
}
