//! Building one output: first where it goes, then what it carries.
//!
//! ```text
//! TransactionOutputBuilder::new()
//!     .with_address(addr)
//!     .with_communication_data(datum)   // optional
//!     .next()?
//!     .with_asset_and_min_required_coin(assets, &coins_per_utxo_byte, coins_per_utxo_word)?
//!     .build()?
//! ```

use crate::address::Address;
use crate::builders::BuilderError;
use crate::fees::compatible_min_ada_required;
use crate::hashing::hash_plutus_data;
use crate::ledger::{Datum, PlutusData, Script, TransactionOutput};
use crate::value::{BigNum, Coin, MultiAsset, Value};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SingleOutputBuilderResult {
    pub output: TransactionOutput,
    /// Datum to carry in the witness set when the output only commits to
    /// its hash.
    pub communication_datum: Option<PlutusData>,
}

impl SingleOutputBuilderResult {
    pub fn new(output: TransactionOutput) -> Self {
        Self {
            output,
            communication_datum: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct TransactionOutputBuilder {
    address: Option<Address>,
    datum: Option<Datum>,
    communication_datum: Option<PlutusData>,
    script_ref: Option<Script>,
}

impl TransactionOutputBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Inline datum, or a bare datum hash.
    pub fn with_data(mut self, datum: Datum) -> Self {
        self.datum = Some(datum);
        self.communication_datum = None;
        self
    }

    /// Commit to `datum` by hash and ship the datum itself in the witness
    /// set.
    pub fn with_communication_data(mut self, datum: PlutusData) -> Self {
        self.datum = Some(Datum::Hash(hash_plutus_data(&datum)));
        self.communication_datum = Some(datum);
        self
    }

    pub fn with_reference_script(mut self, script: Script) -> Self {
        self.script_ref = Some(script);
        self
    }

    pub fn next(self) -> Result<TransactionOutputAmountBuilder, BuilderError> {
        let address = self.address.ok_or(BuilderError::UninitializedField("address"))?;
        Ok(TransactionOutputAmountBuilder {
            address,
            amount: None,
            datum: self.datum,
            communication_datum: self.communication_datum,
            script_ref: self.script_ref,
        })
    }
}

#[derive(Clone, Debug)]
pub struct TransactionOutputAmountBuilder {
    address: Address,
    amount: Option<Value>,
    datum: Option<Datum>,
    communication_datum: Option<PlutusData>,
    script_ref: Option<Script>,
}

impl TransactionOutputAmountBuilder {
    pub fn with_value(mut self, amount: Value) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_coin(self, coin: Coin) -> Self {
        self.with_value(Value::new(coin))
    }

    pub fn with_coin_and_asset(self, coin: Coin, multiasset: MultiAsset) -> Self {
        self.with_value(Value::new_with_assets(coin, multiasset))
    }

    /// Carry `multiasset` plus exactly the minimum ADA the finished output
    /// needs, under the same rule `TransactionBuilder::add_output` checks
    /// (the legacy per-word rule applies too when a word rate is given).
    /// The coin is computed against the output as it will be serialised
    /// (address, datum and reference script included) and re-checked with
    /// the coin in place, so setting it can't push the output into a larger
    /// size bracket.
    pub fn with_asset_and_min_required_coin(
        self,
        multiasset: MultiAsset,
        coins_per_utxo_byte: &Coin,
        coins_per_utxo_word: Option<&Coin>,
    ) -> Result<Self, BuilderError> {
        let mut draft = self.output_with(Value::new_with_assets(BigNum::zero(), multiasset.clone()));
        loop {
            let min = compatible_min_ada_required(&draft, coins_per_utxo_byte, coins_per_utxo_word)?;
            if draft.amount.coin() == min {
                break;
            }
            // The requirement only grows with the coin's encoding, so this
            // settles within a couple of rounds.
            draft.amount.set_coin(BigNum::max(&draft.amount.coin(), &min));
            if draft.amount.coin() > min {
                break;
            }
        }
        Ok(self.with_coin_and_asset(draft.amount.coin(), multiasset))
    }

    fn output_with(&self, amount: Value) -> TransactionOutput {
        TransactionOutput {
            address: self.address.clone(),
            amount,
            datum: self.datum.clone(),
            script_ref: self.script_ref.clone(),
        }
    }

    pub fn build(self) -> Result<SingleOutputBuilderResult, BuilderError> {
        let amount = self
            .amount
            .clone()
            .ok_or(BuilderError::UninitializedField("amount"))?;
        Ok(SingleOutputBuilderResult {
            output: self.output_with(amount),
            communication_datum: self.communication_datum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Credential, EnterpriseAddress};
    use crate::config::{COINS_PER_UTXO_BYTE, COINS_PER_UTXO_WORD};
    use crate::crypto::{Ed25519KeyHash, PolicyId};
    use crate::fees::{legacy_min_ada_required, min_ada_required};
    use crate::value::AssetName;

    fn address() -> Address {
        Address::Enterprise(EnterpriseAddress {
            network: 1,
            payment: Credential::from_keyhash(&Ed25519KeyHash::from_raw([8; 28])),
        })
    }

    fn tokens(count: u8) -> MultiAsset {
        let mut ma = MultiAsset::new();
        for i in 0..count {
            ma.set_asset(
                &PolicyId::from_raw([i; 28]),
                &AssetName::new(format!("token{i}").into_bytes()).unwrap(),
                BigNum::new(1_000_000 + i as u64),
            );
        }
        ma
    }

    #[test]
    fn test_address_is_required() {
        let err = TransactionOutputBuilder::new().next().unwrap_err();
        assert_eq!(err, BuilderError::UninitializedField("address"));
    }

    #[test]
    fn test_amount_is_required() {
        let err = TransactionOutputBuilder::new()
            .with_address(address())
            .next()
            .unwrap()
            .build()
            .unwrap_err();
        assert_eq!(err, BuilderError::UninitializedField("amount"));
    }

    #[test]
    fn test_min_required_coin_is_idempotent() {
        let rate = BigNum::new(COINS_PER_UTXO_BYTE);
        for count in [1, 3, 12] {
            let built = TransactionOutputBuilder::new()
                .with_address(address())
                .next()
                .unwrap()
                .with_asset_and_min_required_coin(tokens(count), &rate, None)
                .unwrap()
                .build()
                .unwrap();
            let coin = built.output.amount.coin();
            assert!(!coin.is_zero());
            assert_eq!(min_ada_required(&built.output, &rate).unwrap(), coin);
        }
    }

    #[test]
    fn test_min_required_coin_honours_word_rate() {
        let byte_rate = BigNum::new(COINS_PER_UTXO_BYTE);
        let word_rate = BigNum::new(COINS_PER_UTXO_WORD);
        let built = TransactionOutputBuilder::new()
            .with_address(address())
            .next()
            .unwrap()
            .with_asset_and_min_required_coin(tokens(1), &byte_rate, Some(&word_rate))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            compatible_min_ada_required(&built.output, &byte_rate, Some(&word_rate)).unwrap(),
            built.output.amount.coin()
        );
        assert!(built.output.amount.coin() >= legacy_min_ada_required(&built.output, &word_rate).unwrap());
    }

    #[test]
    fn test_communication_datum_commits_by_hash() {
        let datum = PlutusData::new_bytes(vec![1, 2]);
        let built = TransactionOutputBuilder::new()
            .with_address(address())
            .with_communication_data(datum.clone())
            .next()
            .unwrap()
            .with_coin(BigNum::new(2_000_000))
            .build()
            .unwrap();
        assert_eq!(built.output.datum, Some(Datum::Hash(hash_plutus_data(&datum))));
        assert_eq!(built.communication_datum, Some(datum));
    }
}
