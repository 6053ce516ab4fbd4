//! # Redeemer Indexing
//!
//! A redeemer points at what it unlocks by position, and the position is
//! taken in the ledger's canonical order for each purpose:
//!
//! | Tag      | Indexes into                           |
//! |----------|----------------------------------------|
//! | `spend`  | all inputs, sorted by (tx hash, index) |
//! | `mint`   | minting policies, sorted by hash       |
//! | `reward` | withdrawals, sorted by reward account  |
//! | `cert`   | certificates, in body order            |
//!
//! Key-witnessed items still take up a slot, so this builder tracks every
//! item and only emits redeemers for the script-witnessed ones.
//!
//! Until an evaluator has run, redeemers carry no execution budget. Drafts
//! fill in a placeholder; the final build refuses to proceed until every
//! budget has been set.

use std::collections::BTreeMap;

use crate::address::RewardAddress;
use crate::builders::certificate_builder::CertificateBuilderResult;
use crate::builders::input_builder::InputBuilderResult;
use crate::builders::mint_builder::MintBuilderResult;
use crate::builders::withdrawal_builder::WithdrawalBuilderResult;
use crate::builders::witness_builder::{InputAggregateWitnessData, RedeemerWitnessKey};
use crate::builders::BuilderError;
use crate::crypto::PolicyId;
use crate::ledger::{ExUnits, PlutusData, Redeemer, RedeemerTag, Redeemers, TransactionInput};
use crate::value::BigNum;

#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingRedeemer {
    data: PlutusData,
    ex_units: Option<ExUnits>,
}

impl PendingRedeemer {
    fn from_witness(witness: Option<&InputAggregateWitnessData>) -> Option<Self> {
        witness
            .and_then(InputAggregateWitnessData::redeemer_plutus_data)
            .map(|data| PendingRedeemer {
                data: data.clone(),
                ex_units: None,
            })
    }
}

#[derive(Clone, Debug, Default)]
pub struct RedeemerSetBuilder {
    spend: BTreeMap<TransactionInput, Option<PendingRedeemer>>,
    mint: BTreeMap<PolicyId, Option<PendingRedeemer>>,
    reward: BTreeMap<RewardAddress, Option<PendingRedeemer>>,
    cert: Vec<Option<PendingRedeemer>>,
}

impl RedeemerSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().next().is_none()
    }

    pub fn add_spend(&mut self, result: &InputBuilderResult) {
        let entry = PendingRedeemer::from_witness(result.aggregate_witness.as_ref());
        self.spend.insert(result.input, entry);
    }

    /// Several results under one policy share one redeemer; the first
    /// Plutus witness seen wins.
    pub fn add_mint(&mut self, result: &MintBuilderResult) {
        let entry = PendingRedeemer::from_witness(result.aggregate_witness.as_ref());
        let slot = self.mint.entry(result.policy_id).or_insert(None);
        if slot.is_none() {
            *slot = entry;
        }
    }

    pub fn add_reward(&mut self, result: &WithdrawalBuilderResult) {
        let entry = PendingRedeemer::from_witness(result.aggregate_witness.as_ref());
        self.reward.insert(result.address, entry);
    }

    pub fn add_cert(&mut self, result: &CertificateBuilderResult) {
        self.cert
            .push(PendingRedeemer::from_witness(result.aggregate_witness.as_ref()));
    }

    /// Set the execution budget of the redeemer at `key`. Returns `false`
    /// if there is no script-witnessed item at that position.
    pub fn update_ex_units(&mut self, key: RedeemerWitnessKey, ex_units: ExUnits) -> bool {
        let slot = match key.tag {
            RedeemerTag::Spend => self.spend.values_mut().nth(key.index as usize),
            RedeemerTag::Mint => self.mint.values_mut().nth(key.index as usize),
            RedeemerTag::Reward => self.reward.values_mut().nth(key.index as usize),
            RedeemerTag::Cert => self.cert.get_mut(key.index as usize),
        };
        match slot {
            Some(Some(pending)) => {
                pending.ex_units = Some(ex_units);
                true
            }
            _ => false,
        }
    }

    /// Keys of every redeemer this transaction will carry.
    pub fn keys(&self) -> Vec<RedeemerWitnessKey> {
        self.pending().map(|(key, _)| key).collect()
    }

    pub fn has_placeholders(&self) -> bool {
        self.pending().any(|(_, p)| p.ex_units.is_none())
    }

    /// Build the redeemers. Budgets never set take `placeholder`; without
    /// one, an unset budget is an error.
    pub fn build(&self, placeholder: Option<ExUnits>) -> Result<Redeemers, BuilderError> {
        let mut redeemers = Redeemers::new();
        for (key, pending) in self.pending() {
            let ex_units = pending
                .ex_units
                .or(placeholder)
                .ok_or(BuilderError::MissingExUnits {
                    tag: key.tag,
                    index: key.index,
                })?;
            redeemers.add(Redeemer::new(
                key.tag,
                BigNum::new(key.index),
                pending.data.clone(),
                ex_units,
            ));
        }
        Ok(redeemers)
    }

    fn pending(&self) -> impl Iterator<Item = (RedeemerWitnessKey, &PendingRedeemer)> {
        fn indexed<'a>(
            tag: RedeemerTag,
            slots: impl Iterator<Item = &'a Option<PendingRedeemer>> + 'a,
        ) -> impl Iterator<Item = (RedeemerWitnessKey, &'a PendingRedeemer)> + 'a {
            slots.enumerate().filter_map(move |(i, slot)| {
                slot.as_ref()
                    .map(|p| (RedeemerWitnessKey::new(tag, i as u64), p))
            })
        }
        indexed(RedeemerTag::Spend, self.spend.values())
            .chain(indexed(RedeemerTag::Mint, self.mint.values()))
            .chain(indexed(RedeemerTag::Cert, self.cert.iter()))
            .chain(indexed(RedeemerTag::Reward, self.reward.values()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Address, Credential, EnterpriseAddress};
    use crate::builders::input_builder::SingleInputBuilder;
    use crate::builders::withdrawal_builder::SingleWithdrawalBuilder;
    use crate::builders::witness_builder::{PartialPlutusWitness, PlutusScriptWitness};
    use crate::crypto::{Ed25519KeyHash, TransactionHash};
    use crate::ledger::{Language, PlutusScript, TransactionOutput};
    use crate::value::Value;

    fn script() -> PlutusScript {
        PlutusScript::new(Language::PlutusV2, vec![0x4e, 0x4d, 0x01, 0x00])
    }

    fn key_input(hash_byte: u8) -> InputBuilderResult {
        let out = TransactionOutput::new(
            Address::Enterprise(EnterpriseAddress {
                network: 0,
                payment: Credential::from_keyhash(&Ed25519KeyHash::from_raw([1; 28])),
            }),
            Value::new(BigNum::new(1_000_000)),
        );
        SingleInputBuilder::new(
            TransactionInput::new(TransactionHash::from_raw([hash_byte; 32]), 0),
            out,
        )
        .payment_key()
        .unwrap()
    }

    fn script_input(hash_byte: u8) -> InputBuilderResult {
        let out = TransactionOutput::new(
            Address::Enterprise(EnterpriseAddress {
                network: 0,
                payment: Credential::from_scripthash(&script().hash()),
            }),
            Value::new(BigNum::new(1_000_000)),
        );
        SingleInputBuilder::new(
            TransactionInput::new(TransactionHash::from_raw([hash_byte; 32]), 0),
            out,
        )
        .plutus_script(
            PartialPlutusWitness::new(PlutusScriptWitness::Script(script()), PlutusData::unit()),
            vec![],
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_spend_index_counts_key_inputs_in_sorted_order() {
        let mut builder = RedeemerSetBuilder::new();
        // Added out of order: the script input sorts after 0x01.. and 0x02..
        builder.add_spend(&script_input(3));
        builder.add_spend(&key_input(2));
        builder.add_spend(&key_input(1));
        assert_eq!(builder.keys(), vec![RedeemerWitnessKey::new(RedeemerTag::Spend, 2)]);
    }

    #[test]
    fn test_reward_index_puts_script_accounts_before_key_accounts() {
        // The all-zero key hash sorts before any script hash bytewise, but
        // the ledger orders script credentials first within a network.
        let key_account = RewardAddress::new(0, Credential::from_keyhash(&Ed25519KeyHash::from_raw([0; 28])));
        let script_account = RewardAddress::new(0, Credential::from_scripthash(&script().hash()));
        let key_withdrawal = SingleWithdrawalBuilder::new(key_account, BigNum::new(5))
            .payment_key()
            .unwrap();
        let script_withdrawal = SingleWithdrawalBuilder::new(script_account, BigNum::new(5))
            .plutus_script(
                PartialPlutusWitness::new(PlutusScriptWitness::Script(script()), PlutusData::unit()),
                vec![],
            )
            .unwrap();

        let mut builder = RedeemerSetBuilder::new();
        builder.add_reward(&key_withdrawal);
        builder.add_reward(&script_withdrawal);
        assert_eq!(builder.keys(), vec![RedeemerWitnessKey::new(RedeemerTag::Reward, 0)]);

        // A mainnet account sorts after every testnet one.
        let mainnet_script = RewardAddress::new(1, Credential::from_scripthash(&script().hash()));
        assert!(key_account < mainnet_script);
        assert!(script_account < key_account);
    }

    #[test]
    fn test_build_requires_budgets_unless_drafting() {
        let mut builder = RedeemerSetBuilder::new();
        builder.add_spend(&script_input(1));
        assert!(builder.has_placeholders());
        assert_eq!(
            builder.build(None).unwrap_err(),
            BuilderError::MissingExUnits {
                tag: RedeemerTag::Spend,
                index: 0
            }
        );

        let draft = builder.build(Some(ExUnits::new(1, 1))).unwrap();
        assert_eq!(draft.total_ex_units().unwrap(), ExUnits::new(1, 1));

        assert!(builder.update_ex_units(RedeemerWitnessKey::new(RedeemerTag::Spend, 0), ExUnits::new(7, 8)));
        assert!(!builder.has_placeholders());
        let built = builder.build(None).unwrap();
        assert_eq!(built.iter().next().unwrap().ex_units, ExUnits::new(7, 8));
    }

    #[test]
    fn test_update_on_key_witnessed_slot_is_refused() {
        let mut builder = RedeemerSetBuilder::new();
        builder.add_spend(&key_input(1));
        assert!(builder.is_empty());
        assert!(!builder.update_ex_units(RedeemerWitnessKey::new(RedeemerTag::Spend, 0), ExUnits::new(1, 1)));
    }
}
