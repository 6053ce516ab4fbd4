//! Reward withdrawals.

use crate::address::{Credential, RewardAddress};
use crate::builders::witness_builder::{
    InputAggregateWitnessData, NativeScriptWitnessInfo, PartialPlutusWitness, PlutusScriptWitness,
    RequiredWitnessSet,
};
use crate::builders::{credential_kind, BuilderError};
use crate::crypto::{Ed25519KeyHash, ScriptHash};
use crate::ledger::NativeScript;
use crate::value::Coin;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawalBuilderResult {
    pub address: RewardAddress,
    pub amount: Coin,
    pub aggregate_witness: Option<InputAggregateWitnessData>,
    pub required_wits: RequiredWitnessSet,
}

#[derive(Clone, Debug)]
pub struct SingleWithdrawalBuilder {
    address: RewardAddress,
    amount: Coin,
}

impl SingleWithdrawalBuilder {
    /// Withdrawals must drain the account: `amount` is the full balance.
    pub fn new(address: RewardAddress, amount: Coin) -> Self {
        Self { address, amount }
    }

    pub fn payment_key(self) -> Result<WithdrawalBuilderResult, BuilderError> {
        let mut required_wits = RequiredWitnessSet::new();
        match &self.address.payment {
            Credential::Key(hash) => required_wits.add_vkey_key_hash(*hash),
            cred => {
                return Err(BuilderError::WrongCredentialKind {
                    found: credential_kind(Some(cred)),
                })
            }
        }
        Ok(self.finish(None, required_wits))
    }

    pub fn native_script(
        self,
        script: NativeScript,
        witness_info: NativeScriptWitnessInfo,
    ) -> Result<WithdrawalBuilderResult, BuilderError> {
        let script_hash = self.script_hash()?;
        if script.hash() != script_hash {
            return Err(BuilderError::MissingScriptWitness(script_hash));
        }
        let mut required_wits = RequiredWitnessSet::new();
        required_wits.add_script_hash(script_hash);
        Ok(self.finish(
            Some(InputAggregateWitnessData::NativeScript(script, witness_info)),
            required_wits,
        ))
    }

    pub fn plutus_script(
        self,
        partial_witness: PartialPlutusWitness,
        required_signers: Vec<Ed25519KeyHash>,
    ) -> Result<WithdrawalBuilderResult, BuilderError> {
        let script_hash = self.script_hash()?;
        if partial_witness.script.hash() != script_hash {
            return Err(BuilderError::MissingScriptWitness(script_hash));
        }
        let mut required_wits = RequiredWitnessSet::new();
        required_wits.add_script_hash(script_hash);
        if let PlutusScriptWitness::Ref(hash) = &partial_witness.script {
            required_wits.add_script_ref(*hash);
        }
        for signer in &required_signers {
            required_wits.add_vkey_key_hash(*signer);
        }
        Ok(self.finish(
            Some(InputAggregateWitnessData::PlutusScript(
                partial_witness,
                required_signers,
                None,
            )),
            required_wits,
        ))
    }

    fn script_hash(&self) -> Result<ScriptHash, BuilderError> {
        match &self.address.payment {
            Credential::Script(hash) => Ok(*hash),
            cred => Err(BuilderError::WrongCredentialKind {
                found: credential_kind(Some(cred)),
            }),
        }
    }

    fn finish(
        self,
        aggregate_witness: Option<InputAggregateWitnessData>,
        required_wits: RequiredWitnessSet,
    ) -> WithdrawalBuilderResult {
        WithdrawalBuilderResult {
            address: self.address,
            amount: self.amount,
            aggregate_witness,
            required_wits,
        }
    }
}
