//! Spending one UTXO.

use crate::address::Credential;
use crate::builders::witness_builder::{
    InputAggregateWitnessData, NativeScriptWitnessInfo, PartialPlutusWitness, PlutusScriptWitness,
    RequiredWitnessSet,
};
use crate::builders::{credential_kind, BuilderError};
use crate::crypto::Ed25519KeyHash;
use crate::hashing::hash_plutus_data;
use crate::ledger::{
    Datum, NativeScript, PlutusData, TransactionInput, TransactionOutput, TransactionUnspentOutput,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputBuilderResult {
    pub input: TransactionInput,
    /// The output being spent.
    pub utxo_info: TransactionOutput,
    pub aggregate_witness: Option<InputAggregateWitnessData>,
    pub required_wits: RequiredWitnessSet,
}

impl InputBuilderResult {
    pub fn to_utxo(&self) -> TransactionUnspentOutput {
        TransactionUnspentOutput::new(self.input, self.utxo_info.clone())
    }
}

#[derive(Clone, Debug)]
pub struct SingleInputBuilder {
    input: TransactionInput,
    utxo_info: TransactionOutput,
}

impl SingleInputBuilder {
    pub fn new(input: TransactionInput, utxo_info: TransactionOutput) -> Self {
        Self { input, utxo_info }
    }

    pub fn from_utxo(utxo: &TransactionUnspentOutput) -> Self {
        Self::new(utxo.input, utxo.output.clone())
    }

    /// Spend with a signature. Byron addresses need a bootstrap witness
    /// instead of a vkey witness.
    pub fn payment_key(self) -> Result<InputBuilderResult, BuilderError> {
        let mut required_wits = RequiredWitnessSet::new();
        match (self.utxo_info.address.payment_cred(), self.utxo_info.address.as_byron()) {
            (Some(Credential::Key(hash)), _) => required_wits.add_vkey_key_hash(*hash),
            (None, Some(byron)) => required_wits.add_bootstrap(byron.clone()),
            (cred, _) => {
                return Err(BuilderError::WrongCredentialKind {
                    found: credential_kind(cred),
                })
            }
        }
        Ok(InputBuilderResult {
            input: self.input,
            utxo_info: self.utxo_info,
            aggregate_witness: None,
            required_wits,
        })
    }

    pub fn native_script(
        self,
        script: NativeScript,
        witness_info: NativeScriptWitnessInfo,
    ) -> Result<InputBuilderResult, BuilderError> {
        let script_hash = self.script_hash()?;
        if script.hash() != script_hash {
            return Err(BuilderError::MissingScriptWitness(script_hash));
        }
        let mut required_wits = RequiredWitnessSet::new();
        required_wits.add_script_hash(script_hash);
        Ok(InputBuilderResult {
            input: self.input,
            utxo_info: self.utxo_info,
            aggregate_witness: Some(InputAggregateWitnessData::NativeScript(script, witness_info)),
            required_wits,
        })
    }

    /// Spend a script-locked output. `datum` must be supplied when the
    /// output only commits to a datum hash; inline datums need nothing.
    pub fn plutus_script(
        self,
        partial_witness: PartialPlutusWitness,
        required_signers: Vec<Ed25519KeyHash>,
        datum: Option<PlutusData>,
    ) -> Result<InputBuilderResult, BuilderError> {
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

        if let Some(Datum::Hash(expected)) = &self.utxo_info.datum {
            match &datum {
                Some(d) if hash_plutus_data(d) == *expected => {}
                _ => return Err(BuilderError::MissingDatum(*expected)),
            }
            required_wits.add_plutus_datum_hash(*expected);
        }

        Ok(InputBuilderResult {
            input: self.input,
            utxo_info: self.utxo_info,
            aggregate_witness: Some(InputAggregateWitnessData::PlutusScript(
                partial_witness,
                required_signers,
                datum,
            )),
            required_wits,
        })
    }

    fn script_hash(&self) -> Result<crate::crypto::ScriptHash, BuilderError> {
        match self.utxo_info.address.payment_cred() {
            Some(Credential::Script(hash)) => Ok(*hash),
            other => Err(BuilderError::WrongCredentialKind {
                found: credential_kind(other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Address, EnterpriseAddress};
    use crate::crypto::{ScriptHash, TransactionHash};
    use crate::ledger::{Language, PlutusScript};
    use crate::value::{BigNum, Value};

    fn output(payment: Credential) -> TransactionOutput {
        TransactionOutput::new(
            Address::Enterprise(EnterpriseAddress {
                network: 0,
                payment,
            }),
            Value::new(BigNum::new(5_000_000)),
        )
    }

    fn input() -> TransactionInput {
        TransactionInput::new(TransactionHash::from_raw([7; 32]), 0)
    }

    #[test]
    fn test_payment_key_requires_the_key_hash() {
        let hash = Ed25519KeyHash::from_raw([1; 28]);
        let result = SingleInputBuilder::new(input(), output(Credential::from_keyhash(&hash)))
            .payment_key()
            .unwrap();
        assert!(result.required_wits.vkeys().contains(&hash));
        assert!(result.aggregate_witness.is_none());
    }

    #[test]
    fn test_payment_key_on_script_address_is_rejected() {
        let cred = Credential::from_scripthash(&ScriptHash::from_raw([2; 28]));
        let err = SingleInputBuilder::new(input(), output(cred))
            .payment_key()
            .unwrap_err();
        assert_eq!(err, BuilderError::WrongCredentialKind { found: "script credential" });
    }

    #[test]
    fn test_native_script_must_match_credential() {
        let script = NativeScript::ScriptPubkey(Ed25519KeyHash::from_raw([3; 28]));
        let good = Credential::from_scripthash(&script.hash());
        let result = SingleInputBuilder::new(input(), output(good))
            .native_script(script.clone(), NativeScriptWitnessInfo::AssumeSignatureCount)
            .unwrap();
        assert!(result.required_wits.scripts().contains(&script.hash()));

        let other = Credential::from_scripthash(&ScriptHash::from_raw([4; 28]));
        let err = SingleInputBuilder::new(input(), output(other))
            .native_script(script, NativeScriptWitnessInfo::Count(1))
            .unwrap_err();
        assert!(matches!(err, BuilderError::MissingScriptWitness(_)));
    }

    #[test]
    fn test_plutus_input_needs_matching_datum() {
        let script = PlutusScript::new(Language::PlutusV2, vec![0x4e, 0x4d, 0x01]);
        let cred = Credential::from_scripthash(&script.hash());
        let datum = PlutusData::new_bytes(vec![42]);
        let utxo = output(cred).with_datum(Datum::Hash(hash_plutus_data(&datum)));
        let partial = PartialPlutusWitness::new(
            PlutusScriptWitness::Script(script),
            PlutusData::unit(),
        );

        let err = SingleInputBuilder::new(input(), utxo.clone())
            .plutus_script(partial.clone(), vec![], None)
            .unwrap_err();
        assert!(matches!(err, BuilderError::MissingDatum(_)));

        let signer = Ed25519KeyHash::from_raw([9; 28]);
        let result = SingleInputBuilder::new(input(), utxo)
            .plutus_script(partial, vec![signer], Some(datum.clone()))
            .unwrap();
        assert!(result.required_wits.plutus_data().contains(&hash_plutus_data(&datum)));
        assert!(result.required_wits.vkeys().contains(&signer));
        assert_eq!(
            result.aggregate_witness.as_ref().and_then(|w| w.plutus_data()),
            Some(&datum)
        );
    }

    #[test]
    fn test_reference_script_is_marked_as_ref() {
        let hash = ScriptHash::from_raw([5; 28]);
        let partial = PartialPlutusWitness::new(PlutusScriptWitness::Ref(hash), PlutusData::unit());
        let result = SingleInputBuilder::new(input(), output(Credential::from_scripthash(&hash)))
            .plutus_script(partial, vec![], None)
            .unwrap();
        assert!(result.required_wits.script_refs().contains(&hash));
    }
}
