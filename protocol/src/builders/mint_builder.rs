//! Minting and burning under one policy.
//!
//! Policies are always scripts, so there is no `payment_key()` here.

use crate::builders::witness_builder::{
    InputAggregateWitnessData, NativeScriptWitnessInfo, PartialPlutusWitness, PlutusScriptWitness,
    RequiredWitnessSet,
};
use crate::crypto::{Ed25519KeyHash, PolicyId};
use crate::ledger::NativeScript;
use crate::value::{AssetName, Int, MintAssets};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintBuilderResult {
    pub policy_id: PolicyId,
    pub assets: MintAssets,
    pub aggregate_witness: Option<InputAggregateWitnessData>,
    pub required_wits: RequiredWitnessSet,
}

#[derive(Clone, Debug)]
pub struct SingleMintBuilder {
    assets: MintAssets,
}

impl SingleMintBuilder {
    /// Positive amounts mint, negative amounts burn.
    pub fn new(assets: MintAssets) -> Self {
        Self { assets }
    }

    pub fn new_single_asset(name: AssetName, amount: Int) -> Self {
        Self::new(MintAssets::new_from_entry(name, amount))
    }

    pub fn native_script(
        self,
        script: NativeScript,
        witness_info: NativeScriptWitnessInfo,
    ) -> MintBuilderResult {
        let policy_id = script.hash();
        let mut required_wits = RequiredWitnessSet::new();
        required_wits.add_script_hash(policy_id);
        MintBuilderResult {
            policy_id,
            assets: self.assets,
            aggregate_witness: Some(InputAggregateWitnessData::NativeScript(script, witness_info)),
            required_wits,
        }
    }

    pub fn plutus_script(
        self,
        partial_witness: PartialPlutusWitness,
        required_signers: Vec<Ed25519KeyHash>,
    ) -> MintBuilderResult {
        let policy_id = partial_witness.script.hash();
        let mut required_wits = RequiredWitnessSet::new();
        required_wits.add_script_hash(policy_id);
        if let PlutusScriptWitness::Ref(hash) = &partial_witness.script {
            required_wits.add_script_ref(*hash);
        }
        for signer in &required_signers {
            required_wits.add_vkey_key_hash(*signer);
        }
        MintBuilderResult {
            policy_id,
            assets: self.assets,
            aggregate_witness: Some(InputAggregateWitnessData::PlutusScript(
                partial_witness,
                required_signers,
                None,
            )),
            required_wits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_is_script_hash() {
        let script = NativeScript::ScriptPubkey(Ed25519KeyHash::from_raw([1; 28]));
        let name = AssetName::new(b"coin".to_vec()).unwrap();
        let result = SingleMintBuilder::new_single_asset(name.clone(), Int::new_i32(5))
            .native_script(script.clone(), NativeScriptWitnessInfo::AssumeSignatureCount);
        assert_eq!(result.policy_id, script.hash());
        assert_eq!(result.assets.get(&name), Some(Int::new_i32(5)));
        assert!(result.required_wits.scripts().contains(&script.hash()));
    }
}
