//! # Witness Accounting
//!
//! Every item added to a transaction says what it needs to be authorised: a
//! signature from some key, a script with some hash, a datum, a redeemer.
//! Those needs are collected in a [`RequiredWitnessSet`]. The
//! [`TransactionWitnessSetBuilder`] then gathers the witnesses that satisfy
//! them, deduplicating as it goes, and can tell you what is still missing.
//!
//! A partially witnessed transaction is a perfectly normal thing to build:
//! the usual flow is to build here, hand the bytes to a wallet, and fold the
//! wallet's signatures back in later. So [`TransactionWitnessSetBuilder::build`]
//! never fails; only [`TransactionWitnessSetBuilder::try_build`] insists on
//! completeness.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;

use crate::address::byron::byron_address_root;
use crate::address::ByronAddress;
use crate::crypto::{
    BootstrapWitness, DatumHash, Ed25519KeyHash, ScriptHash, Vkey, Vkeywitness,
};
use crate::ledger::{
    NativeScript, PlutusData, PlutusList, PlutusScript, Redeemer, RedeemerTag, Redeemers, Script,
    TransactionWitnessSet,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WitnessError {
    #[error("missing witnesses: {0}")]
    MissingWitnesses(Box<RequiredWitnessSet>),
}

// ---------------------------------------------------------------------------
// RequiredWitnessSet
// ---------------------------------------------------------------------------

/// Identifies a redeemer by purpose and position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RedeemerWitnessKey {
    pub tag: RedeemerTag,
    pub index: u64,
}

impl RedeemerWitnessKey {
    pub fn new(tag: RedeemerTag, index: u64) -> Self {
        Self { tag, index }
    }
}

impl fmt::Display for RedeemerWitnessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag, self.index)
    }
}

/// What a transaction (or one item of it) needs in its witness set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequiredWitnessSet {
    vkeys: BTreeSet<Ed25519KeyHash>,
    bootstraps: BTreeSet<ByronAddress>,
    scripts: BTreeSet<ScriptHash>,
    plutus_data: BTreeSet<DatumHash>,
    redeemers: BTreeSet<RedeemerWitnessKey>,
    /// Scripts provided by reference inputs rather than the witness set.
    script_refs: BTreeSet<ScriptHash>,
}

impl RequiredWitnessSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vkey_key_hash(&mut self, hash: Ed25519KeyHash) {
        self.vkeys.insert(hash);
    }

    pub fn add_bootstrap(&mut self, address: ByronAddress) {
        self.bootstraps.insert(address);
    }

    pub fn add_script_hash(&mut self, hash: ScriptHash) {
        self.scripts.insert(hash);
    }

    pub fn add_script_ref(&mut self, hash: ScriptHash) {
        self.script_refs.insert(hash);
    }

    pub fn add_plutus_datum_hash(&mut self, hash: DatumHash) {
        self.plutus_data.insert(hash);
    }

    pub fn add_redeemer_key(&mut self, key: RedeemerWitnessKey) {
        self.redeemers.insert(key);
    }

    pub fn add_all(&mut self, other: &RequiredWitnessSet) {
        self.vkeys.extend(other.vkeys.iter().copied());
        self.bootstraps.extend(other.bootstraps.iter().cloned());
        self.scripts.extend(other.scripts.iter().copied());
        self.plutus_data.extend(other.plutus_data.iter().copied());
        self.redeemers.extend(other.redeemers.iter().copied());
        self.script_refs.extend(other.script_refs.iter().copied());
    }

    pub fn vkeys(&self) -> &BTreeSet<Ed25519KeyHash> {
        &self.vkeys
    }

    pub fn bootstraps(&self) -> &BTreeSet<ByronAddress> {
        &self.bootstraps
    }

    pub fn scripts(&self) -> &BTreeSet<ScriptHash> {
        &self.scripts
    }

    pub fn script_refs(&self) -> &BTreeSet<ScriptHash> {
        &self.script_refs
    }

    pub fn plutus_data(&self) -> &BTreeSet<DatumHash> {
        &self.plutus_data
    }

    pub fn redeemers(&self) -> &BTreeSet<RedeemerWitnessKey> {
        &self.redeemers
    }

    pub fn len(&self) -> usize {
        self.vkeys.len()
            + self.bootstraps.len()
            + self.scripts.len()
            + self.plutus_data.len()
            + self.redeemers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for RequiredWitnessSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.vkeys.is_empty() {
            let keys: Vec<String> = self.vkeys.iter().map(|h| h.to_hex()).collect();
            parts.push(format!("vkeys [{}]", keys.join(", ")));
        }
        if !self.bootstraps.is_empty() {
            parts.push(format!("{} bootstrap(s)", self.bootstraps.len()));
        }
        if !self.scripts.is_empty() {
            let scripts: Vec<String> = self.scripts.iter().map(|h| h.to_hex()).collect();
            parts.push(format!("scripts [{}]", scripts.join(", ")));
        }
        if !self.plutus_data.is_empty() {
            parts.push(format!("{} datum(s)", self.plutus_data.len()));
        }
        if !self.redeemers.is_empty() {
            let keys: Vec<String> = self.redeemers.iter().map(|k| k.to_string()).collect();
            parts.push(format!("redeemers [{}]", keys.join(", ")));
        }
        if parts.is_empty() {
            f.write_str("nothing")
        } else {
            f.write_str(&parts.join("; "))
        }
    }
}

// ---------------------------------------------------------------------------
// Script witness descriptions
// ---------------------------------------------------------------------------

/// How many signatures a native script will end up carrying. Only used to
/// size the fee estimate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NativeScriptWitnessInfo {
    /// This many signers, identity unknown.
    Count(u32),
    /// Exactly these signers.
    Vkeys(Vec<Ed25519KeyHash>),
    /// Every key the script mentions. Safe upper bound.
    AssumeSignatureCount,
}

/// A Plutus script either carried in the witness set or found on a
/// reference input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlutusScriptWitness {
    Script(PlutusScript),
    Ref(ScriptHash),
}

impl PlutusScriptWitness {
    pub fn hash(&self) -> ScriptHash {
        match self {
            PlutusScriptWitness::Script(s) => s.hash(),
            PlutusScriptWitness::Ref(h) => *h,
        }
    }
}

/// A Plutus witness missing only its execution budget, which is filled in
/// once the redeemer index is known and the evaluator has run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialPlutusWitness {
    pub script: PlutusScriptWitness,
    /// The redeemer argument.
    pub data: PlutusData,
}

impl PartialPlutusWitness {
    pub fn new(script: PlutusScriptWitness, data: PlutusData) -> Self {
        Self { script, data }
    }
}

/// Script witnessing attached to one built item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputAggregateWitnessData {
    NativeScript(NativeScript, NativeScriptWitnessInfo),
    /// Witness, extra required signers, and the spending datum (inputs only).
    PlutusScript(PartialPlutusWitness, Vec<Ed25519KeyHash>, Option<PlutusData>),
}

impl InputAggregateWitnessData {
    pub fn redeemer_plutus_data(&self) -> Option<&PlutusData> {
        match self {
            InputAggregateWitnessData::PlutusScript(partial, _, _) => Some(&partial.data),
            InputAggregateWitnessData::NativeScript(..) => None,
        }
    }

    pub fn plutus_data(&self) -> Option<&PlutusData> {
        match self {
            InputAggregateWitnessData::PlutusScript(_, _, datum) => datum.as_ref(),
            InputAggregateWitnessData::NativeScript(..) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionWitnessSetBuilder
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct TransactionWitnessSetBuilder {
    vkeys: BTreeMap<Vkey, Vkeywitness>,
    /// Keyed by the root of the address each witness unlocks.
    bootstraps: BTreeMap<[u8; 28], BootstrapWitness>,
    native_scripts: BTreeMap<ScriptHash, NativeScript>,
    plutus_scripts: BTreeMap<ScriptHash, PlutusScript>,
    plutus_data: BTreeMap<DatumHash, PlutusData>,
    redeemers: BTreeMap<RedeemerWitnessKey, Redeemer>,
    required_wits: RequiredWitnessSet,
}

impl TransactionWitnessSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first witness for a given key wins.
    pub fn add_vkey(&mut self, witness: Vkeywitness) {
        self.vkeys.entry(witness.vkey).or_insert(witness);
    }

    /// One witness per reconstructed address. A key behind several Byron
    /// addresses (different attributes) needs one witness for each.
    pub fn add_bootstrap(&mut self, witness: BootstrapWitness) {
        let root = byron_address_root(witness.vkey.as_bytes(), &witness.chain_code, &witness.attributes);
        self.bootstraps.entry(root).or_insert(witness);
    }

    pub fn add_script(&mut self, script: Script) {
        match script {
            Script::Native(s) => self.add_native_script(s),
            Script::Plutus(s) => self.add_plutus_script(s),
        }
    }

    pub fn add_native_script(&mut self, script: NativeScript) {
        self.native_scripts.entry(script.hash()).or_insert(script);
    }

    pub fn add_plutus_script(&mut self, script: PlutusScript) {
        self.plutus_scripts.entry(script.hash()).or_insert(script);
    }

    pub fn add_plutus_datum(&mut self, datum: PlutusData) {
        let hash = crate::hashing::hash_plutus_data(&datum);
        self.plutus_data.entry(hash).or_insert(datum);
    }

    /// Replaces any redeemer with the same tag and index.
    pub fn add_redeemer(&mut self, redeemer: Redeemer) {
        let key = RedeemerWitnessKey::new(redeemer.tag, redeemer.index.as_u64());
        self.redeemers.insert(key, redeemer);
    }

    pub fn add_redeemers(&mut self, redeemers: &Redeemers) {
        for r in redeemers.iter() {
            self.add_redeemer(r.clone());
        }
    }

    pub fn add_required_wits(&mut self, required: &RequiredWitnessSet) {
        self.required_wits.add_all(required);
    }

    /// Record the scripts and data an item's aggregate witness carries.
    pub fn add_input_aggregate_witness_data(&mut self, data: &InputAggregateWitnessData) {
        match data {
            InputAggregateWitnessData::NativeScript(script, _) => {
                self.add_native_script(script.clone());
            }
            InputAggregateWitnessData::PlutusScript(partial, _, datum) => {
                if let PlutusScriptWitness::Script(script) = &partial.script {
                    self.add_plutus_script(script.clone());
                }
                if let Some(datum) = datum {
                    self.add_plutus_datum(datum.clone());
                }
            }
        }
    }

    /// Merge a witness set produced elsewhere, typically a wallet's.
    pub fn add_existing(&mut self, witness_set: &TransactionWitnessSet) {
        for w in &witness_set.vkeywitnesses {
            self.add_vkey(w.clone());
        }
        for w in &witness_set.bootstraps {
            self.add_bootstrap(w.clone());
        }
        for s in &witness_set.native_scripts {
            self.add_native_script(s.clone());
        }
        for s in &witness_set.plutus_scripts {
            self.add_plutus_script(s.clone());
        }
        if let Some(data) = &witness_set.plutus_data {
            for d in data.iter() {
                self.add_plutus_datum(d.clone());
            }
        }
        if let Some(redeemers) = &witness_set.redeemers {
            self.add_redeemers(redeemers);
        }
    }

    pub fn required_wits(&self) -> &RequiredWitnessSet {
        &self.required_wits
    }

    pub fn vkey_count(&self) -> usize {
        self.vkeys.len()
    }

    pub fn has_vkey_for(&self, hash: &Ed25519KeyHash) -> bool {
        self.vkeys.keys().any(|vkey| vkey.hash() == *hash)
    }

    pub fn has_bootstrap_for(&self, address: &ByronAddress) -> bool {
        self.bootstraps.contains_key(address.root())
    }

    pub fn plutus_scripts(&self) -> impl Iterator<Item = &PlutusScript> {
        self.plutus_scripts.values()
    }

    pub fn plutus_data(&self) -> Option<PlutusList> {
        if self.plutus_data.is_empty() {
            None
        } else {
            Some(self.plutus_data.values().cloned().collect())
        }
    }

    pub fn redeemers(&self) -> Option<Redeemers> {
        if self.redeemers.is_empty() {
            None
        } else {
            Some(Redeemers::from(self.redeemers.values().cloned().collect::<Vec<_>>()))
        }
    }

    /// Required minus present.
    pub fn remaining_wits(&self) -> RequiredWitnessSet {
        let required = &self.required_wits;
        let mut remaining = RequiredWitnessSet::new();
        for hash in &required.vkeys {
            if !self.has_vkey_for(hash) {
                remaining.add_vkey_key_hash(*hash);
            }
        }
        for address in &required.bootstraps {
            if !self.has_bootstrap_for(address) {
                remaining.add_bootstrap(address.clone());
            }
        }
        for hash in &required.scripts {
            let present = self.native_scripts.contains_key(hash)
                || self.plutus_scripts.contains_key(hash)
                || required.script_refs.contains(hash);
            if !present {
                remaining.add_script_hash(*hash);
            }
        }
        for hash in &required.plutus_data {
            if !self.plutus_data.contains_key(hash) {
                remaining.add_plutus_datum_hash(*hash);
            }
        }
        for key in &required.redeemers {
            if !self.redeemers.contains_key(key) {
                remaining.add_redeemer_key(*key);
            }
        }
        remaining
    }

    pub fn try_build(&self) -> Result<TransactionWitnessSet, WitnessError> {
        let remaining = self.remaining_wits();
        if remaining.is_empty() {
            Ok(self.build())
        } else {
            Err(WitnessError::MissingWitnesses(Box::new(remaining)))
        }
    }

    pub fn build(&self) -> TransactionWitnessSet {
        TransactionWitnessSet {
            vkeywitnesses: self.vkeys.values().cloned().collect(),
            native_scripts: self.native_scripts.values().cloned().collect(),
            bootstraps: self.bootstraps.values().cloned().collect(),
            plutus_scripts: self.plutus_scripts.values().cloned().collect(),
            plutus_data: self.plutus_data(),
            redeemers: self.redeemers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::byron::tests::sample_byron;
    use crate::crypto::{make_vkey_witness, PrivateKey, TransactionHash};
    use crate::ledger::{ExUnits, Language};
    use crate::value::BigNum;

    fn key(seed: u8) -> PrivateKey {
        PrivateKey::from_seed(&[seed; 32])
    }

    #[test]
    fn test_vkeys_deduplicate_by_key() {
        let k = key(1);
        let mut builder = TransactionWitnessSetBuilder::new();
        builder.add_vkey(make_vkey_witness(&TransactionHash::from_raw([1; 32]), &k));
        builder.add_vkey(make_vkey_witness(&TransactionHash::from_raw([2; 32]), &k));
        assert_eq!(builder.build().vkeywitnesses.len(), 1);
    }

    #[test]
    fn test_bootstraps_deduplicate_by_address() {
        let k = key(3);
        let chain_code = vec![7u8; 32];
        let witness_for = |attributes: &[u8]| {
            let address = ByronAddress::from_raw_bytes(&sample_byron(
                byron_address_root(k.to_public().as_bytes(), &chain_code, attributes),
                None,
            ))
            .unwrap();
            let witness = BootstrapWitness {
                vkey: k.to_public(),
                signature: k.sign(b"body"),
                chain_code: chain_code.clone(),
                attributes: attributes.to_vec(),
            };
            (address, witness)
        };
        // Same key, two address attribute maps.
        let (plain, plain_wit) = witness_for(&[0xa0]);
        let (tagged, tagged_wit) = witness_for(&[0xa1, 0x02, 0x45, 0x1a, 0x41, 0x70, 0xcb, 0x17]);
        assert_ne!(plain.root(), tagged.root());

        let mut required = RequiredWitnessSet::new();
        required.add_bootstrap(plain.clone());
        required.add_bootstrap(tagged.clone());

        let mut builder = TransactionWitnessSetBuilder::new();
        builder.add_required_wits(&required);
        builder.add_bootstrap(plain_wit.clone());
        assert!(builder.has_bootstrap_for(&plain));
        assert!(!builder.has_bootstrap_for(&tagged));
        assert_eq!(builder.remaining_wits().bootstraps().len(), 1);

        builder.add_bootstrap(tagged_wit);
        builder.add_bootstrap(plain_wit);
        assert!(builder.remaining_wits().is_empty());
        assert_eq!(builder.try_build().unwrap().bootstraps.len(), 2);
    }

    #[test]
    fn test_missing_vkey_reported_until_signed() {
        let k = key(2);
        let mut required = RequiredWitnessSet::new();
        required.add_vkey_key_hash(k.to_public().hash());

        let mut builder = TransactionWitnessSetBuilder::new();
        builder.add_required_wits(&required);
        match builder.try_build() {
            Err(WitnessError::MissingWitnesses(missing)) => {
                assert!(missing.vkeys().contains(&k.to_public().hash()));
            }
            Ok(_) => panic!("expected missing witnesses"),
        }
        // build() still hands back what it has.
        assert!(builder.build().vkeywitnesses.is_empty());

        builder.add_vkey(make_vkey_witness(&TransactionHash::from_raw([0; 32]), &k));
        assert!(builder.remaining_wits().is_empty());
        assert_eq!(builder.try_build().unwrap().vkeywitnesses.len(), 1);
    }

    #[test]
    fn test_scripts_and_data_dedupe_by_hash() {
        let script = NativeScript::ScriptPubkey(Ed25519KeyHash::from_raw([3; 28]));
        let datum = PlutusData::new_bytes(vec![1, 2, 3]);
        let mut builder = TransactionWitnessSetBuilder::new();
        builder.add_native_script(script.clone());
        builder.add_script(Script::Native(script.clone()));
        builder.add_plutus_datum(datum.clone());
        builder.add_plutus_datum(datum);
        let built = builder.build();
        assert_eq!(built.native_scripts, vec![script]);
        assert_eq!(built.plutus_data.map(|d| d.len()), Some(1));
    }

    #[test]
    fn test_redeemers_replace_by_tag_and_index() {
        let mut builder = TransactionWitnessSetBuilder::new();
        let redeemer = |mem| {
            Redeemer::new(RedeemerTag::Spend, BigNum::zero(), PlutusData::unit(), ExUnits::new(mem, 1))
        };
        builder.add_redeemer(redeemer(1));
        builder.add_redeemer(redeemer(2));
        let redeemers = builder.redeemers().unwrap();
        assert_eq!(redeemers.len(), 1);
        assert_eq!(redeemers.iter().next().unwrap().ex_units.mem, 2);
    }

    #[test]
    fn test_script_refs_satisfy_script_requirements() {
        let hash = PlutusScript::new(Language::PlutusV2, vec![0x4e, 0x01]).hash();
        let mut required = RequiredWitnessSet::new();
        required.add_script_hash(hash);
        let mut builder = TransactionWitnessSetBuilder::new();
        builder.add_required_wits(&required);
        assert_eq!(builder.remaining_wits().scripts().len(), 1);

        let mut by_ref = RequiredWitnessSet::new();
        by_ref.add_script_ref(hash);
        builder.add_required_wits(&by_ref);
        assert!(builder.remaining_wits().is_empty());
    }

    #[test]
    fn test_add_existing_merges_without_duplicates() {
        let k = key(4);
        let hash = TransactionHash::from_raw([4; 32]);
        let mut external = TransactionWitnessSet::new();
        external.vkeywitnesses.push(make_vkey_witness(&hash, &k));

        let mut builder = TransactionWitnessSetBuilder::new();
        builder.add_vkey(make_vkey_witness(&hash, &k));
        builder.add_existing(&external);
        builder.add_existing(&external);
        assert_eq!(builder.vkey_count(), 1);
    }

    #[test]
    fn test_missing_display_names_keys() {
        let mut required = RequiredWitnessSet::new();
        required.add_vkey_key_hash(Ed25519KeyHash::from_raw([0xab; 28]));
        required.add_redeemer_key(RedeemerWitnessKey::new(RedeemerTag::Mint, 1));
        let text = required.to_string();
        assert!(text.contains("abab"));
        assert!(text.contains("mint:1"));
    }
}
