//! # Signed Transaction Assembly
//!
//! The last step after balancing: the body is fixed, so its hash is fixed,
//! and all that is left is collecting signatures until every required
//! witness is present.

use tracing::debug;

use crate::builders::witness_builder::{TransactionWitnessSetBuilder, WitnessError};
use crate::crypto::{make_vkey_witness, BootstrapWitness, PrivateKey, Vkeywitness};
use crate::ledger::{AuxiliaryData, Transaction, TransactionBody};

#[derive(Clone, Debug)]
pub struct SignedTxBuilder {
    body: TransactionBody,
    witness_set: TransactionWitnessSetBuilder,
    is_valid: bool,
    auxiliary_data: Option<AuxiliaryData>,
}

impl SignedTxBuilder {
    pub fn new_with_data(
        body: TransactionBody,
        witness_set: TransactionWitnessSetBuilder,
        is_valid: bool,
        auxiliary_data: Option<AuxiliaryData>,
    ) -> Self {
        Self {
            body,
            witness_set,
            is_valid,
            auxiliary_data,
        }
    }

    pub fn body(&self) -> &TransactionBody {
        &self.body
    }

    pub fn witness_set_builder(&self) -> &TransactionWitnessSetBuilder {
        &self.witness_set
    }

    pub fn auxiliary_data(&self) -> Option<&AuxiliaryData> {
        self.auxiliary_data.as_ref()
    }

    pub fn add_vkey(&mut self, witness: Vkeywitness) {
        self.witness_set.add_vkey(witness);
    }

    pub fn add_bootstrap(&mut self, witness: BootstrapWitness) {
        self.witness_set.add_bootstrap(witness);
    }

    /// Sign the body hash with `key`.
    pub fn sign_with(&mut self, key: &PrivateKey) {
        let witness = make_vkey_witness(&self.body.hash(), key);
        debug!(signer = %key.to_public().hash(), "signed transaction body");
        self.add_vkey(witness);
    }

    /// Fails if any required witness is still missing.
    pub fn build_checked(self) -> Result<Transaction, WitnessError> {
        let witness_set = self.witness_set.try_build()?;
        Ok(self.finish(witness_set))
    }

    /// Whatever has been collected so far, e.g. to hand to a wallet that
    /// adds its own signatures.
    pub fn build_unchecked(self) -> Transaction {
        let witness_set = self.witness_set.build();
        self.finish(witness_set)
    }

    fn finish(self, witness_set: crate::ledger::TransactionWitnessSet) -> Transaction {
        let mut tx = Transaction::new(self.body, witness_set, self.auxiliary_data);
        tx.is_valid = self.is_valid;
        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::witness_builder::RequiredWitnessSet;
    use crate::crypto::TransactionHash;
    use crate::ledger::TransactionInput;
    use crate::value::BigNum;

    fn builder_for(key: &PrivateKey) -> SignedTxBuilder {
        let body = TransactionBody::new(
            vec![TransactionInput::new(TransactionHash::from_raw([1; 32]), 0)],
            vec![],
            BigNum::new(200_000),
        );
        let mut witnesses = TransactionWitnessSetBuilder::new();
        let mut required = RequiredWitnessSet::new();
        required.add_vkey_key_hash(key.to_public().hash());
        witnesses.add_required_wits(&required);
        SignedTxBuilder::new_with_data(body, witnesses, true, None)
    }

    #[test]
    fn test_checked_build_needs_every_signature() {
        let key = PrivateKey::from_seed(&[3; 32]);
        let unsigned = builder_for(&key);
        assert!(matches!(
            unsigned.clone().build_checked(),
            Err(WitnessError::MissingWitnesses(_))
        ));
        assert!(unsigned.build_unchecked().witness_set.vkeywitnesses.is_empty());

        let mut signed = builder_for(&key);
        signed.sign_with(&key);
        let tx = signed.build_checked().unwrap();
        let witness = &tx.witness_set.vkeywitnesses[0];
        assert!(witness.vkey.verify(tx.hash().as_bytes(), &witness.signature));
    }
}
