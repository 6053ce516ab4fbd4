//! Certificates and who must sign for them.

use crate::address::Credential;
use crate::builders::witness_builder::{
    InputAggregateWitnessData, NativeScriptWitnessInfo, PartialPlutusWitness, PlutusScriptWitness,
    RequiredWitnessSet,
};
use crate::builders::{credential_kind, BuilderError};
use crate::crypto::{Ed25519KeyHash, ScriptHash};
use crate::ledger::{Certificate, NativeScript};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CertificateBuilderResult {
    pub cert: Certificate,
    pub aggregate_witness: Option<InputAggregateWitnessData>,
    pub required_wits: RequiredWitnessSet,
}

#[derive(Clone, Debug)]
pub struct SingleCertificateBuilder {
    cert: Certificate,
}

impl SingleCertificateBuilder {
    pub fn new(cert: Certificate) -> Self {
        Self { cert }
    }

    /// For certificates the ledger accepts unsigned, like a stake
    /// registration.
    pub fn skip_witness(self) -> CertificateBuilderResult {
        CertificateBuilderResult {
            cert: self.cert,
            aggregate_witness: None,
            required_wits: RequiredWitnessSet::new(),
        }
    }

    /// Every key the certificate names must sign: the stake key, or for
    /// pool certificates the operator (and owners on registration).
    pub fn payment_key(self) -> Result<CertificateBuilderResult, BuilderError> {
        let mut required_wits = RequiredWitnessSet::new();
        for hash in self.key_signers()? {
            required_wits.add_vkey_key_hash(hash);
        }
        Ok(CertificateBuilderResult {
            cert: self.cert,
            aggregate_witness: None,
            required_wits,
        })
    }

    pub fn native_script(
        self,
        script: NativeScript,
        witness_info: NativeScriptWitnessInfo,
    ) -> Result<CertificateBuilderResult, BuilderError> {
        let script_hash = self.script_hash()?;
        if script.hash() != script_hash {
            return Err(BuilderError::MissingScriptWitness(script_hash));
        }
        let mut required_wits = RequiredWitnessSet::new();
        required_wits.add_script_hash(script_hash);
        Ok(CertificateBuilderResult {
            cert: self.cert,
            aggregate_witness: Some(InputAggregateWitnessData::NativeScript(script, witness_info)),
            required_wits,
        })
    }

    pub fn plutus_script(
        self,
        partial_witness: PartialPlutusWitness,
        required_signers: Vec<Ed25519KeyHash>,
    ) -> Result<CertificateBuilderResult, BuilderError> {
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
        Ok(CertificateBuilderResult {
            cert: self.cert,
            aggregate_witness: Some(InputAggregateWitnessData::PlutusScript(
                partial_witness,
                required_signers,
                None,
            )),
            required_wits,
        })
    }

    fn key_signers(&self) -> Result<Vec<Ed25519KeyHash>, BuilderError> {
        match &self.cert {
            Certificate::PoolRegistration(params) => {
                let mut signers = vec![params.operator];
                signers.extend(params.pool_owners.iter().copied());
                Ok(signers)
            }
            Certificate::PoolRetirement { pool_keyhash, .. } => Ok(vec![*pool_keyhash]),
            other => match other.stake_credential() {
                Some(Credential::Key(hash)) => Ok(vec![*hash]),
                cred => Err(BuilderError::WrongCredentialKind {
                    found: credential_kind(cred),
                }),
            },
        }
    }

    fn script_hash(&self) -> Result<ScriptHash, BuilderError> {
        match self.cert.stake_credential() {
            Some(Credential::Script(hash)) => Ok(*hash),
            cred => Err(BuilderError::WrongCredentialKind {
                found: credential_kind(cred),
            }),
        }
    }
}
