//! # Keys and Key Witnesses
//!
//! Ed25519 verification keys, signatures and the two witness shapes the
//! ledger accepts for them: plain vkey witnesses (Shelley-era addresses)
//! and bootstrap witnesses (Byron-era addresses).
//!
//! Signing itself is `ed25519-dalek`'s job. This module only wraps the key
//! material in ledger types, hashes verification keys into
//! [`Ed25519KeyHash`]es and serializes witnesses.
//!
//! Key bytes are never logged.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};
use thiserror::Error;

use super::hash::{blake2b224, Ed25519KeyHash, TransactionHash};
use crate::codec::expect_array;
use crate::error::DeserializeError;

/// Errors from key parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid secret key bytes: expected 32 bytes")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

// ---------------------------------------------------------------------------
// Vkey
// ---------------------------------------------------------------------------

/// A 32-byte Ed25519 verification key as it appears in witnesses.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Vkey([u8; 32]);

impl Vkey {
    pub fn from_raw(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_raw_bytes(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| DeserializeError::WrongLength {
            what: "Vkey",
            expected: 32,
            found: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The key hash that addresses and required-signer sets refer to.
    pub fn hash(&self) -> Ed25519KeyHash {
        Ed25519KeyHash::from_raw(blake2b224(&self.0))
    }

    /// Checks `signature` over `message`. Returns `false` for keys that are
    /// not valid curve points rather than erroring.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        key.verify(message, &sig).is_ok()
    }
}

// ---------------------------------------------------------------------------
// Ed25519Signature
// ---------------------------------------------------------------------------

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Ed25519Signature([u8; 64]);

impl Ed25519Signature {
    pub fn from_raw(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn from_raw_bytes(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| DeserializeError::WrongLength {
            what: "Ed25519Signature",
            expected: 64,
            found: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// A signing key. Deliberately not `Debug`, `Clone` or serializable: if
/// you want the bytes out, call [`PrivateKey::to_raw_bytes`] on purpose.
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    /// Fresh key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn from_raw_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let seed: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    pub fn to_raw_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn to_public(&self) -> Vkey {
        Vkey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }
}

// ---------------------------------------------------------------------------
// Witnesses
// ---------------------------------------------------------------------------

/// `[vkey, signature]` over a transaction hash.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Vkeywitness {
    pub vkey: Vkey,
    pub signature: Ed25519Signature,
}

impl Vkeywitness {
    pub fn new(vkey: Vkey, signature: Ed25519Signature) -> Self {
        Self { vkey, signature }
    }
}

/// Sign a transaction body hash with `key`.
pub fn make_vkey_witness(tx_hash: &TransactionHash, key: &PrivateKey) -> Vkeywitness {
    Vkeywitness::new(key.to_public(), key.sign(tx_hash.as_bytes()))
}

/// Byron-era witness. The address attributes and chain code are needed to
/// reconstruct the Byron address root the signature is checked against.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct BootstrapWitness {
    pub vkey: Vkey,
    pub signature: Ed25519Signature,
    pub chain_code: Vec<u8>,
    pub attributes: Vec<u8>,
}

impl Encode<()> for Vkey {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.bytes(&self.0)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Vkey {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        Vkey::from_raw_bytes(d.bytes()?).map_err(|e| decode::Error::message(e.to_string()))
    }
}

impl Encode<()> for Ed25519Signature {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.bytes(&self.0)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Ed25519Signature {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        Ed25519Signature::from_raw_bytes(d.bytes()?)
            .map_err(|e| decode::Error::message(e.to_string()))
    }
}

impl Encode<()> for Vkeywitness {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?.encode(self.vkey)?.encode(self.signature)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Vkeywitness {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        expect_array(d, 2, "vkeywitness")?;
        Ok(Self {
            vkey: d.decode()?,
            signature: d.decode()?,
        })
    }
}

impl Encode<()> for BootstrapWitness {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(4)?
            .encode(self.vkey)?
            .encode(self.signature)?
            .bytes(&self.chain_code)?
            .bytes(&self.attributes)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for BootstrapWitness {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        expect_array(d, 4, "bootstrap witness")?;
        Ok(Self {
            vkey: d.decode()?,
            signature: d.decode()?,
            chain_code: d.bytes()?.to_vec(),
            attributes: d.bytes()?.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CborEncoding;

    #[test]
    fn test_sign_and_verify() {
        let key = PrivateKey::from_seed(&[7u8; 32]);
        let hash = TransactionHash::from_raw([1u8; 32]);
        let wit = make_vkey_witness(&hash, &key);
        assert!(wit.vkey.verify(hash.as_bytes(), &wit.signature));
        assert!(!wit.vkey.verify(b"something else", &wit.signature));
    }

    #[test]
    fn test_vkey_hash_is_28_bytes_and_stable() {
        let key = PrivateKey::from_seed(&[7u8; 32]);
        assert_eq!(key.to_public().hash(), key.to_public().hash());
        assert_eq!(key.to_public().hash().as_bytes().len(), 28);
    }

    #[test]
    fn test_witness_cbor_round_trip() {
        let key = PrivateKey::from_seed(&[2u8; 32]);
        let wit = make_vkey_witness(&TransactionHash::from_raw([0u8; 32]), &key);
        let bytes = wit.to_bytes();
        // array(2) + bytes(32) header + 32 + bytes(64) header + 64
        assert_eq!(bytes.len(), 1 + 2 + 32 + 2 + 64);
        assert_eq!(Vkeywitness::from_bytes(&bytes).unwrap(), wit);
    }

    #[test]
    fn test_secret_key_length_checked() {
        assert_eq!(
            PrivateKey::from_raw_bytes(&[0u8; 31]).err(),
            Some(KeyError::InvalidSecretKey)
        );
    }
}
