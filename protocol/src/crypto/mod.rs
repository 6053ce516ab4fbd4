//! # Cryptographic Primitives
//!
//! Hashing and Ed25519 key material, wrapped in ledger types.
//!
//! We don't roll our own: Blake2b comes from RustCrypto's `blake2`, Ed25519
//! from `ed25519-dalek`. Everything here is a thin, type-safe wrapper so the
//! rest of the crate never juggles raw `[u8; N]`s.

pub mod hash;
pub mod keys;

pub use hash::{
    blake2b224, blake2b256, AuxiliaryDataHash, DatumHash, Ed25519KeyHash, PolicyId, PoolKeyHash,
    PoolMetadataHash, ScriptDataHash, ScriptHash, TransactionHash, VrfKeyHash,
};
pub use keys::{
    make_vkey_witness, BootstrapWitness, Ed25519Signature, KeyError, PrivateKey, Vkey, Vkeywitness,
};
