//! # Hashing Utilities
//!
//! The ledger hashes with Blake2b in two sizes and nothing else:
//!
//! - **Blake2b-224** — verification-key hashes and script hashes (28 bytes).
//!   Short enough to keep addresses compact.
//! - **Blake2b-256** — transaction ids, datum hashes, auxiliary-data hashes
//!   and the script-data hash (32 bytes).
//!
//! Both come from the RustCrypto `blake2` crate with a variable-output core
//! fixed at compile time, the same `Digest` surface the rest of the
//! RustCrypto family exposes.
//!
//! The second half of the module is the fixed-size hash newtypes. They all
//! share the same surface (bytes, hex, bech32, CBOR, ordering) so they are
//! stamped out by [`impl_hash_type!`].

use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest};

/// Blake2b with a 224-bit output.
pub type Blake2b224 = Blake2b<U28>;

/// Blake2b with a 256-bit output.
pub type Blake2b256 = Blake2b<U32>;

/// Compute Blake2b-224 over `data`.
///
/// # Example
///
/// ```
/// use txforge::crypto::blake2b224;
///
/// assert_eq!(blake2b224(b"txforge").len(), 28);
/// ```
pub fn blake2b224(data: &[u8]) -> [u8; 28] {
    let mut hasher = Blake2b224::new();
    hasher.update(data);
    let mut out = [0u8; 28];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Compute Blake2b-256 over `data`.
pub fn blake2b256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Blake2b-224 over a one-byte prefix followed by `data`, without
/// allocating the concatenation. Script hashes are computed this way
/// (the prefix is the script namespace).
pub fn blake2b224_prefixed(prefix: u8, data: &[u8]) -> [u8; 28] {
    let mut hasher = Blake2b224::new();
    hasher.update([prefix]);
    hasher.update(data);
    let mut out = [0u8; 28];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Stamps out a fixed-size hash newtype with bytes / hex / bech32 / CBOR
/// conversions.
macro_rules! impl_hash_type {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $len]);

        impl $name {
            pub const BYTE_COUNT: usize = $len;

            pub fn from_raw(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn from_raw_bytes(bytes: &[u8]) -> Result<Self, $crate::error::DeserializeError> {
                let arr: [u8; $len] = bytes.try_into().map_err(|_| {
                    $crate::error::DeserializeError::WrongLength {
                        what: stringify!($name),
                        expected: $len,
                        found: bytes.len(),
                    }
                })?;
                Ok(Self(arr))
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn to_raw_bytes(&self) -> Vec<u8> {
                self.0.to_vec()
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self, $crate::error::DeserializeError> {
                Self::from_raw_bytes(&hex::decode(s.trim())?)
            }

            pub fn to_bech32(&self, prefix: &str) -> Result<String, $crate::error::DeserializeError> {
                $crate::crypto::hash::encode_bech32(prefix, &self.0)
            }

            pub fn from_bech32(s: &str) -> Result<Self, $crate::error::DeserializeError> {
                let (_, data) = $crate::crypto::hash::decode_bech32(s)?;
                Self::from_raw_bytes(&data)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::DeserializeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl minicbor::Encode<()> for $name {
            fn encode<W: minicbor::encode::Write>(
                &self,
                e: &mut minicbor::Encoder<W>,
                _ctx: &mut (),
            ) -> Result<(), minicbor::encode::Error<W::Error>> {
                e.bytes(&self.0)?;
                Ok(())
            }
        }

        impl<'b> minicbor::Decode<'b, ()> for $name {
            fn decode(
                d: &mut minicbor::Decoder<'b>,
                _ctx: &mut (),
            ) -> Result<Self, minicbor::decode::Error> {
                let bytes = d.bytes()?;
                let arr: [u8; $len] = bytes.try_into().map_err(|_| {
                    minicbor::decode::Error::message(format!(
                        "{}: expected {} bytes, got {}",
                        stringify!($name),
                        $len,
                        bytes.len()
                    ))
                })?;
                Ok(Self(arr))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(&self.to_hex())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(d)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

impl_hash_type!(
    /// Blake2b-224 of an Ed25519 verification key. Also used for pool ids.
    Ed25519KeyHash,
    28
);
impl_hash_type!(
    /// Blake2b-224 of a namespaced script. Doubles as the minting policy id.
    ScriptHash,
    28
);
impl_hash_type!(
    /// Blake2b-256 of a transaction body.
    TransactionHash,
    32
);
impl_hash_type!(
    /// Blake2b-256 of a Plutus datum.
    DatumHash,
    32
);
impl_hash_type!(
    /// Blake2b-256 of auxiliary data.
    AuxiliaryDataHash,
    32
);
impl_hash_type!(
    /// Blake2b-256 committing redeemers, datums and cost models.
    ScriptDataHash,
    32
);
impl_hash_type!(
    /// Hash of a pool's VRF verification key.
    VrfKeyHash,
    32
);
impl_hash_type!(
    /// Hash of off-chain pool metadata.
    PoolMetadataHash,
    32
);

/// Minting policies are identified by their script hash.
pub type PolicyId = ScriptHash;

/// Pool ids are operator key hashes.
pub type PoolKeyHash = Ed25519KeyHash;

/// Bech32-encode `data` under `prefix`.
pub fn encode_bech32(prefix: &str, data: &[u8]) -> Result<String, crate::error::DeserializeError> {
    let hrp = bech32::Hrp::parse(prefix)
        .map_err(|e| crate::error::DeserializeError::MalformedAddress(e.to_string()))?;
    bech32::encode::<bech32::Bech32>(hrp, data)
        .map_err(|e| crate::error::DeserializeError::MalformedAddress(e.to_string()))
}

/// Bech32-decode into `(prefix, data)`.
///
/// Cardano addresses routinely exceed BIP-173's 90-character limit; the
/// generic decoder only enforces the 1023-character checksum bound.
pub fn decode_bech32(s: &str) -> Result<(String, Vec<u8>), crate::error::DeserializeError> {
    let (hrp, data) = bech32::decode(s)
        .map_err(|e| crate::error::DeserializeError::MalformedAddress(e.to_string()))?;
    Ok((hrp.to_string(), data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CborEncoding;

    #[test]
    fn test_blake2b256_known_vector() {
        // blake2b-256("") from the reference implementation.
        assert_eq!(
            hex::encode(blake2b256(b"")),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn test_blake2b224_is_not_a_truncated_256() {
        // Different output length means a different parameter block, so the
        // 224-bit digest is not a prefix of the 256-bit one.
        let short = blake2b224(b"txforge");
        let long = blake2b256(b"txforge");
        assert_ne!(&short[..], &long[..28]);
    }

    #[test]
    fn test_prefixed_matches_concatenation() {
        let mut joined = vec![0x01];
        joined.extend_from_slice(b"script");
        assert_eq!(blake2b224_prefixed(0x01, b"script"), blake2b224(&joined));
    }

    #[test]
    fn test_hash_hex_round_trip() {
        let h = TransactionHash::from_raw([0xab; 32]);
        assert_eq!(TransactionHash::from_hex(&h.to_hex()).unwrap(), h);
    }

    #[test]
    fn test_hash_wrong_length() {
        let err = Ed25519KeyHash::from_raw_bytes(&[0u8; 27]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::DeserializeError::WrongLength { expected: 28, found: 27, .. }
        ));
    }

    #[test]
    fn test_hash_cbor_round_trip() {
        let h = ScriptHash::from_raw([3u8; 28]);
        let bytes = h.to_bytes();
        assert_eq!(bytes[0], 0x58);
        assert_eq!(ScriptHash::from_bytes(&bytes).unwrap(), h);
    }

    #[test]
    fn test_hash_bech32_round_trip() {
        let pool = PoolKeyHash::from_raw([9u8; 28]);
        let s = pool.to_bech32("pool").unwrap();
        assert!(s.starts_with("pool1"));
        assert_eq!(PoolKeyHash::from_bech32(&s).unwrap(), pool);
    }
}
