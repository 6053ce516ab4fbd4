//! Byron-era (bootstrap) addresses.
//!
//! We never construct these, we only carry them around: a Byron address is
//! kept as its raw CBOR (`[#6.24(payload), crc32]`) and parsed just far
//! enough to read the address root, the attributes and the network magic.
//! The CRC is carried but not recomputed.

use minicbor::Decoder;
use sha3::{Digest, Sha3_256};

use crate::codec::expect_array;
use crate::crypto::blake2b224;
use crate::error::DeserializeError;

/// Protocol magic of mainnet. Addresses without a magic attribute are
/// mainnet addresses too.
pub const MAINNET_PROTOCOL_MAGIC: u32 = 764_824_073;

const ATTR_PROTOCOL_MAGIC: u64 = 2;
const CBOR_IN_CBOR_TAG: u64 = 24;

/// A Byron address as raw bytes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ByronAddress {
    bytes: Vec<u8>,
    root: [u8; 28],
    attributes: Vec<u8>,
    protocol_magic: Option<u32>,
}

impl ByronAddress {
    pub fn from_raw_bytes(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let malformed = |e: minicbor::decode::Error| DeserializeError::MalformedAddress(e.to_string());

        let mut d = Decoder::new(bytes);
        expect_array(&mut d, 2, "byron address").map_err(malformed)?;
        let tag = d.tag().map_err(malformed)?;
        if tag.as_u64() != CBOR_IN_CBOR_TAG {
            return Err(DeserializeError::MalformedAddress(format!(
                "byron payload must be tag 24, got {}",
                tag.as_u64()
            )));
        }
        let payload = d.bytes().map_err(malformed)?;
        d.u32().map_err(malformed)?;
        if d.position() != bytes.len() {
            return Err(DeserializeError::MalformedAddress(
                "trailing bytes after byron address".into(),
            ));
        }

        let mut p = Decoder::new(payload);
        expect_array(&mut p, 3, "byron payload").map_err(malformed)?;
        let root: [u8; 28] = p
            .bytes()
            .map_err(malformed)?
            .try_into()
            .map_err(|_| DeserializeError::MalformedAddress("byron root must be 28 bytes".into()))?;

        let attr_start = p.position();
        let mut protocol_magic = None;
        let entries = p.map().map_err(malformed)?.ok_or_else(|| {
            DeserializeError::MalformedAddress("indefinite byron attributes".into())
        })?;
        for _ in 0..entries {
            if p.u64().map_err(malformed)? == ATTR_PROTOCOL_MAGIC {
                let value = p.bytes().map_err(malformed)?;
                protocol_magic = Some(Decoder::new(value).u32().map_err(malformed)?);
            } else {
                p.skip().map_err(malformed)?;
            }
        }
        let attributes = payload[attr_start..p.position()].to_vec();
        p.u8().map_err(malformed)?;

        Ok(Self {
            bytes: bytes.to_vec(),
            root,
            attributes,
            protocol_magic,
        })
    }

    pub fn to_raw_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(&self.bytes).into_string()
    }

    pub fn from_base58(s: &str) -> Result<Self, DeserializeError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| DeserializeError::MalformedAddress(e.to_string()))?;
        Self::from_raw_bytes(&bytes)
    }

    /// The address root: a hash committing to the spending key and the
    /// attributes.
    pub fn root(&self) -> &[u8; 28] {
        &self.root
    }

    /// CBOR of the attributes map, as embedded in the address.
    pub fn attributes(&self) -> &[u8] {
        &self.attributes
    }

    pub fn protocol_magic(&self) -> u32 {
        self.protocol_magic.unwrap_or(MAINNET_PROTOCOL_MAGIC)
    }

    /// 1 for mainnet, 0 for everything else.
    pub fn network_id(&self) -> u8 {
        if self.protocol_magic() == MAINNET_PROTOCOL_MAGIC {
            1
        } else {
            0
        }
    }

    pub fn is_valid(s: &str) -> bool {
        Self::from_base58(s).is_ok()
    }
}

/// Root of the Byron address a bootstrap witness key unlocks:
/// `blake2b224(sha3_256([0, [0, vkey ‖ chain_code], attributes]))`.
///
/// `attributes` is the raw CBOR of the attributes map.
pub fn byron_address_root(vkey: &[u8; 32], chain_code: &[u8], attributes: &[u8]) -> [u8; 28] {
    let mut spending_data = Vec::with_capacity(7 + 64 + attributes.len());
    spending_data.extend_from_slice(&[0x83, 0x00, 0x82, 0x00, 0x58]);
    spending_data.push((32 + chain_code.len()) as u8);
    spending_data.extend_from_slice(vkey);
    spending_data.extend_from_slice(chain_code);
    spending_data.extend_from_slice(attributes);
    blake2b224(&Sha3_256::digest(&spending_data))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use minicbor::Encoder;

    /// Builds a structurally valid Byron address for tests. The CRC is a
    /// placeholder since it is never verified.
    pub(crate) fn sample_byron(root: [u8; 28], magic: Option<u32>) -> Vec<u8> {
        let mut attrs = Vec::new();
        {
            let mut e = Encoder::new(&mut attrs);
            match magic {
                Some(m) => {
                    let inner = minicbor::to_vec(m).unwrap();
                    e.map(1).unwrap().u8(2).unwrap().bytes(&inner).unwrap();
                }
                None => {
                    e.map(0).unwrap();
                }
            }
        }
        let mut payload = Vec::new();
        {
            let mut e = Encoder::new(&mut payload);
            e.array(3).unwrap().bytes(&root).unwrap();
        }
        payload.extend_from_slice(&attrs);
        payload.push(0x00);

        let mut out = Vec::new();
        let mut e = Encoder::new(&mut out);
        e.array(2)
            .unwrap()
            .tag(minicbor::data::Tag::new(24))
            .unwrap()
            .bytes(&payload)
            .unwrap()
            .u32(0xdead_beef)
            .unwrap();
        out
    }

    #[test]
    fn test_parse_mainnet_byron() {
        let raw = sample_byron([4u8; 28], None);
        let addr = ByronAddress::from_raw_bytes(&raw).unwrap();
        assert_eq!(addr.root(), &[4u8; 28]);
        assert_eq!(addr.network_id(), 1);
        assert_eq!(addr.attributes(), &[0xa0]);
    }

    #[test]
    fn test_parse_testnet_magic() {
        let raw = sample_byron([4u8; 28], Some(1_097_911_063));
        let addr = ByronAddress::from_raw_bytes(&raw).unwrap();
        assert_eq!(addr.protocol_magic(), 1_097_911_063);
        assert_eq!(addr.network_id(), 0);
    }

    #[test]
    fn test_base58_round_trip() {
        let addr = ByronAddress::from_raw_bytes(&sample_byron([9u8; 28], None)).unwrap();
        let text = addr.to_base58();
        assert_eq!(ByronAddress::from_base58(&text).unwrap(), addr);
        assert!(!ByronAddress::is_valid("not-base58-0OIl"));
    }

    #[test]
    fn test_root_depends_on_attributes() {
        let a = byron_address_root(&[1u8; 32], &[2u8; 32], &[0xa0]);
        let b = byron_address_root(&[1u8; 32], &[2u8; 32], &[0xa1, 0x02, 0x41, 0x00]);
        assert_ne!(a, b);
    }
}
