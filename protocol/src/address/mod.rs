//! # Addresses
//!
//! Shelley-era addresses are a header byte followed by one or two
//! credential hashes (CIP-19). The high nibble of the header says which
//! shape follows and whether each credential is a key or a script; the low
//! nibble is the network id.
//!
//! | header | shape                         |
//! |--------|-------------------------------|
//! | `0..3` | base (payment + stake)        |
//! | `4..5` | pointer (payment + pointer)   |
//! | `6..7` | enterprise (payment only)     |
//! | `8`    | Byron, see [`byron`]          |
//! | `14..15` | reward (stake only)         |
//!
//! Only as much of the format is modelled as the builders need: which
//! credential pays, which credential stakes and which network it lives on.

pub mod byron;
pub mod credential;

use std::fmt;
use std::str::FromStr;

use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};

pub use byron::ByronAddress;
pub use credential::Credential;

use crate::config::{ADDR_HRP, ADDR_TEST_HRP, NETWORK_ID_MAINNET, STAKE_HRP, STAKE_TEST_HRP};
use crate::crypto::hash::{decode_bech32, encode_bech32};
use crate::error::DeserializeError;

// ---------------------------------------------------------------------------
// Pointer
// ---------------------------------------------------------------------------

/// Location of the stake registration certificate a pointer address
/// refers to.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Pointer {
    pub slot: u64,
    pub tx_index: u64,
    pub cert_index: u64,
}

fn write_variable_nat(out: &mut Vec<u8>, mut n: u64) {
    let mut groups = vec![(n & 0x7f) as u8];
    n >>= 7;
    while n > 0 {
        groups.push(((n & 0x7f) as u8) | 0x80);
        n >>= 7;
    }
    out.extend(groups.iter().rev());
}

fn read_variable_nat(bytes: &[u8]) -> Result<(u64, usize), DeserializeError> {
    let mut value: u64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        if value >> 57 != 0 {
            return Err(DeserializeError::MalformedAddress(
                "pointer component overflows u64".into(),
            ));
        }
        value = (value << 7) | u64::from(byte & 0x7f);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(DeserializeError::MalformedAddress(
        "truncated pointer component".into(),
    ))
}

// ---------------------------------------------------------------------------
// Shelley shapes
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BaseAddress {
    pub network: u8,
    pub payment: Credential,
    pub stake: Credential,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EnterpriseAddress {
    pub network: u8,
    pub payment: Credential,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PointerAddress {
    pub network: u8,
    pub payment: Credential,
    pub stake: Pointer,
}

/// A stake (reward) account. Withdrawals and pool reward accounts use
/// these.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct RewardAddress {
    pub network: u8,
    pub payment: Credential,
}

impl RewardAddress {
    pub fn new(network: u8, payment: Credential) -> Self {
        Self { network, payment }
    }

    pub fn to_address(&self) -> Address {
        Address::Reward(*self)
    }

    pub fn from_address(addr: &Address) -> Option<Self> {
        match addr {
            Address::Reward(r) => Some(*r),
            _ => None,
        }
    }

    pub fn to_raw_bytes(&self) -> Vec<u8> {
        self.to_address().to_raw_bytes()
    }
}

/// Ledger order of reward accounts: network, then script credentials
/// before key credentials, then hash bytes. Reward redeemer indices are
/// positions in this order.
impl Ord for RewardAddress {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let key = |r: &RewardAddress| (r.network, !r.payment.is_script(), *r.payment.hash_bytes());
        key(self).cmp(&key(other))
    }
}

impl PartialOrd for RewardAddress {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Encode<()> for RewardAddress {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.bytes(&self.to_raw_bytes())?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for RewardAddress {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        let addr = Address::from_raw_bytes(d.bytes()?)
            .map_err(|e| decode::Error::message(e.to_string()))?;
        RewardAddress::from_address(&addr)
            .ok_or_else(|| decode::Error::message("expected a reward address"))
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Any address that can appear in a transaction output.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Address {
    Base(BaseAddress),
    Enterprise(EnterpriseAddress),
    Pointer(PointerAddress),
    Reward(RewardAddress),
    Byron(ByronAddress),
}

impl Address {
    pub fn network_id(&self) -> u8 {
        match self {
            Address::Base(a) => a.network,
            Address::Enterprise(a) => a.network,
            Address::Pointer(a) => a.network,
            Address::Reward(a) => a.network,
            Address::Byron(a) => a.network_id(),
        }
    }

    /// The credential that must authorize spending. `None` for Byron
    /// addresses (bootstrap witnesses cover those) and reward addresses.
    pub fn payment_cred(&self) -> Option<&Credential> {
        match self {
            Address::Base(a) => Some(&a.payment),
            Address::Enterprise(a) => Some(&a.payment),
            Address::Pointer(a) => Some(&a.payment),
            Address::Reward(_) | Address::Byron(_) => None,
        }
    }

    /// The stake credential, for base and reward addresses.
    pub fn staking_cred(&self) -> Option<&Credential> {
        match self {
            Address::Base(a) => Some(&a.stake),
            Address::Reward(a) => Some(&a.payment),
            _ => None,
        }
    }

    pub fn as_byron(&self) -> Option<&ByronAddress> {
        match self {
            Address::Byron(b) => Some(b),
            _ => None,
        }
    }

    pub fn to_raw_bytes(&self) -> Vec<u8> {
        let header = |kind: u8, network: u8| (kind << 4) | (network & 0x0f);
        let script_bit = |c: &Credential, bit: u8| if c.is_script() { 1 << bit } else { 0 };
        let mut out = Vec::with_capacity(57);
        match self {
            Address::Base(a) => {
                let kind = script_bit(&a.payment, 0) | script_bit(&a.stake, 1);
                out.push(header(kind, a.network));
                out.extend_from_slice(a.payment.hash_bytes());
                out.extend_from_slice(a.stake.hash_bytes());
            }
            Address::Pointer(a) => {
                out.push(header(0b0100 | script_bit(&a.payment, 0), a.network));
                out.extend_from_slice(a.payment.hash_bytes());
                write_variable_nat(&mut out, a.stake.slot);
                write_variable_nat(&mut out, a.stake.tx_index);
                write_variable_nat(&mut out, a.stake.cert_index);
            }
            Address::Enterprise(a) => {
                out.push(header(0b0110 | script_bit(&a.payment, 0), a.network));
                out.extend_from_slice(a.payment.hash_bytes());
            }
            Address::Reward(a) => {
                out.push(header(0b1110 | script_bit(&a.payment, 0), a.network));
                out.extend_from_slice(a.payment.hash_bytes());
            }
            Address::Byron(b) => out = b.to_raw_bytes(),
        }
        out
    }

    pub fn from_raw_bytes(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let Some(&header) = bytes.first() else {
            return Err(DeserializeError::MalformedAddress("empty address".into()));
        };
        let kind = header >> 4;
        let network = header & 0x0f;
        let body = &bytes[1..];

        let expect_len = |len: usize| {
            if body.len() == len {
                Ok(())
            } else {
                Err(DeserializeError::MalformedAddress(format!(
                    "address kind {kind} needs {} bytes, got {}",
                    len + 1,
                    bytes.len()
                )))
            }
        };

        match kind {
            0b0000..=0b0011 => {
                expect_len(56)?;
                Ok(Address::Base(BaseAddress {
                    network,
                    payment: Credential::from_kind(kind & 0b01 != 0, &body[..28])?,
                    stake: Credential::from_kind(kind & 0b10 != 0, &body[28..])?,
                }))
            }
            0b0100 | 0b0101 => {
                if body.len() < 28 {
                    return Err(DeserializeError::MalformedAddress(
                        "pointer address too short".into(),
                    ));
                }
                let payment = Credential::from_kind(kind & 0b01 != 0, &body[..28])?;
                let mut rest = &body[28..];
                let mut components = [0u64; 3];
                for slot in components.iter_mut() {
                    let (value, used) = read_variable_nat(rest)?;
                    *slot = value;
                    rest = &rest[used..];
                }
                if !rest.is_empty() {
                    return Err(DeserializeError::MalformedAddress(
                        "trailing bytes after pointer".into(),
                    ));
                }
                Ok(Address::Pointer(PointerAddress {
                    network,
                    payment,
                    stake: Pointer {
                        slot: components[0],
                        tx_index: components[1],
                        cert_index: components[2],
                    },
                }))
            }
            0b0110 | 0b0111 => {
                expect_len(28)?;
                Ok(Address::Enterprise(EnterpriseAddress {
                    network,
                    payment: Credential::from_kind(kind & 0b01 != 0, body)?,
                }))
            }
            0b1000 => Ok(Address::Byron(ByronAddress::from_raw_bytes(bytes)?)),
            0b1110 | 0b1111 => {
                expect_len(28)?;
                Ok(Address::Reward(RewardAddress {
                    network,
                    payment: Credential::from_kind(kind & 0b01 != 0, body)?,
                }))
            }
            other => Err(DeserializeError::MalformedAddress(format!(
                "unsupported address header kind {other}"
            ))),
        }
    }

    /// Default bech32 prefix for this address.
    fn default_prefix(&self) -> &'static str {
        let testnet = self.network_id() != NETWORK_ID_MAINNET;
        match (self, testnet) {
            (Address::Reward(_), false) => STAKE_HRP,
            (Address::Reward(_), true) => STAKE_TEST_HRP,
            (_, false) => ADDR_HRP,
            (_, true) => ADDR_TEST_HRP,
        }
    }

    /// Bech32 with the network's default prefix unless `prefix` is given.
    /// Byron addresses have no bech32 form.
    pub fn to_bech32(&self, prefix: Option<&str>) -> Result<String, DeserializeError> {
        if matches!(self, Address::Byron(_)) {
            return Err(DeserializeError::MalformedAddress(
                "byron addresses are base58 only".into(),
            ));
        }
        encode_bech32(prefix.unwrap_or(self.default_prefix()), &self.to_raw_bytes())
    }

    pub fn from_bech32(s: &str) -> Result<Self, DeserializeError> {
        let (_, data) = decode_bech32(s)?;
        Self::from_raw_bytes(&data)
    }

    /// Bech32 for Shelley shapes, base58 for Byron: whichever form the
    /// address is normally written in.
    pub fn to_text(&self) -> Result<String, DeserializeError> {
        match self {
            Address::Byron(b) => Ok(b.to_base58()),
            _ => self.to_bech32(None),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_text() {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str(&hex::encode(self.to_raw_bytes())),
        }
    }
}

impl FromStr for Address {
    type Err = DeserializeError;

    /// Accepts bech32 or Byron base58.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match Address::from_bech32(s) {
            Ok(addr) => Ok(addr),
            Err(bech_err) => ByronAddress::from_base58(s)
                .map(Address::Byron)
                .map_err(|_| bech_err),
        }
    }
}

impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Encode<()> for Address {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.bytes(&self.to_raw_bytes())?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Address {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        Address::from_raw_bytes(d.bytes()?).map_err(|e| decode::Error::message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CborEncoding;
    use crate::config::NETWORK_ID_TESTNET;
    use crate::crypto::{Ed25519KeyHash, ScriptHash};

    fn key(b: u8) -> Credential {
        Credential::Key(Ed25519KeyHash::from_raw([b; 28]))
    }

    #[test]
    fn test_base_address_header_bits() {
        let addr = Address::Base(BaseAddress {
            network: NETWORK_ID_MAINNET,
            payment: Credential::Script(ScriptHash::from_raw([1u8; 28])),
            stake: key(2),
        });
        let raw = addr.to_raw_bytes();
        assert_eq!(raw.len(), 57);
        assert_eq!(raw[0], 0x11);
        assert_eq!(Address::from_raw_bytes(&raw).unwrap(), addr);
    }

    #[test]
    fn test_bech32_prefixes_follow_network() {
        let main = Address::Enterprise(EnterpriseAddress {
            network: NETWORK_ID_MAINNET,
            payment: key(3),
        });
        let test = Address::Reward(RewardAddress::new(NETWORK_ID_TESTNET, key(3)));
        assert!(main.to_bech32(None).unwrap().starts_with("addr1"));
        assert!(test.to_bech32(None).unwrap().starts_with("stake_test1"));
        let parsed: Address = main.to_string().parse().unwrap();
        assert_eq!(parsed, main);
    }

    #[test]
    fn test_pointer_round_trip() {
        let addr = Address::Pointer(PointerAddress {
            network: NETWORK_ID_TESTNET,
            payment: key(5),
            stake: Pointer {
                slot: 2_498_243,
                tx_index: 27,
                cert_index: 3,
            },
        });
        let raw = addr.to_raw_bytes();
        assert_eq!(raw[0], 0x40);
        assert_eq!(Address::from_raw_bytes(&raw).unwrap(), addr);
    }

    #[test]
    fn test_credentials_by_shape() {
        let base = Address::Base(BaseAddress {
            network: 1,
            payment: key(1),
            stake: key(2),
        });
        assert_eq!(base.payment_cred(), Some(&key(1)));
        assert_eq!(base.staking_cred(), Some(&key(2)));
        let reward = Address::Reward(RewardAddress::new(1, key(7)));
        assert_eq!(reward.payment_cred(), None);
        assert_eq!(reward.staking_cred(), Some(&key(7)));
    }

    #[test]
    fn test_byron_via_base58_text() {
        let raw = byron::tests::sample_byron([6u8; 28], None);
        let addr = Address::from_raw_bytes(&raw).unwrap();
        assert!(addr.to_bech32(None).is_err());
        let text = addr.to_string();
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn test_reward_address_cbor() {
        let reward = RewardAddress::new(1, key(9));
        assert_eq!(RewardAddress::from_bytes(&reward.to_bytes()).unwrap(), reward);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(Address::from_raw_bytes(&[]).is_err());
        assert!(Address::from_raw_bytes(&[0x61, 0x00]).is_err());
        assert!("addr1notreally".parse::<Address>().is_err());
    }
}
