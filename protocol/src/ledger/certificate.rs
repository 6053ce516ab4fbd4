//! Stake and pool certificates.

use minicbor::data::Type;
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};

use super::redeemer::UnitInterval;
use crate::address::{Credential, RewardAddress};
use crate::codec::{decode_set, encode_array, expect_array};
use crate::crypto::{Ed25519KeyHash, PoolKeyHash, PoolMetadataHash, VrfKeyHash};
use crate::value::{Coin, Epoch};

/// Max length of a relay DNS name or metadata URL.
const MAX_DNS_LEN: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Certificate {
    StakeRegistration(Credential),
    StakeDeregistration(Credential),
    StakeDelegation {
        stake_credential: Credential,
        pool_keyhash: PoolKeyHash,
    },
    PoolRegistration(Box<PoolParams>),
    PoolRetirement {
        pool_keyhash: PoolKeyHash,
        epoch: Epoch,
    },
}

impl Certificate {
    /// The stake credential this certificate acts on, for the stake
    /// certificate kinds.
    pub fn stake_credential(&self) -> Option<&Credential> {
        match self {
            Certificate::StakeRegistration(c) | Certificate::StakeDeregistration(c) => Some(c),
            Certificate::StakeDelegation {
                stake_credential, ..
            } => Some(stake_credential),
            Certificate::PoolRegistration(_) | Certificate::PoolRetirement { .. } => None,
        }
    }
}

impl Encode<()> for Certificate {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        match self {
            Certificate::StakeRegistration(cred) => {
                e.array(2)?.u8(0)?.encode(cred)?;
            }
            Certificate::StakeDeregistration(cred) => {
                e.array(2)?.u8(1)?.encode(cred)?;
            }
            Certificate::StakeDelegation {
                stake_credential,
                pool_keyhash,
            } => {
                e.array(3)?.u8(2)?.encode(stake_credential)?.encode(pool_keyhash)?;
            }
            Certificate::PoolRegistration(params) => {
                // Pool params are flattened into the certificate array.
                e.array(10)?.u8(3)?;
                params.encode_fields(e)?;
            }
            Certificate::PoolRetirement {
                pool_keyhash,
                epoch,
            } => {
                e.array(3)?.u8(4)?.encode(pool_keyhash)?.u32(*epoch)?;
            }
        }
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Certificate {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        let len = d
            .array()?
            .ok_or_else(|| decode::Error::message("indefinite certificate array"))?;
        let kind = d.u8()?;
        let expected = match kind {
            0 | 1 => 2,
            2 | 4 => 3,
            3 => 10,
            other => {
                return Err(decode::Error::message(format!(
                    "unsupported certificate kind {other}"
                )))
            }
        };
        if len != expected {
            return Err(decode::Error::message(format!(
                "certificate kind {kind} expects {expected} fields, got {len}"
            )));
        }
        Ok(match kind {
            0 => Certificate::StakeRegistration(d.decode()?),
            1 => Certificate::StakeDeregistration(d.decode()?),
            2 => Certificate::StakeDelegation {
                stake_credential: d.decode()?,
                pool_keyhash: d.decode()?,
            },
            3 => Certificate::PoolRegistration(Box::new(PoolParams::decode_fields(d)?)),
            _ => Certificate::PoolRetirement {
                pool_keyhash: d.decode()?,
                epoch: d.u32()?,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// Pool parameters
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolParams {
    pub operator: PoolKeyHash,
    pub vrf_keyhash: VrfKeyHash,
    pub pledge: Coin,
    pub cost: Coin,
    pub margin: UnitInterval,
    pub reward_account: RewardAddress,
    pub pool_owners: Vec<Ed25519KeyHash>,
    pub relays: Vec<Relay>,
    pub pool_metadata: Option<PoolMetadata>,
}

impl PoolParams {
    fn encode_fields<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
    ) -> Result<(), encode::Error<W::Error>> {
        e.encode(self.operator)?
            .encode(self.vrf_keyhash)?
            .encode(self.pledge)?
            .encode(self.cost)?
            .encode(self.margin)?
            .encode(&self.reward_account)?;
        encode_array(e, &self.pool_owners)?;
        encode_array(e, &self.relays)?;
        match &self.pool_metadata {
            Some(md) => e.encode(md)?,
            None => e.null()?,
        };
        Ok(())
    }

    fn decode_fields(d: &mut Decoder<'_>) -> Result<Self, decode::Error> {
        Ok(PoolParams {
            operator: d.decode()?,
            vrf_keyhash: d.decode()?,
            pledge: d.decode()?,
            cost: d.decode()?,
            margin: d.decode()?,
            reward_account: d.decode()?,
            pool_owners: decode_set(d)?,
            relays: d.array_iter::<Relay>()?.collect::<Result<_, _>>()?,
            pool_metadata: if d.datatype()? == Type::Null {
                d.skip()?;
                None
            } else {
                Some(d.decode()?)
            },
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolMetadata {
    pub url: String,
    pub hash: PoolMetadataHash,
}

impl Encode<()> for PoolMetadata {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?.str(&self.url)?.encode(self.hash)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for PoolMetadata {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        expect_array(d, 2, "pool metadata")?;
        let url = bounded_str(d, "pool metadata url")?;
        Ok(PoolMetadata {
            url,
            hash: d.decode()?,
        })
    }
}

/// How peers reach a pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Relay {
    SingleHostAddr {
        port: Option<u16>,
        ipv4: Option<[u8; 4]>,
        ipv6: Option<[u8; 16]>,
    },
    SingleHostName {
        port: Option<u16>,
        dns_name: String,
    },
    MultiHostName {
        dns_name: String,
    },
}

fn encode_opt_u16<W: encode::Write>(
    e: &mut Encoder<W>,
    v: Option<u16>,
) -> Result<(), encode::Error<W::Error>> {
    match v {
        Some(p) => e.u16(p)?,
        None => e.null()?,
    };
    Ok(())
}

fn encode_opt_bytes<W: encode::Write>(
    e: &mut Encoder<W>,
    v: Option<&[u8]>,
) -> Result<(), encode::Error<W::Error>> {
    match v {
        Some(b) => e.bytes(b)?,
        None => e.null()?,
    };
    Ok(())
}

fn decode_nullable<'b, T>(
    d: &mut Decoder<'b>,
    f: impl FnOnce(&mut Decoder<'b>) -> Result<T, decode::Error>,
) -> Result<Option<T>, decode::Error> {
    if d.datatype()? == Type::Null {
        d.skip()?;
        Ok(None)
    } else {
        f(d).map(Some)
    }
}

fn fixed_bytes<const N: usize>(d: &mut Decoder<'_>) -> Result<[u8; N], decode::Error> {
    let raw = d.bytes()?;
    raw.try_into()
        .map_err(|_| decode::Error::message(format!("expected {N} address bytes, got {}", raw.len())))
}

fn bounded_str(d: &mut Decoder<'_>, what: &str) -> Result<String, decode::Error> {
    let s = d.str()?;
    if s.len() > MAX_DNS_LEN {
        return Err(decode::Error::message(format!(
            "{what} longer than {MAX_DNS_LEN} bytes"
        )));
    }
    Ok(s.to_string())
}

impl Encode<()> for Relay {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        match self {
            Relay::SingleHostAddr { port, ipv4, ipv6 } => {
                e.array(4)?.u8(0)?;
                encode_opt_u16(e, *port)?;
                encode_opt_bytes(e, ipv4.as_ref().map(|b| b.as_slice()))?;
                encode_opt_bytes(e, ipv6.as_ref().map(|b| b.as_slice()))?;
            }
            Relay::SingleHostName { port, dns_name } => {
                e.array(3)?.u8(1)?;
                encode_opt_u16(e, *port)?;
                e.str(dns_name)?;
            }
            Relay::MultiHostName { dns_name } => {
                e.array(2)?.u8(2)?.str(dns_name)?;
            }
        }
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Relay {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        let len = d.array()?;
        match (d.u8()?, len) {
            (0, Some(4)) => Ok(Relay::SingleHostAddr {
                port: decode_nullable(d, |d| d.u16())?,
                ipv4: decode_nullable(d, fixed_bytes::<4>)?,
                ipv6: decode_nullable(d, fixed_bytes::<16>)?,
            }),
            (1, Some(3)) => Ok(Relay::SingleHostName {
                port: decode_nullable(d, |d| d.u16())?,
                dns_name: bounded_str(d, "relay dns name")?,
            }),
            (2, Some(2)) => Ok(Relay::MultiHostName {
                dns_name: bounded_str(d, "relay dns name")?,
            }),
            (kind, len) => Err(decode::Error::message(format!(
                "malformed relay kind {kind} with length {len:?}"
            ))),
        }
    }
}
