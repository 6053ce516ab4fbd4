//! # Transaction Body & Transaction
//!
//! The body is a CBOR map keyed by small integers. Only fields that are
//! set get written, and always in ascending key order, so the same body
//! always hashes the same way. What does change the hash is the order of
//! entries *inside* map- and list-valued fields (certificates,
//! withdrawals, mint, ...): those are written in the order they were
//! added.
//!
//! Wallets sign the body hash, so once a transaction leaves txforge its
//! body bytes are frozen. [`RawTransaction`] splits serialized
//! transactions into their raw parts so witnesses can be merged without
//! re-encoding (and possibly re-ordering) a body someone already signed.

use minicbor::data::Type;
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};

use super::certificate::Certificate;
use super::metadata::AuxiliaryData;
use super::utxo::{TransactionInput, TransactionOutput};
use super::witness::TransactionWitnessSet;
use crate::address::RewardAddress;
use crate::codec::{decode_set, encode_array, OrderedMap};
use crate::crypto::{AuxiliaryDataHash, Ed25519KeyHash, ScriptDataHash, TransactionHash};
use crate::error::DeserializeError;
use crate::value::{Coin, Mint, Slot};

// ---------------------------------------------------------------------------
// Withdrawals
// ---------------------------------------------------------------------------

/// Reward account → amount withdrawn, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Withdrawals(OrderedMap<RewardAddress, Coin>);

impl Withdrawals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(&mut self, account: RewardAddress, amount: Coin) -> Option<Coin> {
        self.0.insert(account, amount)
    }

    pub fn get(&self, account: &RewardAddress) -> Option<Coin> {
        self.0.get(account).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RewardAddress, &Coin)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RewardAddress> {
        self.0.keys()
    }
}

impl Encode<()> for Withdrawals {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        self.0.encode(e, ctx)
    }
}

impl<'b> Decode<'b, ()> for Withdrawals {
    fn decode(d: &mut Decoder<'b>, ctx: &mut ()) -> Result<Self, decode::Error> {
        Ok(Self(OrderedMap::decode(d, ctx)?))
    }
}

// ---------------------------------------------------------------------------
// TransactionBody
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionBody {
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub fee: Coin,
    pub ttl: Option<Slot>,
    pub certs: Option<Vec<Certificate>>,
    pub withdrawals: Option<Withdrawals>,
    pub auxiliary_data_hash: Option<AuxiliaryDataHash>,
    pub validity_start_interval: Option<Slot>,
    pub mint: Option<Mint>,
    pub script_data_hash: Option<ScriptDataHash>,
    pub collateral: Option<Vec<TransactionInput>>,
    pub required_signers: Option<Vec<Ed25519KeyHash>>,
    pub network_id: Option<u8>,
    pub collateral_return: Option<TransactionOutput>,
    pub total_collateral: Option<Coin>,
    pub reference_inputs: Option<Vec<TransactionInput>>,
}

impl TransactionBody {
    pub fn new(inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>, fee: Coin) -> Self {
        Self {
            inputs,
            outputs,
            fee,
            ..Default::default()
        }
    }

    pub fn hash(&self) -> TransactionHash {
        crate::hashing::hash_transaction(self)
    }

    fn field_count(&self) -> u64 {
        3 + [
            self.ttl.is_some(),
            self.certs.is_some(),
            self.withdrawals.is_some(),
            self.auxiliary_data_hash.is_some(),
            self.validity_start_interval.is_some(),
            self.mint.is_some(),
            self.script_data_hash.is_some(),
            self.collateral.is_some(),
            self.required_signers.is_some(),
            self.network_id.is_some(),
            self.collateral_return.is_some(),
            self.total_collateral.is_some(),
            self.reference_inputs.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count() as u64
    }
}

impl Encode<()> for TransactionBody {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(self.field_count())?;
        e.u8(0)?;
        encode_array(e, &self.inputs)?;
        e.u8(1)?;
        encode_array(e, &self.outputs)?;
        e.u8(2)?.encode(self.fee)?;
        if let Some(ttl) = self.ttl {
            e.u8(3)?.encode(ttl)?;
        }
        if let Some(certs) = &self.certs {
            e.u8(4)?;
            encode_array(e, certs)?;
        }
        if let Some(withdrawals) = &self.withdrawals {
            e.u8(5)?.encode(withdrawals)?;
        }
        if let Some(hash) = self.auxiliary_data_hash {
            e.u8(7)?.encode(hash)?;
        }
        if let Some(start) = self.validity_start_interval {
            e.u8(8)?.encode(start)?;
        }
        if let Some(mint) = &self.mint {
            e.u8(9)?.encode(mint)?;
        }
        if let Some(hash) = self.script_data_hash {
            e.u8(11)?.encode(hash)?;
        }
        if let Some(collateral) = &self.collateral {
            e.u8(13)?;
            encode_array(e, collateral)?;
        }
        if let Some(signers) = &self.required_signers {
            e.u8(14)?;
            encode_array(e, signers)?;
        }
        if let Some(network_id) = self.network_id {
            e.u8(15)?.u8(network_id)?;
        }
        if let Some(ret) = &self.collateral_return {
            e.u8(16)?.encode(ret)?;
        }
        if let Some(total) = self.total_collateral {
            e.u8(17)?.encode(total)?;
        }
        if let Some(refs) = &self.reference_inputs {
            e.u8(18)?;
            encode_array(e, refs)?;
        }
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for TransactionBody {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        let len = d
            .map()?
            .ok_or_else(|| decode::Error::message("indefinite transaction body"))?;
        let mut body = TransactionBody::default();
        let (mut has_inputs, mut has_outputs, mut has_fee) = (false, false, false);
        for _ in 0..len {
            match d.u8()? {
                0 => {
                    body.inputs = decode_set(d)?;
                    has_inputs = true;
                }
                1 => {
                    body.outputs = d.array_iter()?.collect::<Result<_, _>>()?;
                    has_outputs = true;
                }
                2 => {
                    body.fee = d.decode()?;
                    has_fee = true;
                }
                3 => body.ttl = Some(d.decode()?),
                4 => body.certs = Some(decode_set(d)?),
                5 => body.withdrawals = Some(d.decode()?),
                7 => body.auxiliary_data_hash = Some(d.decode()?),
                8 => body.validity_start_interval = Some(d.decode()?),
                9 => body.mint = Some(d.decode()?),
                11 => body.script_data_hash = Some(d.decode()?),
                13 => body.collateral = Some(decode_set(d)?),
                14 => body.required_signers = Some(decode_set(d)?),
                15 => body.network_id = Some(d.u8()?),
                16 => body.collateral_return = Some(d.decode()?),
                17 => body.total_collateral = Some(d.decode()?),
                18 => body.reference_inputs = Some(decode_set(d)?),
                other => {
                    return Err(decode::Error::message(format!(
                        "unsupported transaction body field {other}"
                    )))
                }
            }
        }
        if !(has_inputs && has_outputs && has_fee) {
            return Err(decode::Error::message(
                "transaction body needs inputs, outputs and fee",
            ));
        }
        Ok(body)
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub body: TransactionBody,
    pub witness_set: TransactionWitnessSet,
    pub is_valid: bool,
    pub auxiliary_data: Option<AuxiliaryData>,
}

impl Transaction {
    pub fn new(
        body: TransactionBody,
        witness_set: TransactionWitnessSet,
        auxiliary_data: Option<AuxiliaryData>,
    ) -> Self {
        Self {
            body,
            witness_set,
            is_valid: true,
            auxiliary_data,
        }
    }

    pub fn hash(&self) -> TransactionHash {
        self.body.hash()
    }
}

impl Encode<()> for Transaction {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(4)?
            .encode(&self.body)?
            .encode(&self.witness_set)?
            .bool(self.is_valid)?;
        match &self.auxiliary_data {
            Some(aux) => e.encode(aux)?,
            None => e.null()?,
        };
        Ok(())
    }
}

fn decode_nullable_aux(d: &mut Decoder<'_>) -> Result<Option<AuxiliaryData>, decode::Error> {
    if d.datatype()? == Type::Null {
        d.skip()?;
        Ok(None)
    } else {
        Ok(Some(d.decode()?))
    }
}

impl<'b> Decode<'b, ()> for Transaction {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        // Pre-Alonzo transactions have no validity flag.
        let len = d.array()?;
        let body = d.decode()?;
        let witness_set = d.decode()?;
        let is_valid = match len {
            Some(4) => d.bool()?,
            Some(3) => true,
            other => {
                return Err(decode::Error::message(format!(
                    "transaction must have 3 or 4 fields, got {other:?}"
                )))
            }
        };
        Ok(Transaction {
            body,
            witness_set,
            is_valid,
            auxiliary_data: decode_nullable_aux(d)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Raw splicing
// ---------------------------------------------------------------------------

/// A serialized transaction cut into its top-level parts, each kept as the
/// exact bytes it arrived with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTransaction<'a> {
    pub body: &'a [u8],
    pub witness_set: &'a [u8],
    pub is_valid: bool,
    /// Includes the CBOR `null` when there is no auxiliary data.
    pub auxiliary_data: &'a [u8],
}

impl<'a> RawTransaction<'a> {
    pub fn split(bytes: &'a [u8]) -> Result<Self, DeserializeError> {
        let mut d = Decoder::new(bytes);
        let len = d.array()?;

        let span = move |d: &mut Decoder<'a>| -> Result<&'a [u8], DeserializeError> {
            let start = d.position();
            d.skip()?;
            Ok(&bytes[start..d.position()])
        };

        let body = span(&mut d)?;
        let witness_set = span(&mut d)?;
        let is_valid = match len {
            Some(4) => d.bool()?,
            Some(3) => true,
            other => {
                return Err(DeserializeError::MalformedBytes(format!(
                    "transaction must have 3 or 4 fields, got {other:?}"
                )))
            }
        };
        let auxiliary_data = span(&mut d)?;
        if d.position() != bytes.len() {
            return Err(DeserializeError::MalformedBytes(format!(
                "{} trailing bytes after transaction",
                bytes.len() - d.position()
            )));
        }
        Ok(RawTransaction {
            body,
            witness_set,
            is_valid,
            auxiliary_data,
        })
    }

    /// Hash of the body exactly as serialized.
    pub fn body_hash(&self) -> TransactionHash {
        TransactionHash::from_raw(crate::crypto::blake2b256(self.body))
    }

    /// Reassemble with a replacement witness set, always in the 4-field
    /// form. Body and auxiliary data bytes are copied through untouched.
    pub fn with_witness_set(&self, witness_set: &TransactionWitnessSet) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + self.auxiliary_data.len() + 256);
        out.push(0x84);
        out.extend_from_slice(self.body);
        out.extend(crate::codec::CborEncoding::to_bytes(witness_set));
        out.push(if self.is_valid { 0xf5 } else { 0xf4 });
        out.extend_from_slice(self.auxiliary_data);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Address, Credential, EnterpriseAddress};
    use crate::codec::CborEncoding;
    use crate::value::{BigNum, Value};

    fn sample_body() -> TransactionBody {
        let input = TransactionInput::new(TransactionHash::from_raw([1; 32]), 0);
        let out = TransactionOutput::new(
            Address::Enterprise(EnterpriseAddress {
                network: 1,
                payment: Credential::from_keyhash(&Ed25519KeyHash::from_raw([2; 28])),
            }),
            Value::new(BigNum::new(1_500_000)),
        );
        let mut body = TransactionBody::new(vec![input], vec![out], BigNum::new(170_000));
        body.ttl = Some(BigNum::new(5000));
        body
    }

    #[test]
    fn test_body_round_trip_and_key_order() {
        let body = sample_body();
        let bytes = body.to_bytes();
        // map(4), key 0 first
        assert_eq!(&bytes[..2], &[0xa4, 0x00]);
        assert_eq!(TransactionBody::from_bytes(&bytes).unwrap(), body);
    }

    #[test]
    fn test_body_requires_fee() {
        // {0: [], 1: []}
        assert!(TransactionBody::from_bytes(&[0xa2, 0x00, 0x80, 0x01, 0x80]).is_err());
    }

    #[test]
    fn test_mary_form_decodes() {
        let tx = Transaction::new(sample_body(), TransactionWitnessSet::new(), None);
        let mut bytes = tx.to_bytes();
        // Rewrite as [body, witnesses, null] by dropping the validity flag.
        bytes[0] = 0x83;
        let flag_at = bytes.len() - 2;
        bytes.remove(flag_at);
        let decoded = Transaction::from_bytes(&bytes).unwrap();
        assert!(decoded.is_valid);
        assert_eq!(decoded.body, tx.body);
    }

    #[test]
    fn test_raw_split_preserves_body_bytes() {
        let tx = Transaction::new(
            sample_body(),
            TransactionWitnessSet::new(),
            Some(AuxiliaryData::with_message(&["hi"]).unwrap()),
        );
        let bytes = tx.to_bytes();
        let raw = RawTransaction::split(&bytes).unwrap();
        assert_eq!(raw.body, tx.body.to_bytes().as_slice());
        assert_eq!(raw.body_hash(), tx.hash());
        assert_eq!(raw.with_witness_set(&TransactionWitnessSet::new()), bytes);
    }
}
