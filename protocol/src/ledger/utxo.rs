//! # Inputs, Outputs & UTXOs
//!
//! Outputs come in two wire shapes. The legacy array
//! `[address, value (, datum_hash)]` is what every pre-Babbage wallet
//! understands, so it stays the default. An inline datum or a reference
//! script can't be expressed in it, and those force the map shape
//! `{0: address, 1: value, 2: datum_option, 3: script_ref}`.

use std::fmt;
use std::str::FromStr;

use minicbor::data::{Tag, Type};
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};

use super::plutus_data::PlutusData;
use super::script::Script;
use crate::address::Address;
use crate::codec::{expect_array, CborEncoding};
use crate::crypto::{DatumHash, TransactionHash};
use crate::error::DeserializeError;
use crate::value::{BigNum, Value};

/// CBOR tag for "embedded CBOR in a byte string".
const ENCODED_CBOR_TAG: u64 = 24;

// ---------------------------------------------------------------------------
// TransactionInput
// ---------------------------------------------------------------------------

/// A reference to an output of an earlier transaction.
///
/// `Ord` is the ledger's input order (hash bytes, then index); spend
/// redeemer indices are positions in it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionInput {
    pub transaction_id: TransactionHash,
    pub index: u64,
}

impl TransactionInput {
    pub fn new(transaction_id: TransactionHash, index: u64) -> Self {
        Self {
            transaction_id,
            index,
        }
    }
}

impl fmt::Display for TransactionInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.transaction_id, self.index)
    }
}

impl FromStr for TransactionInput {
    type Err = DeserializeError;

    /// Parses `"<tx hash hex>#<index>"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hash, index) = s
            .split_once('#')
            .ok_or_else(|| DeserializeError::MalformedBytes(format!("{s:?} is not hash#index")))?;
        let index = index
            .parse::<u64>()
            .map_err(|e| DeserializeError::InvalidNumber(e.to_string()))?;
        Ok(TransactionInput::new(TransactionHash::from_hex(hash)?, index))
    }
}

impl Encode<()> for TransactionInput {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?.encode(self.transaction_id)?.u64(self.index)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for TransactionInput {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        expect_array(d, 2, "transaction input")?;
        Ok(TransactionInput::new(d.decode()?, d.u64()?))
    }
}

// ---------------------------------------------------------------------------
// Datum
// ---------------------------------------------------------------------------

/// The datum attached to an output: by hash, or inline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Datum {
    Hash(DatumHash),
    Data(PlutusData),
}

impl Datum {
    pub fn hash(&self) -> DatumHash {
        match self {
            Datum::Hash(h) => *h,
            Datum::Data(data) => crate::hashing::hash_plutus_data(data),
        }
    }

    pub fn as_data(&self) -> Option<&PlutusData> {
        match self {
            Datum::Data(d) => Some(d),
            Datum::Hash(_) => None,
        }
    }
}

impl Encode<()> for Datum {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        match self {
            Datum::Hash(h) => {
                e.array(2)?.u8(0)?.encode(h)?;
            }
            Datum::Data(data) => {
                e.array(2)?
                    .u8(1)?
                    .tag(Tag::new(ENCODED_CBOR_TAG))?
                    .bytes(&data.to_bytes())?;
            }
        }
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Datum {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        expect_array(d, 2, "datum option")?;
        match d.u8()? {
            0 => Ok(Datum::Hash(d.decode()?)),
            1 => Ok(Datum::Data(decode_embedded(d)?)),
            other => Err(decode::Error::message(format!("unknown datum option {other}"))),
        }
    }
}

/// Decode `24(bytes .cbor T)`.
fn decode_embedded<T: CborEncoding>(d: &mut Decoder<'_>) -> Result<T, decode::Error> {
    let tag = d.tag()?.as_u64();
    if tag != ENCODED_CBOR_TAG {
        return Err(decode::Error::message(format!(
            "expected embedded cbor tag 24, got {tag}"
        )));
    }
    T::from_bytes(d.bytes()?).map_err(|e| decode::Error::message(e.to_string()))
}

// ---------------------------------------------------------------------------
// TransactionOutput
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    pub address: Address,
    pub amount: Value,
    pub datum: Option<Datum>,
    pub script_ref: Option<Script>,
}

impl TransactionOutput {
    pub fn new(address: Address, amount: Value) -> Self {
        Self {
            address,
            amount,
            datum: None,
            script_ref: None,
        }
    }

    pub fn with_datum(mut self, datum: Datum) -> Self {
        self.datum = Some(datum);
        self
    }

    pub fn with_script_ref(mut self, script: Script) -> Self {
        self.script_ref = Some(script);
        self
    }

    /// Whether the output needs the post-Alonzo map shape.
    pub fn uses_map_format(&self) -> bool {
        self.script_ref.is_some() || matches!(self.datum, Some(Datum::Data(_)))
    }
}

impl Encode<()> for TransactionOutput {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        if !self.uses_map_format() {
            match &self.datum {
                Some(Datum::Hash(h)) => {
                    e.array(3)?.encode(&self.address)?.encode(&self.amount)?.encode(h)?;
                }
                _ => {
                    e.array(2)?.encode(&self.address)?.encode(&self.amount)?;
                }
            }
            return Ok(());
        }

        let len = 2 + u64::from(self.datum.is_some()) + u64::from(self.script_ref.is_some());
        e.map(len)?;
        e.u8(0)?.encode(&self.address)?;
        e.u8(1)?.encode(&self.amount)?;
        if let Some(datum) = &self.datum {
            e.u8(2)?.encode(datum)?;
        }
        if let Some(script) = &self.script_ref {
            e.u8(3)?
                .tag(Tag::new(ENCODED_CBOR_TAG))?
                .bytes(&script.to_bytes())?;
        }
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for TransactionOutput {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        match d.datatype()? {
            Type::Array => {
                let len = d.array()?;
                let mut out = TransactionOutput::new(d.decode()?, d.decode()?);
                match len {
                    Some(2) => {}
                    Some(3) => out.datum = Some(Datum::Hash(d.decode()?)),
                    other => {
                        return Err(decode::Error::message(format!(
                            "legacy output must have 2 or 3 fields, got {other:?}"
                        )))
                    }
                }
                Ok(out)
            }
            Type::Map => {
                let len = d
                    .map()?
                    .ok_or_else(|| decode::Error::message("indefinite output map"))?;
                let (mut address, mut amount, mut datum, mut script_ref) = (None, None, None, None);
                for _ in 0..len {
                    match d.u8()? {
                        0 => address = Some(d.decode()?),
                        1 => amount = Some(d.decode()?),
                        2 => datum = Some(d.decode()?),
                        3 => script_ref = Some(decode_embedded(d)?),
                        other => {
                            return Err(decode::Error::message(format!(
                                "unknown output field {other}"
                            )))
                        }
                    }
                }
                Ok(TransactionOutput {
                    address: address.ok_or_else(|| decode::Error::message("output without address"))?,
                    amount: amount.ok_or_else(|| decode::Error::message("output without amount"))?,
                    datum,
                    script_ref,
                })
            }
            other => Err(decode::Error::message(format!(
                "transaction output cannot start with {other:?}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionUnspentOutput
// ---------------------------------------------------------------------------

/// An input together with the output it spends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionUnspentOutput {
    pub input: TransactionInput,
    pub output: TransactionOutput,
}

impl TransactionUnspentOutput {
    pub fn new(input: TransactionInput, output: TransactionOutput) -> Self {
        Self { input, output }
    }

    pub fn amount(&self) -> &Value {
        &self.output.amount
    }

    /// Parses a hint string `"<tx hash>#<index>|<address>:<lovelace>"`.
    pub fn from_hint(hint: &str) -> Result<Self, DeserializeError> {
        let (input, output) = hint
            .split_once('|')
            .ok_or_else(|| DeserializeError::MalformedBytes(format!("{hint:?} is missing '|'")))?;
        let (address, lovelace) = output.rsplit_once(':').ok_or_else(|| {
            DeserializeError::MalformedBytes(format!("{output:?} is not address:lovelace"))
        })?;
        Ok(Self::new(
            input.parse()?,
            TransactionOutput::new(address.parse()?, Value::new(lovelace.parse::<BigNum>()?)),
        ))
    }

    /// The hint form of an ADA-only UTXO. `None` when the output carries
    /// anything a hint can't express.
    pub fn to_hint(&self) -> Option<String> {
        if self.output.amount.has_assets()
            || self.output.datum.is_some()
            || self.output.script_ref.is_some()
        {
            return None;
        }
        let address = self.output.address.to_text().ok()?;
        Some(format!(
            "{}|{}:{}",
            self.input,
            address,
            self.output.amount.coin()
        ))
    }
}

impl Encode<()> for TransactionUnspentOutput {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?.encode(self.input)?.encode(&self.output)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for TransactionUnspentOutput {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        expect_array(d, 2, "unspent output")?;
        Ok(TransactionUnspentOutput::new(d.decode()?, d.decode()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Credential, EnterpriseAddress};
    use crate::crypto::Ed25519KeyHash;
    use crate::ledger::script::{Language, PlutusScript};

    fn addr() -> Address {
        Address::Enterprise(EnterpriseAddress {
            network: 0,
            payment: Credential::from_keyhash(&Ed25519KeyHash::from_raw([9; 28])),
        })
    }

    #[test]
    fn test_input_ordering_and_text() {
        let a = TransactionInput::new(TransactionHash::from_raw([1; 32]), 5);
        let b = TransactionInput::new(TransactionHash::from_raw([1; 32]), 0);
        let c = TransactionInput::new(TransactionHash::from_raw([0; 32]), 9);
        let mut v = vec![a, b, c];
        v.sort();
        assert_eq!(v, vec![c, b, a]);
        assert_eq!(a.to_string().parse::<TransactionInput>().unwrap(), a);
    }

    #[test]
    fn test_legacy_output_shape() {
        let out = TransactionOutput::new(addr(), Value::new(BigNum::new(2_000_000)));
        let bytes = out.to_bytes();
        assert_eq!(bytes[0], 0x82);
        assert_eq!(TransactionOutput::from_bytes(&bytes).unwrap(), out);

        let hashed = out.clone().with_datum(Datum::Hash(DatumHash::from_raw([3; 32])));
        assert_eq!(hashed.to_bytes()[0], 0x83);
        assert_eq!(TransactionOutput::from_bytes(&hashed.to_bytes()).unwrap(), hashed);
    }

    #[test]
    fn test_inline_datum_and_script_ref_force_map_shape() {
        let out = TransactionOutput::new(addr(), Value::new(BigNum::new(2_000_000)))
            .with_datum(Datum::Data(PlutusData::new_bytes(vec![1, 2])))
            .with_script_ref(Script::Plutus(PlutusScript::new(Language::PlutusV2, vec![7; 10])));
        let bytes = out.to_bytes();
        assert_eq!(bytes[0], 0xa4);
        assert_eq!(TransactionOutput::from_bytes(&bytes).unwrap(), out);
    }

    #[test]
    fn test_hint_round_trip() {
        let hash = "ab".repeat(32);
        let text = addr().to_text().unwrap();
        let hint = format!("{hash}#1|{text}:5000000");
        let utxo = TransactionUnspentOutput::from_hint(&hint).unwrap();
        assert_eq!(utxo.input.index, 1);
        assert_eq!(utxo.amount().coin(), BigNum::new(5_000_000));
        assert_eq!(utxo.to_hint().unwrap(), hint);
    }

    #[test]
    fn test_bad_hints() {
        assert!(TransactionUnspentOutput::from_hint("nope").is_err());
        assert!(TransactionUnspentOutput::from_hint(&format!("{}#x|a:1", "00".repeat(32))).is_err());
    }
}
