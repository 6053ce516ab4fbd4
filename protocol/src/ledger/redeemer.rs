//! Redeemers, execution budgets, prices and cost models.

use std::collections::BTreeMap;

use minicbor::data::{Tag, Type};
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};
use serde::{Deserialize, Serialize};

use super::plutus_data::PlutusData;
use super::script::Language;
use crate::codec::expect_array;
use crate::value::{ArithmeticError, BigNum};

const UNIT_INTERVAL_TAG: u64 = 30;

// ---------------------------------------------------------------------------
// ExUnits / prices
// ---------------------------------------------------------------------------

/// Execution budget: memory units and CPU steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExUnits {
    pub mem: u64,
    pub steps: u64,
}

impl ExUnits {
    pub fn new(mem: u64, steps: u64) -> Self {
        Self { mem, steps }
    }

    pub fn checked_add(&self, other: &ExUnits) -> Result<ExUnits, ArithmeticError> {
        Ok(ExUnits {
            mem: self.mem.checked_add(other.mem).ok_or(ArithmeticError::Overflow)?,
            steps: self
                .steps
                .checked_add(other.steps)
                .ok_or(ArithmeticError::Overflow)?,
        })
    }
}

impl Encode<()> for ExUnits {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?.u64(self.mem)?.u64(self.steps)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for ExUnits {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        expect_array(d, 2, "ex units")?;
        Ok(ExUnits::new(d.u64()?, d.u64()?))
    }
}

/// A rational `numerator / denominator`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitInterval {
    pub numerator: u64,
    pub denominator: u64,
}

impl UnitInterval {
    pub fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

impl Encode<()> for UnitInterval {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.tag(Tag::new(UNIT_INTERVAL_TAG))?
            .array(2)?
            .u64(self.numerator)?
            .u64(self.denominator)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for UnitInterval {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        let tag = d.tag()?.as_u64();
        if tag != UNIT_INTERVAL_TAG {
            return Err(decode::Error::message(format!(
                "unit interval must carry tag 30, got {tag}"
            )));
        }
        expect_array(d, 2, "unit interval")?;
        Ok(UnitInterval::new(d.u64()?, d.u64()?))
    }
}

/// Lovelace per memory unit and per CPU step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExUnitPrices {
    pub mem_price: UnitInterval,
    pub step_price: UnitInterval,
}

impl ExUnitPrices {
    pub fn new(mem_price: UnitInterval, step_price: UnitInterval) -> Self {
        Self {
            mem_price,
            step_price,
        }
    }
}

// ---------------------------------------------------------------------------
// Redeemers
// ---------------------------------------------------------------------------

/// What a redeemer's index points into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeemerTag {
    /// Sorted transaction inputs.
    Spend,
    /// Sorted minting policies.
    Mint,
    /// Certificates, in transaction order.
    Cert,
    /// Sorted withdrawal reward accounts.
    Reward,
}

impl RedeemerTag {
    fn code(&self) -> u8 {
        match self {
            RedeemerTag::Spend => 0,
            RedeemerTag::Mint => 1,
            RedeemerTag::Cert => 2,
            RedeemerTag::Reward => 3,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RedeemerTag::Spend),
            1 => Some(RedeemerTag::Mint),
            2 => Some(RedeemerTag::Cert),
            3 => Some(RedeemerTag::Reward),
            _ => None,
        }
    }
}

impl std::fmt::Display for RedeemerTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RedeemerTag::Spend => "spend",
            RedeemerTag::Mint => "mint",
            RedeemerTag::Cert => "cert",
            RedeemerTag::Reward => "reward",
        })
    }
}

/// Accepts the evaluator spellings `certificate` and `withdrawal` too.
impl std::str::FromStr for RedeemerTag {
    type Err = crate::error::DeserializeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spend" => Ok(RedeemerTag::Spend),
            "mint" => Ok(RedeemerTag::Mint),
            "cert" | "certificate" => Ok(RedeemerTag::Cert),
            "reward" | "withdrawal" => Ok(RedeemerTag::Reward),
            other => Err(crate::error::DeserializeError::MalformedJson(format!(
                "unknown redeemer purpose {other:?}"
            ))),
        }
    }
}

impl Encode<()> for RedeemerTag {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.u8(self.code())?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for RedeemerTag {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        let code = d.u8()?;
        RedeemerTag::from_code(code)
            .ok_or_else(|| decode::Error::message(format!("unknown redeemer tag {code}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redeemer {
    pub tag: RedeemerTag,
    pub index: BigNum,
    pub data: PlutusData,
    pub ex_units: ExUnits,
}

impl Redeemer {
    pub fn new(tag: RedeemerTag, index: BigNum, data: PlutusData, ex_units: ExUnits) -> Self {
        Self {
            tag,
            index,
            data,
            ex_units,
        }
    }
}

impl Encode<()> for Redeemer {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(4)?
            .encode(self.tag)?
            .encode(self.index)?
            .encode(&self.data)?
            .encode(self.ex_units)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Redeemer {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        expect_array(d, 4, "redeemer")?;
        Ok(Redeemer {
            tag: d.decode()?,
            index: d.decode()?,
            data: d.decode()?,
            ex_units: d.decode()?,
        })
    }
}

/// The witness set's redeemer list. Encoded as the array form; the
/// Conway map form (`{[tag, index] => [data, ex_units]}`) is accepted on
/// decode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Redeemers(Vec<Redeemer>);

impl Redeemers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn add(&mut self, redeemer: Redeemer) {
        self.0.push(redeemer);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Redeemer> {
        self.0.iter()
    }

    pub fn total_ex_units(&self) -> Result<ExUnits, ArithmeticError> {
        self.0
            .iter()
            .try_fold(ExUnits::default(), |acc, r| acc.checked_add(&r.ex_units))
    }
}

impl From<Vec<Redeemer>> for Redeemers {
    fn from(v: Vec<Redeemer>) -> Self {
        Self(v)
    }
}

impl Encode<()> for Redeemers {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        crate::codec::encode_array(e, &self.0)
    }
}

impl<'b> Decode<'b, ()> for Redeemers {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        match d.datatype()? {
            Type::Map | Type::MapIndef => {
                let mut out = Vec::new();
                let len = d.map()?;
                let mut remaining = len;
                loop {
                    match remaining {
                        Some(0) => break,
                        Some(ref mut n) => *n -= 1,
                        None if d.datatype()? == Type::Break => {
                            d.skip()?;
                            break;
                        }
                        None => {}
                    }
                    expect_array(d, 2, "redeemer key")?;
                    let tag = d.decode()?;
                    let index = d.decode()?;
                    expect_array(d, 2, "redeemer value")?;
                    let data = d.decode()?;
                    let ex_units = d.decode()?;
                    out.push(Redeemer::new(tag, index, data, ex_units));
                }
                Ok(Redeemers(out))
            }
            _ => Ok(Redeemers(
                d.array_iter::<Redeemer>()?.collect::<Result<Vec<_>, _>>()?,
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Cost models
// ---------------------------------------------------------------------------

/// One language's cost parameters, in protocol order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostModel(pub Vec<i64>);

/// Cost models per language.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Costmdls(BTreeMap<Language, CostModel>);

impl Costmdls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, language: Language, model: CostModel) -> Option<CostModel> {
        self.0.insert(language, model)
    }

    pub fn get(&self, language: &Language) -> Option<&CostModel> {
        self.0.get(language)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Only the models for `languages`.
    pub fn retain_languages(&self, languages: &[Language]) -> Costmdls {
        Costmdls(
            self.0
                .iter()
                .filter(|(lang, _)| languages.contains(lang))
                .map(|(lang, model)| (*lang, model.clone()))
                .collect(),
        )
    }

    /// The "language views" encoding hashed into the script-data hash.
    ///
    /// PlutusV1 kept a historical quirk: its key is the CBOR of `0` wrapped
    /// in a byte string, and its value is the CBOR of an indefinite list,
    /// again wrapped in a byte string. Later languages use a plain uint key
    /// and a definite list. Keys are in canonical order (shorter encodings
    /// first), which puts V1's two-byte key last.
    pub fn language_views_encoding(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut e = Encoder::new(&mut buf);
        // Writing into a Vec<u8> is infallible.
        let _ = self.write_language_views(&mut e);
        buf
    }

    fn write_language_views<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(self.0.len() as u64)?;
        for (lang, model) in self.0.iter().filter(|(l, _)| **l != Language::PlutusV1) {
            e.u8(lang.kind())?;
            e.array(model.0.len() as u64)?;
            for cost in &model.0 {
                e.i64(*cost)?;
            }
        }
        if let Some(model) = self.0.get(&Language::PlutusV1) {
            e.bytes(&[0x00])?.bytes(&indefinite_costs(&model.0))?;
        }
        Ok(())
    }
}

fn indefinite_costs(costs: &[i64]) -> Vec<u8> {
    let mut e = Encoder::new(Vec::new());
    // Writing into a Vec<u8> is infallible.
    let _ = e.begin_array();
    for cost in costs {
        let _ = e.i64(*cost);
    }
    let _ = e.end();
    e.into_writer()
}

impl Encode<()> for Costmdls {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(self.0.len() as u64)?;
        for (lang, model) in &self.0 {
            e.encode(lang)?.array(model.0.len() as u64)?;
            for cost in &model.0 {
                e.i64(*cost)?;
            }
        }
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Costmdls {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        let mut out = BTreeMap::new();
        for entry in d.map_iter::<Language, Vec<i64>>()? {
            let (lang, costs) = entry?;
            out.insert(lang, CostModel(costs));
        }
        Ok(Costmdls(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CborEncoding;

    #[test]
    fn test_unit_interval_tagged() {
        let ui = UnitInterval::new(577, 10_000);
        let bytes = ui.to_bytes();
        assert_eq!(&bytes[..2], &[0xd8, 0x1e]);
        assert_eq!(UnitInterval::from_bytes(&bytes).unwrap(), ui);
    }

    #[test]
    fn test_redeemers_array_and_map_forms() {
        let r = Redeemer::new(
            RedeemerTag::Mint,
            BigNum::new(1),
            PlutusData::unit(),
            ExUnits::new(10, 20),
        );
        let redeemers = Redeemers::from(vec![r.clone()]);
        assert_eq!(Redeemers::from_bytes(&redeemers.to_bytes()).unwrap(), redeemers);

        // {[1, 1]: [121([]), [10, 20]]}
        let map_form = [
            0xa1, 0x82, 0x01, 0x01, 0x82, 0xd8, 0x79, 0x80, 0x82, 0x0a, 0x14,
        ];
        assert_eq!(Redeemers::from_bytes(&map_form).unwrap(), redeemers);
    }

    #[test]
    fn test_total_ex_units() {
        let mk = |mem, steps| {
            Redeemer::new(RedeemerTag::Spend, BigNum::zero(), PlutusData::unit(), ExUnits::new(mem, steps))
        };
        let rs = Redeemers::from(vec![mk(1, 2), mk(3, 4)]);
        assert_eq!(rs.total_ex_units().unwrap(), ExUnits::new(4, 6));
        let overflow = Redeemers::from(vec![mk(u64::MAX, 0), mk(1, 0)]);
        assert_eq!(overflow.total_ex_units(), Err(ArithmeticError::Overflow));
    }

    #[test]
    fn test_language_views_order_and_shape() {
        let mut models = Costmdls::new();
        models.insert(Language::PlutusV1, CostModel(vec![1, 2]));
        models.insert(Language::PlutusV2, CostModel(vec![3]));
        let views = models.language_views_encoding();
        // map(2), V2 key 1, [3], then V1 bytes key h'00', bytes(9f 01 02 ff)
        assert_eq!(
            views,
            vec![0xa2, 0x01, 0x81, 0x03, 0x41, 0x00, 0x44, 0x9f, 0x01, 0x02, 0xff]
        );
    }

    #[test]
    fn test_retain_languages() {
        let mut models = Costmdls::new();
        models.insert(Language::PlutusV1, CostModel(vec![1]));
        models.insert(Language::PlutusV3, CostModel(vec![2]));
        let only_v3 = models.retain_languages(&[Language::PlutusV3]);
        assert_eq!(only_v3.len(), 1);
        assert!(only_v3.get(&Language::PlutusV1).is_none());
    }
}
