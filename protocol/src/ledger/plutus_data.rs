//! # Plutus Data
//!
//! The untyped data Plutus scripts consume: constructors, maps, lists,
//! integers and byte strings, nested arbitrarily.
//!
//! Two JSON schemas are supported, both as explicit conversions over
//! `serde_json::Value` rather than a derived format:
//!
//! - [`PlutusDatumSchema::BasicConversions`] maps JSON onto data the way a
//!   human would write it: numbers are integers, strings are bytes (hex if
//!   `0x`-prefixed, UTF-8 otherwise), arrays are lists, objects are maps.
//!   Constructors have no representation and are rejected.
//! - [`PlutusDatumSchema::DetailedSchema`] is the lossless tagged form
//!   (`{"int": 1}`, `{"bytes": "..."}`, `{"constructor": 0, "fields": []}`).

use minicbor::data::{Tag, Type};
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};
use serde_json::{json, Map as JsonMap, Value as JsonValue};

use crate::codec::{decode_bytes, encode_bounded_bytes, OrderedMap};
use crate::error::DeserializeError;
use crate::value::{BigNum, Int};

const GENERAL_CONSTR_TAG: u64 = 102;
const BIGNUM_POS_TAG: u64 = 2;
const BIGNUM_NEG_TAG: u64 = 3;

/// Which JSON shape to read or write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlutusDatumSchema {
    BasicConversions,
    DetailedSchema,
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlutusData {
    Constr(ConstrPlutusData),
    Map(PlutusMap),
    List(PlutusList),
    Integer(Int),
    Bytes(Vec<u8>),
}

/// `Constr alternative fields`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstrPlutusData {
    pub alternative: BigNum,
    pub data: PlutusList,
}

impl ConstrPlutusData {
    pub fn new(alternative: BigNum, data: PlutusList) -> Self {
        Self { alternative, data }
    }

    /// The compact tag for `alternative`, if it has one.
    fn compact_tag(alternative: u64) -> Option<u64> {
        match alternative {
            0..=6 => Some(121 + alternative),
            7..=127 => Some(1280 + alternative - 7),
            _ => None,
        }
    }

    fn alternative_from_tag(tag: u64) -> Option<u64> {
        match tag {
            121..=127 => Some(tag - 121),
            1280..=1400 => Some(tag - 1280 + 7),
            _ => None,
        }
    }
}

/// A list of data. Remembers whether it was read as a definite-length
/// array so re-encoding reproduces the same bytes (datum hashes depend on
/// it). Fresh lists use the indefinite form when non-empty.
#[derive(Clone, Debug, Default)]
pub struct PlutusList {
    elems: Vec<PlutusData>,
    definite_encoding: Option<bool>,
}

impl PartialEq for PlutusList {
    fn eq(&self, other: &Self) -> bool {
        self.elems == other.elems
    }
}

impl Eq for PlutusList {}

impl PlutusList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PlutusData> {
        self.elems.get(index)
    }

    pub fn add(&mut self, elem: PlutusData) {
        self.elems.push(elem);
        self.definite_encoding = None;
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlutusData> {
        self.elems.iter()
    }
}

impl From<Vec<PlutusData>> for PlutusList {
    fn from(elems: Vec<PlutusData>) -> Self {
        Self {
            elems,
            definite_encoding: None,
        }
    }
}

impl FromIterator<PlutusData> for PlutusList {
    fn from_iter<I: IntoIterator<Item = PlutusData>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

pub type PlutusMap = OrderedMap<PlutusData, PlutusData>;

impl PlutusData {
    pub fn new_constr(alternative: u64, fields: PlutusList) -> Self {
        PlutusData::Constr(ConstrPlutusData::new(BigNum::new(alternative), fields))
    }

    pub fn new_integer(int: Int) -> Self {
        PlutusData::Integer(int)
    }

    pub fn new_bytes(bytes: Vec<u8>) -> Self {
        PlutusData::Bytes(bytes)
    }

    pub fn new_list(list: PlutusList) -> Self {
        PlutusData::List(list)
    }

    pub fn new_map(map: PlutusMap) -> Self {
        PlutusData::Map(map)
    }

    /// Shorthand for `Constr 0 []`, the usual "unit" datum.
    pub fn unit() -> Self {
        Self::new_constr(0, PlutusList::new())
    }

    // -----------------------------------------------------------------------
    // JSON
    // -----------------------------------------------------------------------

    pub fn from_json(json: &str, schema: PlutusDatumSchema) -> Result<Self, DeserializeError> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::from_json_value(&value, schema)
    }

    pub fn to_json(&self, schema: PlutusDatumSchema) -> Result<String, DeserializeError> {
        Ok(self.to_json_value(schema)?.to_string())
    }

    pub fn from_json_value(
        value: &JsonValue,
        schema: PlutusDatumSchema,
    ) -> Result<Self, DeserializeError> {
        match schema {
            PlutusDatumSchema::BasicConversions => basic_from_json(value),
            PlutusDatumSchema::DetailedSchema => detailed_from_json(value),
        }
    }

    pub fn to_json_value(&self, schema: PlutusDatumSchema) -> Result<JsonValue, DeserializeError> {
        match schema {
            PlutusDatumSchema::BasicConversions => basic_to_json(self),
            PlutusDatumSchema::DetailedSchema => Ok(detailed_to_json(self)),
        }
    }
}

fn malformed(msg: impl Into<String>) -> DeserializeError {
    DeserializeError::MalformedJson(msg.into())
}

fn json_int(n: &serde_json::Number) -> Result<Int, DeserializeError> {
    if let Some(u) = n.as_u64() {
        Ok(Int::new(&BigNum::new(u)))
    } else if let Some(i) = n.as_i64() {
        Ok(Int::from_i128(i as i128).unwrap_or_default())
    } else {
        Err(malformed(format!("{n} is not an integer")))
    }
}

fn int_to_json(int: &Int) -> JsonValue {
    let v = int.as_i128();
    if let Ok(u) = u64::try_from(v) {
        json!(u)
    } else if let Ok(i) = i64::try_from(v) {
        json!(i)
    } else {
        // Outside what a JSON number can carry losslessly.
        JsonValue::String(v.to_string())
    }
}

/// Strings are bytes: hex after a `0x` prefix, UTF-8 otherwise.
fn basic_string_bytes(s: &str) -> Result<Vec<u8>, DeserializeError> {
    match s.strip_prefix("0x") {
        Some(hex_part) => Ok(hex::decode(hex_part)?),
        None => Ok(s.as_bytes().to_vec()),
    }
}

fn basic_from_json(value: &JsonValue) -> Result<PlutusData, DeserializeError> {
    match value {
        JsonValue::Null => Err(malformed("null is not plutus data")),
        JsonValue::Bool(_) => Err(malformed("booleans are not plutus data")),
        JsonValue::Number(n) => Ok(PlutusData::Integer(json_int(n)?)),
        JsonValue::String(s) => Ok(PlutusData::Bytes(basic_string_bytes(s)?)),
        JsonValue::Array(items) => items
            .iter()
            .map(basic_from_json)
            .collect::<Result<PlutusList, _>>()
            .map(PlutusData::List),
        JsonValue::Object(obj) => {
            let mut map = PlutusMap::new();
            for (raw_key, raw_value) in obj {
                let key = if raw_key.starts_with("0x") {
                    PlutusData::Bytes(basic_string_bytes(raw_key)?)
                } else {
                    match raw_key.parse::<Int>() {
                        Ok(int) => PlutusData::Integer(int),
                        Err(_) => PlutusData::Bytes(raw_key.as_bytes().to_vec()),
                    }
                };
                map.insert(key, basic_from_json(raw_value)?);
            }
            Ok(PlutusData::Map(map))
        }
    }
}

/// Bytes come back as text when they are printable UTF-8 that wouldn't be
/// mistaken for hex, `0x`-hex otherwise.
fn basic_bytes_to_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if !s.starts_with("0x") && !s.chars().any(char::is_control) => s.to_string(),
        _ => format!("0x{}", hex::encode(bytes)),
    }
}

fn basic_to_json(data: &PlutusData) -> Result<JsonValue, DeserializeError> {
    match data {
        PlutusData::Constr(_) => Err(malformed(
            "constructors have no BasicConversions representation",
        )),
        PlutusData::Integer(int) => Ok(int_to_json(int)),
        PlutusData::Bytes(bytes) => Ok(JsonValue::String(basic_bytes_to_string(bytes))),
        PlutusData::List(list) => list
            .iter()
            .map(basic_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        PlutusData::Map(map) => {
            let mut obj = JsonMap::new();
            for (key, value) in map.iter() {
                let key = match key {
                    PlutusData::Integer(int) => int.to_string(),
                    PlutusData::Bytes(bytes) => basic_bytes_to_string(bytes),
                    _ => return Err(malformed("map keys must be integers or bytes")),
                };
                obj.insert(key, basic_to_json(value)?);
            }
            Ok(JsonValue::Object(obj))
        }
    }
}

fn detailed_from_json(value: &JsonValue) -> Result<PlutusData, DeserializeError> {
    let obj = value
        .as_object()
        .ok_or_else(|| malformed("detailed schema expects an object"))?;

    if let Some(alt) = obj.get("constructor") {
        let alternative = alt
            .as_u64()
            .ok_or_else(|| malformed("constructor must be a non-negative integer"))?;
        let fields = obj
            .get("fields")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| malformed("constructor needs a fields array"))?;
        let data = fields
            .iter()
            .map(detailed_from_json)
            .collect::<Result<PlutusList, _>>()?;
        return Ok(PlutusData::new_constr(alternative, data));
    }

    if obj.len() != 1 {
        return Err(malformed("expected exactly one of int/bytes/list/map"));
    }
    let (tag, inner) = obj.iter().next().ok_or_else(|| malformed("empty object"))?;
    match tag.as_str() {
        "int" => match inner {
            JsonValue::Number(n) => Ok(PlutusData::Integer(json_int(n)?)),
            JsonValue::String(s) => Ok(PlutusData::Integer(s.parse()?)),
            _ => Err(malformed("int must be a number")),
        },
        "bytes" => inner
            .as_str()
            .ok_or_else(|| malformed("bytes must be a hex string"))
            .and_then(|s| Ok(PlutusData::Bytes(hex::decode(s)?))),
        "list" => inner
            .as_array()
            .ok_or_else(|| malformed("list must be an array"))?
            .iter()
            .map(detailed_from_json)
            .collect::<Result<PlutusList, _>>()
            .map(PlutusData::List),
        "map" => {
            let entries = inner
                .as_array()
                .ok_or_else(|| malformed("map must be an array of {k, v}"))?;
            let mut map = PlutusMap::new();
            for entry in entries {
                let k = entry.get("k").ok_or_else(|| malformed("map entry missing k"))?;
                let v = entry.get("v").ok_or_else(|| malformed("map entry missing v"))?;
                map.insert(detailed_from_json(k)?, detailed_from_json(v)?);
            }
            Ok(PlutusData::Map(map))
        }
        other => Err(malformed(format!("unknown detailed tag {other:?}"))),
    }
}

fn detailed_to_json(data: &PlutusData) -> JsonValue {
    match data {
        PlutusData::Constr(c) => json!({
            "constructor": c.alternative.as_u64(),
            "fields": c.data.iter().map(detailed_to_json).collect::<Vec<_>>(),
        }),
        PlutusData::Integer(int) => json!({ "int": int_to_json(int) }),
        PlutusData::Bytes(bytes) => json!({ "bytes": hex::encode(bytes) }),
        PlutusData::List(list) => json!({
            "list": list.iter().map(detailed_to_json).collect::<Vec<_>>(),
        }),
        PlutusData::Map(map) => json!({
            "map": map
                .iter()
                .map(|(k, v)| json!({ "k": detailed_to_json(k), "v": detailed_to_json(v) }))
                .collect::<Vec<_>>(),
        }),
    }
}

// ---------------------------------------------------------------------------
// CBOR
// ---------------------------------------------------------------------------

impl Encode<()> for PlutusList {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        let definite = self.definite_encoding.unwrap_or(self.elems.is_empty());
        if definite {
            e.array(self.elems.len() as u64)?;
        } else {
            e.begin_array()?;
        }
        for elem in &self.elems {
            e.encode(elem)?;
        }
        if !definite {
            e.end()?;
        }
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for PlutusList {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        let definite = d.datatype()? == Type::Array;
        let elems = d.array_iter::<PlutusData>()?.collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            elems,
            definite_encoding: Some(definite),
        })
    }
}

impl Encode<()> for PlutusData {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        match self {
            PlutusData::Constr(c) => {
                let alternative = c.alternative.as_u64();
                match ConstrPlutusData::compact_tag(alternative) {
                    Some(tag) => {
                        e.tag(Tag::new(tag))?.encode(&c.data)?;
                    }
                    None => {
                        e.tag(Tag::new(GENERAL_CONSTR_TAG))?
                            .array(2)?
                            .u64(alternative)?
                            .encode(&c.data)?;
                    }
                }
            }
            PlutusData::Map(map) => {
                e.encode(map)?;
            }
            PlutusData::List(list) => {
                e.encode(list)?;
            }
            PlutusData::Integer(int) => {
                e.encode(int)?;
            }
            PlutusData::Bytes(bytes) => encode_bounded_bytes(e, bytes)?,
        }
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for PlutusData {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        match d.datatype()? {
            Type::Tag => {
                let tag = d.tag()?.as_u64();
                if let Some(alternative) = ConstrPlutusData::alternative_from_tag(tag) {
                    return Ok(PlutusData::new_constr(alternative, d.decode()?));
                }
                match tag {
                    GENERAL_CONSTR_TAG => {
                        crate::codec::expect_array(d, 2, "general constructor")?;
                        let alternative = d.u64()?;
                        Ok(PlutusData::new_constr(alternative, d.decode()?))
                    }
                    BIGNUM_POS_TAG | BIGNUM_NEG_TAG => {
                        let magnitude = decode_bytes(d)?;
                        if magnitude.len() > 8 {
                            return Err(decode::Error::message(
                                "plutus integer exceeds the supported 64-bit magnitude",
                            ));
                        }
                        let n = magnitude
                            .iter()
                            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
                        let int = if tag == BIGNUM_POS_TAG {
                            Int::new(&BigNum::new(n))
                        } else {
                            // Tag 3 encodes -1 - n.
                            Int::from_i128(-1 - n as i128).ok_or_else(|| {
                                decode::Error::message("plutus integer out of range")
                            })?
                        };
                        Ok(PlutusData::Integer(int))
                    }
                    other => Err(decode::Error::message(format!(
                        "unexpected tag {other} in plutus data"
                    ))),
                }
            }
            Type::Map | Type::MapIndef => Ok(PlutusData::Map(d.decode()?)),
            Type::Array | Type::ArrayIndef => Ok(PlutusData::List(d.decode()?)),
            Type::Bytes | Type::BytesIndef => Ok(PlutusData::Bytes(decode_bytes(d)?)),
            Type::U8
            | Type::U16
            | Type::U32
            | Type::U64
            | Type::I8
            | Type::I16
            | Type::I32
            | Type::I64
            | Type::Int => Ok(PlutusData::Integer(d.decode()?)),
            other => Err(decode::Error::message(format!(
                "unexpected {other} in plutus data"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CborEncoding;

    #[test]
    fn test_constr_tags() {
        assert_eq!(PlutusData::unit().to_bytes(), vec![0xd8, 0x79, 0x80]);
        let seventh = PlutusData::new_constr(7, PlutusList::new());
        assert_eq!(&seventh.to_bytes()[..3], &[0xd9, 0x05, 0x00]);
        let general = PlutusData::new_constr(200, PlutusList::new());
        assert_eq!(&general.to_bytes()[..2], &[0xd8, 0x66]);
        for data in [PlutusData::unit(), seventh, general] {
            assert_eq!(PlutusData::from_bytes(&data.to_bytes()).unwrap(), data);
        }
    }

    #[test]
    fn test_list_encoding_is_preserved() {
        // Definite [1, 2] stays definite after a round trip.
        let definite = [0x82, 0x01, 0x02];
        let data = PlutusData::from_bytes(&definite).unwrap();
        assert_eq!(data.to_bytes(), definite.to_vec());
        // Freshly built non-empty lists are indefinite.
        let fresh: PlutusList = vec![PlutusData::Integer(Int::new_i32(1))].into();
        assert_eq!(PlutusData::List(fresh).to_bytes(), vec![0x9f, 0x01, 0xff]);
    }

    #[test]
    fn test_long_bytes_chunked() {
        let data = PlutusData::Bytes(vec![1u8; 65]);
        let bytes = data.to_bytes();
        assert_eq!(bytes[0], 0x5f);
        assert_eq!(PlutusData::from_bytes(&bytes).unwrap(), data);
    }

    #[test]
    fn test_bignum_tags_decode() {
        // 2(h'01 00') = 256, 3(h'00') = -1
        assert_eq!(
            PlutusData::from_bytes(&[0xc2, 0x42, 0x01, 0x00]).unwrap(),
            PlutusData::Integer(Int::new_i32(256))
        );
        assert_eq!(
            PlutusData::from_bytes(&[0xc3, 0x41, 0x00]).unwrap(),
            PlutusData::Integer(Int::new_i32(-1))
        );
    }

    #[test]
    fn test_basic_json() {
        let data =
            PlutusData::from_json(r#"{"5": [1, "0xcafe", "hi"]}"#, PlutusDatumSchema::BasicConversions)
                .unwrap();
        let PlutusData::Map(map) = &data else {
            panic!("expected map");
        };
        let list = map.get(&PlutusData::Integer(Int::new_i32(5))).unwrap();
        let PlutusData::List(list) = list else {
            panic!("expected list");
        };
        assert_eq!(list.get(1), Some(&PlutusData::Bytes(vec![0xca, 0xfe])));
        assert_eq!(list.get(2), Some(&PlutusData::Bytes(b"hi".to_vec())));

        let back = data.to_json(PlutusDatumSchema::BasicConversions).unwrap();
        assert_eq!(back, r#"{"5":[1,"0xcafe","hi"]}"#);
    }

    #[test]
    fn test_basic_json_rejects_constructors() {
        assert!(PlutusData::unit()
            .to_json(PlutusDatumSchema::BasicConversions)
            .is_err());
        assert!(PlutusData::from_json("true", PlutusDatumSchema::BasicConversions).is_err());
    }

    #[test]
    fn test_detailed_json_round_trip() {
        let json = r#"{"constructor":1,"fields":[{"int":-5},{"bytes":"00ff"},{"map":[{"k":{"list":[]},"v":{"int":1}}]}]}"#;
        let data = PlutusData::from_json(json, PlutusDatumSchema::DetailedSchema).unwrap();
        let back = data.to_json(PlutusDatumSchema::DetailedSchema).unwrap();
        assert_eq!(
            PlutusData::from_json(&back, PlutusDatumSchema::DetailedSchema).unwrap(),
            data
        );
        assert!(PlutusData::from_json(r#"{"int":1,"bytes":""}"#, PlutusDatumSchema::DetailedSchema)
            .is_err());
    }
}
