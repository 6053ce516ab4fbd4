//! # Transaction Metadata & Auxiliary Data
//!
//! Metadata is a tree of maps, lists, integers, byte strings and text,
//! hung off numeric labels. Bytes and text are capped at 64 bytes each;
//! longer payloads have to be split across a list by the caller (see
//! [`AuxiliaryData::with_message`] for the CIP-20 case).
//!
//! Auxiliary data wraps the metadata plus any scripts that travel with the
//! transaction. Three wire shapes exist, all accepted on decode:
//!
//! | Shape      | Encoding                                   | Emitted when            |
//! |------------|--------------------------------------------|-------------------------|
//! | Shelley    | `{ label => metadatum }`                   | no scripts              |
//! | Shelley-MA | `[ metadata, [native scripts] ]`           | native scripts only     |
//! | Alonzo     | `259({ 0: md, 1: native, 2..4: plutus })` | any Plutus script       |

use minicbor::data::{Tag, Type};
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};
use serde_json::{json, Map as JsonMap, Value as JsonValue};

use super::script::{Language, NativeScript, PlutusScript};
use crate::codec::{decode_bytes, decode_set, encode_array, OrderedMap};
use crate::config::{CIP20_MESSAGE_LABEL, MAX_METADATUM_CHUNK};
use crate::error::DeserializeError;
use crate::value::{BigNum, Int};

const ALONZO_AUX_TAG: u64 = 259;

/// Which JSON shape to read or write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetadataJsonSchema {
    /// Strings are text, objects are maps with text keys. No bytes.
    NoConversions,
    /// Like `NoConversions`, but `0x`-prefixed strings are bytes and
    /// numeric object keys are integers.
    BasicConversions,
    /// Lossless tagged form: `{"int": 1}`, `{"bytes": "..."}`,
    /// `{"string": "..."}`, `{"list": [...]}`, `{"map": [{"k":..,"v":..}]}`.
    DetailedSchema,
}

// ---------------------------------------------------------------------------
// TransactionMetadatum
// ---------------------------------------------------------------------------

pub type MetadataMap = OrderedMap<TransactionMetadatum, TransactionMetadatum>;
pub type MetadataList = Vec<TransactionMetadatum>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionMetadatum {
    Map(MetadataMap),
    List(MetadataList),
    Int(Int),
    Bytes(Vec<u8>),
    Text(String),
}

impl TransactionMetadatum {
    pub fn new_bytes(bytes: Vec<u8>) -> Result<Self, DeserializeError> {
        check_chunk("metadatum bytes", bytes.len())?;
        Ok(TransactionMetadatum::Bytes(bytes))
    }

    pub fn new_text(text: impl Into<String>) -> Result<Self, DeserializeError> {
        let text = text.into();
        check_chunk("metadatum text", text.len())?;
        Ok(TransactionMetadatum::Text(text))
    }

    pub fn new_int(int: Int) -> Self {
        TransactionMetadatum::Int(int)
    }

    pub fn new_list(list: MetadataList) -> Self {
        TransactionMetadatum::List(list)
    }

    pub fn new_map(map: MetadataMap) -> Self {
        TransactionMetadatum::Map(map)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TransactionMetadatum::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&MetadataList> {
        match self {
            TransactionMetadatum::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MetadataMap> {
        match self {
            TransactionMetadatum::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn from_json(json: &str, schema: MetadataJsonSchema) -> Result<Self, DeserializeError> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::from_json_value(&value, schema)
    }

    pub fn to_json(&self, schema: MetadataJsonSchema) -> Result<String, DeserializeError> {
        Ok(self.to_json_value(schema)?.to_string())
    }

    pub fn from_json_value(
        value: &JsonValue,
        schema: MetadataJsonSchema,
    ) -> Result<Self, DeserializeError> {
        match schema {
            MetadataJsonSchema::DetailedSchema => detailed_from_json(value),
            _ => simple_from_json(value, schema),
        }
    }

    pub fn to_json_value(&self, schema: MetadataJsonSchema) -> Result<JsonValue, DeserializeError> {
        match schema {
            MetadataJsonSchema::DetailedSchema => Ok(detailed_to_json(self)),
            _ => simple_to_json(self, schema),
        }
    }
}

fn check_chunk(what: &'static str, found: usize) -> Result<(), DeserializeError> {
    if found > MAX_METADATUM_CHUNK {
        return Err(DeserializeError::TooLong { what, found });
    }
    Ok(())
}

fn malformed(msg: impl Into<String>) -> DeserializeError {
    DeserializeError::MalformedJson(msg.into())
}

fn json_number(n: &serde_json::Number) -> Result<TransactionMetadatum, DeserializeError> {
    let int = if let Some(u) = n.as_u64() {
        Int::new(&BigNum::new(u))
    } else if let Some(i) = n.as_i64() {
        Int::from_i128(i as i128).ok_or_else(|| malformed(format!("{n} out of range")))?
    } else {
        return Err(malformed(format!("{n} is not an integer")));
    };
    Ok(TransactionMetadatum::Int(int))
}

fn int_to_json(int: &Int) -> JsonValue {
    let v = int.as_i128();
    if let Ok(u) = u64::try_from(v) {
        json!(u)
    } else if let Ok(i) = i64::try_from(v) {
        json!(i)
    } else {
        JsonValue::String(v.to_string())
    }
}

fn simple_string(s: &str, schema: MetadataJsonSchema) -> Result<TransactionMetadatum, DeserializeError> {
    match (schema, s.strip_prefix("0x")) {
        (MetadataJsonSchema::BasicConversions, Some(hex_part)) => {
            TransactionMetadatum::new_bytes(hex::decode(hex_part)?)
        }
        _ => TransactionMetadatum::new_text(s),
    }
}

fn simple_from_json(
    value: &JsonValue,
    schema: MetadataJsonSchema,
) -> Result<TransactionMetadatum, DeserializeError> {
    match value {
        JsonValue::Null | JsonValue::Bool(_) => {
            Err(malformed("null and booleans are not metadata"))
        }
        JsonValue::Number(n) => json_number(n),
        JsonValue::String(s) => simple_string(s, schema),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| simple_from_json(item, schema))
            .collect::<Result<Vec<_>, _>>()
            .map(TransactionMetadatum::List),
        JsonValue::Object(obj) => {
            let mut map = MetadataMap::new();
            for (raw_key, raw_value) in obj {
                let key = match (schema, raw_key.parse::<Int>()) {
                    (MetadataJsonSchema::BasicConversions, Ok(int)) => TransactionMetadatum::Int(int),
                    _ => simple_string(raw_key, schema)?,
                };
                map.insert(key, simple_from_json(raw_value, schema)?);
            }
            Ok(TransactionMetadatum::Map(map))
        }
    }
}

fn simple_to_json(
    datum: &TransactionMetadatum,
    schema: MetadataJsonSchema,
) -> Result<JsonValue, DeserializeError> {
    match datum {
        TransactionMetadatum::Int(int) => Ok(int_to_json(int)),
        TransactionMetadatum::Text(s) => Ok(JsonValue::String(s.clone())),
        TransactionMetadatum::Bytes(bytes) => match schema {
            MetadataJsonSchema::BasicConversions => {
                Ok(JsonValue::String(format!("0x{}", hex::encode(bytes))))
            }
            _ => Err(malformed("bytes have no NoConversions representation")),
        },
        TransactionMetadatum::List(items) => items
            .iter()
            .map(|item| simple_to_json(item, schema))
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        TransactionMetadatum::Map(map) => {
            let mut obj = JsonMap::new();
            for (key, value) in map.iter() {
                let key = match (key, schema) {
                    (TransactionMetadatum::Text(s), _) => s.clone(),
                    (TransactionMetadatum::Int(int), MetadataJsonSchema::BasicConversions) => {
                        int.to_string()
                    }
                    (TransactionMetadatum::Bytes(b), MetadataJsonSchema::BasicConversions) => {
                        format!("0x{}", hex::encode(b))
                    }
                    _ => return Err(malformed("map key has no JSON object-key form")),
                };
                obj.insert(key, simple_to_json(value, schema)?);
            }
            Ok(JsonValue::Object(obj))
        }
    }
}

fn detailed_from_json(value: &JsonValue) -> Result<TransactionMetadatum, DeserializeError> {
    let obj = value
        .as_object()
        .ok_or_else(|| malformed("detailed schema expects an object"))?;
    if obj.len() != 1 {
        return Err(malformed("detailed schema objects have exactly one key"));
    }
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| malformed("empty detailed schema object"))?;
    match kind.as_str() {
        "int" => match inner {
            JsonValue::Number(n) => json_number(n),
            JsonValue::String(s) => Ok(TransactionMetadatum::Int(s.parse()?)),
            _ => Err(malformed("\"int\" expects a number")),
        },
        "bytes" => {
            let s = inner
                .as_str()
                .ok_or_else(|| malformed("\"bytes\" expects a hex string"))?;
            TransactionMetadatum::new_bytes(hex::decode(s)?)
        }
        "string" => {
            let s = inner
                .as_str()
                .ok_or_else(|| malformed("\"string\" expects a string"))?;
            TransactionMetadatum::new_text(s)
        }
        "list" => inner
            .as_array()
            .ok_or_else(|| malformed("\"list\" expects an array"))?
            .iter()
            .map(detailed_from_json)
            .collect::<Result<Vec<_>, _>>()
            .map(TransactionMetadatum::List),
        "map" => {
            let entries = inner
                .as_array()
                .ok_or_else(|| malformed("\"map\" expects an array of {k, v}"))?;
            let mut map = MetadataMap::new();
            for entry in entries {
                let k = entry.get("k").ok_or_else(|| malformed("map entry missing \"k\""))?;
                let v = entry.get("v").ok_or_else(|| malformed("map entry missing \"v\""))?;
                map.insert(detailed_from_json(k)?, detailed_from_json(v)?);
            }
            Ok(TransactionMetadatum::Map(map))
        }
        other => Err(malformed(format!("unknown metadatum kind {other:?}"))),
    }
}

fn detailed_to_json(datum: &TransactionMetadatum) -> JsonValue {
    match datum {
        TransactionMetadatum::Int(int) => json!({ "int": int_to_json(int) }),
        TransactionMetadatum::Bytes(b) => json!({ "bytes": hex::encode(b) }),
        TransactionMetadatum::Text(s) => json!({ "string": s }),
        TransactionMetadatum::List(items) => {
            json!({ "list": items.iter().map(detailed_to_json).collect::<Vec<_>>() })
        }
        TransactionMetadatum::Map(map) => json!({
            "map": map
                .iter()
                .map(|(k, v)| json!({ "k": detailed_to_json(k), "v": detailed_to_json(v) }))
                .collect::<Vec<_>>()
        }),
    }
}

impl Encode<()> for TransactionMetadatum {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        match self {
            TransactionMetadatum::Map(m) => m.encode(e, ctx),
            TransactionMetadatum::List(l) => encode_array(e, l),
            TransactionMetadatum::Int(i) => i.encode(e, ctx),
            TransactionMetadatum::Bytes(b) => {
                e.bytes(b)?;
                Ok(())
            }
            TransactionMetadatum::Text(s) => {
                e.str(s)?;
                Ok(())
            }
        }
    }
}

impl<'b> Decode<'b, ()> for TransactionMetadatum {
    fn decode(d: &mut Decoder<'b>, ctx: &mut ()) -> Result<Self, decode::Error> {
        let too_long = |what: &str, n: usize| {
            decode::Error::message(format!("{what} of {n} bytes exceeds {MAX_METADATUM_CHUNK}"))
        };
        match d.datatype()? {
            Type::Map | Type::MapIndef => Ok(TransactionMetadatum::Map(MetadataMap::decode(d, ctx)?)),
            Type::Array | Type::ArrayIndef => Ok(TransactionMetadatum::List(
                d.array_iter::<TransactionMetadatum>()?.collect::<Result<_, _>>()?,
            )),
            Type::Bytes | Type::BytesIndef => {
                let bytes = decode_bytes(d)?;
                if bytes.len() > MAX_METADATUM_CHUNK {
                    return Err(too_long("metadatum bytes", bytes.len()));
                }
                Ok(TransactionMetadatum::Bytes(bytes))
            }
            Type::String | Type::StringIndef => {
                let mut text = String::new();
                for chunk in d.str_iter()? {
                    text.push_str(chunk?);
                }
                if text.len() > MAX_METADATUM_CHUNK {
                    return Err(too_long("metadatum text", text.len()));
                }
                Ok(TransactionMetadatum::Text(text))
            }
            _ => Ok(TransactionMetadatum::Int(Int::decode(d, ctx)?)),
        }
    }
}

// ---------------------------------------------------------------------------
// GeneralTransactionMetadata
// ---------------------------------------------------------------------------

/// Label → metadatum, kept in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneralTransactionMetadata(OrderedMap<BigNum, TransactionMetadatum>);

impl GeneralTransactionMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn insert(
        &mut self,
        label: BigNum,
        value: TransactionMetadatum,
    ) -> Option<TransactionMetadatum> {
        self.0.insert(label, value)
    }

    pub fn get(&self, label: &BigNum) -> Option<&TransactionMetadatum> {
        self.0.get(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BigNum, &TransactionMetadatum)> {
        self.0.iter()
    }
}

impl Encode<()> for GeneralTransactionMetadata {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        self.0.encode(e, ctx)
    }
}

impl<'b> Decode<'b, ()> for GeneralTransactionMetadata {
    fn decode(d: &mut Decoder<'b>, ctx: &mut ()) -> Result<Self, decode::Error> {
        Ok(Self(OrderedMap::decode(d, ctx)?))
    }
}

// ---------------------------------------------------------------------------
// AuxiliaryData
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuxiliaryData {
    pub metadata: Option<GeneralTransactionMetadata>,
    pub native_scripts: Vec<NativeScript>,
    pub plutus_scripts: Vec<PlutusScript>,
}

impl AuxiliaryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.as_ref().map_or(true, |m| m.is_empty())
            && self.native_scripts.is_empty()
            && self.plutus_scripts.is_empty()
    }

    pub fn add_metadatum(&mut self, label: BigNum, value: TransactionMetadatum) {
        self.metadata
            .get_or_insert_with(GeneralTransactionMetadata::new)
            .insert(label, value);
    }

    /// CIP-20 message metadata: `674 => {"msg": [line, ...]}`. Lines longer
    /// than 64 bytes are split on character boundaries.
    pub fn with_message<S: AsRef<str>>(lines: &[S]) -> Result<Self, DeserializeError> {
        let mut chunks = Vec::new();
        for line in lines {
            for chunk in split_utf8(line.as_ref(), MAX_METADATUM_CHUNK) {
                chunks.push(TransactionMetadatum::new_text(chunk)?);
            }
        }
        let mut body = MetadataMap::new();
        body.insert(TransactionMetadatum::new_text("msg")?, TransactionMetadatum::List(chunks));

        let mut aux = AuxiliaryData::new();
        aux.add_metadatum(BigNum::new(CIP20_MESSAGE_LABEL), TransactionMetadatum::Map(body));
        Ok(aux)
    }

    /// The CIP-20 message chunks, if present.
    pub fn message(&self) -> Option<Vec<String>> {
        let body = self
            .metadata
            .as_ref()?
            .get(&BigNum::new(CIP20_MESSAGE_LABEL))?
            .as_map()?;
        let msg_key = TransactionMetadatum::Text("msg".to_string());
        body.get(&msg_key)?
            .as_list()?
            .iter()
            .map(|m| m.as_text().map(str::to_string))
            .collect()
    }
}

/// Split `s` into pieces of at most `max` bytes without cutting a char.
fn split_utf8(s: &str, max: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = s;
    while rest.len() > max {
        let mut cut = max;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (head, tail) = rest.split_at(cut);
        out.push(head);
        rest = tail;
    }
    out.push(rest);
    out
}

impl Encode<()> for AuxiliaryData {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        let empty = GeneralTransactionMetadata::new();
        let metadata = self.metadata.as_ref().unwrap_or(&empty);

        if self.plutus_scripts.is_empty() && self.native_scripts.is_empty() {
            e.encode(metadata)?;
            return Ok(());
        }
        if self.plutus_scripts.is_empty() {
            e.array(2)?.encode(metadata)?;
            encode_array(e, &self.native_scripts)?;
            return Ok(());
        }

        let by_lang = |lang: Language| -> Vec<&PlutusScript> {
            self.plutus_scripts
                .iter()
                .filter(|s| s.language() == lang)
                .collect()
        };
        let groups = [
            (2u8, by_lang(Language::PlutusV1)),
            (3u8, by_lang(Language::PlutusV2)),
            (4u8, by_lang(Language::PlutusV3)),
        ];
        let len = u64::from(self.metadata.is_some())
            + u64::from(!self.native_scripts.is_empty())
            + groups.iter().filter(|(_, g)| !g.is_empty()).count() as u64;

        e.tag(Tag::new(ALONZO_AUX_TAG))?.map(len)?;
        if let Some(md) = &self.metadata {
            e.u8(0)?.encode(md)?;
        }
        if !self.native_scripts.is_empty() {
            e.u8(1)?;
            encode_array(e, &self.native_scripts)?;
        }
        for (key, group) in groups.iter().filter(|(_, g)| !g.is_empty()) {
            e.u8(*key)?.array(group.len() as u64)?;
            for script in group {
                script.encode_bytes(e)?;
            }
        }
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for AuxiliaryData {
    fn decode(d: &mut Decoder<'b>, ctx: &mut ()) -> Result<Self, decode::Error> {
        match d.datatype()? {
            Type::Map | Type::MapIndef => Ok(AuxiliaryData {
                metadata: Some(GeneralTransactionMetadata::decode(d, ctx)?),
                ..Default::default()
            }),
            Type::Array | Type::ArrayIndef => {
                crate::codec::expect_array(d, 2, "shelley-ma auxiliary data")?;
                Ok(AuxiliaryData {
                    metadata: Some(d.decode()?),
                    native_scripts: decode_set(d)?,
                    plutus_scripts: Vec::new(),
                })
            }
            Type::Tag => {
                let tag = d.tag()?.as_u64();
                if tag != ALONZO_AUX_TAG {
                    return Err(decode::Error::message(format!(
                        "unexpected auxiliary data tag {tag}"
                    )));
                }
                let mut aux = AuxiliaryData::new();
                let len = d.map()?.ok_or_else(|| {
                    decode::Error::message("indefinite alonzo auxiliary data map")
                })?;
                for _ in 0..len {
                    match d.u8()? {
                        0 => aux.metadata = Some(d.decode()?),
                        1 => aux.native_scripts = decode_set(d)?,
                        key @ 2..=4 => {
                            let language = Language::from_kind(key - 2)
                                .ok_or_else(|| decode::Error::message("bad language key"))?;
                            crate::codec::skip_set_tag(d)?;
                            let n = d.array()?.ok_or_else(|| {
                                decode::Error::message("indefinite plutus script list")
                            })?;
                            for _ in 0..n {
                                aux.plutus_scripts.push(PlutusScript::decode_as(d, language)?);
                            }
                        }
                        other => {
                            return Err(decode::Error::message(format!(
                                "unknown auxiliary data key {other}"
                            )))
                        }
                    }
                }
                Ok(aux)
            }
            other => Err(decode::Error::message(format!(
                "auxiliary data cannot start with {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CborEncoding;
    use crate::crypto::Ed25519KeyHash;

    #[test]
    fn test_metadatum_length_cap() {
        assert!(TransactionMetadatum::new_text("a".repeat(64)).is_ok());
        assert!(matches!(
            TransactionMetadatum::new_text("a".repeat(65)),
            Err(DeserializeError::TooLong { found: 65, .. })
        ));
        assert!(TransactionMetadatum::new_bytes(vec![0; 65]).is_err());
    }

    #[test]
    fn test_cip20_message_chunks_on_char_boundaries() {
        // 'é' is two bytes; 40 of them straddle the 64-byte limit.
        let line = "é".repeat(40);
        let aux = AuxiliaryData::with_message(&[line.as_str(), "hello"]).unwrap();
        let msg = aux.message().unwrap();
        assert_eq!(msg.len(), 3);
        assert_eq!(msg[0].len(), 64);
        assert_eq!(msg[1].len(), 16);
        assert_eq!(msg[2], "hello");
        assert_eq!(msg[0].clone() + &msg[1], line);
    }

    #[test]
    fn test_shelley_form_round_trip() {
        let aux = AuxiliaryData::with_message(&["F2LB: hi"]).unwrap();
        let bytes = aux.to_bytes();
        assert_eq!(bytes[0], 0xa1);
        assert_eq!(AuxiliaryData::from_bytes(&bytes).unwrap(), aux);
    }

    #[test]
    fn test_script_forms() {
        let native = NativeScript::ScriptPubkey(Ed25519KeyHash::from_raw([1; 28]));
        let mut aux = AuxiliaryData::new();
        aux.native_scripts.push(native);
        let ma_bytes = aux.to_bytes();
        assert_eq!(ma_bytes[0], 0x82);
        // Shelley-MA always carries metadata, even if empty.
        let decoded = AuxiliaryData::from_bytes(&ma_bytes).unwrap();
        assert_eq!(decoded.native_scripts, aux.native_scripts);

        aux.plutus_scripts
            .push(PlutusScript::new(Language::PlutusV2, vec![1, 2, 3]));
        let alonzo = aux.to_bytes();
        assert_eq!(&alonzo[..3], &[0xd9, 0x01, 0x03]);
        assert_eq!(AuxiliaryData::from_bytes(&alonzo).unwrap(), aux);
    }

    #[test]
    fn test_json_schemas() {
        let json = r#"{"name": "pool", "hash": "0xdeadbeef", "n": [1, -2]}"#;
        let basic = TransactionMetadatum::from_json(json, MetadataJsonSchema::BasicConversions).unwrap();
        let map = basic.as_map().unwrap();
        assert_eq!(
            map.get(&TransactionMetadatum::Text("hash".into())),
            Some(&TransactionMetadatum::Bytes(vec![0xde, 0xad, 0xbe, 0xef]))
        );

        let plain = TransactionMetadatum::from_json(json, MetadataJsonSchema::NoConversions).unwrap();
        assert_eq!(
            plain.as_map().unwrap().get(&TransactionMetadatum::Text("hash".into())),
            Some(&TransactionMetadatum::Text("0xdeadbeef".into()))
        );
        assert!(basic.to_json(MetadataJsonSchema::NoConversions).is_err());

        let detailed = basic.to_json(MetadataJsonSchema::DetailedSchema).unwrap();
        let back = TransactionMetadatum::from_json(&detailed, MetadataJsonSchema::DetailedSchema).unwrap();
        assert_eq!(back, basic);
    }

    #[test]
    fn test_basic_numeric_keys() {
        let m = TransactionMetadatum::from_json(r#"{"1": "x"}"#, MetadataJsonSchema::BasicConversions).unwrap();
        assert!(m
            .as_map()
            .unwrap()
            .contains_key(&TransactionMetadatum::Int(Int::new_i32(1))));
    }
}
