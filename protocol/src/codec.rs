//! # Canonical CBOR Plumbing
//!
//! Every ledger entity in txforge implements `minicbor`'s [`Encode`] and
//! [`Decode`] by hand. Derives would be shorter, but the ledger format has
//! opinions derives don't: maps keep the order in which entries were
//! inserted (not sorted), sets may or may not carry tag 258, and byte
//! strings longer than 64 bytes are sometimes chunked.
//!
//! The [`CborEncoding`] trait layers the `to_bytes` / `from_bytes` / hex
//! round trip on top of those impls, and [`OrderedMap`] is the
//! insertion-ordered map backing every map-valued ledger field.

use minicbor::data::Type;
use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};

use crate::error::DeserializeError;

/// CBOR tag the Conway era puts in front of sets. Accepted on decode,
/// never emitted.
pub const SET_TAG: u64 = 258;

/// Byte/text chunk limit for metadata and Plutus data.
pub const MAX_CHUNK_LEN: usize = 64;

/// Result type of a CBOR encode step.
pub type EncodeResult<W> = Result<(), encode::Error<<W as encode::Write>::Error>>;

/// Binary round trip for any ledger type with CBOR impls.
pub trait CborEncoding: Encode<()> + for<'b> Decode<'b, ()> + Sized {
    /// Canonical CBOR bytes.
    fn to_bytes(&self) -> Vec<u8> {
        minicbor::to_vec(self).expect("encoding into a Vec<u8> cannot fail")
    }

    /// Parse from CBOR, rejecting trailing garbage.
    fn from_bytes(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let mut d = Decoder::new(bytes);
        let value = d.decode::<Self>()?;
        if d.position() != bytes.len() {
            return Err(DeserializeError::MalformedBytes(format!(
                "{} trailing bytes",
                bytes.len() - d.position()
            )));
        }
        Ok(value)
    }

    fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    fn from_hex(s: &str) -> Result<Self, DeserializeError> {
        Self::from_bytes(&hex::decode(s.trim())?)
    }
}

impl<T> CborEncoding for T where T: Encode<()> + for<'b> Decode<'b, ()> {}

/// Consume a definite array header of exactly `expected` entries.
pub(crate) fn expect_array(
    d: &mut Decoder<'_>,
    expected: u64,
    what: &'static str,
) -> Result<(), decode::Error> {
    match d.array()? {
        Some(n) if n == expected => Ok(()),
        Some(n) => Err(decode::Error::message(format!(
            "{what}: expected array of {expected}, got {n}"
        ))),
        None => Err(decode::Error::message(format!(
            "{what}: indefinite array where a fixed tuple was expected"
        ))),
    }
}

/// Skip the optional set tag (258) in front of a collection.
pub(crate) fn skip_set_tag(d: &mut Decoder<'_>) -> Result<(), decode::Error> {
    if d.datatype()? == Type::Tag {
        let tag = d.tag()?;
        if tag.as_u64() != SET_TAG {
            return Err(decode::Error::message(format!(
                "unexpected tag {} in front of a set",
                tag.as_u64()
            )));
        }
    }
    Ok(())
}

/// Decode a (possibly tagged, possibly indefinite) array of `T`.
pub(crate) fn decode_set<'b, T: Decode<'b, ()>>(
    d: &mut Decoder<'b>,
) -> Result<Vec<T>, decode::Error> {
    skip_set_tag(d)?;
    d.array_iter::<T>()?.collect()
}

/// Encode a slice as a definite array.
pub(crate) fn encode_array<W: encode::Write, T: Encode<()>>(
    e: &mut Encoder<W>,
    items: &[T],
) -> EncodeResult<W> {
    e.array(items.len() as u64)?;
    for item in items {
        e.encode(item)?;
    }
    Ok(())
}

/// Decode a byte string, chunked or not.
pub(crate) fn decode_bytes(d: &mut Decoder<'_>) -> Result<Vec<u8>, decode::Error> {
    match d.datatype()? {
        Type::BytesIndef => {
            let mut out = Vec::new();
            for chunk in d.bytes_iter()? {
                out.extend_from_slice(chunk?);
            }
            Ok(out)
        }
        _ => Ok(d.bytes()?.to_vec()),
    }
}

/// Encode a byte string, chunking into 64-byte pieces when it is longer.
pub(crate) fn encode_bounded_bytes<W: encode::Write>(
    e: &mut Encoder<W>,
    bytes: &[u8],
) -> EncodeResult<W> {
    if bytes.len() <= MAX_CHUNK_LEN {
        e.bytes(bytes)?;
    } else {
        e.begin_bytes()?;
        for chunk in bytes.chunks(MAX_CHUNK_LEN) {
            e.bytes(chunk)?;
        }
        e.end()?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// OrderedMap
// ---------------------------------------------------------------------------

/// A map that remembers insertion order.
///
/// Equality ignores order (two maps with the same entries are equal), but
/// encoding walks entries in the order they were first inserted. Replacing
/// the value of an existing key keeps its original position. This is what
/// makes structurally-equal maps built in different sequences hash
/// differently on the ledger.
#[derive(Clone, Debug, Eq)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: PartialEq, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or replaces. Returns the previous value for `key`, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn retain(&mut self, mut f: impl FnMut(&K, &V) -> bool) {
        self.entries.retain(|(k, v)| f(k, v));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.entries.iter_mut().map(|(k, v)| (&*k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for OrderedMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).map(|ov| ov == v).unwrap_or(false))
    }
}

impl<K: PartialEq, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K, V> IntoIterator for OrderedMap<K, V> {
    type Item = (K, V);
    type IntoIter = std::vec::IntoIter<(K, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Encode<()>, V: Encode<()>> Encode<()> for OrderedMap<K, V> {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(self.entries.len() as u64)?;
        for (k, v) in &self.entries {
            e.encode(k)?.encode(v)?;
        }
        Ok(())
    }
}

impl<'b, K, V> Decode<'b, ()> for OrderedMap<K, V>
where
    K: Decode<'b, ()> + PartialEq,
    V: Decode<'b, ()>,
{
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        let mut map = OrderedMap::new();
        for entry in d.map_iter::<K, V>()? {
            let (k, v) = entry?;
            if map.insert(k, v).is_some() {
                return Err(decode::Error::message("duplicate map key"));
            }
        }
        Ok(map)
    }
}
