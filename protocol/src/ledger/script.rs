//! Native (multisig/timelock) scripts and Plutus scripts.

use std::collections::BTreeSet;

use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};
use serde::{Deserialize, Serialize};

use crate::codec::{decode_bytes, decode_set, encode_array, expect_array, CborEncoding};
use crate::crypto::hash::blake2b224_prefixed;
use crate::crypto::{Ed25519KeyHash, ScriptHash};
use crate::value::Slot;

/// Hash namespace of native scripts.
const NATIVE_SCRIPT_NAMESPACE: u8 = 0x00;

// ---------------------------------------------------------------------------
// NativeScript
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NativeScript {
    ScriptPubkey(Ed25519KeyHash),
    ScriptAll(Vec<NativeScript>),
    ScriptAny(Vec<NativeScript>),
    ScriptNOfK { n: u32, scripts: Vec<NativeScript> },
    /// Valid from this slot onwards.
    TimelockStart(Slot),
    /// Valid strictly before this slot.
    TimelockExpiry(Slot),
}

impl NativeScript {
    pub fn hash(&self) -> ScriptHash {
        ScriptHash::from_raw(blake2b224_prefixed(
            NATIVE_SCRIPT_NAMESPACE,
            &self.to_bytes(),
        ))
    }

    /// Every key hash the script mentions. Signing with all of them always
    /// satisfies the script's signature clauses, so this is the upper bound
    /// used when the real signer set isn't known yet.
    pub fn required_signers(&self) -> Vec<Ed25519KeyHash> {
        let mut out = BTreeSet::new();
        self.collect_signers(&mut out);
        out.into_iter().collect()
    }

    fn collect_signers(&self, out: &mut BTreeSet<Ed25519KeyHash>) {
        match self {
            NativeScript::ScriptPubkey(h) => {
                out.insert(*h);
            }
            NativeScript::ScriptAll(scripts)
            | NativeScript::ScriptAny(scripts)
            | NativeScript::ScriptNOfK { scripts, .. } => {
                scripts.iter().for_each(|s| s.collect_signers(out));
            }
            NativeScript::TimelockStart(_) | NativeScript::TimelockExpiry(_) => {}
        }
    }
}

impl Encode<()> for NativeScript {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        match self {
            NativeScript::ScriptPubkey(h) => {
                e.array(2)?.u8(0)?.encode(h)?;
            }
            NativeScript::ScriptAll(scripts) => {
                e.array(2)?.u8(1)?;
                encode_array(e, scripts)?;
            }
            NativeScript::ScriptAny(scripts) => {
                e.array(2)?.u8(2)?;
                encode_array(e, scripts)?;
            }
            NativeScript::ScriptNOfK { n, scripts } => {
                e.array(3)?.u8(3)?.u32(*n)?;
                encode_array(e, scripts)?;
            }
            NativeScript::TimelockStart(slot) => {
                e.array(2)?.u8(4)?.encode(slot)?;
            }
            NativeScript::TimelockExpiry(slot) => {
                e.array(2)?.u8(5)?.encode(slot)?;
            }
        }
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for NativeScript {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        let len = d.array()?;
        let kind = d.u8()?;
        let expected = if kind == 3 { 3 } else { 2 };
        if len != Some(expected) {
            return Err(decode::Error::message(format!(
                "native script kind {kind} expects {expected} fields"
            )));
        }
        match kind {
            0 => Ok(NativeScript::ScriptPubkey(d.decode()?)),
            1 => Ok(NativeScript::ScriptAll(decode_set(d)?)),
            2 => Ok(NativeScript::ScriptAny(decode_set(d)?)),
            3 => {
                let n = d.u32()?;
                Ok(NativeScript::ScriptNOfK {
                    n,
                    scripts: decode_set(d)?,
                })
            }
            4 => Ok(NativeScript::TimelockStart(d.decode()?)),
            5 => Ok(NativeScript::TimelockExpiry(d.decode()?)),
            other => Err(decode::Error::message(format!(
                "unknown native script kind {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Plutus scripts
// ---------------------------------------------------------------------------

/// Plutus language version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Language {
    PlutusV1,
    PlutusV2,
    PlutusV3,
}

impl Language {
    /// Key under which the language's cost model is stored.
    pub fn kind(&self) -> u8 {
        match self {
            Language::PlutusV1 => 0,
            Language::PlutusV2 => 1,
            Language::PlutusV3 => 2,
        }
    }

    pub fn from_kind(kind: u8) -> Option<Self> {
        match kind {
            0 => Some(Language::PlutusV1),
            1 => Some(Language::PlutusV2),
            2 => Some(Language::PlutusV3),
            _ => None,
        }
    }

    /// Hash namespace: one past the cost-model key.
    fn namespace(&self) -> u8 {
        self.kind() + 1
    }
}

impl Encode<()> for Language {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.u8(self.kind())?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Language {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        let kind = d.u8()?;
        Language::from_kind(kind)
            .ok_or_else(|| decode::Error::message(format!("unknown plutus language {kind}")))
    }
}

/// Compiled Plutus script bytes tagged with their language. On the wire
/// the language is implied by where the script sits, so CBOR impls cover
/// only the bytes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlutusScript {
    language: Language,
    bytes: Vec<u8>,
}

impl PlutusScript {
    pub fn new(language: Language, bytes: Vec<u8>) -> Self {
        Self { language, bytes }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn hash(&self) -> ScriptHash {
        ScriptHash::from_raw(blake2b224_prefixed(self.language.namespace(), &self.bytes))
    }

    pub(crate) fn encode_bytes<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
    ) -> Result<(), encode::Error<W::Error>> {
        e.bytes(&self.bytes)?;
        Ok(())
    }

    pub(crate) fn decode_as(d: &mut Decoder<'_>, language: Language) -> Result<Self, decode::Error> {
        Ok(Self::new(language, decode_bytes(d)?))
    }
}

// ---------------------------------------------------------------------------
// Script (reference scripts)
// ---------------------------------------------------------------------------

/// Any script, as carried by an output's reference-script field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Script {
    Native(NativeScript),
    Plutus(PlutusScript),
}

impl Script {
    pub fn hash(&self) -> ScriptHash {
        match self {
            Script::Native(s) => s.hash(),
            Script::Plutus(s) => s.hash(),
        }
    }

    pub fn language(&self) -> Option<Language> {
        match self {
            Script::Native(_) => None,
            Script::Plutus(s) => Some(s.language()),
        }
    }
}

impl Encode<()> for Script {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?;
        match self {
            Script::Native(s) => {
                e.u8(0)?.encode(s)?;
            }
            Script::Plutus(s) => {
                e.u8(s.language().namespace())?;
                s.encode_bytes(e)?;
            }
        }
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Script {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        expect_array(d, 2, "script")?;
        match d.u8()? {
            0 => Ok(Script::Native(d.decode()?)),
            n @ 1..=3 => {
                let language = Language::from_kind(n - 1)
                    .ok_or_else(|| decode::Error::message("unknown script language"))?;
                Ok(Script::Plutus(PlutusScript::decode_as(d, language)?))
            }
            other => Err(decode::Error::message(format!("unknown script kind {other}"))),
        }
    }
}
