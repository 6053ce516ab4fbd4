//! Payment and stake credentials.

use std::fmt;

use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};
use serde::{Deserialize, Serialize};

use crate::codec::expect_array;
use crate::crypto::{Ed25519KeyHash, ScriptHash};

/// Who may spend from (or delegate for) an address: a key or a script.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Credential {
    Key(Ed25519KeyHash),
    Script(ScriptHash),
}

impl Credential {
    pub fn from_keyhash(hash: &Ed25519KeyHash) -> Self {
        Credential::Key(*hash)
    }

    pub fn from_scripthash(hash: &ScriptHash) -> Self {
        Credential::Script(*hash)
    }

    pub fn as_keyhash(&self) -> Option<&Ed25519KeyHash> {
        match self {
            Credential::Key(h) => Some(h),
            Credential::Script(_) => None,
        }
    }

    pub fn as_scripthash(&self) -> Option<&ScriptHash> {
        match self {
            Credential::Script(h) => Some(h),
            Credential::Key(_) => None,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Credential::Script(_))
    }

    /// The 28 hash bytes, whichever kind.
    pub fn hash_bytes(&self) -> &[u8; 28] {
        match self {
            Credential::Key(h) => h.as_bytes(),
            Credential::Script(h) => h.as_bytes(),
        }
    }

    pub(crate) fn from_kind(is_script: bool, bytes: &[u8]) -> Result<Self, crate::error::DeserializeError> {
        if is_script {
            Ok(Credential::Script(ScriptHash::from_raw_bytes(bytes)?))
        } else {
            Ok(Credential::Key(Ed25519KeyHash::from_raw_bytes(bytes)?))
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Key(h) => write!(f, "Key({})", h.to_hex()),
            Credential::Script(h) => write!(f, "Script({})", h.to_hex()),
        }
    }
}

impl Encode<()> for Credential {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(2)?;
        match self {
            Credential::Key(h) => e.u8(0)?.encode(h)?,
            Credential::Script(h) => e.u8(1)?.encode(h)?,
        };
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for Credential {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        expect_array(d, 2, "credential")?;
        match d.u8()? {
            0 => Ok(Credential::Key(d.decode()?)),
            1 => Ok(Credential::Script(d.decode()?)),
            other => Err(decode::Error::message(format!(
                "unknown credential kind {other}"
            ))),
        }
    }
}
