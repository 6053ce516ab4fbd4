//! The witness set: signatures, scripts, datums and redeemers.

use minicbor::{decode, encode, Decode, Decoder, Encode, Encoder};

use super::plutus_data::PlutusList;
use super::redeemer::Redeemers;
use super::script::{Language, NativeScript, PlutusScript};
use crate::codec::{decode_set, encode_array, skip_set_tag};
use crate::crypto::{BootstrapWitness, Vkeywitness};

/// Witness-set map key for each Plutus language's script list.
fn plutus_key(language: Language) -> u8 {
    match language {
        Language::PlutusV1 => 3,
        Language::PlutusV2 => 6,
        Language::PlutusV3 => 7,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionWitnessSet {
    pub vkeywitnesses: Vec<Vkeywitness>,
    pub native_scripts: Vec<NativeScript>,
    pub bootstraps: Vec<BootstrapWitness>,
    /// All languages together; split by language on the wire.
    pub plutus_scripts: Vec<PlutusScript>,
    pub plutus_data: Option<PlutusList>,
    pub redeemers: Option<Redeemers>,
}

impl TransactionWitnessSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.field_count() == 0
    }

    fn plutus_group(&self, language: Language) -> Vec<&PlutusScript> {
        self.plutus_scripts
            .iter()
            .filter(|s| s.language() == language)
            .collect()
    }

    fn field_count(&self) -> u64 {
        let languages = [Language::PlutusV1, Language::PlutusV2, Language::PlutusV3];
        u64::from(!self.vkeywitnesses.is_empty())
            + u64::from(!self.native_scripts.is_empty())
            + u64::from(!self.bootstraps.is_empty())
            + u64::from(self.plutus_data.as_ref().is_some_and(|d| !d.is_empty()))
            + u64::from(self.redeemers.as_ref().is_some_and(|r| !r.is_empty()))
            + languages
                .iter()
                .filter(|l| !self.plutus_group(**l).is_empty())
                .count() as u64
    }
}

impl Encode<()> for TransactionWitnessSet {
    fn encode<W: encode::Write>(
        &self,
        e: &mut Encoder<W>,
        _ctx: &mut (),
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(self.field_count())?;
        if !self.vkeywitnesses.is_empty() {
            e.u8(0)?;
            encode_array(e, &self.vkeywitnesses)?;
        }
        if !self.native_scripts.is_empty() {
            e.u8(1)?;
            encode_array(e, &self.native_scripts)?;
        }
        if !self.bootstraps.is_empty() {
            e.u8(2)?;
            encode_array(e, &self.bootstraps)?;
        }
        let write_group = |e: &mut Encoder<W>, language| -> Result<(), encode::Error<W::Error>> {
            let group = self.plutus_group(language);
            if !group.is_empty() {
                e.u8(plutus_key(language))?.array(group.len() as u64)?;
                for script in group {
                    script.encode_bytes(e)?;
                }
            }
            Ok(())
        };
        write_group(e, Language::PlutusV1)?;
        if let Some(data) = self.plutus_data.as_ref().filter(|d| !d.is_empty()) {
            e.u8(4)?.encode(data)?;
        }
        if let Some(redeemers) = self.redeemers.as_ref().filter(|r| !r.is_empty()) {
            e.u8(5)?.encode(redeemers)?;
        }
        write_group(e, Language::PlutusV2)?;
        write_group(e, Language::PlutusV3)?;
        Ok(())
    }
}

impl<'b> Decode<'b, ()> for TransactionWitnessSet {
    fn decode(d: &mut Decoder<'b>, _ctx: &mut ()) -> Result<Self, decode::Error> {
        let len = d
            .map()?
            .ok_or_else(|| decode::Error::message("indefinite witness set map"))?;
        let mut ws = TransactionWitnessSet::new();
        for _ in 0..len {
            match d.u8()? {
                0 => ws.vkeywitnesses = decode_set(d)?,
                1 => ws.native_scripts = decode_set(d)?,
                2 => ws.bootstraps = decode_set(d)?,
                4 => {
                    skip_set_tag(d)?;
                    ws.plutus_data = Some(d.decode()?);
                }
                5 => ws.redeemers = Some(d.decode()?),
                key @ (3 | 6 | 7) => {
                    let language = match key {
                        3 => Language::PlutusV1,
                        6 => Language::PlutusV2,
                        _ => Language::PlutusV3,
                    };
                    skip_set_tag(d)?;
                    let n = d
                        .array()?
                        .ok_or_else(|| decode::Error::message("indefinite plutus script list"))?;
                    for _ in 0..n {
                        ws.plutus_scripts.push(PlutusScript::decode_as(d, language)?);
                    }
                }
                other => {
                    return Err(decode::Error::message(format!(
                        "unknown witness set field {other}"
                    )))
                }
            }
        }
        Ok(ws)
    }
}
