//! # Ledger Hashes
//!
//! Everything the body commits to by hash: the body itself (the
//! transaction id), auxiliary data, datums, and the script-data hash that
//! pins redeemers, datums and cost models.
//!
//! All of these are Blake2b-256 over the CBOR *as we encode it*, which
//! means map fields hash in insertion order. Don't sort anything here.

use crate::codec::CborEncoding;
use crate::crypto::{
    blake2b256, AuxiliaryDataHash, DatumHash, ScriptDataHash, TransactionHash,
};
use crate::ledger::{AuxiliaryData, Costmdls, Language, PlutusData, PlutusList, Redeemers, TransactionBody};

pub fn hash_transaction(body: &TransactionBody) -> TransactionHash {
    TransactionHash::from_raw(blake2b256(&body.to_bytes()))
}

pub fn hash_auxiliary_data(aux: &AuxiliaryData) -> AuxiliaryDataHash {
    AuxiliaryDataHash::from_raw(blake2b256(&aux.to_bytes()))
}

pub fn hash_plutus_data(data: &PlutusData) -> DatumHash {
    DatumHash::from_raw(blake2b256(&data.to_bytes()))
}

/// Script-data hash over `redeemers`, the language views of `cost_models`
/// and, when present, `datums`.
///
/// A transaction with datums but no redeemers (it only *creates* outputs
/// locked by scripts) hashes the fixed form `0x80 ‖ datums ‖ 0xa0`: an
/// empty redeemer array, the datums, an empty cost model map.
pub fn hash_script_data(
    redeemers: &Redeemers,
    cost_models: &Costmdls,
    datums: Option<&PlutusList>,
) -> ScriptDataHash {
    let mut preimage = Vec::new();
    let datums = datums.filter(|d| !d.is_empty());
    if redeemers.is_empty() && datums.is_some() {
        preimage.push(0x80);
        if let Some(d) = datums {
            preimage.extend(d.to_bytes());
        }
        preimage.push(0xa0);
    } else {
        preimage.extend(redeemers.to_bytes());
        if let Some(d) = datums {
            preimage.extend(d.to_bytes());
        }
        preimage.extend(cost_models.language_views_encoding());
    }
    ScriptDataHash::from_raw(blake2b256(&preimage))
}

/// [`hash_script_data`] with the cost models trimmed to `used_languages`.
/// `None` when there is nothing to commit to.
pub fn calc_script_data_hash(
    redeemers: &Redeemers,
    datums: Option<&PlutusList>,
    cost_models: &Costmdls,
    used_languages: &[Language],
) -> Option<ScriptDataHash> {
    let has_datums = datums.is_some_and(|d| !d.is_empty());
    if redeemers.is_empty() && !has_datums {
        return None;
    }
    let relevant = cost_models.retain_languages(used_languages);
    Some(hash_script_data(redeemers, &relevant, datums))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{CostModel, ExUnits, Redeemer, RedeemerTag};
    use crate::value::BigNum;

    fn one_redeemer() -> Redeemers {
        Redeemers::from(vec![Redeemer::new(
            RedeemerTag::Spend,
            BigNum::zero(),
            PlutusData::unit(),
            ExUnits::new(100, 200),
        )])
    }

    fn models() -> Costmdls {
        let mut m = Costmdls::new();
        m.insert(Language::PlutusV1, CostModel(vec![1, 2, 3]));
        m.insert(Language::PlutusV2, CostModel(vec![4, 5, 6]));
        m
    }

    #[test]
    fn test_no_plutus_means_no_hash() {
        assert!(calc_script_data_hash(&Redeemers::new(), None, &models(), &[]).is_none());
        let empty = PlutusList::new();
        assert!(calc_script_data_hash(&Redeemers::new(), Some(&empty), &models(), &[]).is_none());
    }

    #[test]
    fn test_datums_only_preimage() {
        let datums = PlutusList::from(vec![PlutusData::new_bytes(vec![1])]);
        let mut preimage = vec![0x80];
        preimage.extend(datums.to_bytes());
        preimage.push(0xa0);
        assert_eq!(
            calc_script_data_hash(&Redeemers::new(), Some(&datums), &models(), &[]),
            Some(ScriptDataHash::from_raw(blake2b256(&preimage)))
        );
    }

    #[test]
    fn test_only_used_languages_are_committed() {
        let redeemers = one_redeemer();
        let v2_only = calc_script_data_hash(&redeemers, None, &models(), &[Language::PlutusV2]);
        let both = calc_script_data_hash(
            &redeemers,
            None,
            &models(),
            &[Language::PlutusV1, Language::PlutusV2],
        );
        assert_ne!(v2_only, both);

        let mut only_v2_models = Costmdls::new();
        only_v2_models.insert(Language::PlutusV2, CostModel(vec![4, 5, 6]));
        assert_eq!(
            v2_only,
            Some(hash_script_data(&redeemers, &only_v2_models, None))
        );
    }

    #[test]
    fn test_datum_hash_matches_cbor() {
        let data = PlutusData::new_integer(crate::value::Int::new_i32(42));
        assert_eq!(
            hash_plutus_data(&data),
            DatumHash::from_raw(blake2b256(&data.to_bytes()))
        );
    }
}
