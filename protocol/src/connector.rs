//! # Wallet Connector Glue
//!
//! txforge never talks to a wallet itself. Whatever sits between the
//! library and the user's keys (a browser extension, a hardware device, a
//! file on disk) implements [`WalletConnector`], and the functions here
//! turn what it hands back into builder inputs and signed transactions.
//!
//! Everything crossing the boundary is CBOR hex, the way dApp wallets
//! speak:
//!
//! ```text
//! get_utxos()          -> ["<utxo cbor hex>", ...]
//! get_change_address() -> "<address>"
//! sign_tx(tx_hex)      -> "<witness set cbor hex>"
//! ```
//!
//! The signed transaction is then spliced together with
//! [`assemble_signed_tx`], which keeps the body bytes exactly as the
//! wallet saw them so the signatures stay valid.

use tracing::{debug, warn};

use crate::address::{Address, Credential};
use crate::builders::{
    BuilderError, RedeemerWitnessKey, SignedTxBuilder, SingleCertificateBuilder,
    TransactionBuilder, TransactionBuilderConfig, TransactionWitnessSetBuilder,
};
use crate::codec::CborEncoding;
use crate::crypto::{make_vkey_witness, PoolKeyHash, PrivateKey, Vkeywitness};
use crate::error::{DeserializeError, Result, TxForgeError};
use crate::ledger::{
    Certificate, ExUnits, RawTransaction, RedeemerTag, TransactionUnspentOutput,
    TransactionWitnessSet,
};
use crate::selection::CoinSelectionStrategyCIP2;

// ---------------------------------------------------------------------------
// The connector contract
// ---------------------------------------------------------------------------

/// What a wallet must offer for txforge to build and sign on its behalf.
pub trait WalletConnector {
    /// Spendable UTXOs, CBOR hex each.
    fn get_utxos(&self) -> Result<Vec<String>>;

    fn get_change_address(&self) -> Result<String>;

    fn get_used_addresses(&self) -> Result<Vec<String>>;

    /// Sign `tx_hex` and return only the witnesses the wallet added.
    fn sign_tx(&self, tx_hex: &str) -> Result<String>;
}

/// An in-memory wallet: fixed UTXOs and a set of keys that sign whatever
/// they are handed. Used by the CLI and in tests.
pub struct StaticWallet {
    utxos: Vec<TransactionUnspentOutput>,
    change_address: Address,
    keys: Vec<PrivateKey>,
}

impl StaticWallet {
    pub fn new(utxos: Vec<TransactionUnspentOutput>, change_address: Address) -> Self {
        Self {
            utxos,
            change_address,
            keys: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: PrivateKey) -> Self {
        self.keys.push(key);
        self
    }
}

impl WalletConnector for StaticWallet {
    fn get_utxos(&self) -> Result<Vec<String>> {
        Ok(self.utxos.iter().map(CborEncoding::to_hex).collect())
    }

    fn get_change_address(&self) -> Result<String> {
        Ok(self.change_address.to_text()?)
    }

    fn get_used_addresses(&self) -> Result<Vec<String>> {
        let mut used: Vec<&Address> = self.utxos.iter().map(|u| &u.output.address).collect();
        used.sort();
        used.dedup();
        used.into_iter()
            .map(|a| a.to_text().map_err(TxForgeError::from))
            .collect()
    }

    fn sign_tx(&self, tx_hex: &str) -> Result<String> {
        if self.keys.is_empty() {
            return Err(TxForgeError::Wallet("no signing keys loaded".into()));
        }
        let bytes = hex::decode(tx_hex.trim()).map_err(DeserializeError::from)?;
        let raw = RawTransaction::split(&bytes)?;
        let tx_hash = raw.body_hash();
        let witness_set = TransactionWitnessSet {
            vkeywitnesses: self
                .keys
                .iter()
                .map(|k| make_vkey_witness(&tx_hash, k))
                .collect(),
            ..Default::default()
        };
        debug!(%tx_hash, signatures = self.keys.len(), "wallet signed transaction");
        Ok(witness_set.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Inbound parsing
// ---------------------------------------------------------------------------

/// A UTXO as a wallet reports it: CBOR hex, or the hint form
/// `"<tx hash>#<index>|<address>:<lovelace>"`.
pub fn parse_utxo(s: &str) -> std::result::Result<TransactionUnspentOutput, DeserializeError> {
    let s = s.trim();
    if s.contains('|') {
        TransactionUnspentOutput::from_hint(s)
    } else {
        TransactionUnspentOutput::from_hex(s)
    }
}

/// Pull a wallet's UTXOs and change address.
pub fn wallet_inputs<W: WalletConnector + ?Sized>(
    wallet: &W,
) -> Result<(Vec<TransactionUnspentOutput>, Address)> {
    let utxos = wallet
        .get_utxos()?
        .iter()
        .map(|s| parse_utxo(s))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let change: Address = wallet.get_change_address()?.parse()?;
    Ok((utxos, change))
}

// ---------------------------------------------------------------------------
// Witness merging
// ---------------------------------------------------------------------------

/// Combine loose vkey witnesses (CBOR hex each) into one witness set.
/// Duplicates collapse.
pub fn assemble_witness_set<S: AsRef<str>>(
    vkey_witnesses: &[S],
) -> std::result::Result<TransactionWitnessSet, DeserializeError> {
    let mut builder = TransactionWitnessSetBuilder::new();
    for hex in vkey_witnesses {
        builder.add_vkey(Vkeywitness::from_hex(hex.as_ref())?);
    }
    Ok(builder.build())
}

/// Fold a wallet's witness set into `tx_hex`. Scripts, datums and
/// redeemers already in the transaction are kept; body and auxiliary data
/// bytes are not re-encoded.
pub fn assemble_signed_tx(
    tx_hex: &str,
    witness_set_hex: &str,
) -> std::result::Result<String, DeserializeError> {
    let bytes = hex::decode(tx_hex.trim())?;
    let raw = RawTransaction::split(&bytes)?;
    let existing = TransactionWitnessSet::from_bytes(raw.witness_set)?;
    let added = TransactionWitnessSet::from_hex(witness_set_hex)?;

    let mut merged = TransactionWitnessSetBuilder::new();
    merged.add_existing(&existing);
    merged.add_existing(&added);
    let witness_set = merged.build();
    debug!(
        tx_hash = %raw.body_hash(),
        vkeys = witness_set.vkeywitnesses.len(),
        "assembled signed transaction"
    );
    Ok(hex::encode(raw.with_witness_set(&witness_set)))
}

// ---------------------------------------------------------------------------
// Delegation
// ---------------------------------------------------------------------------

/// Delegate `stake_credential` to `pool`, funding the fee from `utxos` and
/// returning the rest to `change_address`. The credential must already be
/// registered.
pub fn delegation_tx(
    utxos: &[TransactionUnspentOutput],
    stake_credential: Credential,
    pool: PoolKeyHash,
    change_address: &Address,
    config: TransactionBuilderConfig,
    strategy: CoinSelectionStrategyCIP2,
) -> std::result::Result<SignedTxBuilder, BuilderError> {
    let mut builder = TransactionBuilder::new(config);
    for utxo in utxos {
        builder.add_utxo(utxo.clone());
    }
    builder.add_cert(
        SingleCertificateBuilder::new(Certificate::StakeDelegation {
            stake_credential,
            pool_keyhash: pool,
        })
        .payment_key()?,
    );
    builder.select_utxos(strategy)?;
    debug!(%pool, utxos = utxos.len(), %strategy, "building delegation");
    builder.build(change_address)
}

// ---------------------------------------------------------------------------
// Evaluator results
// ---------------------------------------------------------------------------

/// Parse an evaluator's budget report:
///
/// ```json
/// { "spend:0": { "memory": 1700, "steps": 476468 }, "mint:0": { ... } }
/// ```
///
/// `cpu` is accepted for `steps`, and `certificate` / `withdrawal` for
/// `cert` / `reward`.
pub fn parse_evaluation(
    json: &str,
) -> std::result::Result<Vec<(RedeemerWitnessKey, ExUnits)>, DeserializeError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let entries = value
        .as_object()
        .ok_or_else(|| DeserializeError::MalformedJson("evaluation result must be an object".into()))?;

    let mut budgets = Vec::with_capacity(entries.len());
    for (key, units) in entries {
        let (tag, index) = key.split_once(':').ok_or_else(|| {
            DeserializeError::MalformedJson(format!("redeemer key {key:?} is not purpose:index"))
        })?;
        let tag: RedeemerTag = tag.parse()?;
        let index: u64 = index
            .parse()
            .map_err(|_| DeserializeError::InvalidNumber(index.to_string()))?;
        let field = |names: &[&str]| {
            names
                .iter()
                .find_map(|n| units.get(*n).and_then(serde_json::Value::as_u64))
                .ok_or_else(|| {
                    DeserializeError::MalformedJson(format!("{key}: missing {}", names[0]))
                })
        };
        budgets.push((
            RedeemerWitnessKey::new(tag, index),
            ExUnits::new(field(&["memory", "mem"])?, field(&["steps", "cpu"])?),
        ));
    }
    Ok(budgets)
}

/// Feed evaluator budgets into `builder`. Returns how many matched a
/// script-witnessed item.
pub fn apply_evaluation(builder: &mut TransactionBuilder, budgets: &[(RedeemerWitnessKey, ExUnits)]) -> usize {
    let applied = budgets
        .iter()
        .filter(|(key, units)| builder.set_exunits(*key, *units))
        .count();
    if applied < budgets.len() {
        warn!(applied, reported = budgets.len(), "some evaluator budgets matched nothing");
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::EnterpriseAddress;
    use crate::config::ProtocolParams;
    use crate::crypto::{Ed25519KeyHash, TransactionHash};
    use crate::ledger::{Transaction, TransactionInput, TransactionOutput};
    use crate::value::{BigNum, Value};

    fn key() -> PrivateKey {
        PrivateKey::from_seed(&[21; 32])
    }

    fn address() -> Address {
        Address::Enterprise(EnterpriseAddress {
            network: 0,
            payment: Credential::from_keyhash(&key().to_public().hash()),
        })
    }

    fn wallet() -> StaticWallet {
        let utxo = TransactionUnspentOutput::new(
            TransactionInput::new(TransactionHash::from_raw([4; 32]), 2),
            TransactionOutput::new(address(), Value::new(BigNum::new(25_000_000))),
        );
        StaticWallet::new(vec![utxo], address()).with_key(key())
    }

    #[test]
    fn test_parse_utxo_accepts_both_forms() {
        let utxo = wallet().utxos[0].clone();
        assert_eq!(parse_utxo(&utxo.to_hex()).unwrap(), utxo);
        assert_eq!(parse_utxo(&utxo.to_hint().unwrap()).unwrap(), utxo);
    }

    #[test]
    fn test_delegation_round_trip_through_wallet() {
        let wallet = wallet();
        let (utxos, change) = wallet_inputs(&wallet).unwrap();
        let signed = delegation_tx(
            &utxos,
            Credential::from_keyhash(&key().to_public().hash()),
            PoolKeyHash::from_raw([9; 28]),
            &change,
            TransactionBuilderConfig::from(&ProtocolParams::default()),
            CoinSelectionStrategyCIP2::LargestFirst,
        )
        .unwrap();
        let body_hash = signed.body().hash();
        let unsigned_hex = signed.build_unchecked().to_hex();

        let witness_hex = wallet.sign_tx(&unsigned_hex).unwrap();
        let signed_hex = assemble_signed_tx(&unsigned_hex, &witness_hex).unwrap();
        let tx = Transaction::from_hex(&signed_hex).unwrap();

        assert_eq!(tx.hash(), body_hash);
        assert_eq!(tx.witness_set.vkeywitnesses.len(), 1);
        let w = &tx.witness_set.vkeywitnesses[0];
        assert!(w.vkey.verify(body_hash.as_bytes(), &w.signature));
    }

    #[test]
    fn test_assemble_witness_set_dedups() {
        let w = make_vkey_witness(&TransactionHash::from_raw([1; 32]), &key()).to_hex();
        let ws = assemble_witness_set(&[w.clone(), w]).unwrap();
        assert_eq!(ws.vkeywitnesses.len(), 1);
    }

    #[test]
    fn test_wallet_without_keys_refuses() {
        let wallet = StaticWallet::new(vec![], address());
        assert!(matches!(wallet.sign_tx("80"), Err(TxForgeError::Wallet(_))));
    }

    #[test]
    fn test_parse_evaluation() {
        let json = r#"{
            "spend:1": { "memory": 1700, "steps": 476468 },
            "certificate:0": { "mem": 10, "cpu": 20 }
        }"#;
        let mut budgets = parse_evaluation(json).unwrap();
        budgets.sort_by_key(|(key, _)| *key);
        assert_eq!(
            budgets,
            vec![
                (RedeemerWitnessKey::new(RedeemerTag::Spend, 1), ExUnits::new(1700, 476_468)),
                (RedeemerWitnessKey::new(RedeemerTag::Cert, 0), ExUnits::new(10, 20)),
            ]
        );

        assert!(parse_evaluation(r#"{"vote:0": {"memory": 1, "steps": 1}}"#).is_err());
        assert!(parse_evaluation(r#"{"spend:0": {"memory": 1}}"#).is_err());
    }

    #[test]
    fn test_used_addresses_are_deduplicated() {
        let other = Address::Enterprise(EnterpriseAddress {
            network: 0,
            payment: Credential::from_keyhash(&Ed25519KeyHash::from_raw([3; 28])),
        });
        let utxos = (0..3)
            .map(|i| {
                TransactionUnspentOutput::new(
                    TransactionInput::new(TransactionHash::from_raw([i; 32]), 0),
                    TransactionOutput::new(
                        if i == 1 { other.clone() } else { address() },
                        Value::new(BigNum::new(2_000_000)),
                    ),
                )
            })
            .collect();
        let wallet = StaticWallet::new(utxos, address());
        assert_eq!(wallet.get_used_addresses().unwrap().len(), 2);
    }
}
