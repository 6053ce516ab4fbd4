//! # Build Requests
//!
//! The JSON a caller hands to `txforge build`, and the code that turns it
//! into a transaction:
//!
//! ```json
//! {
//!   "utxos": ["<hash>#0|addr_test1...:25000000", "<utxo cbor hex>"],
//!   "outputs": [{ "address": "addr_test1...", "lovelace": 5000000 }],
//!   "change_address": "addr_test1...",
//!   "delegation": { "stake_credential_hex": "<28-byte key hash>", "pool": "pool1..." },
//!   "message": "thanks for the coffee",
//!   "ttl": 123456789,
//!   "strategy": "random_improve"
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use txforge::address::{Address, Credential};
use txforge::builders::{SingleCertificateBuilder, TransactionBuilder, TransactionBuilderConfig, TransactionOutputBuilder};
use txforge::codec::CborEncoding;
use txforge::config::ProtocolParams;
use txforge::connector::parse_utxo;
use txforge::fees::{self, LinearFee};
use txforge::crypto::{Ed25519KeyHash, PoolKeyHash};
use txforge::ledger::{AuxiliaryData, Certificate, Transaction};
use txforge::selection::CoinSelectionStrategyCIP2;
use txforge::value::BigNum;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildRequest {
    /// Hint strings or CBOR hex.
    pub utxos: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<OutputRequest>,
    pub change_address: String,
    #[serde(default)]
    pub delegation: Option<DelegationRequest>,
    /// Attached as a CIP-20 message.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default = "default_strategy")]
    pub strategy: CoinSelectionStrategyCIP2,
}

fn default_strategy() -> CoinSelectionStrategyCIP2 {
    CoinSelectionStrategyCIP2::LargestFirst
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputRequest {
    pub address: String,
    pub lovelace: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelegationRequest {
    pub stake_credential_hex: String,
    /// Bech32 `pool1...` or hex.
    pub pool: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BuildResponse {
    pub tx_hex: String,
    pub tx_hash: String,
    pub fee: u64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MinFeeResponse {
    pub linear: u64,
    pub script: u64,
    pub total: u64,
}

/// Mainnet defaults, or the parameters in `path`.
pub fn load_params(path: Option<&Path>) -> Result<ProtocolParams> {
    let Some(path) = path else {
        return Ok(ProtocolParams::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read protocol parameters from {}", path.display()))?;
    ProtocolParams::from_json(&json)
        .with_context(|| format!("invalid protocol parameters in {}", path.display()))
}

pub fn load_request(path: &Path) -> Result<BuildRequest> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read build request from {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("invalid build request in {}", path.display()))
}

pub fn build(request: &BuildRequest, params: &ProtocolParams) -> Result<BuildResponse> {
    let mut builder = TransactionBuilder::new(TransactionBuilderConfig::from(params));

    for (i, utxo) in request.utxos.iter().enumerate() {
        builder.add_utxo(parse_utxo(utxo).with_context(|| format!("utxos[{i}]"))?);
    }

    for (i, output) in request.outputs.iter().enumerate() {
        let address: Address = output
            .address
            .parse()
            .with_context(|| format!("outputs[{i}].address"))?;
        let result = TransactionOutputBuilder::new()
            .with_address(address)
            .next()?
            .with_coin(BigNum::new(output.lovelace))
            .build()?;
        builder
            .add_output(result)
            .with_context(|| format!("outputs[{i}]"))?;
    }

    if let Some(delegation) = &request.delegation {
        let stake = Ed25519KeyHash::from_hex(&delegation.stake_credential_hex)
            .context("delegation.stake_credential_hex")?;
        let pool = parse_pool(&delegation.pool).context("delegation.pool")?;
        let cert = Certificate::StakeDelegation {
            stake_credential: Credential::from_keyhash(&stake),
            pool_keyhash: pool,
        };
        builder.add_cert(SingleCertificateBuilder::new(cert).payment_key()?);
    }

    if let Some(message) = &request.message {
        builder.set_auxiliary_data(AuxiliaryData::with_message(&[message])?);
    }
    if let Some(ttl) = request.ttl {
        builder.set_ttl(BigNum::new(ttl));
    }

    builder
        .select_utxos(request.strategy)
        .with_context(|| format!("coin selection ({})", request.strategy))?;

    let change: Address = request.change_address.parse().context("change_address")?;
    let signed = builder.build(&change)?;
    let fee = signed.body().fee;
    let tx_hash = signed.body().hash();
    let tx = signed.build_unchecked();

    tracing::info!(%tx_hash, %fee, "transaction built");
    Ok(BuildResponse {
        tx_hex: tx.to_hex(),
        tx_hash: tx_hash.to_hex(),
        fee: fee.as_u64(),
    })
}

/// Minimum fee of a transaction as submitted. The size term is charged on
/// the bytes given, not on a re-encoding, since a node prices what it
/// receives.
pub fn min_fee(tx_hex: &str, params: &ProtocolParams) -> Result<MinFeeResponse> {
    let bytes = hex::decode(tx_hex.trim()).context("transaction is not hex")?;
    let tx = Transaction::from_bytes(&bytes).context("not a transaction")?;
    let linear = LinearFee::from(params).fee_for_size(bytes.len())?;
    let script = fees::min_script_fee(&tx, &params.ex_unit_prices())?;
    let total = linear.checked_add(&script)?;
    tracing::debug!(tx_hash = %tx.hash(), size = bytes.len(), %total, "computed minimum fee");
    Ok(MinFeeResponse {
        linear: linear.as_u64(),
        script: script.as_u64(),
        total: total.as_u64(),
    })
}

fn parse_pool(s: &str) -> Result<PoolKeyHash> {
    let s = s.trim();
    if s.starts_with("pool1") {
        Ok(PoolKeyHash::from_bech32(s)?)
    } else {
        Ok(PoolKeyHash::from_hex(s)?)
    }
}
