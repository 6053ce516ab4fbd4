//! # Protocol Configuration & Constants
//!
//! Every magic number txforge knows about the ledger lives here. If you're
//! hardcoding a lovelace amount somewhere else, you're doing it wrong.
//!
//! The constants are mainnet values at the time of writing. They change by
//! on-chain governance, not by release, so anything that actually builds a
//! transaction takes a [`ProtocolParams`] (which defaults to these numbers
//! but can be loaded from JSON) instead of reading the constants directly.

use serde::{Deserialize, Serialize};

use crate::ledger::{Costmdls, ExUnitPrices, ExUnits, UnitInterval};

// ---------------------------------------------------------------------------
// Networks
// ---------------------------------------------------------------------------

/// Network id carried in Shelley address headers and the body's network
/// id field.
pub const NETWORK_ID_MAINNET: u8 = 1;

/// Every test network (preview, preprod, sanchonet) shares id 0.
pub const NETWORK_ID_TESTNET: u8 = 0;

/// Bech32 prefixes. Testnets get the `_test` suffix.
pub const ADDR_HRP: &str = "addr";
pub const ADDR_TEST_HRP: &str = "addr_test";
pub const STAKE_HRP: &str = "stake";
pub const STAKE_TEST_HRP: &str = "stake_test";
pub const POOL_HRP: &str = "pool";

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

/// Lovelace per byte of serialized transaction (`minFeeA`).
pub const MIN_FEE_COEFFICIENT: u64 = 44;

/// Flat lovelace per transaction (`minFeeB`).
pub const MIN_FEE_CONSTANT: u64 = 155_381;

/// Memory unit price, 577 / 10 000 lovelace.
pub const PRICE_MEM: (u64, u64) = (577, 10_000);

/// CPU step price, 721 / 10 000 000 lovelace.
pub const PRICE_STEP: (u64, u64) = (721, 10_000_000);

/// Per-transaction execution budget.
pub const MAX_TX_EX_MEM: u64 = 14_000_000;
pub const MAX_TX_EX_STEPS: u64 = 10_000_000_000;

/// Fee placeholder used while estimating: large enough that the fee field
/// can only shrink once the real fee is known.
pub const FEE_ESTIMATION_PLACEHOLDER: u64 = 0x1_0000_0000;

// ---------------------------------------------------------------------------
// Deposits
// ---------------------------------------------------------------------------

/// Stake key registration deposit, refunded on deregistration.
pub const KEY_DEPOSIT: u64 = 2_000_000;

/// Stake pool registration deposit.
pub const POOL_DEPOSIT: u64 = 500_000_000;

// ---------------------------------------------------------------------------
// Output minimum ADA
// ---------------------------------------------------------------------------

/// Babbage-era `coinsPerUTxOByte`.
pub const COINS_PER_UTXO_BYTE: u64 = 4_310;

/// Alonzo-era `coinsPerUTxOWord`, kept for the compatibility formula.
pub const COINS_PER_UTXO_WORD: u64 = 34_482;

/// Bytes of ledger bookkeeping charged on top of an output's own CBOR size.
pub const MIN_ADA_OVERHEAD_BYTES: u64 = 160;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

pub const MAX_VALUE_SIZE: u32 = 5_000;
pub const MAX_TX_SIZE: u32 = 16_384;
pub const COLLATERAL_PERCENTAGE: u32 = 150;
pub const MAX_COLLATERAL_INPUTS: u32 = 3;

/// Metadatum byte strings and text are capped at this many bytes.
pub const MAX_METADATUM_CHUNK: usize = 64;

/// CIP-20 transaction message label.
pub const CIP20_MESSAGE_LABEL: u64 = 674;

// ---------------------------------------------------------------------------
// ProtocolParams
// ---------------------------------------------------------------------------

/// The subset of protocol parameters transaction building depends on.
///
/// `Default` is mainnet. Every field can be overridden from JSON; missing
/// fields keep their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParams {
    pub min_fee_a: u64,
    pub min_fee_b: u64,
    pub key_deposit: u64,
    pub pool_deposit: u64,
    pub coins_per_utxo_byte: u64,
    /// Only consulted by the compatibility minimum-ADA formula.
    pub coins_per_utxo_word: Option<u64>,
    pub max_value_size: u32,
    pub max_tx_size: u32,
    pub price_mem: UnitInterval,
    pub price_step: UnitInterval,
    pub max_tx_ex_units: ExUnits,
    pub collateral_percentage: u32,
    pub max_collateral_inputs: u32,
    pub cost_models: Costmdls,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            min_fee_a: MIN_FEE_COEFFICIENT,
            min_fee_b: MIN_FEE_CONSTANT,
            key_deposit: KEY_DEPOSIT,
            pool_deposit: POOL_DEPOSIT,
            coins_per_utxo_byte: COINS_PER_UTXO_BYTE,
            coins_per_utxo_word: Some(COINS_PER_UTXO_WORD),
            max_value_size: MAX_VALUE_SIZE,
            max_tx_size: MAX_TX_SIZE,
            price_mem: UnitInterval::new(PRICE_MEM.0, PRICE_MEM.1),
            price_step: UnitInterval::new(PRICE_STEP.0, PRICE_STEP.1),
            max_tx_ex_units: ExUnits::new(MAX_TX_EX_MEM, MAX_TX_EX_STEPS),
            collateral_percentage: COLLATERAL_PERCENTAGE,
            max_collateral_inputs: MAX_COLLATERAL_INPUTS,
            cost_models: Costmdls::new(),
        }
    }
}

impl ProtocolParams {
    pub fn ex_unit_prices(&self) -> ExUnitPrices {
        ExUnitPrices::new(self.price_mem, self.price_step)
    }

    pub fn from_json(json: &str) -> Result<Self, crate::error::DeserializeError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Bech32 prefix for payment addresses on `network_id`.
pub fn address_hrp(network_id: u8) -> &'static str {
    if network_id == NETWORK_ID_MAINNET {
        ADDR_HRP
    } else {
        ADDR_TEST_HRP
    }
}

/// Friendly network name, mainly for logging.
pub fn network_name(network_id: u8) -> String {
    match network_id {
        NETWORK_ID_MAINNET => "mainnet".to_string(),
        NETWORK_ID_TESTNET => "testnet".to_string(),
        other => format!("unknown({other})"),
    }
}
