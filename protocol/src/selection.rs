//! # CIP-2 Coin Selection
//!
//! Picks inputs from a pool of UTXOs until the transaction's outputs (plus
//! whatever else it owes: deposits, burns, the fee) are covered.
//!
//! Every selected input makes the transaction bigger and therefore more
//! expensive, so selection doesn't run against a fixed target: each time an
//! input is taken, its marginal fee is added to what's owed. That marginal
//! fee, and the act of adding the input, belong to whoever is building the
//! transaction, behind the [`SelectionHost`] trait.
//!
//! ## Strategies
//!
//! - **LargestFirst**: biggest UTXOs first until covered. Few inputs, no
//!   randomness, and it tends to hoover up your largest coins.
//! - **RandomImprove**: per output, random picks until covered, then a
//!   swap pass nudging each output's inputs towards twice the output
//!   amount (but never past three times it). Leaves useful change behind
//!   and doesn't leak which coins are yours by size.
//! - The `MultiAsset` variants run one pass per native asset first, then
//!   the ADA pass. The plain variants refuse outputs carrying assets.
//!
//! Selection only fails with [`SelectionError::InsufficientInput`] once
//! there is nothing left to pick: an unlucky random draw never fails a
//! selection the pool could have covered.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::crypto::PolicyId;
use crate::ledger::{TransactionInput, TransactionUnspentOutput};
use crate::value::{ArithmeticError, AssetName, BigNum, Coin, Value};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// Even every available UTXO together can't cover the target.
    #[error("UTxO balance insufficient to cover {asset}")]
    InsufficientInput { asset: String },

    /// An ADA-only strategy was asked to fund outputs carrying tokens.
    #[error("outputs carry native assets; use a MultiAsset strategy")]
    NonAdaAssetsInOutput,

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinSelectionStrategyCIP2 {
    LargestFirst,
    RandomImprove,
    LargestFirstMultiAsset,
    RandomImproveMultiAsset,
}

impl CoinSelectionStrategyCIP2 {
    pub fn supports_assets(&self) -> bool {
        matches!(
            self,
            CoinSelectionStrategyCIP2::LargestFirstMultiAsset
                | CoinSelectionStrategyCIP2::RandomImproveMultiAsset
        )
    }
}

impl fmt::Display for CoinSelectionStrategyCIP2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CoinSelectionStrategyCIP2::LargestFirst => "largest-first",
            CoinSelectionStrategyCIP2::RandomImprove => "random-improve",
            CoinSelectionStrategyCIP2::LargestFirstMultiAsset => "largest-first-multi-asset",
            CoinSelectionStrategyCIP2::RandomImproveMultiAsset => "random-improve-multi-asset",
        })
    }
}

impl FromStr for CoinSelectionStrategyCIP2 {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "largest-first" => Ok(CoinSelectionStrategyCIP2::LargestFirst),
            "random-improve" => Ok(CoinSelectionStrategyCIP2::RandomImprove),
            "largest-first-multi-asset" => Ok(CoinSelectionStrategyCIP2::LargestFirstMultiAsset),
            "random-improve-multi-asset" => Ok(CoinSelectionStrategyCIP2::RandomImproveMultiAsset),
            other => Err(format!("unknown coin selection strategy {other:?}")),
        }
    }
}

/// The transaction being funded.
pub trait SelectionHost {
    type Error: From<SelectionError> + From<ArithmeticError>;

    /// What adding `utxo` as an input would add to the fee.
    fn fee_for_input(&self, utxo: &TransactionUnspentOutput) -> Result<Coin, Self::Error>;

    /// Add `utxo` as an input.
    fn add_selected_input(&mut self, utxo: &TransactionUnspentOutput) -> Result<(), Self::Error>;
}

/// What one selection pass measures: lovelace, or one native asset.
type Measure<'m> = &'m dyn Fn(&Value) -> Option<BigNum>;

/// Select inputs from `available` until `input_total` covers
/// `output_total`. `outputs` are the explicit output amounts (used by
/// RandomImprove to size its picks); `output_total` must already include
/// them along with deposits, burns and the current fee.
///
/// Returns the selected inputs in the order they were added to `host`.
pub fn select_inputs<H: SelectionHost, R: Rng + ?Sized>(
    host: &mut H,
    available: &[TransactionUnspentOutput],
    outputs: &[Value],
    strategy: CoinSelectionStrategyCIP2,
    input_total: Value,
    output_total: Value,
    rng: &mut R,
) -> Result<Vec<TransactionInput>, H::Error> {
    if !strategy.supports_assets() && outputs.iter().any(Value::has_assets) {
        return Err(SelectionError::NonAdaAssetsInOutput.into());
    }
    debug!(
        %strategy,
        candidates = available.len(),
        input = %input_total.coin(),
        target = %output_total.coin(),
        "starting coin selection"
    );

    let asset_targets: Vec<(PolicyId, AssetName)> = output_total
        .multiasset()
        .map(|ma| ma.leaves().map(|(p, n, _)| (*p, n.clone())).collect())
        .unwrap_or_default();

    let mut selector = Selector {
        host,
        available,
        remaining: (0..available.len()).collect(),
        selected: Vec::new(),
        input_total,
        output_total,
        rng,
    };
    let lovelace = |v: &Value| Some(v.coin());

    match strategy {
        CoinSelectionStrategyCIP2::LargestFirst => {
            selector.largest_first_by(&lovelace, "lovelace")?;
        }
        CoinSelectionStrategyCIP2::LargestFirstMultiAsset => {
            for (policy, name) in &asset_targets {
                let by = |v: &Value| v.multiasset().map(|ma| ma.get_asset(policy, name));
                selector.largest_first_by(&by, &asset_label(policy, name))?;
            }
            selector.largest_first_by(&lovelace, "lovelace")?;
        }
        CoinSelectionStrategyCIP2::RandomImprove => {
            selector.random_improve_by(&lovelace, outputs, true)?;
            selector.cover_fees()?;
        }
        CoinSelectionStrategyCIP2::RandomImproveMultiAsset => {
            for (policy, name) in &asset_targets {
                let by = |v: &Value| v.multiasset().map(|ma| ma.get_asset(policy, name));
                selector.random_improve_by(&by, outputs, false)?;
                // Demand no explicit output carries (burns, a shortfall
                // after existing inputs) is left for the top-up.
                selector.top_up(&by, &asset_label(policy, name))?;
            }
            selector.random_improve_by(&lovelace, outputs, false)?;
            selector.cover_fees()?;
        }
    }

    let picked: Vec<TransactionInput> = selector
        .selected
        .iter()
        .map(|i| available[*i].input)
        .collect();
    debug!(selected = picked.len(), "coin selection complete");
    Ok(picked)
}

fn asset_label(policy: &PolicyId, name: &AssetName) -> String {
    format!("{}.{}", policy, name.to_hex())
}

struct Selector<'a, H: ?Sized, R: ?Sized> {
    host: &'a mut H,
    available: &'a [TransactionUnspentOutput],
    /// Indices into `available` not selected yet.
    remaining: BTreeSet<usize>,
    selected: Vec<usize>,
    input_total: Value,
    output_total: Value,
    rng: &'a mut R,
}

impl<H: SelectionHost + ?Sized, R: Rng + ?Sized> Selector<'_, H, R> {
    fn covered(&self, by: Measure<'_>) -> bool {
        by(&self.input_total).unwrap_or_default() >= by(&self.output_total).unwrap_or_default()
    }

    fn measure(&self, i: usize, by: Measure<'_>) -> BigNum {
        by(&self.available[i].output.amount).unwrap_or_default()
    }

    fn take(&mut self, i: usize) -> Result<(), H::Error> {
        let available = self.available;
        let utxo = &available[i];
        let fee = self.host.fee_for_input(utxo)?;
        self.host.add_selected_input(utxo)?;
        self.input_total = self.input_total.checked_add(&utxo.output.amount)?;
        self.output_total = self.output_total.checked_add(&Value::new(fee))?;
        self.remaining.remove(&i);
        self.selected.push(i);
        trace!(input = %utxo.input, coin = %utxo.output.amount.coin(), %fee, "selected input");
        Ok(())
    }

    fn relevant(&self, by: Measure<'_>) -> Vec<usize> {
        self.remaining
            .iter()
            .copied()
            .filter(|i| !self.measure(*i, by).is_zero())
            .collect()
    }

    fn largest_first_by(&mut self, by: Measure<'_>, label: &str) -> Result<(), H::Error> {
        let mut candidates = self.relevant(by);
        // Stable: ties keep pool order.
        candidates.sort_by_key(|i| Reverse(self.measure(*i, by)));
        for i in candidates {
            if self.covered(by) {
                break;
            }
            self.take(i)?;
        }
        if self.covered(by) {
            Ok(())
        } else {
            Err(SelectionError::InsufficientInput {
                asset: label.to_string(),
            }
            .into())
        }
    }

    fn random_improve_by(
        &mut self,
        by: Measure<'_>,
        outputs: &[Value],
        improve: bool,
    ) -> Result<(), H::Error> {
        if self.covered(by) {
            return Ok(());
        }
        let mut relevant = self.relevant(by);
        let mut targets: Vec<BigNum> = outputs
            .iter()
            .filter_map(|v| by(v))
            .filter(|amount| !amount.is_zero())
            .collect();
        targets.sort_by_key(|amount| Reverse(*amount));
        let mut associated: Vec<Vec<usize>> = vec![Vec::new(); targets.len()];

        // Phase 1: random picks per output, largest output first.
        'outputs: for (slot, needed) in targets.iter().enumerate() {
            let mut added = BigNum::zero();
            while added < *needed {
                if relevant.is_empty() {
                    break 'outputs;
                }
                let pick = self.rng.gen_range(0..relevant.len());
                let i = relevant.swap_remove(pick);
                added = added.checked_add(&self.measure(i, by))?;
                associated[slot].push(i);
            }
        }

        // Phase 2: swap towards 2x the output, capped at 3x.
        if improve {
            for (slot, needed) in targets.iter().enumerate() {
                let ideal = needed.as_u64() as u128 * 2;
                let max = needed.as_u64() as u128 * 3;
                for chosen in associated[slot].iter_mut() {
                    if relevant.is_empty() {
                        break;
                    }
                    let pick = self.rng.gen_range(0..relevant.len());
                    let current = self.measure(*chosen, by).as_u64() as u128;
                    let candidate = self.measure(relevant[pick], by).as_u64() as u128;
                    if ideal.abs_diff(candidate) < ideal.abs_diff(current) && candidate < max {
                        std::mem::swap(chosen, &mut relevant[pick]);
                    }
                }
            }
        }

        for i in associated.into_iter().flatten() {
            self.take(i)?;
        }
        Ok(())
    }

    /// Phase 3: random extra inputs until the growing fee is covered.
    fn cover_fees(&mut self) -> Result<(), H::Error> {
        self.top_up(&|v: &Value| Some(v.coin()), "lovelace")
    }

    /// Random extra inputs holding some of `by` until it is covered.
    fn top_up(&mut self, by: Measure<'_>, label: &str) -> Result<(), H::Error> {
        while !self.covered(by) {
            let relevant = self.relevant(by);
            if relevant.is_empty() {
                return Err(SelectionError::InsufficientInput {
                    asset: label.to_string(),
                }
                .into());
            }
            let pick = self.rng.gen_range(0..relevant.len());
            self.take(relevant[pick])?;
        }
        Ok(())
    }
}
