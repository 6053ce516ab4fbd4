//! # Transaction Builder
//!
//! Collects item-builder results, optionally selects more inputs, and
//! balances everything into a transaction with a single change output.
//!
//! ## Lifecycle
//!
//! ```text
//! new(config)
//!   add_input / add_output / add_cert / add_withdrawal / add_mint / ...
//!   select_utxos(strategy)              (optional)
//!   build_for_evaluation(change_addr)   (Plutus only: draft for the evaluator)
//!   set_exunits(key, units)             (Plutus only: feed results back)
//! build(change_addr) -> SignedTxBuilder
//! ```
//!
//! `build` consumes the builder: one builder, one transaction.
//!
//! ## Accounting
//!
//! ```text
//! total_input  = inputs + withdrawals + deregistration refunds + minted
//! total_output = outputs + burned
//! deposit      = key deposits for registrations + pool deposits
//! total_input == total_output + fee + deposit        (change is an output)
//! ```
//!
//! Refunds are counted once, on the input side; `deposit` is gross.
//!
//! ## Fee estimation
//!
//! Fees depend on the final size, which depends on witnesses nobody has
//! produced yet. Estimates are therefore made against a *fake* transaction:
//! one dummy vkey witness per key expected to sign, dummy bootstrap
//! witnesses, redeemers with a maximal placeholder budget until real budgets
//! are known, and a fee field wide enough for any fee. The real
//! transaction can only be smaller.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace, warn};

use crate::address::{Address, ByronAddress, Credential};
use crate::builders::certificate_builder::CertificateBuilderResult;
use crate::builders::input_builder::{InputBuilderResult, SingleInputBuilder};
use crate::builders::mint_builder::MintBuilderResult;
use crate::builders::output_builder::SingleOutputBuilderResult;
use crate::builders::redeemer_builder::RedeemerSetBuilder;
use crate::builders::signed_tx::SignedTxBuilder;
use crate::builders::withdrawal_builder::WithdrawalBuilderResult;
use crate::builders::witness_builder::{
    InputAggregateWitnessData, NativeScriptWitnessInfo, PlutusScriptWitness, RedeemerWitnessKey,
    TransactionWitnessSetBuilder,
};
use crate::builders::BuilderError;
use crate::codec::CborEncoding;
use crate::config::{
    ProtocolParams, COLLATERAL_PERCENTAGE, FEE_ESTIMATION_PLACEHOLDER, MAX_COLLATERAL_INPUTS,
    MAX_TX_EX_MEM, MAX_TX_EX_STEPS,
};
use crate::crypto::{BootstrapWitness, Ed25519KeyHash, Ed25519Signature, ScriptHash, Vkey, Vkeywitness};
use crate::fees::{self, compatible_min_ada_required, LinearFee};
use crate::hashing::{calc_script_data_hash, hash_auxiliary_data};
use crate::ledger::{
    AuxiliaryData, Certificate, Costmdls, ExUnitPrices, ExUnits, Language, Redeemers, Transaction,
    TransactionBody, TransactionInput, TransactionOutput, TransactionUnspentOutput,
    TransactionWitnessSet, Withdrawals,
};
use crate::selection::{select_inputs, CoinSelectionStrategyCIP2, SelectionHost};
use crate::value::{ArithmeticError, BigNum, Coin, Int, Mint, MintAssets, Slot, Value};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// The protocol parameters a builder prices and validates against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionBuilderConfig {
    pub fee_algo: LinearFee,
    pub pool_deposit: Coin,
    pub key_deposit: Coin,
    pub max_value_size: u32,
    pub max_tx_size: u32,
    pub coins_per_utxo_byte: Coin,
    /// When set, outputs must also satisfy the legacy per-word minimum.
    pub coins_per_utxo_word: Option<Coin>,
    pub ex_unit_prices: ExUnitPrices,
    pub max_tx_ex_units: ExUnits,
    pub collateral_percentage: u32,
    pub max_collateral_inputs: u32,
    pub cost_models: Costmdls,
}

impl From<&ProtocolParams> for TransactionBuilderConfig {
    fn from(params: &ProtocolParams) -> Self {
        Self {
            fee_algo: LinearFee::from(params),
            pool_deposit: BigNum::new(params.pool_deposit),
            key_deposit: BigNum::new(params.key_deposit),
            max_value_size: params.max_value_size,
            max_tx_size: params.max_tx_size,
            coins_per_utxo_byte: BigNum::new(params.coins_per_utxo_byte),
            coins_per_utxo_word: params.coins_per_utxo_word.map(BigNum::new),
            ex_unit_prices: params.ex_unit_prices(),
            max_tx_ex_units: params.max_tx_ex_units,
            collateral_percentage: params.collateral_percentage,
            max_collateral_inputs: params.max_collateral_inputs,
            cost_models: params.cost_models.clone(),
        }
    }
}

/// Field-by-field construction of a [`TransactionBuilderConfig`].
///
/// Fees, deposits, size limits, the per-byte rate and execution prices are
/// mandatory. Everything Plutus-specific beyond prices falls back to
/// mainnet values.
#[derive(Clone, Debug, Default)]
pub struct TransactionBuilderConfigBuilder {
    fee_algo: Option<LinearFee>,
    pool_deposit: Option<Coin>,
    key_deposit: Option<Coin>,
    max_value_size: Option<u32>,
    max_tx_size: Option<u32>,
    coins_per_utxo_byte: Option<Coin>,
    coins_per_utxo_word: Option<Coin>,
    ex_unit_prices: Option<ExUnitPrices>,
    max_tx_ex_units: Option<ExUnits>,
    collateral_percentage: Option<u32>,
    max_collateral_inputs: Option<u32>,
    cost_models: Option<Costmdls>,
}

impl TransactionBuilderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fee_algo(mut self, fee_algo: LinearFee) -> Self {
        self.fee_algo = Some(fee_algo);
        self
    }

    pub fn pool_deposit(mut self, pool_deposit: Coin) -> Self {
        self.pool_deposit = Some(pool_deposit);
        self
    }

    pub fn key_deposit(mut self, key_deposit: Coin) -> Self {
        self.key_deposit = Some(key_deposit);
        self
    }

    pub fn max_value_size(mut self, max_value_size: u32) -> Self {
        self.max_value_size = Some(max_value_size);
        self
    }

    pub fn max_tx_size(mut self, max_tx_size: u32) -> Self {
        self.max_tx_size = Some(max_tx_size);
        self
    }

    pub fn coins_per_utxo_byte(mut self, rate: Coin) -> Self {
        self.coins_per_utxo_byte = Some(rate);
        self
    }

    pub fn coins_per_utxo_word(mut self, rate: Coin) -> Self {
        self.coins_per_utxo_word = Some(rate);
        self
    }

    pub fn ex_unit_prices(mut self, prices: ExUnitPrices) -> Self {
        self.ex_unit_prices = Some(prices);
        self
    }

    pub fn max_tx_ex_units(mut self, units: ExUnits) -> Self {
        self.max_tx_ex_units = Some(units);
        self
    }

    pub fn collateral_percentage(mut self, percentage: u32) -> Self {
        self.collateral_percentage = Some(percentage);
        self
    }

    pub fn max_collateral_inputs(mut self, count: u32) -> Self {
        self.max_collateral_inputs = Some(count);
        self
    }

    pub fn cost_models(mut self, cost_models: Costmdls) -> Self {
        self.cost_models = Some(cost_models);
        self
    }

    pub fn build(self) -> Result<TransactionBuilderConfig, BuilderError> {
        Ok(TransactionBuilderConfig {
            fee_algo: self
                .fee_algo
                .ok_or(BuilderError::UninitializedField("fee_algo"))?,
            pool_deposit: self
                .pool_deposit
                .ok_or(BuilderError::UninitializedField("pool_deposit"))?,
            key_deposit: self
                .key_deposit
                .ok_or(BuilderError::UninitializedField("key_deposit"))?,
            max_value_size: self
                .max_value_size
                .ok_or(BuilderError::UninitializedField("max_value_size"))?,
            max_tx_size: self
                .max_tx_size
                .ok_or(BuilderError::UninitializedField("max_tx_size"))?,
            coins_per_utxo_byte: self
                .coins_per_utxo_byte
                .ok_or(BuilderError::UninitializedField("coins_per_utxo_byte"))?,
            coins_per_utxo_word: self.coins_per_utxo_word,
            ex_unit_prices: self
                .ex_unit_prices
                .ok_or(BuilderError::UninitializedField("ex_unit_prices"))?,
            max_tx_ex_units: self
                .max_tx_ex_units
                .unwrap_or(ExUnits::new(MAX_TX_EX_MEM, MAX_TX_EX_STEPS)),
            collateral_percentage: self.collateral_percentage.unwrap_or(COLLATERAL_PERCENTAGE),
            max_collateral_inputs: self.max_collateral_inputs.unwrap_or(MAX_COLLATERAL_INPUTS),
            cost_models: self.cost_models.unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Draft for evaluation
// ---------------------------------------------------------------------------

/// A balanced transaction whose redeemers still carry placeholder budgets,
/// for handing to a Plutus evaluator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DraftTransaction {
    tx: Transaction,
}

impl DraftTransaction {
    pub fn draft_body(&self) -> &TransactionBody {
        &self.tx.body
    }

    /// The draft with dummy witnesses, sized like the real thing.
    pub fn draft_tx(&self) -> &Transaction {
        &self.tx
    }

    /// Redeemers the evaluator should report on.
    pub fn redeemer_keys(&self) -> Vec<RedeemerWitnessKey> {
        self.tx
            .witness_set
            .redeemers
            .iter()
            .flat_map(|r| r.iter())
            .map(|r| RedeemerWitnessKey::new(r.tag, r.index.as_u64()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    config: TransactionBuilderConfig,
    inputs: Vec<InputBuilderResult>,
    outputs: Vec<TransactionOutput>,
    fee: Option<Coin>,
    ttl: Option<Slot>,
    validity_start_interval: Option<Slot>,
    certs: Vec<CertificateBuilderResult>,
    withdrawals: Vec<WithdrawalBuilderResult>,
    mints: Vec<MintBuilderResult>,
    auxiliary_data: Option<AuxiliaryData>,
    collateral: Vec<InputBuilderResult>,
    collateral_return: Option<TransactionOutput>,
    total_collateral: Option<Coin>,
    required_signers: BTreeSet<Ed25519KeyHash>,
    reference_inputs: Vec<TransactionUnspentOutput>,
    network_id: Option<u8>,
    /// Candidates for [`TransactionBuilder::select_utxos`].
    utxos: Vec<TransactionUnspentOutput>,
    witness_builder: TransactionWitnessSetBuilder,
    redeemer_builder: RedeemerSetBuilder,
    additional_witnesses: usize,
}

impl TransactionBuilder {
    pub fn new(config: TransactionBuilderConfig) -> Self {
        Self {
            config,
            inputs: Vec::new(),
            outputs: Vec::new(),
            fee: None,
            ttl: None,
            validity_start_interval: None,
            certs: Vec::new(),
            withdrawals: Vec::new(),
            mints: Vec::new(),
            auxiliary_data: None,
            collateral: Vec::new(),
            collateral_return: None,
            total_collateral: None,
            required_signers: BTreeSet::new(),
            reference_inputs: Vec::new(),
            network_id: None,
            utxos: Vec::new(),
            witness_builder: TransactionWitnessSetBuilder::new(),
            redeemer_builder: RedeemerSetBuilder::new(),
            additional_witnesses: 0,
        }
    }

    pub fn config(&self) -> &TransactionBuilderConfig {
        &self.config
    }

    // -- items --------------------------------------------------------------

    /// Adding the same input twice is a no-op.
    pub fn add_input(&mut self, result: InputBuilderResult) {
        if self.inputs.iter().any(|i| i.input == result.input) {
            trace!(input = %result.input, "input already present");
            return;
        }
        self.record_witnesses(&result.required_wits, result.aggregate_witness.as_ref());
        self.redeemer_builder.add_spend(&result);
        trace!(input = %result.input, coin = %result.utxo_info.amount.coin(), "added input");
        self.inputs.push(result);
    }

    /// Offer a UTXO to input selection without spending it yet.
    pub fn add_utxo(&mut self, utxo: TransactionUnspentOutput) {
        self.utxos.push(utxo);
    }

    /// Reference a UTXO without spending it, typically for its script.
    pub fn add_reference_input(&mut self, utxo: TransactionUnspentOutput) {
        if !self.reference_inputs.iter().any(|r| r.input == utxo.input) {
            self.reference_inputs.push(utxo);
        }
    }

    pub fn add_output(&mut self, result: SingleOutputBuilderResult) -> Result<(), BuilderError> {
        self.check_output(&result.output)?;
        if let Some(datum) = result.communication_datum {
            self.witness_builder.add_plutus_datum(datum);
        }
        self.outputs.push(result.output);
        Ok(())
    }

    pub fn add_cert(&mut self, result: CertificateBuilderResult) {
        self.record_witnesses(&result.required_wits, result.aggregate_witness.as_ref());
        self.redeemer_builder.add_cert(&result);
        self.certs.push(result);
    }

    pub fn add_withdrawal(&mut self, result: WithdrawalBuilderResult) {
        self.record_witnesses(&result.required_wits, result.aggregate_witness.as_ref());
        self.redeemer_builder.add_reward(&result);
        self.withdrawals.push(result);
    }

    pub fn add_mint(&mut self, result: MintBuilderResult) {
        self.record_witnesses(&result.required_wits, result.aggregate_witness.as_ref());
        self.redeemer_builder.add_mint(&result);
        self.mints.push(result);
    }

    /// Collateral must be spendable by a plain signature.
    pub fn add_collateral(&mut self, result: InputBuilderResult) -> Result<(), BuilderError> {
        if result.aggregate_witness.is_some() || !is_key_spendable(&result.utxo_info.address) {
            return Err(BuilderError::CollateralMustBeKeyLocked);
        }
        self.witness_builder.add_required_wits(&result.required_wits);
        self.collateral.push(result);
        if let Some(ret) = self.collateral_return.clone() {
            self.set_collateral_return(ret)?;
        }
        Ok(())
    }

    /// Sets the collateral return and derives `total_collateral` from it.
    pub fn set_collateral_return(&mut self, output: TransactionOutput) -> Result<(), BuilderError> {
        let collateral = self
            .collateral
            .iter()
            .try_fold(BigNum::zero(), |acc, c| acc.checked_add(&c.utxo_info.amount.coin()))?;
        let total = collateral.checked_sub(&output.amount.coin()).map_err(|_| {
            BuilderError::UTxOBalanceError(format!(
                "collateral return of {} exceeds the {} lovelace of collateral",
                output.amount.coin(),
                collateral
            ))
        })?;
        self.total_collateral = Some(total);
        self.collateral_return = Some(output);
        Ok(())
    }

    pub fn add_required_signer(&mut self, hash: Ed25519KeyHash) {
        let mut required = crate::builders::RequiredWitnessSet::new();
        required.add_vkey_key_hash(hash);
        self.witness_builder.add_required_wits(&required);
        self.required_signers.insert(hash);
    }

    pub fn set_fee(&mut self, fee: Coin) {
        self.fee = Some(fee);
    }

    pub fn set_ttl(&mut self, ttl: Slot) {
        self.ttl = Some(ttl);
    }

    pub fn set_validity_start_interval(&mut self, slot: Slot) {
        self.validity_start_interval = Some(slot);
    }

    pub fn set_network_id(&mut self, network_id: u8) {
        self.network_id = Some(network_id);
    }

    pub fn set_auxiliary_data(&mut self, auxiliary_data: AuxiliaryData) {
        self.auxiliary_data = Some(auxiliary_data);
    }

    pub fn auxiliary_data(&self) -> Option<&AuxiliaryData> {
        self.auxiliary_data.as_ref()
    }

    /// Budget fee estimation for `n` signatures beyond the ones the builder
    /// can see, e.g. a co-signer added after the wallet signs.
    pub fn set_additional_witnesses(&mut self, n: usize) {
        self.additional_witnesses = n;
    }

    /// Override a redeemer's placeholder budget. Returns `false` if no
    /// script-witnessed item sits at `key`.
    pub fn set_exunits(&mut self, key: RedeemerWitnessKey, ex_units: ExUnits) -> bool {
        let found = self.redeemer_builder.update_ex_units(key, ex_units);
        if !found {
            warn!(redeemer = %key, "no redeemer at this position");
        }
        found
    }

    fn record_witnesses(
        &mut self,
        required: &crate::builders::RequiredWitnessSet,
        aggregate: Option<&InputAggregateWitnessData>,
    ) {
        self.witness_builder.add_required_wits(required);
        if let Some(data) = aggregate {
            self.witness_builder.add_input_aggregate_witness_data(data);
        }
    }

    fn check_output(&self, output: &TransactionOutput) -> Result<(), BuilderError> {
        let value_size = output.amount.to_bytes().len();
        if value_size > self.config.max_value_size as usize {
            return Err(BuilderError::ValueSizeExceeded {
                size: value_size,
                max: self.config.max_value_size,
            });
        }
        let min = self.min_ada_for(output)?;
        if output.amount.coin() < min {
            return Err(BuilderError::OutputBelowMinAda {
                coin: output.amount.coin(),
                min,
            });
        }
        Ok(())
    }

    fn min_ada_for(&self, output: &TransactionOutput) -> Result<Coin, ArithmeticError> {
        compatible_min_ada_required(
            output,
            &self.config.coins_per_utxo_byte,
            self.config.coins_per_utxo_word.as_ref(),
        )
    }

    // -- accounting ---------------------------------------------------------

    pub fn get_explicit_input(&self) -> Result<Value, ArithmeticError> {
        self.inputs
            .iter()
            .try_fold(Value::zero(), |acc, i| acc.checked_add(&i.utxo_info.amount))
    }

    /// Withdrawals plus deposit refunds from deregistrations.
    pub fn get_implicit_input(&self) -> Result<Value, ArithmeticError> {
        let withdrawn = self
            .withdrawals
            .iter()
            .try_fold(BigNum::zero(), |acc, w| acc.checked_add(&w.amount))?;
        let refunds = self.count_certs(|c| matches!(c, Certificate::StakeDeregistration(_)));
        let refunded = self.config.key_deposit.checked_mul(&BigNum::new(refunds))?;
        Ok(Value::new(withdrawn.checked_add(&refunded)?))
    }

    pub fn get_total_input(&self) -> Result<Value, ArithmeticError> {
        let minted = self
            .mint()?
            .map(|m| Value::new_from_assets(m.as_positive_multiasset()))
            .unwrap_or_default();
        self.get_explicit_input()?
            .checked_add(&self.get_implicit_input()?)?
            .checked_add(&minted)
    }

    pub fn get_explicit_output(&self) -> Result<Value, ArithmeticError> {
        self.outputs
            .iter()
            .try_fold(Value::zero(), |acc, o| acc.checked_add(&o.amount))
    }

    pub fn get_total_output(&self) -> Result<Value, ArithmeticError> {
        let burned = self
            .mint()?
            .map(|m| Value::new_from_assets(m.as_negative_multiasset()))
            .unwrap_or_default();
        self.get_explicit_output()?.checked_add(&burned)
    }

    /// Deposits taken by registrations, before refunds.
    pub fn get_deposit(&self) -> Result<Coin, ArithmeticError> {
        let keys = self.count_certs(|c| matches!(c, Certificate::StakeRegistration(_)));
        let pools = self.count_certs(|c| matches!(c, Certificate::PoolRegistration(_)));
        self.config
            .key_deposit
            .checked_mul(&BigNum::new(keys))?
            .checked_add(&self.config.pool_deposit.checked_mul(&BigNum::new(pools))?)
    }

    pub fn get_fee_if_set(&self) -> Option<Coin> {
        self.fee
    }

    fn count_certs(&self, pred: impl Fn(&Certificate) -> bool) -> u64 {
        self.certs.iter().filter(|c| pred(&c.cert)).count() as u64
    }

    // -- fees ---------------------------------------------------------------

    /// Minimum fee for the transaction as it stands, fully witnessed.
    pub fn min_fee(&self) -> Result<Coin, BuilderError> {
        let tx = self.fake_tx(BigNum::new(FEE_ESTIMATION_PLACEHOLDER))?;
        Ok(fees::min_fee(&tx, &self.config.fee_algo, &self.config.ex_unit_prices)?)
    }

    /// What adding `result` would add to the minimum fee.
    pub fn fee_for_input(&self, result: &InputBuilderResult) -> Result<Coin, BuilderError> {
        let mut with = self.clone();
        with.add_input(result.clone());
        Ok(with.min_fee()?.clamped_sub(&self.min_fee()?))
    }

    /// What adding `result` would add to the minimum fee.
    pub fn fee_for_output(&self, result: &SingleOutputBuilderResult) -> Result<Coin, BuilderError> {
        self.marginal_output_fee(&result.output)
    }

    fn marginal_output_fee(&self, output: &TransactionOutput) -> Result<Coin, BuilderError> {
        let mut with = self.clone();
        with.outputs.push(output.clone());
        Ok(with.min_fee()?.clamped_sub(&self.min_fee()?))
    }

    /// Serialized size of the fully witnessed transaction.
    pub fn full_size(&self) -> Result<usize, BuilderError> {
        let fee = self.fee.unwrap_or(BigNum::new(FEE_ESTIMATION_PLACEHOLDER));
        Ok(self.fake_tx(fee)?.to_bytes().len())
    }

    pub fn output_sizes(&self) -> Vec<usize> {
        self.outputs.iter().map(|o| o.to_bytes().len()).collect()
    }

    // -- selection ----------------------------------------------------------

    /// Select inputs from the UTXOs offered via [`add_utxo`](Self::add_utxo)
    /// until outputs, deposits and the fee are covered.
    pub fn select_utxos(&mut self, strategy: CoinSelectionStrategyCIP2) -> Result<(), BuilderError> {
        self.select_utxos_with_rng(strategy, &mut StdRng::from_entropy())
    }

    pub fn select_utxos_with_rng<R: Rng + ?Sized>(
        &mut self,
        strategy: CoinSelectionStrategyCIP2,
        rng: &mut R,
    ) -> Result<(), BuilderError> {
        let spent: BTreeSet<TransactionInput> = self.inputs.iter().map(|i| i.input).collect();
        let candidates: Vec<TransactionUnspentOutput> = self
            .utxos
            .iter()
            .filter(|u| !spent.contains(&u.input) && is_key_spendable(&u.output.address))
            .cloned()
            .collect();
        let input_total = self.get_total_input()?;
        let output_total = self
            .get_total_output()?
            .checked_add(&Value::new(self.get_deposit()?))?
            .checked_add(&Value::new(self.min_fee()?))?;
        let outputs: Vec<Value> = self.outputs.iter().map(|o| o.amount.clone()).collect();

        let picked = select_inputs(
            self,
            &candidates,
            &outputs,
            strategy,
            input_total,
            output_total,
            rng,
        )?;
        debug!(%strategy, picked = picked.len(), inputs = self.inputs.len(), "selected utxos");
        Ok(())
    }

    // -- building -----------------------------------------------------------

    /// Balance with placeholder budgets and return the draft an evaluator
    /// needs. The builder itself is left untouched.
    pub fn build_for_evaluation(&self, change_address: &Address) -> Result<DraftTransaction, BuilderError> {
        let mut draft = self.clone();
        let fee = draft.add_change_if_needed(change_address)?;
        let tx = draft.fake_tx(fee)?;
        debug!(
            redeemers = tx.witness_set.redeemers.as_ref().map_or(0, Redeemers::len),
            %fee,
            "built draft for evaluation"
        );
        Ok(DraftTransaction { tx })
    }

    /// Balance into a single change output at `change_address` and hand
    /// back the body ready for signing.
    pub fn build(mut self, change_address: &Address) -> Result<SignedTxBuilder, BuilderError> {
        // Surface missing budgets before doing any fee work.
        let redeemers = self.redeemer_builder.build(None)?;
        let fee = self.add_change_if_needed(change_address)?;
        self.check_balance(fee)?;

        let size = self.fake_tx(fee)?.to_bytes().len();
        if size > self.config.max_tx_size as usize {
            return Err(BuilderError::MaxTxSizeExceeded {
                size,
                max: self.config.max_tx_size,
            });
        }

        let body = self.build_body(fee, &redeemers)?;
        let mut witness_builder = self.witness_builder;
        let mut redeemer_keys = crate::builders::RequiredWitnessSet::new();
        for key in self.redeemer_builder.keys() {
            redeemer_keys.add_redeemer_key(key);
        }
        witness_builder.add_required_wits(&redeemer_keys);
        witness_builder.add_redeemers(&redeemers);

        debug!(
            tx_hash = %body.hash(),
            %fee,
            inputs = body.inputs.len(),
            outputs = body.outputs.len(),
            size,
            "built transaction"
        );
        Ok(SignedTxBuilder::new_with_data(
            body,
            witness_builder,
            true,
            self.auxiliary_data,
        ))
    }

    /// Route whatever the inputs leave over to one change output, and fix
    /// the fee. Returns the fee.
    fn add_change_if_needed(&mut self, change_address: &Address) -> Result<Coin, BuilderError> {
        let input = self.get_total_input()?;
        let owed = self
            .get_total_output()?
            .checked_add(&Value::new(self.get_deposit()?))?;
        let excess = input.checked_sub(&owed).map_err(|_| {
            BuilderError::UTxOBalanceError(format!(
                "inputs ({} lovelace) do not cover outputs and deposits ({} lovelace)",
                input.coin(),
                owed.coin()
            ))
        })?;

        let base_fee = self.min_fee()?;
        if let Some(explicit) = self.fee {
            if explicit < base_fee {
                return Err(BuilderError::FeeBelowMinimum {
                    fee: explicit,
                    min: base_fee,
                });
            }
        }

        let fee_without_change = self.fee.unwrap_or(base_fee);
        if !excess.has_assets() && excess.coin() == fee_without_change {
            debug!(fee = %fee_without_change, "inputs balance exactly, no change output");
            self.fee = Some(fee_without_change);
            return Ok(fee_without_change);
        }
        if excess.coin() < base_fee {
            return Err(BuilderError::UTxOBalanceError(format!(
                "{} lovelace left after outputs cannot pay the {} fee",
                excess.coin(),
                base_fee
            )));
        }

        let change_fee =
            self.marginal_output_fee(&TransactionOutput::new(change_address.clone(), excess.clone()))?;
        let required_fee = base_fee.checked_add(&change_fee)?;
        let fee = match self.fee {
            Some(explicit) if explicit < required_fee => {
                return Err(BuilderError::FeeBelowMinimum {
                    fee: explicit,
                    min: required_fee,
                })
            }
            Some(explicit) => explicit,
            None => required_fee,
        };

        let change_value = excess.checked_sub(&Value::new(fee)).map_err(|_| {
            BuilderError::UTxOBalanceError(format!(
                "{} lovelace left after outputs cannot pay the {} fee and a change output",
                excess.coin(),
                fee
            ))
        })?;
        let change = TransactionOutput::new(change_address.clone(), change_value);
        let min = self.min_ada_for(&change)?;
        if change.amount.coin() < min {
            return Err(BuilderError::UTxOBalanceError(format!(
                "change of {} lovelace is below the {} minimum for its output",
                change.amount.coin(),
                min
            )));
        }
        let value_size = change.amount.to_bytes().len();
        if value_size > self.config.max_value_size as usize {
            return Err(BuilderError::ValueSizeExceeded {
                size: value_size,
                max: self.config.max_value_size,
            });
        }

        debug!(%fee, change = %change.amount.coin(), assets = change.amount.has_assets(), "routing change");
        self.outputs.push(change);
        self.fee = Some(fee);
        Ok(fee)
    }

    fn check_balance(&self, fee: Coin) -> Result<(), BuilderError> {
        let input = self.get_total_input()?;
        let output = self
            .get_total_output()?
            .checked_add(&Value::new(fee.checked_add(&self.get_deposit()?)?))?;
        if input != output {
            return Err(BuilderError::UTxOBalanceError(format!(
                "inputs ({} lovelace) != outputs + fee + deposit ({} lovelace)",
                input.coin(),
                output.coin()
            )));
        }
        Ok(())
    }

    // -- assembly -----------------------------------------------------------

    fn aggregate_witnesses(&self) -> impl Iterator<Item = &InputAggregateWitnessData> {
        self.inputs
            .iter()
            .map(|i| i.aggregate_witness.as_ref())
            .chain(self.certs.iter().map(|c| c.aggregate_witness.as_ref()))
            .chain(self.withdrawals.iter().map(|w| w.aggregate_witness.as_ref()))
            .chain(self.mints.iter().map(|m| m.aggregate_witness.as_ref()))
            .flatten()
    }

    /// Mint entries merged per policy, in first-seen order.
    fn mint(&self) -> Result<Option<Mint>, ArithmeticError> {
        let mut merged: Vec<(crate::crypto::PolicyId, MintAssets)> = Vec::new();
        for result in &self.mints {
            match merged.iter_mut().find(|(p, _)| *p == result.policy_id) {
                Some((_, assets)) => {
                    for (name, amount) in result.assets.iter() {
                        let sum = assets
                            .get(name)
                            .map_or(Some(amount.as_i128()), |a| a.as_i128().checked_add(amount.as_i128()))
                            .and_then(Int::from_i128)
                            .ok_or(ArithmeticError::Overflow)?;
                        assets.insert(name.clone(), sum);
                    }
                }
                None => merged.push((result.policy_id, result.assets.clone())),
            }
        }
        if merged.is_empty() {
            return Ok(None);
        }
        let mut mint = Mint::new();
        for (policy, assets) in merged {
            mint.insert(policy, assets);
        }
        Ok(Some(mint))
    }

    fn withdrawals_map(&self) -> Option<Withdrawals> {
        if self.withdrawals.is_empty() {
            return None;
        }
        let mut map = Withdrawals::new();
        for w in &self.withdrawals {
            map.insert(w.address, w.amount);
        }
        Some(map)
    }

    fn all_required_signers(&self) -> BTreeSet<Ed25519KeyHash> {
        let mut signers = self.required_signers.clone();
        for w in self.aggregate_witnesses() {
            if let InputAggregateWitnessData::PlutusScript(_, required, _) = w {
                signers.extend(required.iter().copied());
            }
        }
        signers
    }

    /// Scripts available on reference inputs, or on inputs being spent.
    fn reference_scripts(&self) -> BTreeMap<ScriptHash, Option<Language>> {
        self.reference_inputs
            .iter()
            .map(|r| &r.output)
            .chain(self.inputs.iter().map(|i| &i.utxo_info))
            .filter_map(|o| o.script_ref.as_ref())
            .map(|s| (s.hash(), s.language()))
            .collect()
    }

    fn used_languages(&self) -> Result<Vec<Language>, BuilderError> {
        let references = self.reference_scripts();
        let mut languages: BTreeSet<Language> =
            self.witness_builder.plutus_scripts().map(|s| s.language()).collect();
        for w in self.aggregate_witnesses() {
            if let InputAggregateWitnessData::PlutusScript(partial, _, _) = w {
                if let PlutusScriptWitness::Ref(hash) = &partial.script {
                    match references.get(hash) {
                        Some(Some(language)) => {
                            languages.insert(*language);
                        }
                        _ => return Err(BuilderError::MissingScriptWitness(*hash)),
                    }
                }
            }
        }
        Ok(languages.into_iter().collect())
    }

    fn build_body(&self, fee: Coin, redeemers: &Redeemers) -> Result<TransactionBody, BuilderError> {
        let mut inputs: Vec<TransactionInput> = self.inputs.iter().map(|i| i.input).collect();
        inputs.sort();
        let mut body = TransactionBody::new(inputs, self.outputs.clone(), fee);
        body.ttl = self.ttl;
        if !self.certs.is_empty() {
            body.certs = Some(self.certs.iter().map(|c| c.cert.clone()).collect());
        }
        body.withdrawals = self.withdrawals_map();
        body.auxiliary_data_hash = self.auxiliary_data.as_ref().map(hash_auxiliary_data);
        body.validity_start_interval = self.validity_start_interval;
        body.mint = self.mint()?;
        body.script_data_hash = calc_script_data_hash(
            redeemers,
            self.witness_builder.plutus_data().as_ref(),
            &self.config.cost_models,
            &self.used_languages()?,
        );
        if !self.collateral.is_empty() {
            let mut collateral: Vec<TransactionInput> = self.collateral.iter().map(|c| c.input).collect();
            collateral.sort();
            body.collateral = Some(collateral);
        }
        let signers = self.all_required_signers();
        if !signers.is_empty() {
            body.required_signers = Some(signers.into_iter().collect());
        }
        body.network_id = self.network_id;
        body.collateral_return = self.collateral_return.clone();
        body.total_collateral = self.total_collateral;
        if !self.reference_inputs.is_empty() {
            body.reference_inputs = Some(self.reference_inputs.iter().map(|r| r.input).collect());
        }
        Ok(body)
    }

    /// The witness set the finished transaction will roughly carry: the
    /// real one plus a dummy for every signature still to come.
    fn fake_witness_set(&self, redeemers: Redeemers) -> TransactionWitnessSet {
        let mut ws = self.witness_builder.build();
        let required = self.witness_builder.required_wits();

        let mut signers: BTreeSet<Ed25519KeyHash> = required.vkeys().clone();
        let mut anonymous = self.additional_witnesses;
        for w in self.aggregate_witnesses() {
            if let InputAggregateWitnessData::NativeScript(script, info) = w {
                match info {
                    NativeScriptWitnessInfo::Count(n) => anonymous += *n as usize,
                    NativeScriptWitnessInfo::Vkeys(keys) => signers.extend(keys.iter().copied()),
                    NativeScriptWitnessInfo::AssumeSignatureCount => {
                        signers.extend(script.required_signers())
                    }
                }
            }
        }
        let unsigned = signers
            .iter()
            .filter(|h| !self.witness_builder.has_vkey_for(h))
            .count();
        ws.vkeywitnesses
            .extend((0..unsigned + anonymous).map(fake_vkey_witness));

        let missing_bootstraps: Vec<&ByronAddress> = required
            .bootstraps()
            .iter()
            .filter(|a| !self.witness_builder.has_bootstrap_for(a))
            .collect();
        ws.bootstraps.extend(
            missing_bootstraps
                .into_iter()
                .enumerate()
                .map(|(i, addr)| fake_bootstrap_witness(i, addr)),
        );

        ws.redeemers = (!redeemers.is_empty()).then_some(redeemers);
        ws
    }

    fn fake_tx(&self, fee: Coin) -> Result<Transaction, BuilderError> {
        let redeemers = self.redeemer_builder.build(Some(self.config.max_tx_ex_units))?;
        let body = self.build_body(fee, &redeemers)?;
        let witness_set = self.fake_witness_set(redeemers);
        Ok(Transaction::new(body, witness_set, self.auxiliary_data.clone()))
    }
}

impl SelectionHost for TransactionBuilder {
    type Error = BuilderError;

    fn fee_for_input(&self, utxo: &TransactionUnspentOutput) -> Result<Coin, BuilderError> {
        let result = SingleInputBuilder::from_utxo(utxo).payment_key()?;
        TransactionBuilder::fee_for_input(self, &result)
    }

    fn add_selected_input(&mut self, utxo: &TransactionUnspentOutput) -> Result<(), BuilderError> {
        let result = SingleInputBuilder::from_utxo(utxo).payment_key()?;
        self.add_input(result);
        Ok(())
    }
}

/// Spendable with a vkey or bootstrap witness alone.
fn is_key_spendable(address: &Address) -> bool {
    matches!(address.payment_cred(), Some(Credential::Key(_))) || address.as_byron().is_some()
}

fn fake_key_bytes(i: usize) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&(i as u64).to_be_bytes());
    bytes
}

fn fake_vkey_witness(i: usize) -> Vkeywitness {
    Vkeywitness::new(
        Vkey::from_raw(fake_key_bytes(i)),
        Ed25519Signature::from_raw([0u8; 64]),
    )
}

fn fake_bootstrap_witness(i: usize, address: &ByronAddress) -> BootstrapWitness {
    BootstrapWitness {
        vkey: Vkey::from_raw(fake_key_bytes(i)),
        signature: Ed25519Signature::from_raw([0u8; 64]),
        chain_code: vec![0u8; 32],
        attributes: address.attributes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{BaseAddress, EnterpriseAddress, RewardAddress};
    use crate::builders::certificate_builder::SingleCertificateBuilder;
    use crate::builders::mint_builder::SingleMintBuilder;
    use crate::builders::output_builder::TransactionOutputBuilder;
    use crate::builders::withdrawal_builder::SingleWithdrawalBuilder;
    use crate::builders::witness_builder::PartialPlutusWitness;
    use crate::crypto::{make_vkey_witness, PoolKeyHash, PrivateKey, TransactionHash};
    use crate::ledger::{NativeScript, PlutusData, PlutusScript, RedeemerTag};
    use crate::crypto::PolicyId;
    use crate::fees::min_ada_required;
    use crate::value::{AssetName, MultiAsset};
    use rand::rngs::StdRng;

    const ADA: u64 = 1_000_000;

    fn config() -> TransactionBuilderConfig {
        TransactionBuilderConfig::from(&ProtocolParams::default())
    }

    fn key() -> PrivateKey {
        PrivateKey::from_seed(&[11; 32])
    }

    fn key_address(key: &PrivateKey) -> Address {
        Address::Enterprise(EnterpriseAddress {
            network: 1,
            payment: Credential::from_keyhash(&key.to_public().hash()),
        })
    }

    fn utxo(seed: u8, address: Address, lovelace: u64) -> TransactionUnspentOutput {
        TransactionUnspentOutput::new(
            TransactionInput::new(TransactionHash::from_raw([seed; 32]), 0),
            TransactionOutput::new(address, Value::new(BigNum::new(lovelace))),
        )
    }

    fn key_input(seed: u8, lovelace: u64) -> InputBuilderResult {
        SingleInputBuilder::from_utxo(&utxo(seed, key_address(&key()), lovelace))
            .payment_key()
            .unwrap()
    }

    fn output(lovelace: u64) -> SingleOutputBuilderResult {
        let recipient = Address::Enterprise(EnterpriseAddress {
            network: 1,
            payment: Credential::from_keyhash(&Ed25519KeyHash::from_raw([0x22; 28])),
        });
        TransactionOutputBuilder::new()
            .with_address(recipient)
            .next()
            .unwrap()
            .with_coin(BigNum::new(lovelace))
            .build()
            .unwrap()
    }

    fn change_address() -> Address {
        Address::Enterprise(EnterpriseAddress {
            network: 1,
            payment: Credential::from_keyhash(&Ed25519KeyHash::from_raw([0x33; 28])),
        })
    }

    fn stake_cred() -> Credential {
        Credential::from_keyhash(&key().to_public().hash())
    }

    #[test]
    fn test_change_is_input_minus_output_minus_fee() {
        let mut builder = TransactionBuilder::new(config());
        builder.add_input(key_input(1, 100 * ADA));
        builder.add_output(output(40 * ADA)).unwrap();

        let signed = builder.build(&change_address()).unwrap();
        let body = signed.body().clone();
        assert_eq!(body.outputs.len(), 2);
        let change = &body.outputs[1];
        assert_eq!(change.address, change_address());
        assert_eq!(
            change.amount.coin().as_u64() + body.fee.as_u64(),
            60 * ADA
        );

        let mut signed = signed;
        signed.add_vkey(make_vkey_witness(&body.hash(), &key()));
        let tx = signed.build_checked().unwrap();
        let actual_min = fees::min_fee(
            &tx,
            &config().fee_algo,
            &config().ex_unit_prices,
        )
        .unwrap();
        assert!(body.fee >= actual_min);
    }

    #[test]
    fn test_accounting_identity_with_deposits_and_refunds() {
        let mut builder = TransactionBuilder::new(config());
        builder.add_input(key_input(1, 10 * ADA));
        builder.add_cert(
            SingleCertificateBuilder::new(Certificate::StakeRegistration(stake_cred())).skip_witness(),
        );
        assert_eq!(builder.get_deposit().unwrap(), BigNum::new(2 * ADA));
        assert_eq!(builder.get_implicit_input().unwrap(), Value::zero());

        let mut dereg = TransactionBuilder::new(config());
        dereg.add_input(key_input(1, 10 * ADA));
        dereg.add_cert(
            SingleCertificateBuilder::new(Certificate::StakeDeregistration(stake_cred()))
                .payment_key()
                .unwrap(),
        );
        assert_eq!(dereg.get_implicit_input().unwrap().coin(), BigNum::new(2 * ADA));
        assert_eq!(dereg.get_total_input().unwrap().coin(), BigNum::new(12 * ADA));

        let signed = builder.build(&change_address()).unwrap();
        let body = signed.body();
        let out: u64 = body.outputs.iter().map(|o| o.amount.coin().as_u64()).sum();
        assert_eq!(out + body.fee.as_u64() + 2 * ADA, 10 * ADA);
    }

    #[test]
    fn test_withdrawal_is_implicit_input() {
        let mut builder = TransactionBuilder::new(config());
        builder.add_input(key_input(1, 5 * ADA));
        builder.add_withdrawal(
            SingleWithdrawalBuilder::new(RewardAddress::new(1, stake_cred()), BigNum::new(3 * ADA))
                .payment_key()
                .unwrap(),
        );
        assert_eq!(builder.get_total_input().unwrap().coin(), BigNum::new(8 * ADA));
        let body = builder.build(&change_address()).unwrap().body().clone();
        assert!(body.withdrawals.is_some());
        let out: u64 = body.outputs.iter().map(|o| o.amount.coin().as_u64()).sum();
        assert_eq!(out + body.fee.as_u64(), 8 * ADA);
    }

    #[test]
    fn test_marginal_fees_are_positive() {
        let mut builder = TransactionBuilder::new(config());
        builder.add_input(key_input(1, 10 * ADA));
        let per_byte = config().fee_algo.coefficient().as_u64();
        assert!(builder.fee_for_output(&output(2 * ADA)).unwrap().as_u64() > per_byte * 30);
        assert!(builder.fee_for_input(&key_input(2, ADA)).unwrap().as_u64() > per_byte * 30);
    }

    #[test]
    fn test_additional_witnesses_raise_the_fee() {
        let mut builder = TransactionBuilder::new(config());
        builder.add_input(key_input(1, 10 * ADA));
        let base = builder.min_fee().unwrap();
        builder.set_additional_witnesses(2);
        let padded = builder.min_fee().unwrap();
        // Each vkey witness is ~100 bytes.
        assert!(padded.as_u64() - base.as_u64() >= 2 * 100 * 44);
    }

    #[test]
    fn test_explicit_fee_below_minimum() {
        let mut builder = TransactionBuilder::new(config());
        builder.add_input(key_input(1, 10 * ADA));
        builder.set_fee(BigNum::new(1_000));
        let err = builder.build(&change_address()).unwrap_err();
        assert!(matches!(err, BuilderError::FeeBelowMinimum { .. }));
    }

    #[test]
    fn test_change_below_min_ada_is_an_error() {
        let mut builder = TransactionBuilder::new(config());
        builder.add_input(key_input(1, 3 * ADA));
        builder.add_output(output(2_500_000)).unwrap();
        let err = builder.build(&change_address()).unwrap_err();
        assert!(matches!(err, BuilderError::UTxOBalanceError(_)), "{err}");
    }

    #[test]
    fn test_insufficient_inputs() {
        let mut builder = TransactionBuilder::new(config());
        builder.add_input(key_input(1, 2 * ADA));
        builder.add_output(output(5 * ADA)).unwrap();
        assert!(matches!(
            builder.build(&change_address()),
            Err(BuilderError::UTxOBalanceError(_))
        ));
    }

    #[test]
    fn test_output_checks() {
        let mut builder = TransactionBuilder::new(config());
        let err = builder.add_output(output(1_000)).unwrap_err();
        assert!(matches!(err, BuilderError::OutputBelowMinAda { .. }));

        let tight = TransactionBuilderConfig {
            max_value_size: 4,
            ..config()
        };
        let mut builder = TransactionBuilder::new(tight);
        let err = builder.add_output(output(5 * ADA)).unwrap_err();
        assert!(matches!(err, BuilderError::ValueSizeExceeded { .. }));
    }

    #[test]
    fn test_auto_min_ada_output_is_accepted() {
        let config = config();
        let mut tokens = MultiAsset::new();
        tokens.set_asset(
            &PolicyId::from_raw([5; 28]),
            &AssetName::new(b"TOK".to_vec()).unwrap(),
            BigNum::new(1),
        );
        let recipient = Address::Enterprise(EnterpriseAddress {
            network: 1,
            payment: Credential::from_keyhash(&Ed25519KeyHash::from_raw([0x22; 28])),
        });
        let amount_builder = TransactionOutputBuilder::new().with_address(recipient).next().unwrap();

        let byte_only = amount_builder
            .clone()
            .with_asset_and_min_required_coin(tokens.clone(), &config.coins_per_utxo_byte, None)
            .unwrap()
            .build()
            .unwrap();
        let both = amount_builder
            .with_asset_and_min_required_coin(
                tokens,
                &config.coins_per_utxo_byte,
                config.coins_per_utxo_word.as_ref(),
            )
            .unwrap()
            .build()
            .unwrap();

        // The legacy word rule dominates for a small single-asset bundle.
        assert!(both.output.amount.coin() > byte_only.output.amount.coin());
        assert!(
            both.output.amount.coin()
                >= min_ada_required(&both.output, &config.coins_per_utxo_byte).unwrap()
        );

        let mut builder = TransactionBuilder::new(config.clone());
        assert!(matches!(
            builder.add_output(byte_only),
            Err(BuilderError::OutputBelowMinAda { .. })
        ));
        builder.add_output(both).unwrap();
    }

    #[test]
    fn test_max_tx_size() {
        let tiny = TransactionBuilderConfig {
            max_tx_size: 100,
            ..config()
        };
        let mut builder = TransactionBuilder::new(tiny);
        builder.add_input(key_input(1, 10 * ADA));
        assert!(matches!(
            builder.build(&change_address()),
            Err(BuilderError::MaxTxSizeExceeded { .. })
        ));
    }

    #[test]
    fn test_selection_funds_outputs() {
        let mut builder = TransactionBuilder::new(config());
        for (seed, amount) in [(1, 3 * ADA), (2, 50 * ADA), (3, 20 * ADA)] {
            builder.add_utxo(utxo(seed, key_address(&key()), amount));
        }
        builder.add_output(output(30 * ADA)).unwrap();
        builder
            .select_utxos_with_rng(CoinSelectionStrategyCIP2::LargestFirst, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert_eq!(builder.get_explicit_input().unwrap().coin(), BigNum::new(50 * ADA));
        builder.build(&change_address()).unwrap();
    }

    #[test]
    fn test_selection_skips_script_utxos() {
        let script_addr = Address::Enterprise(EnterpriseAddress {
            network: 1,
            payment: Credential::from_scripthash(&ScriptHash::from_raw([1; 28])),
        });
        let mut builder = TransactionBuilder::new(config());
        builder.add_utxo(utxo(1, script_addr, 100 * ADA));
        builder.add_output(output(5 * ADA)).unwrap();
        let err = builder
            .select_utxos_with_rng(CoinSelectionStrategyCIP2::LargestFirst, &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, BuilderError::Selection(_)));
    }

    #[test]
    fn test_mint_counts_as_input_and_lands_in_change() {
        let policy = NativeScript::ScriptPubkey(key().to_public().hash());
        let name = AssetName::new(b"NFT".to_vec()).unwrap();
        let mut builder = TransactionBuilder::new(config());
        builder.add_input(key_input(1, 10 * ADA));
        builder.add_mint(
            SingleMintBuilder::new_single_asset(name.clone(), Int::new_i32(1))
                .native_script(policy.clone(), NativeScriptWitnessInfo::AssumeSignatureCount),
        );
        let total = builder.get_total_input().unwrap();
        assert_eq!(
            total.multiasset().map(|ma| ma.get_asset(&policy.hash(), &name)),
            Some(BigNum::one())
        );
        let signed = builder.build(&change_address()).unwrap();
        let change = signed.body().outputs.last().unwrap();
        assert_eq!(
            change.amount.multiasset().map(|ma| ma.get_asset(&policy.hash(), &name)),
            Some(BigNum::one())
        );
        assert_eq!(signed.witness_set_builder().build().native_scripts, vec![policy]);
    }

    #[test]
    fn test_collateral_rules() {
        let mut builder = TransactionBuilder::new(config());
        let script = NativeScript::ScriptAll(vec![]);
        let script_utxo = utxo(
            9,
            Address::Enterprise(EnterpriseAddress {
                network: 1,
                payment: Credential::from_scripthash(&script.hash()),
            }),
            5 * ADA,
        );
        let script_input = SingleInputBuilder::from_utxo(&script_utxo)
            .native_script(script, NativeScriptWitnessInfo::Count(0))
            .unwrap();
        assert_eq!(
            builder.add_collateral(script_input).unwrap_err(),
            BuilderError::CollateralMustBeKeyLocked
        );

        builder.add_collateral(key_input(4, 5 * ADA)).unwrap();
        builder
            .set_collateral_return(TransactionOutput::new(
                change_address(),
                Value::new(BigNum::new(3 * ADA)),
            ))
            .unwrap();
        builder.add_input(key_input(1, 10 * ADA));
        let body = builder.build(&change_address()).unwrap().body().clone();
        assert_eq!(body.total_collateral, Some(BigNum::new(2 * ADA)));
        assert_eq!(body.collateral.map(|c| c.len()), Some(1));
    }

    #[test]
    fn test_plutus_flow_needs_ex_units() {
        let script = PlutusScript::new(Language::PlutusV2, vec![0x4e, 0x4d, 0x01, 0x00, 0x00]);
        let script_addr = Address::Base(BaseAddress {
            network: 1,
            payment: Credential::from_scripthash(&script.hash()),
            stake: stake_cred(),
        });
        let datum = PlutusData::new_bytes(vec![1]);
        let locked = TransactionUnspentOutput::new(
            TransactionInput::new(TransactionHash::from_raw([5; 32]), 1),
            TransactionOutput::new(script_addr, Value::new(BigNum::new(20 * ADA)))
                .with_datum(crate::ledger::Datum::Data(datum)),
        );
        let spend = SingleInputBuilder::from_utxo(&locked)
            .plutus_script(
                PartialPlutusWitness::new(PlutusScriptWitness::Script(script), PlutusData::unit()),
                vec![],
                None,
            )
            .unwrap();

        let mut builder = TransactionBuilder::new(config());
        builder.add_input(key_input(1, 10 * ADA));
        builder.add_input(spend);
        builder.add_collateral(key_input(2, 5 * ADA)).unwrap();

        let draft = builder.build_for_evaluation(&change_address()).unwrap();
        // 0x01.. sorts before 0x05.., so the script input is spend:1.
        let key = RedeemerWitnessKey::new(RedeemerTag::Spend, 1);
        assert_eq!(draft.redeemer_keys(), vec![key]);
        assert!(draft.draft_body().script_data_hash.is_some());

        let err = builder.clone().build(&change_address()).unwrap_err();
        assert_eq!(
            err,
            BuilderError::MissingExUnits {
                tag: RedeemerTag::Spend,
                index: 1
            }
        );

        assert!(builder.set_exunits(key, ExUnits::new(500_000, 200_000_000)));
        let signed = builder.build(&change_address()).unwrap();
        let redeemers = signed.witness_set_builder().redeemers().unwrap();
        assert_eq!(redeemers.iter().next().unwrap().ex_units, ExUnits::new(500_000, 200_000_000));
        assert!(signed.body().script_data_hash.is_some());
    }

    #[test]
    fn test_reference_script_language_must_be_known() {
        let hash = ScriptHash::from_raw([0x44; 28]);
        let locked = utxo(
            7,
            Address::Enterprise(EnterpriseAddress {
                network: 1,
                payment: Credential::from_scripthash(&hash),
            }),
            10 * ADA,
        );
        let spend = SingleInputBuilder::from_utxo(&locked)
            .plutus_script(
                PartialPlutusWitness::new(PlutusScriptWitness::Ref(hash), PlutusData::unit()),
                vec![],
                None,
            )
            .unwrap();
        let mut builder = TransactionBuilder::new(config());
        builder.add_input(spend);
        assert_eq!(builder.min_fee().unwrap_err(), BuilderError::MissingScriptWitness(hash));
    }

    #[test]
    fn test_delegation_certificate_needs_signature() {
        let mut builder = TransactionBuilder::new(config());
        builder.add_input(key_input(1, 10 * ADA));
        builder.add_cert(
            SingleCertificateBuilder::new(Certificate::StakeDelegation {
                stake_credential: stake_cred(),
                pool_keyhash: PoolKeyHash::from_raw([0x55; 28]),
            })
            .payment_key()
            .unwrap(),
        );
        let signed = builder.build(&change_address()).unwrap();
        // Payment and stake key are the same key here.
        let remaining = signed.witness_set_builder().remaining_wits();
        assert_eq!(remaining.vkeys().len(), 1);
    }

    #[test]
    fn test_config_builder_reports_missing_fields() {
        let err = TransactionBuilderConfigBuilder::new()
            .fee_algo(LinearFee::new(BigNum::new(44), BigNum::new(155_381)))
            .build()
            .unwrap_err();
        assert_eq!(err, BuilderError::UninitializedField("pool_deposit"));

        let params = ProtocolParams::default();
        let built = TransactionBuilderConfigBuilder::new()
            .fee_algo(LinearFee::from(&params))
            .pool_deposit(BigNum::new(params.pool_deposit))
            .key_deposit(BigNum::new(params.key_deposit))
            .max_value_size(params.max_value_size)
            .max_tx_size(params.max_tx_size)
            .coins_per_utxo_byte(BigNum::new(params.coins_per_utxo_byte))
            .coins_per_utxo_word(BigNum::new(params.coins_per_utxo_word.unwrap()))
            .ex_unit_prices(params.ex_unit_prices())
            .build()
            .unwrap();
        assert_eq!(built, config());
    }

    #[test]
    fn test_message_sets_auxiliary_hash() {
        let mut builder = TransactionBuilder::new(config());
        builder.add_input(key_input(1, 10 * ADA));
        builder.set_auxiliary_data(AuxiliaryData::with_message(&["hello"]).unwrap());
        let signed = builder.build(&change_address()).unwrap();
        assert!(signed.body().auxiliary_data_hash.is_some());
    }
}
