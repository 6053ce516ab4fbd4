//! End-to-end tests for transaction building.
//!
//! Each test goes from raw UTXOs to a serialized transaction and checks
//! what a node would check: value is preserved, the fee covers the final
//! size, signatures verify against the body hash, and the bytes decode
//! back to the same transaction.

use txforge::address::{Address, BaseAddress, Credential, EnterpriseAddress};
use txforge::builders::{
    PartialPlutusWitness, PlutusScriptWitness, SingleInputBuilder, SingleMintBuilder,
    TransactionBuilder, TransactionBuilderConfig, TransactionOutputBuilder, NativeScriptWitnessInfo,
};
use txforge::codec::CborEncoding;
use txforge::config::ProtocolParams;
use txforge::connector::{apply_evaluation, parse_evaluation};
use txforge::crypto::{Ed25519KeyHash, PrivateKey, TransactionHash};
use txforge::fees;
use txforge::hashing::hash_auxiliary_data;
use txforge::ledger::{
    AuxiliaryData, Datum, Language, NativeScript, PlutusData, PlutusScript, Transaction,
    TransactionInput, TransactionMetadatum, TransactionOutput, TransactionUnspentOutput,
};
use txforge::selection::CoinSelectionStrategyCIP2;
use txforge::value::{AssetName, BigNum, Int, MultiAsset, Value};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const ADA: u64 = 1_000_000;

fn params() -> ProtocolParams {
    ProtocolParams::default()
}

fn config() -> TransactionBuilderConfig {
    TransactionBuilderConfig::from(&params())
}

fn wallet_key() -> PrivateKey {
    PrivateKey::from_seed(&[42; 32])
}

fn wallet_address() -> Address {
    let hash = wallet_key().to_public().hash();
    Address::Base(BaseAddress {
        network: 0,
        payment: Credential::from_keyhash(&hash),
        stake: Credential::from_keyhash(&hash),
    })
}

fn recipient() -> Address {
    Address::Enterprise(EnterpriseAddress {
        network: 0,
        payment: Credential::from_keyhash(&Ed25519KeyHash::from_raw([0x77; 28])),
    })
}

fn utxo(seed: u8, value: Value) -> TransactionUnspentOutput {
    TransactionUnspentOutput::new(
        TransactionInput::new(TransactionHash::from_raw([seed; 32]), u64::from(seed % 3)),
        TransactionOutput::new(wallet_address(), value),
    )
}

fn ada(n: u64) -> Value {
    Value::new(BigNum::new(n * ADA))
}

fn pay(builder: &mut TransactionBuilder, lovelace: u64) {
    let output = TransactionOutputBuilder::new()
        .with_address(recipient())
        .next()
        .unwrap()
        .with_coin(BigNum::new(lovelace))
        .build()
        .unwrap();
    builder.add_output(output).unwrap();
}

fn sum_outputs(tx: &Transaction) -> u64 {
    tx.body.outputs.iter().map(|o| o.amount.coin().as_u64()).sum()
}

// ---------------------------------------------------------------------------
// Simple payments
// ---------------------------------------------------------------------------

#[test]
fn payment_is_balanced_signed_and_round_trips() {
    let mut builder = TransactionBuilder::new(config());
    builder.add_input(
        SingleInputBuilder::from_utxo(&utxo(1, ada(100)))
            .payment_key()
            .unwrap(),
    );
    pay(&mut builder, 40 * ADA);

    let mut signed = builder.build(&wallet_address()).unwrap();
    signed.sign_with(&wallet_key());
    let tx = signed.build_checked().unwrap();

    // 100 in, 40 out, the rest is change minus fee.
    assert_eq!(tx.body.outputs.len(), 2);
    assert_eq!(tx.body.outputs[1].address, wallet_address());
    assert_eq!(sum_outputs(&tx) + tx.body.fee.as_u64(), 100 * ADA);

    let min = fees::min_fee(&tx, &config().fee_algo, &config().ex_unit_prices).unwrap();
    assert!(tx.body.fee >= min, "fee {} below minimum {}", tx.body.fee, min);
    // The estimate is pessimistic by the fee field's width only.
    assert!(tx.body.fee.as_u64() - min.as_u64() <= 10 * 44);

    let decoded = Transaction::from_bytes(&tx.to_bytes()).unwrap();
    assert_eq!(decoded, tx);
    let witness = &decoded.witness_set.vkeywitnesses[0];
    assert!(witness.vkey.verify(decoded.hash().as_bytes(), &witness.signature));
}

#[test]
fn selection_and_change_for_each_strategy() {
    for strategy in [
        CoinSelectionStrategyCIP2::LargestFirst,
        CoinSelectionStrategyCIP2::RandomImprove,
        CoinSelectionStrategyCIP2::LargestFirstMultiAsset,
        CoinSelectionStrategyCIP2::RandomImproveMultiAsset,
    ] {
        let mut builder = TransactionBuilder::new(config());
        for (seed, amount) in [(1, 4), (2, 9), (3, 15), (4, 30), (5, 2)] {
            builder.add_utxo(utxo(seed, ada(amount)));
        }
        pay(&mut builder, 20 * ADA);
        builder.select_utxos(strategy).unwrap();

        let input = builder.get_explicit_input().unwrap().coin().as_u64();
        let tx = builder.build(&wallet_address()).unwrap().build_unchecked();
        assert_eq!(sum_outputs(&tx) + tx.body.fee.as_u64(), input, "{strategy}");
    }
}

#[test]
fn assets_in_inputs_land_in_change() {
    let policy = NativeScript::ScriptPubkey(Ed25519KeyHash::from_raw([5; 28])).hash();
    let name = AssetName::new(b"HOSKY".to_vec()).unwrap();
    let mut tokens = MultiAsset::new();
    tokens.set_asset(&policy, &name, BigNum::new(1_000));

    let mut builder = TransactionBuilder::new(config());
    builder.add_utxo(utxo(1, Value::new_with_assets(BigNum::new(5 * ADA), tokens)));
    builder.add_utxo(utxo(2, ada(10)));
    pay(&mut builder, 3 * ADA);
    builder
        .select_utxos(CoinSelectionStrategyCIP2::LargestFirstMultiAsset)
        .unwrap();

    let tx = builder.build(&wallet_address()).unwrap().build_unchecked();
    let change = tx.body.outputs.last().unwrap();
    // Tokens can only have come from utxo 1, so it must have been spent
    // iff the change carries them.
    let spent_token_utxo = tx.body.inputs.iter().any(|i| i.transaction_id == TransactionHash::from_raw([1; 32]));
    let change_tokens = change
        .amount
        .multiasset()
        .map(|ma| ma.get_asset(&policy, &name))
        .unwrap_or_default();
    assert_eq!(spent_token_utxo, change_tokens == BigNum::new(1_000));
}

// ---------------------------------------------------------------------------
// Minting
// ---------------------------------------------------------------------------

#[test]
fn mint_and_burn_balance() {
    let key = wallet_key();
    let policy_script = NativeScript::ScriptPubkey(key.to_public().hash());
    let policy = policy_script.hash();
    let name = AssetName::new(b"TICKET".to_vec()).unwrap();

    let mut builder = TransactionBuilder::new(config());
    builder.add_input(
        SingleInputBuilder::from_utxo(&utxo(1, ada(20)))
            .payment_key()
            .unwrap(),
    );
    builder.add_mint(
        SingleMintBuilder::new_single_asset(name.clone(), Int::new_i32(10))
            .native_script(policy_script, NativeScriptWitnessInfo::AssumeSignatureCount),
    );

    let mut signed = builder.build(&wallet_address()).unwrap();
    signed.sign_with(&key);
    let tx = signed.build_checked().unwrap();

    let change = tx.body.outputs.last().unwrap();
    assert_eq!(
        change.amount.multiasset().map(|ma| ma.get_asset(&policy, &name)),
        Some(BigNum::new(10))
    );
    assert_eq!(tx.witness_set.native_scripts.len(), 1);
    let minted = tx.body.mint.as_ref().and_then(|m| m.get(&policy)).and_then(|a| a.get(&name));
    assert_eq!(minted, Some(Int::new_i32(10)));
}

// ---------------------------------------------------------------------------
// Plutus
// ---------------------------------------------------------------------------

#[test]
fn plutus_spend_through_evaluator() {
    let script = PlutusScript::new(Language::PlutusV2, vec![0x46, 0x01, 0x00, 0x00, 0x22, 0x00, 0x11]);
    let script_address = Address::Enterprise(EnterpriseAddress {
        network: 0,
        payment: Credential::from_scripthash(&script.hash()),
    });
    let locked = TransactionUnspentOutput::new(
        TransactionInput::new(TransactionHash::from_raw([9; 32]), 0),
        TransactionOutput::new(script_address, ada(30))
            .with_datum(Datum::Data(PlutusData::new_integer(Int::new_i32(42)))),
    );

    let mut builder = TransactionBuilder::new(config());
    builder.add_input(
        SingleInputBuilder::from_utxo(&locked)
            .plutus_script(
                PartialPlutusWitness::new(PlutusScriptWitness::Script(script), PlutusData::unit()),
                vec![],
                None,
            )
            .unwrap(),
    );
    builder.add_input(
        SingleInputBuilder::from_utxo(&utxo(1, ada(5)))
            .payment_key()
            .unwrap(),
    );
    builder
        .add_collateral(
            SingleInputBuilder::from_utxo(&utxo(2, ada(5)))
                .payment_key()
                .unwrap(),
        )
        .unwrap();

    let draft = builder.build_for_evaluation(&wallet_address()).unwrap();
    assert_eq!(draft.redeemer_keys().len(), 1);
    let draft_fee = draft.draft_body().fee;

    // What an evaluator would report for the redeemer at spend:1
    // (0x01.. sorts before 0x09..).
    let report = r#"{ "spend:1": { "memory": 1200000, "steps": 400000000 } }"#;
    let budgets = parse_evaluation(report).unwrap();
    assert_eq!(apply_evaluation(&mut builder, &budgets), 1);

    let mut signed = builder.build(&wallet_address()).unwrap();
    signed.sign_with(&wallet_key());
    let tx = signed.build_checked().unwrap();

    assert!(tx.body.fee < draft_fee, "real budgets are cheaper than the placeholder");
    assert!(tx.body.script_data_hash.is_some());
    assert_eq!(tx.body.collateral.as_ref().map(Vec::len), Some(1));
    assert_eq!(sum_outputs(&tx) + tx.body.fee.as_u64(), 35 * ADA);
    let min = fees::min_fee(&tx, &config().fee_algo, &config().ex_unit_prices).unwrap();
    assert!(tx.body.fee >= min);
}

// ---------------------------------------------------------------------------
// Canonical encoding
// ---------------------------------------------------------------------------

#[test]
fn metadata_insertion_order_changes_the_hash() {
    let entry = |n: i32| TransactionMetadatum::new_int(Int::new_i32(n));

    let mut first = AuxiliaryData::new();
    first.add_metadatum(BigNum::new(1), entry(1));
    first.add_metadatum(BigNum::new(2), entry(2));

    let mut second = AuxiliaryData::new();
    second.add_metadatum(BigNum::new(2), entry(2));
    second.add_metadatum(BigNum::new(1), entry(1));

    assert_ne!(hash_auxiliary_data(&first), hash_auxiliary_data(&second));

    let build = |aux: AuxiliaryData| {
        let mut builder = TransactionBuilder::new(config());
        builder.add_input(
            SingleInputBuilder::from_utxo(&utxo(1, ada(10)))
                .payment_key()
                .unwrap(),
        );
        builder.set_auxiliary_data(aux);
        builder.build(&wallet_address()).unwrap().body().hash()
    };
    assert_ne!(build(first), build(second));
}

#[test]
fn cip20_message_survives_serialization() {
    let long_line = "a".repeat(100);
    let mut builder = TransactionBuilder::new(config());
    builder.add_input(
        SingleInputBuilder::from_utxo(&utxo(1, ada(10)))
            .payment_key()
            .unwrap(),
    );
    builder.set_auxiliary_data(AuxiliaryData::with_message(&["gm", long_line.as_str()]).unwrap());
    let tx = builder.build(&wallet_address()).unwrap().build_unchecked();

    let decoded = Transaction::from_hex(&tx.to_hex()).unwrap();
    let message = decoded.auxiliary_data.and_then(|a| a.message()).unwrap();
    assert_eq!(message.len(), 3);
    assert_eq!(message[0], "gm");
    assert_eq!(message[1].len(), 64);
    assert_eq!(message[2].len(), 36);
}
