//! # Builders
//!
//! Transactions are put together in two layers:
//!
//! 1. **Item builders** ([`input_builder`], [`output_builder`],
//!    [`certificate_builder`], [`withdrawal_builder`], [`mint_builder`])
//!    each wrap one ledger item and end in exactly one terminal call that
//!    says how it will be witnessed: `skip_witness()`, `payment_key()`,
//!    `native_script(..)` or `plutus_script(..)`. The result pairs the item
//!    with the witnesses it requires.
//! 2. The [`tx_builder::TransactionBuilder`] collects those results, selects
//!    more inputs if asked, prices the whole thing, and balances it into a
//!    single change output.
//!
//! Witness bookkeeping lives in [`witness_builder`], redeemer indexing in
//! [`redeemer_builder`], and final assembly of body plus signatures in
//! [`signed_tx`].

pub mod certificate_builder;
pub mod input_builder;
pub mod mint_builder;
pub mod output_builder;
pub mod redeemer_builder;
pub mod signed_tx;
pub mod tx_builder;
pub mod withdrawal_builder;
pub mod witness_builder;

use thiserror::Error;

use crate::crypto::{DatumHash, ScriptHash};
use crate::ledger::RedeemerTag;
use crate::selection::SelectionError;
use crate::value::{ArithmeticError, Coin};

pub use certificate_builder::{CertificateBuilderResult, SingleCertificateBuilder};
pub use input_builder::{InputBuilderResult, SingleInputBuilder};
pub use mint_builder::{MintBuilderResult, SingleMintBuilder};
pub use output_builder::{
    SingleOutputBuilderResult, TransactionOutputAmountBuilder, TransactionOutputBuilder,
};
pub use redeemer_builder::RedeemerSetBuilder;
pub use signed_tx::SignedTxBuilder;
pub use tx_builder::{
    DraftTransaction, TransactionBuilder, TransactionBuilderConfig,
    TransactionBuilderConfigBuilder,
};
pub use withdrawal_builder::{SingleWithdrawalBuilder, WithdrawalBuilderResult};
pub use witness_builder::{
    InputAggregateWitnessData, NativeScriptWitnessInfo, PartialPlutusWitness, PlutusScriptWitness,
    RedeemerWitnessKey, RequiredWitnessSet, TransactionWitnessSetBuilder, WitnessError,
};

/// Everything that can go wrong while assembling or balancing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuilderError {
    /// Inputs can't cover outputs, deposits and fee, or the change left
    /// over would be an output the ledger rejects.
    #[error("UTxO balance error: {0}")]
    UTxOBalanceError(String),

    #[error(transparent)]
    MissingWitnesses(#[from] WitnessError),

    #[error("transaction is {size} bytes, the limit is {max}")]
    MaxTxSizeExceeded { size: usize, max: u32 },

    /// The supplied script doesn't hash to the credential it must witness,
    /// or a reference script was never provided.
    #[error("missing script witness for {0}")]
    MissingScriptWitness(ScriptHash),

    /// The output being spent commits to a datum hash the caller didn't
    /// supply a matching datum for.
    #[error("missing datum for hash {0}")]
    MissingDatum(DatumHash),

    /// A terminal call that doesn't fit the item's credential, e.g.
    /// `payment_key()` on a script address.
    #[error("wrong witness kind for this item ({found})")]
    WrongCredentialKind { found: &'static str },

    #[error("required field `{0}` was never set")]
    UninitializedField(&'static str),

    #[error("redeemer {tag}:{index} still has placeholder execution units")]
    MissingExUnits { tag: RedeemerTag, index: u64 },

    #[error("fee {fee} is below the minimum {min}")]
    FeeBelowMinimum { fee: Coin, min: Coin },

    #[error("output value is {size} bytes, the limit is {max}")]
    ValueSizeExceeded { size: usize, max: u32 },

    #[error("output carries {coin} lovelace, needs at least {min}")]
    OutputBelowMinAda { coin: Coin, min: Coin },

    #[error("collateral inputs must be locked by a payment key")]
    CollateralMustBeKeyLocked,

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// What kind of credential locks something, for error messages.
pub(crate) fn credential_kind(cred: Option<&crate::address::Credential>) -> &'static str {
    match cred {
        Some(c) if c.is_script() => "script credential",
        Some(_) => "key credential",
        None => "no payment credential",
    }
}
