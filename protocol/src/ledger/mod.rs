//! # Ledger Entities
//!
//! The on-chain data model, each type with hand-written CBOR impls that
//! match the ledger's binary format byte for byte. Builders in
//! [`crate::builders`] assemble these; nothing here knows about balancing
//! or fees.

pub mod certificate;
pub mod metadata;
pub mod plutus_data;
pub mod redeemer;
pub mod script;
pub mod transaction;
pub mod utxo;
pub mod witness;

pub use certificate::{Certificate, PoolMetadata, PoolParams, Relay};
pub use metadata::{
    AuxiliaryData, GeneralTransactionMetadata, MetadataJsonSchema, MetadataList, MetadataMap,
    TransactionMetadatum,
};
pub use plutus_data::{ConstrPlutusData, PlutusData, PlutusDatumSchema, PlutusList, PlutusMap};
pub use redeemer::{
    CostModel, Costmdls, ExUnitPrices, ExUnits, Redeemer, RedeemerTag, Redeemers, UnitInterval,
};
pub use script::{Language, NativeScript, PlutusScript, Script};
pub use transaction::{RawTransaction, Transaction, TransactionBody, Withdrawals};
pub use utxo::{Datum, TransactionInput, TransactionOutput, TransactionUnspentOutput};
pub use witness::TransactionWitnessSet;
