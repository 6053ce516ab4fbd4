// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # txforge — Cardano Transaction Construction
//!
//! txforge turns "pay these people, delegate to that pool, mint this
//! token" into a balanced, correctly priced, byte-exact Cardano
//! transaction. It does no I/O: UTXOs, protocol parameters and signatures
//! come in from outside, CBOR goes out.
//!
//! ## Architecture
//!
//! - **value** — `BigNum`, `Int`, multi-asset `Value` and `Mint`, with
//!   checked arithmetic and a partial order. Money never wraps.
//! - **codec** — Canonical CBOR helpers. Maps keep insertion order because
//!   hashes are taken over the bytes, not over an abstract structure.
//! - **crypto** — Blake2b hash newtypes, Ed25519 keys and vkey witnesses.
//! - **address** — Shelley header-byte addresses, bech32, Byron base58.
//! - **ledger** — Bodies, outputs, certificates, scripts, Plutus data,
//!   redeemers, metadata, witness sets.
//! - **hashing** — Transaction, datum, auxiliary-data and script-data
//!   hashes.
//! - **fees** — Linear fee, script execution fee, minimum ADA per output.
//! - **selection** — CIP-2 coin selection (largest-first, random-improve,
//!   and their multi-asset variants).
//! - **builders** — Item builders, witness accounting, redeemer indexing,
//!   and the `TransactionBuilder` that balances it all.
//! - **connector** — The seam to wallets and Plutus evaluators.
//! - **config** — Protocol constants and `ProtocolParams`.
//!
//! ## Design Philosophy
//!
//! 1. The node is the reference. If a hash disagrees with a node's, we are wrong.
//! 2. Arithmetic is checked everywhere. An overflow is an error, not a wrap.
//! 3. Estimates err high. A fee one byte too large is a rounding error; one
//!    byte too small is a rejected transaction.

pub mod address;
pub mod builders;
pub mod codec;
pub mod config;
pub mod connector;
pub mod crypto;
pub mod error;
pub mod fees;
pub mod hashing;
pub mod ledger;
pub mod selection;
pub mod value;

pub use error::{DeserializeError, Result, TxForgeError};
