//! # CLI Interface
//!
//! Defines the command-line argument structure for `txforge` using
//! `clap` derive. Supports five subcommands: `build`, `assemble`, `hash`,
//! `min-fee`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cardano transaction builder.
///
/// Builds balanced transactions from a JSON request, folds wallet
/// signatures into them, and inspects serialized transactions. Reads files
/// and flags, writes hex or JSON to stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "txforge",
    about = "Cardano transaction builder",
    version,
    propagate_version = true
)]
pub struct TxForgeCli {
    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "TXFORGE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, global = true, env = "TXFORGE_LOG", default_value = "txforge=info")]
    pub log_level: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the txforge binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a balanced, unsigned transaction from a request file.
    Build(BuildArgs),
    /// Merge a wallet's witness set into a transaction.
    Assemble(AssembleArgs),
    /// Print a transaction's hash.
    Hash(HashArgs),
    /// Print the minimum fee of a transaction.
    MinFee(MinFeeArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Path to the build request (JSON).
    #[arg(long, short = 'r', env = "TXFORGE_REQUEST")]
    pub request: PathBuf,

    /// Protocol parameters (JSON). Mainnet defaults when omitted.
    #[arg(long, short = 'p', env = "TXFORGE_PARAMS")]
    pub params: Option<PathBuf>,
}

/// Arguments for the `assemble` subcommand.
#[derive(Parser, Debug)]
pub struct AssembleArgs {
    /// Transaction CBOR hex, as produced by `build`.
    #[arg(long, env = "TXFORGE_TX")]
    pub tx: String,

    /// Witness set CBOR hex, as returned by the wallet.
    #[arg(long, env = "TXFORGE_WITNESS_SET")]
    pub witness_set: String,
}

/// Arguments for the `hash` subcommand.
#[derive(Parser, Debug)]
pub struct HashArgs {
    /// Transaction CBOR hex.
    #[arg(long, env = "TXFORGE_TX")]
    pub tx: String,
}

/// Arguments for the `min-fee` subcommand.
#[derive(Parser, Debug)]
pub struct MinFeeArgs {
    /// Transaction CBOR hex.
    #[arg(long, env = "TXFORGE_TX")]
    pub tx: String,

    /// Protocol parameters (JSON). Mainnet defaults when omitted.
    #[arg(long, short = 'p', env = "TXFORGE_PARAMS")]
    pub params: Option<PathBuf>,
}
