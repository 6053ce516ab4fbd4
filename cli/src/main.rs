// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # txforge
//!
//! Entry point for the `txforge` binary. Parses CLI arguments, initializes
//! logging, and runs one subcommand:
//!
//! - `build`    — build a balanced, unsigned transaction from a request file
//! - `assemble` — merge a wallet's witness set into a transaction
//! - `hash`     — print a transaction's hash
//! - `min-fee`  — print the minimum fee of a transaction
//! - `version`  — print build version information

mod cli;
mod logging;
mod request;

use anyhow::{Context, Result};
use clap::Parser;

use txforge::ledger::RawTransaction;

use cli::{Commands, TxForgeCli};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = TxForgeCli::parse();
    logging::init_logging(&cli.log_level, LogFormat::from_str_lossy(&cli.log_format));

    match cli.command {
        Commands::Build(args) => {
            let params = request::load_params(args.params.as_deref())?;
            let request = request::load_request(&args.request)?;
            let response = request::build(&request, &params)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Assemble(args) => {
            let signed = txforge::connector::assemble_signed_tx(&args.tx, &args.witness_set)
                .context("failed to assemble signed transaction")?;
            println!("{signed}");
        }
        Commands::Hash(args) => {
            let bytes = hex::decode(args.tx.trim()).context("transaction is not hex")?;
            let raw = RawTransaction::split(&bytes).context("not a transaction")?;
            println!("{}", raw.body_hash());
        }
        Commands::MinFee(args) => {
            let params = request::load_params(args.params.as_deref())?;
            let response = request::min_fee(&args.tx, &params)?;
            println!("{}", serde_json::to_string(&response)?);
        }
        Commands::Version => print_version(),
    }
    Ok(())
}

fn print_version() {
    println!("txforge {}", env!("CARGO_PKG_VERSION"));
    println!(
        "  mainnet defaults: min_fee_a={} min_fee_b={} coins_per_utxo_byte={}",
        txforge::config::MIN_FEE_COEFFICIENT,
        txforge::config::MIN_FEE_CONSTANT,
        txforge::config::COINS_PER_UTXO_BYTE,
    );
}
