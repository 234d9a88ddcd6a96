//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "zerocoin")]
#[command(about = "Zerocoin engine - anonymous mint and spend of fixed-denomination coins", long_about = None)]
pub struct Cli {
    /// JSON config file; defaults and ZEROCOIN_* variables are used otherwise
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an in-process mint, confirm, spend and replay cycle
    Simulate {
        /// Amount to mint
        #[arg(short, long, default_value = "6666")]
        mint: u64,

        /// Amount to spend once the mints mature
        #[arg(short, long, default_value = "115")]
        spend: u64,

        /// Spend type (spend, stake, mn-collateral, sign-message)
        #[arg(short = 't', long, default_value = "spend")]
        spend_type: String,

        /// Other coins minted per denomination, as anonymity set
        #[arg(short, long, default_value = "4")]
        decoys: usize,

        /// Coin selection strategy
        #[arg(long, value_enum, default_value = "decomposing")]
        selector: SelectorKind,

        /// Write the final state snapshot here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show how an amount splits into denominations
    Denominations {
        /// Amount to decompose
        amount: u64,
    },

    /// Summarize a saved state snapshot
    Inspect {
        /// Snapshot written by `simulate --output`
        path: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SelectorKind {
    /// One coin of exactly the requested denomination
    Exact,
    /// Exact match across coins when possible, otherwise spend with change
    Decomposing,
}
