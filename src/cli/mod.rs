//! Command line interface
//!
//! - `run`: start the trading engine
//! - `summary`: print the trade journal summary
//! - `reset`: wipe the trade journal
//! - `config`: show the effective configuration

mod journal;
mod run;

pub use journal::{ResetArgs, SummaryArgs};
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "kalshi-momentum")]
#[command(about = "Momentum convergence trading engine for Kalshi binary markets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the trading engine
    Run(RunArgs),
    /// Print the trade journal summary
    Summary(SummaryArgs),
    /// Wipe the trade journal
    Reset(ResetArgs),
    /// Show the effective configuration
    Config,
}
