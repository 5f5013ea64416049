//! Command-line parsing for the Treasury yield loader.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the loading/caching code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_DATASET;
use crate::domain::SpreadPair;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "yields", version, about = "U.S. Treasury daily yield-curve loader")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct GlobalArgs {
    /// Dataset configuration file (default: `$YIELDS_CONFIG` or `datalocations.toml`).
    #[arg(long, global = true, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// HTTP timeout in seconds for the remote fetch (default: `$YIELDS_HTTP_TIMEOUT_SECS` or 30).
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Log cache decisions and fetches to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the yield window ending at a date (refreshing the local store if stale).
    Frame(WindowArgs),
    /// Print maturity spreads and flag inversions.
    Spreads(SpreadArgs),
    /// Print the yield curve for the last few dates (maturities as rows).
    Curves(CurveArgs),
    /// Create the local store from the published table.
    Bootstrap(BootstrapArgs),
    /// List configured datasets.
    Datasets,
}

/// Which window of which dataset to load.
#[derive(Debug, Args, Clone)]
pub struct WindowArgs {
    /// Last date of the window (YYYYMMDD, YYYY-MM-DD, MM/DD/YYYY, MM/DD/YY, "Mon DD, YYYY"). Default: today.
    #[arg(short, long)]
    pub date: Option<String>,

    /// Dataset name from the configuration file.
    #[arg(long, default_value = DEFAULT_DATASET)]
    pub dataset: String,

    /// Number of rows to keep.
    #[arg(short = 'n', long, default_value_t = 252)]
    pub lookback: usize,

    /// Restrict output to these maturities (e.g. `--maturity 2_yr,10_yr`).
    #[arg(short, long, value_delimiter = ',')]
    pub maturity: Vec<String>,

    /// Export the printed frame to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the printed frame to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SpreadArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Spread as LONG:SHORT (repeatable). Default: 10_yr:2_yr, 10_yr:6_mo, 5_yr:2_yr.
    #[arg(short, long = "pair", value_name = "LONG:SHORT")]
    pub pairs: Vec<SpreadPair>,
}

#[derive(Debug, Args, Clone)]
pub struct CurveArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// How many of the most recent dates to show.
    #[arg(long, default_value_t = 5)]
    pub last: usize,
}

#[derive(Debug, Args, Clone)]
pub struct BootstrapArgs {
    /// Dataset name from the configuration file.
    #[arg(long, default_value = DEFAULT_DATASET)]
    pub dataset: String,

    /// Year of the published table to seed from (default: configured year, else the current year).
    #[arg(long)]
    pub year: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spreads_accept_repeated_pairs() {
        let cli = Cli::parse_from(["yields", "spreads", "--pair", "10_yr:2_yr", "-p", "5_yr:2_yr", "-n", "10"]);
        let Command::Spreads(args) = cli.command else {
            panic!("expected spreads");
        };
        assert_eq!(args.pairs, vec![SpreadPair::new("10_yr", "2_yr"), SpreadPair::new("5_yr", "2_yr")]);
        assert_eq!(args.window.lookback, 10);
        assert_eq!(args.window.dataset, DEFAULT_DATASET);
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::parse_from(["yields", "frame", "--config", "x.toml", "-v", "-m", "2_yr,10_yr"]);
        assert_eq!(cli.global.config, Some(PathBuf::from("x.toml")));
        assert!(cli.global.verbose);
        let Command::Frame(args) = cli.command else {
            panic!("expected frame");
        };
        assert_eq!(args.maturity, vec!["2_yr", "10_yr"]);
    }

    #[test]
    fn bad_pair_is_rejected() {
        assert!(Cli::try_parse_from(["yields", "spreads", "--pair", "10_yr"]).is_err());
    }
}
