//! Command-line parsing for the sales report tool.
//!
//! Argument parsing and command dispatch stay separate from the
//! loading/aggregation/forecast code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::DEFAULT_DATA_URL;

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sales", version, about = "Sales dashboard, promotion insight, and 7-day demand forecast")]
pub struct Cli {
    /// Append logs to this file instead of stderr (recommended with the TUI).
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Daily trend, top products, and regional distribution.
    Dashboard(ReportArgs),
    /// Metrics and rows for one product.
    Product(ProductArgs),
    /// Fit ARIMA(1,1,1) to one product and project the next 7 days.
    Forecast(ForecastArgs),
    /// Compare average units with and without promotion.
    Promotion(ReportArgs),
    /// Summary of the most recent week.
    Insight(ReportArgs),
    /// Launch the interactive TUI (default when no subcommand is given).
    Tui(SourceArgs),
}

/// Where the sales table comes from.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Sales file to load (.csv or .xlsx). Takes priority over every other source.
    #[arg(short = 'f', long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Pick the sales file interactively from the current directory tree.
    #[arg(long, conflicts_with = "file")]
    pub pick: bool,

    /// Directory holding the local cache file pair.
    #[arg(long, default_value = ".")]
    pub local_dir: PathBuf,

    /// Basename of the local cache pair (`<name>.csv`, then `<name>.xlsx`).
    #[arg(long, default_value = "motor_clean_fixed")]
    pub local_basename: String,

    /// Remote CSV used when no file is available locally.
    #[arg(long, env = "SALES_DATA_URL", default_value = DEFAULT_DATA_URL)]
    pub url: String,

    /// HTTP timeout for the remote source.
    #[arg(long, default_value_t = 15)]
    pub timeout_secs: u64,

    /// Seed for synthesized columns (random when omitted).
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Terminal plot options.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 16)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub plot: PlotArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ProductArgs {
    #[command(flatten)]
    pub report: ReportArgs,

    /// Product to analyse (defaults to the first product in the table).
    #[arg(short = 'p', long)]
    pub product: Option<String>,

    /// Maximum number of rows to print.
    #[arg(long, default_value_t = 20)]
    pub rows: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub report: ReportArgs,

    /// Product to forecast (defaults to the first product in the table).
    #[arg(short = 'p', long)]
    pub product: Option<String>,

    /// Write `forecast_<product>.csv`.
    #[arg(long)]
    pub export: bool,

    /// Directory for the exported CSV.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Print the forecast as JSON instead of a text report.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn forecast_flags_parse() {
        let cli = Cli::try_parse_from([
            "sales", "forecast", "-f", "data.csv", "--product", "Product-3", "--export", "--seed", "7",
        ])
        .unwrap();
        let Command::Forecast(args) = cli.command else {
            panic!("expected forecast");
        };
        assert_eq!(args.product.as_deref(), Some("Product-3"));
        assert!(args.export);
        assert_eq!(args.report.source.seed, Some(7));
        assert_eq!(args.report.source.local_basename, "motor_clean_fixed");
    }

    #[test]
    fn file_and_pick_conflict() {
        assert!(Cli::try_parse_from(["sales", "dashboard", "-f", "a.csv", "--pick"]).is_err());
    }
}
