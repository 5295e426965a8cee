//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments (after loading `.env`)
//! - installs logging
//! - loads the session table through the source chain
//! - prints the requested view, plots, and optional exports

use clap::Parser;

use crate::cli::{Cli, Command, ForecastArgs, PlotArgs, ProductArgs, ReportArgs, SourceArgs};
use crate::domain::{SalesTable, SessionConfig};
use crate::error::{AppError, SalesError};
use crate::logging::LogTarget;
use crate::plot::{PlotSeries, render_bar_chart, render_date_plot};
use crate::report;

pub mod pipeline;

use pipeline::Session;

/// Glyphs for per-product trend lines, in ranking order.
const TREND_GLYPHS: [char; 5] = ['*', '+', 'o', 'x', '#'];

/// Entry point for the `sales` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` is optional; real environment variables win.
    let _ = dotenvy::dotenv();

    // `sales` and `sales -f data.csv` behave like `sales tui ...`. Clap requires
    // a subcommand name, so argv is rewritten before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    let log_target = match (&cli.log_file, &cli.command) {
        (Some(path), _) => LogTarget::File(path.clone()),
        (None, Command::Tui(_)) => LogTarget::Discard,
        (None, _) => LogTarget::Stderr,
    };
    crate::logging::init(log_target)?;

    match cli.command {
        Command::Dashboard(args) => handle_dashboard(&args),
        Command::Promotion(args) => handle_promotion(&args),
        Command::Insight(args) => handle_insight(&args),
        Command::Product(args) => handle_product(&args),
        Command::Forecast(args) => handle_forecast(&args),
        Command::Tui(args) => {
            let config = session_config(&args)?;
            crate::tui::run(&config)
        }
    }
}

fn open_session(args: &SourceArgs) -> Result<Session, AppError> {
    let config = session_config(args)?;
    Ok(Session::open(&config)?)
}

fn handle_dashboard(args: &ReportArgs) -> Result<(), AppError> {
    let session = open_session(&args.source)?;
    let table = session.table();

    let top = report::top_products(table.records(), report::TOP_N);
    let regions = report::region_totals(table.records());
    println!("{}", report::format_dashboard(table, &top, &regions));
    if plot_enabled(&args.plot) {
        let ids: Vec<&str> = top.iter().map(|p| p.product_id.as_str()).collect();
        println!("Daily units, top products:");
        println!("{}", trend_plot(table, &ids, &args.plot));
        let bars: Vec<(String, u64)> = regions.iter().map(|r| (r.region.clone(), r.total_units)).collect();
        println!("{}", render_bar_chart(&bars, args.plot.width / 2));
    }
    Ok(())
}

fn handle_promotion(args: &ReportArgs) -> Result<(), AppError> {
    let session = open_session(&args.source)?;
    println!("{}", report::format_promotion(&report::promotion_summary(session.table())));
    Ok(())
}

fn handle_insight(args: &ReportArgs) -> Result<(), AppError> {
    let session = open_session(&args.source)?;
    let insight = report::weekly_insight(session.table());
    println!("{}", report::format_insight(insight.as_ref()));
    if let Some(i) = insight.filter(|_| plot_enabled(&args.plot)) {
        let bars: Vec<(String, u64)> = i
            .top_products
            .iter()
            .map(|p| (p.product_id.clone(), p.total_units))
            .collect();
        println!("{}", render_bar_chart(&bars, args.plot.width / 2));
    }
    Ok(())
}

fn handle_product(args: &ProductArgs) -> Result<(), AppError> {
    let session = open_session(&args.report.source)?;
    let product = session.resolve_product(args.product.as_deref())?;
    let table = session.table();

    let summary = report::product_summary(table, &product)
        .ok_or_else(|| AppError::from(SalesError::UnknownProduct(product.clone())))?;
    println!("{}", report::format_product(&summary, args.rows));
    if plot_enabled(&args.report.plot) {
        println!("{}", trend_plot(table, &[product.as_str()], &args.report.plot));
    }
    Ok(())
}

fn handle_forecast(args: &ForecastArgs) -> Result<(), AppError> {
    let session = open_session(&args.report.source)?;
    let product = session.resolve_product(args.product.as_deref())?;
    let table = session.table();

    let result = crate::forecast::forecast_product(table, &product)?;

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| AppError::new(4, format!("Failed to encode forecast as JSON: {e}")))?;
        println!("{json}");
    } else {
        println!("{}", report::format_forecast(&result));
        if plot_enabled(&args.report.plot) {
            let history: Vec<_> = report::daily_trend(table)
                .remove(&product)
                .unwrap_or_default()
                .into_iter()
                .map(|(d, u)| (d, u as f64))
                .collect();
            let projected: Vec<_> = result.points.iter().map(|p| (p.date, p.predicted_units)).collect();
            let plot = render_date_plot(
                &[
                    PlotSeries { label: "history", points: &history, glyph: '-' },
                    PlotSeries { label: "forecast", points: &projected, glyph: '*' },
                ],
                args.report.plot.width,
                args.report.plot.height,
            );
            println!("{plot}");
        }
    }

    if args.export {
        let path = crate::io::export_forecast(&args.out_dir, &result)?;
        // Keep stdout parseable in JSON mode.
        if args.json {
            eprintln!("Exported {}", path.display());
        } else {
            println!("Exported {}", path.display());
        }
    }
    Ok(())
}

fn trend_plot(table: &SalesTable, products: &[&str], plot: &PlotArgs) -> String {
    let mut trends = report::daily_trend(table);
    let owned: Vec<(String, Vec<(chrono::NaiveDate, f64)>)> = products
        .iter()
        .take(TREND_GLYPHS.len())
        .map(|&p| {
            let pts = trends
                .remove(p)
                .unwrap_or_default()
                .into_iter()
                .map(|(d, u)| (d, u as f64))
                .collect();
            (p.to_string(), pts)
        })
        .collect();

    let series: Vec<PlotSeries<'_>> = owned
        .iter()
        .zip(TREND_GLYPHS)
        .map(|((label, points), glyph)| PlotSeries {
            label: label.as_str(),
            points: points.as_slice(),
            glyph,
        })
        .collect();
    render_date_plot(&series, plot.width, plot.height)
}

fn plot_enabled(plot: &PlotArgs) -> bool {
    !plot.no_plot
}

/// Resolve the upload (running the picker for `--pick`) and build the config.
fn session_config(args: &SourceArgs) -> Result<SessionConfig, AppError> {
    let mut config = session_config_from_args(args);
    if args.pick {
        config.upload = Some(crate::cli::picker::prompt_for_sales_file()?);
    }
    Ok(config)
}

pub fn session_config_from_args(args: &SourceArgs) -> SessionConfig {
    SessionConfig {
        upload: args.file.clone(),
        local_dir: args.local_dir.clone(),
        local_basename: args.local_basename.clone(),
        remote_url: args.url.clone(),
        timeout_secs: args.timeout_secs,
        seed: args.seed,
    }
}

/// Rewrite argv so `sales` defaults to `sales tui`.
///
/// Rules:
/// - `sales`                        -> `sales tui`
/// - `sales -f data.csv ...`        -> `sales tui -f data.csv ...`
/// - `sales --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "dashboard" | "product" | "forecast" | "promotion" | "insight" | "tui"
    );
    if is_subcommand {
        return argv;
    }

    // A leading flag means "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
    }
    argv
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_tui() {
        assert_eq!(rewrite_args(argv(&["sales"])), argv(&["sales", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["sales", "-f", "a.csv"])),
            argv(&["sales", "tui", "-f", "a.csv"])
        );
    }

    #[test]
    fn subcommands_and_help_untouched() {
        assert_eq!(rewrite_args(argv(&["sales", "forecast"])), argv(&["sales", "forecast"]));
        assert_eq!(rewrite_args(argv(&["sales", "--help"])), argv(&["sales", "--help"]));
    }

    #[test]
    fn config_copies_source_flags() {
        let cli = Cli::try_parse_from(["sales", "tui", "--local-dir", "data", "--seed", "3", "--url", "http://x/y.csv"])
            .unwrap();
        let Command::Tui(args) = cli.command else {
            panic!("expected tui");
        };
        let config = session_config_from_args(&args);
        assert_eq!(config.local_dir, PathBuf::from("data"));
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.remote_url, "http://x/y.csv");
        assert!(config.upload.is_none());
    }
}
