//! `sales-report` library crate.
//!
//! The binary (`sales`) is a thin wrapper around this library so that:
//!
//! - core logic (normalizer, forecast runner) is testable without spawning processes
//! - the CLI and the TUI share one session pipeline

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod io;
pub mod logging;
pub mod math;
pub mod plot;
pub mod report;
pub mod tui;
