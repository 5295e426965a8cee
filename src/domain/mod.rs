//! Domain types used throughout the app.
//!
//! This module defines:
//!
//! - the canonical sales table (`SalesRecord`, `SalesTable`)
//! - source identity + provenance (`SourceKey`, `TableProvenance`)
//! - forecast outputs (`ForecastResult`, `ForecastPoint`)
//! - session configuration and the view enum

pub mod types;

pub use types::*;
