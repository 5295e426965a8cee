//! Input/output helpers.
//!
//! - CSV/XLSX ingest + normalization (`ingest`)
//! - forecast CSV export (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
