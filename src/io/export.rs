//! Export a forecast to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::domain::ForecastResult;
use crate::error::SalesError;

#[derive(Serialize)]
struct ExportRow {
    date: String,
    predicted_units_sold: f64,
}

/// `forecast_<product>.csv`, with anything outside `[A-Za-z0-9_-]` replaced by `_`.
pub fn forecast_file_name(product: &str) -> String {
    let safe: String = product
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("forecast_{safe}.csv")
}

/// Write the forecast to `<dir>/forecast_<product>.csv` and return the path.
pub fn export_forecast(dir: &Path, result: &ForecastResult) -> Result<PathBuf, SalesError> {
    let path = dir.join(forecast_file_name(&result.product_id));
    write_forecast_csv(&path, result)?;
    info!(path = %path.display(), product = %result.product_id, "forecast exported");
    Ok(path)
}

/// Write the forecast rows (`date,predicted_units_sold`) to `path`.
pub fn write_forecast_csv(path: &Path, result: &ForecastResult) -> Result<(), SalesError> {
    let export_err = |reason: String| SalesError::Export {
        path: path.to_path_buf(),
        reason,
    };

    let mut writer = csv::Writer::from_path(path).map_err(|e| export_err(e.to_string()))?;
    for p in &result.points {
        writer
            .serialize(ExportRow {
                date: p.date.format("%Y-%m-%d").to_string(),
                predicted_units_sold: p.predicted_units,
            })
            .map_err(|e| export_err(e.to_string()))?;
    }
    writer.flush().map_err(|e| export_err(e.to_string()))?;
    Ok(())
}
