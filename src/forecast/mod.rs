//! Demand forecasting for a single product.
//!
//! The runner extracts one product's `units_sold` series from the canonical
//! table, fits a fixed-order ARIMA(1,1,1) (`arima`), and labels the next
//! `FORECAST_HORIZON` calendar days after the product's last date.

use chrono::{Duration, NaiveDate};
use tracing::{debug, warn};

use crate::domain::{ForecastPoint, ForecastResult, ModelSummary, SalesTable};
use crate::error::SalesError;

pub mod arima;

pub use arima::{Arima111, FitError, MIN_OBSERVATIONS};

/// Number of days forecast past the last observation.
pub const FORECAST_HORIZON: usize = 7;

/// A product's history: its last date plus the non-null unit counts in date order.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSeries {
    pub last_date: NaiveDate,
    pub units: Vec<f64>,
}

/// Collect the history for `product`, or `None` if the product has no rows.
pub fn product_series(table: &SalesTable, product: &str) -> Option<ProductSeries> {
    let mut last_date = None;
    let mut units = Vec::new();
    for r in table.product_records(product) {
        last_date = Some(r.date);
        if let Some(u) = r.units_sold {
            units.push(u as f64);
        }
    }
    last_date.map(|last_date| ProductSeries { last_date, units })
}

/// Fit the model for one product and forecast the following week.
///
/// Fit problems (short or constant series, singular regressions) come back as
/// `ForecastFitFailure`, which callers treat as recoverable.
pub fn forecast_product(table: &SalesTable, product: &str) -> Result<ForecastResult, SalesError> {
    let series =
        product_series(table, product).ok_or_else(|| SalesError::UnknownProduct(product.to_string()))?;

    let model = Arima111::fit(&series.units).map_err(|e| {
        warn!(product, error = %e, "forecast fit failed");
        SalesError::ForecastFitFailure {
            product: product.to_string(),
            reason: e.to_string(),
        }
    })?;
    debug!(product, ar = model.ar(), ma = model.ma(), n = model.n_obs(), "fitted ARIMA(1,1,1)");

    let points = forecast_dates(series.last_date, FORECAST_HORIZON)
        .into_iter()
        .zip(model.forecast(FORECAST_HORIZON))
        .map(|(date, predicted_units)| ForecastPoint { date, predicted_units })
        .collect();

    Ok(ForecastResult {
        product_id: product.to_string(),
        points,
        model: ModelSummary {
            ar: model.ar(),
            ma: model.ma(),
            sigma2: model.sigma2(),
            n_obs: model.n_obs(),
        },
    })
}

/// `steps` consecutive days starting the day after `last`.
fn forecast_dates(last: NaiveDate, steps: usize) -> Vec<NaiveDate> {
    (1..=steps)
        .filter_map(|i| last.checked_add_signed(Duration::days(i as i64)))
        .collect()
}
