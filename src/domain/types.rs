//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - built once by the normalizer and shared read-only for the session
//! - aggregated by the report helpers
//! - exported to CSV/JSON

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One row of the canonical sales table.
///
/// `date` is always present. The other fields are `None` only when the source
/// had the column but the individual cell was empty or unparsable; columns that
/// were missing entirely are synthesized and therefore always `Some`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub region: Option<String>,
    pub product_id: Option<String>,
    pub promotion: Option<bool>,
    pub units_sold: Option<u32>,
}

/// Canonical columns recognized by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Date,
    Region,
    Promotion,
    UnitsSold,
    ProductId,
}

impl Column {
    /// Lower-case header names accepted for this column.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::Date => &["date", "tanggal"],
            Column::Region => &["region", "wilayah"],
            Column::Promotion => &["promotion_flag", "promotion", "promo", "promosi"],
            Column::UnitsSold => &["units_sold", "units", "sales", "penjualan"],
            Column::ProductId => &["product_id", "product", "nama_produk"],
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Region => "region",
            Column::Promotion => "promotion_flag",
            Column::UnitsSold => "units_sold",
            Column::ProductId => "product_id",
        }
    }
}

/// Identity of a data source, used as the load-cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceKey {
    /// A user-supplied file, keyed by name and content digest.
    Uploaded { name: String, digest: u64 },
    /// A local cache file next to the working directory.
    Local(PathBuf),
    /// The remote default dataset.
    Default(String),
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKey::Uploaded { name, .. } => write!(f, "uploaded file {name}"),
            SourceKey::Local(path) => write!(f, "local file {}", path.display()),
            SourceKey::Default(url) => write!(f, "default dataset {url}"),
        }
    }
}

/// How the canonical table came to be (status messages only).
#[derive(Debug, Clone)]
pub struct TableProvenance {
    pub source: SourceKey,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub synthesized: Vec<Column>,
}

/// The canonical, date-sorted sales table.
///
/// Built once per session by `io::ingest::normalize` and never mutated after.
#[derive(Debug, Clone)]
pub struct SalesTable {
    records: Vec<SalesRecord>,
    provenance: TableProvenance,
}

impl SalesTable {
    /// Wrap already-normalized records.
    ///
    /// Callers must hand over records sorted ascending by date; the normalizer
    /// is the only producer outside tests.
    pub fn new(records: Vec<SalesRecord>, provenance: TableProvenance) -> Self {
        debug_assert!(records.windows(2).all(|w| w[0].date <= w[1].date));
        Self { records, provenance }
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn provenance(&self) -> &TableProvenance {
        &self.provenance
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// Distinct product ids in order of first appearance.
    pub fn product_ids(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for id in self.records.iter().filter_map(|r| r.product_id.as_deref()) {
            if !out.iter().any(|seen| seen == id) {
                out.push(id.to_string());
            }
        }
        out
    }

    /// Rows for a single product (still date-sorted).
    pub fn product_records<'a>(&'a self, product: &'a str) -> impl Iterator<Item = &'a SalesRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.product_id.as_deref() == Some(product))
    }
}

/// A single forecast step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    /// Point forecast; not clamped, so it may be negative.
    pub predicted_units: f64,
}

/// Fitted ARIMA(1,1,1) coefficients reported alongside the forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub ar: f64,
    pub ma: f64,
    pub sigma2: f64,
    pub n_obs: usize,
}

/// Seven-day demand forecast for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub product_id: String,
    pub points: Vec<ForecastPoint>,
    pub model: ModelSummary,
}

/// The five mutually exclusive report views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewKind {
    Dashboard,
    Product,
    Forecast,
    Promotion,
    Insight,
}

impl ViewKind {
    pub const ALL: [ViewKind; 5] = [
        ViewKind::Dashboard,
        ViewKind::Product,
        ViewKind::Forecast,
        ViewKind::Promotion,
        ViewKind::Insight,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ViewKind::Dashboard => "Sales Dashboard",
            ViewKind::Product => "Product Analysis",
            ViewKind::Forecast => "Demand Forecast",
            ViewKind::Promotion => "Promotion",
            ViewKind::Insight => "Weekly Insight",
        }
    }

    pub fn index(self) -> usize {
        match self {
            ViewKind::Dashboard => 0,
            ViewKind::Product => 1,
            ViewKind::Forecast => 2,
            ViewKind::Promotion => 3,
            ViewKind::Insight => 4,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Session configuration as understood by the loader.
///
/// This is derived from CLI flags (plus `.env` / environment defaults).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Explicit file supplied by the operator (highest priority source).
    pub upload: Option<PathBuf>,
    /// Directory searched for the local cache file pair.
    pub local_dir: PathBuf,
    /// Basename of the local cache pair (`<basename>.csv`, `<basename>.xlsx`).
    pub local_basename: String,
    /// Remote CSV used when nothing local is available.
    pub remote_url: String,
    pub timeout_secs: u64,
    /// Seed for synthesized columns; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(day: u32, product: Option<&str>) -> SalesRecord {
        SalesRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            region: None,
            product_id: product.map(str::to_string),
            promotion: None,
            units_sold: Some(10),
        }
    }

    fn provenance() -> TableProvenance {
        TableProvenance {
            source: SourceKey::Default("memory".to_string()),
            rows_read: 0,
            rows_dropped: 0,
            synthesized: Vec::new(),
        }
    }

    #[test]
    fn product_ids_keep_first_appearance_order() {
        let table = SalesTable::new(
            vec![
                record(1, Some("B")),
                record(2, Some("A")),
                record(3, None),
                record(4, Some("B")),
            ],
            provenance(),
        );
        assert_eq!(table.product_ids(), vec!["B".to_string(), "A".to_string()]);
        assert_eq!(table.product_records("B").count(), 2);
        assert_eq!(table.last_date(), NaiveDate::from_ymd_opt(2024, 3, 4));
    }

    #[test]
    fn view_cycle_wraps() {
        assert_eq!(ViewKind::Insight.next(), ViewKind::Dashboard);
        assert_eq!(ViewKind::Dashboard.prev(), ViewKind::Insight);
    }
}
