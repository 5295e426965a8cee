//! Reporting utilities: aggregations behind each view, plus text formatting.
//!
//! Every helper takes the canonical table by reference and returns plain data;
//! rendering lives in `format` (CLI) and `tui` (interactive).
//!
//! Conventions shared by all helpers:
//! - rows with a null grouping key are left out of that grouping
//! - null unit counts contribute nothing to sums and are not counted in means
//! - an empty group yields no entry

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};

use crate::domain::{SalesRecord, SalesTable};

pub mod format;

pub use format::*;

/// Number of products shown in the rankings.
pub const TOP_N: usize = 5;

/// Look-back used by the weekly insight (`date >= max_date - 7 days`).
pub const INSIGHT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTotal {
    pub product_id: String,
    pub total_units: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionTotal {
    pub region: String,
    pub total_units: u64,
    /// Fraction of all units (0.0 when the grand total is zero).
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductSummary {
    pub product_id: String,
    pub total_units: u64,
    /// Mean units per row with a unit count ("daily average").
    pub mean_units: Option<f64>,
    pub top_region: Option<String>,
    pub rows: Vec<SalesRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupMean {
    pub mean: f64,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductPromotionMean {
    pub product_id: String,
    pub promoted: bool,
    pub mean_units: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromotionSummary {
    pub promoted: Option<GroupMean>,
    pub not_promoted: Option<GroupMean>,
    pub by_product: Vec<ProductPromotionMean>,
}

impl PromotionSummary {
    /// Fixed-template verdict: promoted rows sell more on average.
    ///
    /// No significance test backs this; it is a plain comparison of means.
    pub fn is_effective(&self) -> bool {
        match (&self.promoted, &self.not_promoted) {
            (Some(p), Some(n)) => p.mean > n.mean,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyInsight {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub rows: usize,
    pub top_product: Option<String>,
    pub total_units: u64,
    pub best_region: Option<String>,
    pub top_products: Vec<ProductTotal>,
}

/// Top `n` products by total units, descending (ties by product id).
pub fn top_products<'a>(records: impl IntoIterator<Item = &'a SalesRecord>, n: usize) -> Vec<ProductTotal> {
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for r in records {
        if let Some(product) = r.product_id.as_deref() {
            *totals.entry(product).or_default() += r.units_sold.map(u64::from).unwrap_or(0);
        }
    }

    let mut out: Vec<ProductTotal> = totals
        .into_iter()
        .map(|(product_id, total_units)| ProductTotal {
            product_id: product_id.to_string(),
            total_units,
        })
        .collect();
    out.sort_by(|a, b| {
        b.total_units
            .cmp(&a.total_units)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    out.truncate(n);
    out
}

/// Units per region, ordered by region name.
pub fn region_totals<'a>(records: impl IntoIterator<Item = &'a SalesRecord>) -> Vec<RegionTotal> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for r in records {
        if let Some(region) = r.region.as_deref() {
            *totals.entry(region).or_default() += r.units_sold.map(u64::from).unwrap_or(0);
        }
    }

    let grand: u64 = totals.values().sum();
    totals
        .into_iter()
        .map(|(region, total_units)| RegionTotal {
            region: region.to_string(),
            total_units,
            share: if grand > 0 { total_units as f64 / grand as f64 } else { 0.0 },
        })
        .collect()
}

/// Most frequent region; ties resolve to the alphabetically first region.
pub fn mode_region<'a>(records: impl IntoIterator<Item = &'a SalesRecord>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in records {
        if let Some(region) = r.region.as_deref() {
            *counts.entry(region).or_default() += 1;
        }
    }
    // `BTreeMap` iterates alphabetically and `max_by` keeps the last maximum,
    // so iterate in reverse to keep the first.
    counts
        .into_iter()
        .rev()
        .max_by(|a, b| a.1.cmp(&b.1))
        .map(|(region, _)| region.to_string())
}

/// Mean of the non-null unit counts.
pub fn mean_units<'a>(records: impl IntoIterator<Item = &'a SalesRecord>) -> Option<GroupMean> {
    let mut sum = 0u64;
    let mut rows = 0usize;
    for u in records.into_iter().filter_map(|r| r.units_sold) {
        sum += u64::from(u);
        rows += 1;
    }
    (rows > 0).then(|| GroupMean {
        mean: sum as f64 / rows as f64,
        rows,
    })
}

/// Per-day unit totals for each product, keyed by product id.
pub fn daily_trend(table: &SalesTable) -> BTreeMap<String, Vec<(NaiveDate, u64)>> {
    let mut out: BTreeMap<String, Vec<(NaiveDate, u64)>> = BTreeMap::new();
    for r in table.records() {
        let (Some(product), Some(units)) = (r.product_id.as_deref(), r.units_sold) else {
            continue;
        };
        let series = out.entry(product.to_string()).or_default();
        // Records are date-sorted, so same-day rows are adjacent.
        match series.last_mut() {
            Some((date, total)) if *date == r.date => *total += u64::from(units),
            _ => series.push((r.date, u64::from(units))),
        }
    }
    out
}

/// Metrics for the product analysis view; `None` if the product has no rows.
pub fn product_summary(table: &SalesTable, product: &str) -> Option<ProductSummary> {
    let rows: Vec<SalesRecord> = table.product_records(product).cloned().collect();
    if rows.is_empty() {
        return None;
    }
    Some(ProductSummary {
        product_id: product.to_string(),
        total_units: rows.iter().filter_map(|r| r.units_sold).map(u64::from).sum(),
        mean_units: mean_units(&rows).map(|m| m.mean),
        top_region: mode_region(&rows),
        rows,
    })
}

/// Promotion vs. no-promotion averages, overall and per product.
pub fn promotion_summary(table: &SalesTable) -> PromotionSummary {
    let records = table.records();
    let promoted = mean_units(records.iter().filter(|r| r.promotion == Some(true)));
    let not_promoted = mean_units(records.iter().filter(|r| r.promotion == Some(false)));

    let mut groups: BTreeMap<(&str, bool), (u64, usize)> = BTreeMap::new();
    for r in records {
        let (Some(product), Some(flag), Some(units)) = (r.product_id.as_deref(), r.promotion, r.units_sold) else {
            continue;
        };
        let entry = groups.entry((product, flag)).or_default();
        entry.0 += u64::from(units);
        entry.1 += 1;
    }

    let by_product = groups
        .into_iter()
        .map(|((product, promoted), (sum, rows))| ProductPromotionMean {
            product_id: product.to_string(),
            promoted,
            mean_units: sum as f64 / rows as f64,
        })
        .collect();

    PromotionSummary {
        promoted,
        not_promoted,
        by_product,
    }
}

/// Summary of the last week of data, or `None` when the window is empty.
pub fn weekly_insight(table: &SalesTable) -> Option<WeeklyInsight> {
    let window_end = table.last_date()?;
    let window_start = window_end - Duration::days(INSIGHT_WINDOW_DAYS);
    let recent: Vec<&SalesRecord> = table.records().iter().filter(|r| r.date >= window_start).collect();
    if recent.is_empty() {
        return None;
    }

    let top_products = top_products(recent.iter().copied(), TOP_N);
    let best_region = region_totals(recent.iter().copied())
        .into_iter()
        // First region wins ties (names are already sorted).
        .fold(None::<RegionTotal>, |best, r| match best {
            Some(b) if b.total_units >= r.total_units => Some(b),
            _ => Some(r),
        })
        .map(|r| r.region);

    Some(WeeklyInsight {
        window_start,
        window_end,
        rows: recent.len(),
        top_product: top_products.first().map(|p| p.product_id.clone()),
        total_units: recent.iter().filter_map(|r| r.units_sold).map(u64::from).sum(),
        best_region,
        top_products,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{SourceKey, TableProvenance};

    pub(crate) fn rec(day: u32, product: &str, region: &str, promo: bool, units: u32) -> SalesRecord {
        SalesRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            region: Some(region.to_string()),
            product_id: Some(product.to_string()),
            promotion: Some(promo),
            units_sold: Some(units),
        }
    }

    pub(crate) fn table(records: Vec<SalesRecord>) -> SalesTable {
        SalesTable::new(
            records,
            TableProvenance {
                source: SourceKey::Default("memory".to_string()),
                rows_read: 0,
                rows_dropped: 0,
                synthesized: Vec::new(),
            },
        )
    }

    #[test]
    fn top_products_sorted_and_capped() {
        let records: Vec<SalesRecord> = (1..=7)
            .map(|i| rec(i, &format!("P{i}"), "Medan", false, i * 10))
            .chain([rec(8, "P1", "Medan", false, 5)])
            .collect();
        let top = top_products(&records, TOP_N);

        assert_eq!(top.len(), 5);
        assert!(top.windows(2).all(|w| w[0].total_units >= w[1].total_units));
        assert_eq!(top[0].product_id, "P7");

        let few = top_products(&records[..2], TOP_N);
        assert_eq!(few.len(), 2);
    }

    #[test]
    fn alternating_promotion_means_use_five_rows_each() {
        let records: Vec<SalesRecord> = (1..=10)
            .map(|i| rec(i, "A", "Medan", i % 2 == 0, if i % 2 == 0 { 100 } else { 50 }))
            .collect();
        let summary = promotion_summary(&table(records));

        let promoted = summary.promoted.clone().unwrap();
        let not_promoted = summary.not_promoted.clone().unwrap();
        assert_eq!(promoted.rows, 5);
        assert_eq!(not_promoted.rows, 5);
        assert!((promoted.mean - 100.0).abs() < 1e-12);
        assert!((not_promoted.mean - 50.0).abs() < 1e-12);
        assert!(summary.is_effective());
        assert_eq!(summary.by_product.len(), 2);
    }

    #[test]
    fn promotion_without_one_group_is_not_effective() {
        let records = vec![rec(1, "A", "Medan", true, 10), rec(2, "A", "Medan", true, 20)];
        let summary = promotion_summary(&table(records));
        assert!(summary.not_promoted.is_none());
        assert!(!summary.is_effective());
    }

    #[test]
    fn mode_region_breaks_ties_alphabetically() {
        let records = vec![
            rec(1, "A", "Surabaya", false, 1),
            rec(2, "A", "Bandung", false, 1),
            rec(3, "A", "Surabaya", false, 1),
            rec(4, "A", "Bandung", false, 1),
        ];
        assert_eq!(mode_region(&records).as_deref(), Some("Bandung"));
    }

    #[test]
    fn region_shares_sum_to_one() {
        let records = vec![
            rec(1, "A", "Medan", false, 30),
            rec(2, "B", "Jakarta", false, 10),
            rec(3, "A", "Medan", false, 60),
        ];
        let regions = region_totals(&records);
        assert_eq!(regions[0].region, "Jakarta");
        assert_eq!(regions[1].total_units, 90);
        let sum: f64 = regions.iter().map(|r| r.share).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn weekly_insight_uses_last_seven_days() {
        let records = vec![
            rec(1, "Old", "Medan", false, 1000),
            rec(10, "A", "Medan", false, 5),
            rec(14, "B", "Jakarta", true, 30),
            rec(17, "A", "Medan", false, 10),
        ];
        let insight = weekly_insight(&table(records)).unwrap();

        assert_eq!(insight.window_start, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(insight.rows, 3);
        assert_eq!(insight.total_units, 45);
        assert_eq!(insight.top_product.as_deref(), Some("B"));
        assert_eq!(insight.best_region.as_deref(), Some("Jakarta"));
        assert!(insight.top_products.iter().all(|p| p.product_id != "Old"));
    }

    #[test]
    fn weekly_insight_empty_table() {
        assert!(weekly_insight(&table(Vec::new())).is_none());
    }

    #[test]
    fn product_summary_metrics() {
        let mut records = vec![
            rec(1, "A", "Medan", false, 10),
            rec(2, "A", "Jakarta", true, 20),
            rec(3, "A", "Medan", false, 30),
            rec(4, "B", "Jakarta", false, 99),
        ];
        records[2].units_sold = None;
        let s = product_summary(&table(records), "A").unwrap();
        assert_eq!(s.total_units, 30);
        assert_eq!(s.mean_units, Some(15.0));
        assert_eq!(s.top_region.as_deref(), Some("Medan"));
        assert_eq!(s.rows.len(), 3);
    }

    #[test]
    fn daily_trend_merges_same_day_rows() {
        let records = vec![
            rec(1, "A", "Medan", false, 10),
            rec(1, "A", "Jakarta", false, 5),
            rec(2, "A", "Medan", false, 7),
        ];
        let trend = daily_trend(&table(records));
        let a = &trend["A"];
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].1, 15);
    }
}
