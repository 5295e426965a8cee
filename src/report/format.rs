//! Formatted terminal output for each view.
//!
//! Formatting stays in one place so the aggregation code is easy to test and
//! output changes are localized.

use crate::domain::{ForecastResult, SalesRecord, SalesTable};

use super::{GroupMean, ProductSummary, ProductTotal, PromotionSummary, RegionTotal, WeeklyInsight};

/// Header line describing where the table came from.
pub fn format_provenance(table: &SalesTable) -> String {
    let p = table.provenance();
    let mut out = format!("Source: {} | rows={}", p.source, table.len());
    if p.rows_dropped > 0 {
        out.push_str(&format!(" (dropped {} of {} with bad dates)", p.rows_dropped, p.rows_read));
    }
    if let (Some(first), Some(last)) = (table.first_date(), table.last_date()) {
        out.push_str(&format!(" | dates=[{first}, {last}]"));
    }
    if !p.synthesized.is_empty() {
        let names: Vec<&str> = p.synthesized.iter().map(|c| c.display_name()).collect();
        out.push_str(&format!(" | synthesized: {}", names.join(", ")));
    }
    out.push('\n');
    out
}

pub fn format_dashboard(table: &SalesTable, top: &[ProductTotal], regions: &[RegionTotal]) -> String {
    let mut out = String::new();
    out.push_str("=== Sales Dashboard ===\n");
    out.push_str(&format_provenance(table));

    out.push_str("\nTop products by units sold:\n");
    out.push_str(&format_top_products(top));

    out.push_str("\nRegional distribution:\n");
    push_row(&mut out, format!("{:<16} {:>12} {:>8}", "region", "units", "share"));
    push_row(&mut out, format!("{:-<16} {:-<12} {:-<8}", "", "", ""));
    for r in regions {
        push_row(
            &mut out,
            format!(
                "{:<16} {:>12} {:>7.1}%",
                truncate(&r.region, 16),
                r.total_units,
                r.share * 100.0
            ),
        );
    }
    out
}

pub fn format_product(summary: &ProductSummary, max_rows: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Product Analysis: {} ===\n", summary.product_id));
    out.push_str(&format!("Total units sold : {}\n", summary.total_units));
    out.push_str(&format!(
        "Daily average    : {}\n",
        summary.mean_units.map(|m| format!("{m:.2}")).unwrap_or_else(|| "n/a".to_string())
    ));
    out.push_str(&format!(
        "Top region       : {}\n",
        summary.top_region.as_deref().unwrap_or("n/a")
    ));

    out.push_str(&format!("\nRows ({}):\n", summary.rows.len()));
    out.push_str(&format_records(&summary.rows, max_rows));
    out
}

pub fn format_forecast(result: &ForecastResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Demand Forecast: {} ===\n", result.product_id));
    out.push_str(&format!(
        "Model: ARIMA(1,1,1) | ar={:.4} ma={:.4} sigma2={:.3} n={}\n\n",
        result.model.ar, result.model.ma, result.model.sigma2, result.model.n_obs
    ));
    push_row(&mut out, format!("{:<12} {:>14}", "date", "predicted"));
    push_row(&mut out, format!("{:-<12} {:-<14}", "", ""));
    for p in &result.points {
        push_row(&mut out, format!("{:<12} {:>14.2}", p.date, p.predicted_units));
    }
    out
}

pub fn format_promotion(summary: &PromotionSummary) -> String {
    let mut out = String::new();
    out.push_str("=== Promotion Recommendation ===\n");
    let fmt_group = |label: &str, g: &Option<GroupMean>| match g {
        Some(g) => format!("{label:<14}: {:.2} units/row over {} rows\n", g.mean, g.rows),
        None => format!("{label:<14}: no rows\n"),
    };
    out.push_str(&fmt_group("With promo", &summary.promoted));
    out.push_str(&fmt_group("Without promo", &summary.not_promoted));

    out.push('\n');
    if summary.is_effective() {
        out.push_str("Verdict: promotion is effective; promoted rows sell more on average.\n");
    } else {
        out.push_str("Verdict: promotion is not clearly effective; review the promotion strategy.\n");
    }

    out.push_str("\nAverage units by product and promotion:\n");
    push_row(&mut out, format!("{:<16} {:<6} {:>12}", "product", "promo", "mean_units"));
    push_row(&mut out, format!("{:-<16} {:-<6} {:-<12}", "", "", ""));
    for row in &summary.by_product {
        push_row(
            &mut out,
            format!(
                "{:<16} {:<6} {:>12.2}",
                truncate(&row.product_id, 16),
                if row.promoted { "yes" } else { "no" },
                row.mean_units
            ),
        );
    }
    out
}

pub fn format_insight(insight: Option<&WeeklyInsight>) -> String {
    let mut out = String::new();
    out.push_str("=== Weekly Insight ===\n");
    let Some(i) = insight else {
        out.push_str("No recent data in the last 7 days.\n");
        return out;
    };

    out.push_str(&format!(
        "Window: {} .. {} ({} rows)\n",
        i.window_start, i.window_end, i.rows
    ));
    out.push_str(&format!(
        "Best-selling product: {}\n",
        i.top_product.as_deref().unwrap_or("n/a")
    ));
    out.push_str(&format!("Total units sold    : {}\n", i.total_units));
    out.push_str(&format!(
        "Top region          : {}\n",
        i.best_region.as_deref().unwrap_or("n/a")
    ));
    out.push_str("\nTop products this week:\n");
    out.push_str(&format_top_products(&i.top_products));
    out
}

fn format_top_products(rows: &[ProductTotal]) -> String {
    let mut out = String::new();
    push_row(&mut out, format!("{:<4} {:<20} {:>12}", "#", "product", "units"));
    push_row(&mut out, format!("{:-<4} {:-<20} {:-<12}", "", "", ""));
    for (i, p) in rows.iter().enumerate() {
        push_row(
            &mut out,
            format!("{:<4} {:<20} {:>12}", i + 1, truncate(&p.product_id, 20), p.total_units),
        );
    }
    out
}

fn format_records(rows: &[SalesRecord], max_rows: usize) -> String {
    let mut out = String::new();
    push_row(
        &mut out,
        format!("{:<12} {:<14} {:<6} {:>8}", "date", "region", "promo", "units"),
    );
    push_row(&mut out, format!("{:-<12} {:-<14} {:-<6} {:-<8}", "", "", "", ""));
    for r in rows.iter().take(max_rows) {
        push_row(
            &mut out,
            format!(
                "{:<12} {:<14} {:<6} {:>8}",
                r.date,
                truncate(r.region.as_deref().unwrap_or(""), 14),
                match r.promotion {
                    Some(true) => "yes",
                    Some(false) => "no",
                    None => "",
                },
                r.units_sold.map(|u| u.to_string()).unwrap_or_default(),
            ),
        );
    }
    if rows.len() > max_rows {
        out.push_str(&format!("... {} more rows\n", rows.len() - max_rows));
    }
    out
}

fn push_row(out: &mut String, row: String) {
    out.push_str(row.trim_end());
    out.push('\n');
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ForecastPoint, ModelSummary};
    use crate::report::tests::{rec, table};
    use crate::report::{promotion_summary, region_totals, top_products, weekly_insight};
    use chrono::NaiveDate;

    #[test]
    fn dashboard_lists_products_and_regions() {
        let t = table(vec![
            rec(1, "A", "Medan", false, 10),
            rec(2, "B", "Jakarta", true, 30),
        ]);
        let txt = format_dashboard(&t, &top_products(t.records(), 5), &region_totals(t.records()));

        assert!(txt.contains("Source: default dataset memory | rows=2"));
        assert!(txt.contains("1    B"));
        assert!(txt.contains("Jakarta"));
        assert!(txt.contains("75.0%"));
        assert!(txt.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn forecast_table_has_seven_rows() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let result = ForecastResult {
            product_id: "A".to_string(),
            points: (0..7)
                .map(|i| ForecastPoint {
                    date: start + chrono::Duration::days(i),
                    predicted_units: -1.5 + i as f64,
                })
                .collect(),
            model: ModelSummary {
                ar: 0.5,
                ma: -0.2,
                sigma2: 4.0,
                n_obs: 30,
            },
        };
        let txt = format_forecast(&result);
        assert_eq!(txt.lines().filter(|l| l.starts_with("2024-02-")).count(), 7);
        assert!(txt.contains("-1.50"));
    }

    #[test]
    fn promotion_verdict_text() {
        let t = table(vec![rec(1, "A", "Medan", true, 100), rec(2, "A", "Medan", false, 10)]);
        assert!(format_promotion(&promotion_summary(&t)).contains("promotion is effective"));

        let t = table(vec![rec(1, "A", "Medan", true, 10), rec(2, "A", "Medan", false, 100)]);
        assert!(format_promotion(&promotion_summary(&t)).contains("not clearly effective"));
    }

    #[test]
    fn insight_without_data() {
        let t = table(Vec::new());
        assert!(format_insight(weekly_insight(&t).as_ref()).contains("No recent data"));
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("Yogyakarta", 5), "Yogy.");
        assert_eq!(truncate("Medan", 5), "Medan");
    }
}
