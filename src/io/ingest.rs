//! Tabular ingest and normalization.
//!
//! This module turns a heterogeneous sales table (CSV or XLSX) into the
//! canonical `SalesTable` every view reads from.
//!
//! Design goals:
//! - **Lenient schema**: every column is optional; missing columns are synthesized
//! - **Silent row filtering**: rows with unparsable dates are dropped and counted
//! - **Stable ordering**: the output is date-sorted, ties keep source order
//! - **Separation of concerns**: no source selection or reporting logic here

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, DataType, Reader, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use rand::rngs::StdRng;

use crate::data::synth;
use crate::domain::{Column, SalesRecord, SalesTable, SourceKey, TableProvenance};
use crate::error::SalesError;

/// The two recognized tabular formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Xlsx,
}

impl TableFormat {
    /// Detect the format from a file name's extension.
    pub fn from_name(name: &str) -> Result<Self, SalesError> {
        let ext = std::path::Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(TableFormat::Csv),
            Some("xlsx") => Ok(TableFormat::Xlsx),
            _ => Err(SalesError::UnsupportedFormat { name: name.to_string() }),
        }
    }
}

/// An untyped table as read from a source: header names plus text cells.
///
/// Empty strings stand for missing cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Decode raw bytes in the given format.
pub fn read_table(bytes: &[u8], format: TableFormat, origin: &str) -> Result<RawTable, SalesError> {
    match format {
        TableFormat::Csv => read_csv(bytes, origin),
        TableFormat::Xlsx => read_xlsx(bytes, origin),
    }
}

/// Read a delimited text table with a header row.
pub fn read_csv(bytes: &[u8], origin: &str) -> Result<RawTable, SalesError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| parse_error(origin, format!("cannot read CSV headers: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record: StringRecord = result.map_err(|e| parse_error(origin, format!("CSV parse error: {e}")))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}

/// Read the first worksheet of an XLSX workbook; its first row is the header.
pub fn read_xlsx(bytes: &[u8], origin: &str) -> Result<RawTable, SalesError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| parse_error(origin, format!("cannot open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| parse_error(origin, "workbook has no worksheets"))?
        .map_err(|e| parse_error(origin, format!("cannot read first worksheet: {e}")))?;

    let mut rows_iter = range.rows();
    let headers = rows_iter
        .next()
        .map(|row| row.iter().map(cell_to_string).collect())
        .unwrap_or_default();
    let rows = rows_iter.map(|row| row.iter().map(cell_to_string).collect()).collect();

    Ok(RawTable { headers, rows })
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::DurationIso(s) => s.clone(),
    }
}

fn parse_error(origin: &str, reason: impl Into<String>) -> SalesError {
    SalesError::Parse {
        origin: origin.to_string(),
        reason: reason.into(),
    }
}

/// Normalize a raw table into the canonical sales table.
///
/// Steps:
/// 1. resolve dates (synthesize a daily sequence if the column is absent,
///    otherwise parse and drop rows that do not parse)
/// 2. synthesize any of region / promotion / units / product that is absent
/// 3. stable-sort by date
pub fn normalize(raw: &RawTable, source: SourceKey, rng: &mut StdRng) -> SalesTable {
    let header_map = build_header_map(&raw.headers);
    let col = |c: Column| resolve_column(&header_map, c);

    let rows_read = raw.rows.len();

    // 1) Dates.
    let dated: Vec<(NaiveDate, &Vec<String>)> = match col(Column::Date) {
        None => synth::dates(rows_read).into_iter().zip(raw.rows.iter()).collect(),
        Some(idx) => raw
            .rows
            .iter()
            .filter_map(|row| parse_date(cell(row, idx)?).map(|d| (d, row)))
            .collect(),
    };
    let rows_dropped = rows_read - dated.len();
    let n = dated.len();

    // 2) Column backfill (whole-column only; partial columns keep their gaps).
    let mut synthesized = Vec::new();
    if col(Column::Date).is_none() {
        synthesized.push(Column::Date);
    }

    let regions: Vec<Option<String>> = match col(Column::Region) {
        Some(idx) => dated.iter().map(|(_, row)| cell(row, idx).map(str::to_string)).collect(),
        None => {
            synthesized.push(Column::Region);
            synth::regions(rng, n).into_iter().map(Some).collect()
        }
    };
    let promotions: Vec<Option<bool>> = match col(Column::Promotion) {
        Some(idx) => dated.iter().map(|(_, row)| cell(row, idx).and_then(parse_flag)).collect(),
        None => {
            synthesized.push(Column::Promotion);
            synth::promotions(rng, n).into_iter().map(Some).collect()
        }
    };
    let units: Vec<Option<u32>> = match col(Column::UnitsSold) {
        Some(idx) => dated.iter().map(|(_, row)| cell(row, idx).and_then(parse_units)).collect(),
        None => {
            synthesized.push(Column::UnitsSold);
            synth::units(rng, n).into_iter().map(Some).collect()
        }
    };
    let products: Vec<Option<String>> = match col(Column::ProductId) {
        Some(idx) => dated.iter().map(|(_, row)| cell(row, idx).map(str::to_string)).collect(),
        None => {
            synthesized.push(Column::ProductId);
            synth::product_ids(n).into_iter().map(Some).collect()
        }
    };

    let mut records: Vec<SalesRecord> = dated
        .into_iter()
        .zip(regions)
        .zip(promotions)
        .zip(units)
        .zip(products)
        .map(|(((((date, _), region), promotion), units_sold), product_id)| SalesRecord {
            date,
            region,
            product_id,
            promotion,
            units_sold,
        })
        .collect();

    // 3) `sort_by_key` is stable, so same-day rows keep source order.
    records.sort_by_key(|r| r.date);

    SalesTable::new(
        records,
        TableProvenance {
            source,
            rows_read,
            rows_dropped,
            synthesized,
        },
    )
}

fn build_header_map(headers: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for duplicated headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, the date column goes unrecognized.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_column(header_map: &HashMap<String, usize>, column: Column) -> Option<usize> {
    column.aliases().iter().find_map(|alias| header_map.get(*alias).copied())
}

fn cell(row: &[String], idx: usize) -> Option<&str> {
    row.get(idx).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    // Ambiguous slash/dash dates read month-first; day-first only when that fails.
    const DATE_FMTS: [&str; 6] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y", "%d-%m-%Y"];
    const DATETIME_FMTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" => Some(true),
        "0" | "0.0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn parse_units(s: &str) -> Option<u32> {
    if let Ok(v) = s.parse::<u32>() {
        return Some(v);
    }
    // Exports with gaps often write integer columns as floats (`12.0`).
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}
