//! ASCII plotting for terminal output.
//!
//! Fixed-size grid, deterministic output (helpful for golden tests).
//!
//! Plot elements:
//! - one line per series, drawn with the series' own character
//! - earlier series win where lines overlap
//! - horizontal bars (`#`) for grouped totals

use chrono::NaiveDate;

/// A dated series to draw on a shared grid.
#[derive(Debug, Clone, Copy)]
pub struct PlotSeries<'a> {
    pub label: &'a str,
    pub points: &'a [(NaiveDate, f64)],
    pub glyph: char,
}

/// Render one or more dated series on a `width` x `height` grid.
pub fn render_date_plot(series: &[PlotSeries<'_>], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some((d_min, d_max)) = date_range(series) else {
        return "Plot: no data\n".to_string();
    };
    let x_min = 0.0;
    let x_max = ((d_max - d_min).num_days() as f64).max(1.0);

    let (y_min, y_max) = y_range(series).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    for s in series {
        let pts: Vec<(f64, f64)> = s
            .points
            .iter()
            .map(|&(d, y)| ((d - d_min).num_days() as f64, y))
            .collect();
        draw_series(&mut grid, &pts, s.glyph, (x_min, x_max), (y_min, y_max));
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: dates=[{d_min}, {d_max}] | units=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    let legend: Vec<String> = series
        .iter()
        .filter(|s| !s.points.is_empty())
        .map(|s| format!("{} {}", s.glyph, s.label))
        .collect();
    out.push_str(&format!("Legend: {}\n", legend.join(" | ")));
    out
}

/// Horizontal bar chart; bars are scaled so the largest value spans `width`.
pub fn render_bar_chart(rows: &[(String, u64)], width: usize) -> String {
    let width = width.max(1);
    let label_w = rows.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    let max = rows.iter().map(|&(_, v)| v).max().unwrap_or(0);

    let mut out = String::new();
    for (label, value) in rows {
        let len = if max == 0 {
            0
        } else {
            ((*value as f64 / max as f64) * width as f64).round() as usize
        };
        out.push_str(&format!("{label:<label_w$} |{} {value}\n", "#".repeat(len)));
    }
    out
}

fn date_range(series: &[PlotSeries<'_>]) -> Option<(NaiveDate, NaiveDate)> {
    let dates = series.iter().flat_map(|s| s.points.iter().map(|&(d, _)| d));
    let min = dates.clone().min()?;
    let max = dates.max()?;
    Some((min, max))
}

fn y_range(series: &[PlotSeries<'_>]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in series.iter().flat_map(|s| s.points.iter()) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        // Flat series: centre it.
        Some((min_y - 1.0, min_y + 1.0))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(grid: &mut [Vec<char>], pts: &[(f64, f64)], ch: char, x: (f64, f64), y: (f64, f64)) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, v) in pts {
        if !v.is_finite() {
            continue;
        }
        let cx = map_x(t, x.0, x.1, width);
        let cy = map_y(v, y.0, y.1, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, cx, cy, ch),
            None if grid[cy][cx] == ' ' => grid[cy][cx] = ch,
            None => {}
        }
        prev = Some((cx, cy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
