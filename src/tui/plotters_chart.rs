//! Plotters-powered sales chart widget for Ratatui.
//!
//! Plotters output is drawn into the Ratatui buffer through
//! `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// High-contrast palette for terminal rendering, one color per series.
pub const PALETTE: [RGBColor; 5] = [
    RGBColor(0, 255, 255),
    RGBColor(0, 255, 0),
    RGBColor(255, 255, 0),
    RGBColor(255, 0, 255),
    RGBColor(255, 96, 96),
];

/// One line on the chart. X is a day offset from the chart's base date.
pub struct ChartLine<'a> {
    pub points: &'a [(f64, f64)],
    pub color: RGBColor,
    /// Draw dots only (used for forecast points).
    pub dotted: bool,
}

/// A render-only chart description; series and bounds are computed by the caller.
pub struct SalesPlottersChart<'a> {
    pub lines: &'a [ChartLine<'a>],
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub fmt_x: &'a dyn Fn(f64) -> String,
}

impl Widget for SalesPlottersChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| format!("{v:.0}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            for line in self.lines {
                if line.dotted {
                    // `Circle` radii are mis-scaled by the ratatui backend; pixels render cleanly.
                    chart.draw_series(line.points.iter().map(|&(x, y)| Pixel::new((x, y), line.color)))?;
                } else {
                    chart.draw_series(LineSeries::new(line.points.iter().copied(), &line.color))?;
                }
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}

/// Shared bounds for a set of series, with 5% vertical padding.
pub fn bounds(lines: &[ChartLine<'_>]) -> ([f64; 2], [f64; 2]) {
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in lines.iter().flat_map(|l| l.points.iter()) {
        if x.is_finite() && y.is_finite() {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }

    if !x_min.is_finite() || !x_max.is_finite() {
        return ([0.0, 1.0], [0.0, 1.0]);
    }
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    if y_max <= y_min {
        y_min -= 1.0;
        y_max += 1.0;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
    ([x_min, x_max], [y_min - pad, y_max + pad])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_all_lines() {
        let a = [(0.0, 10.0), (5.0, 20.0)];
        let b = [(6.0, 5.0), (12.0, 15.0)];
        let lines = [
            ChartLine { points: &a, color: PALETTE[0], dotted: false },
            ChartLine { points: &b, color: PALETTE[1], dotted: true },
        ];
        let (x, y) = bounds(&lines);
        assert_eq!(x, [0.0, 12.0]);
        assert!(y[0] < 5.0 && y[1] > 20.0);
    }

    #[test]
    fn bounds_of_flat_single_point() {
        let a = [(3.0, 7.0)];
        let lines = [ChartLine { points: &a, color: PALETTE[0], dotted: false }];
        let (x, y) = bounds(&lines);
        assert_eq!(x, [3.0, 4.0]);
        assert!(y[0] < 7.0 && y[1] > 7.0);
    }

    #[test]
    fn tiny_area_renders_hint() {
        let lines: [ChartLine<'_>; 0] = [];
        let fmt = |v: f64| format!("{v}");
        let area = Rect::new(0, 0, 50, 4);
        let mut buf = Buffer::empty(area);
        SalesPlottersChart {
            lines: &lines,
            x_bounds: [0.0, 1.0],
            y_bounds: [0.0, 1.0],
            fmt_x: &fmt,
        }
        .render(area, &mut buf);
        let first_row: String = (0..area.width).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert!(first_row.starts_with("Chart area too small"));
    }
}
