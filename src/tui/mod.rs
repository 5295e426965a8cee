//! Ratatui-based terminal UI.
//!
//! Five mutually exclusive views over one session table: dashboard, product
//! analysis, demand forecast, promotion recommendation, and weekly insight.
//! Forecasts are computed on first view and memoized per product.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use tracing::{info, warn};

use crate::app::pipeline::Session;
use crate::domain::{ForecastResult, SalesTable, SessionConfig, ViewKind};
use crate::error::AppError;
use crate::report;

mod plotters_chart;

use plotters_chart::{ChartLine, PALETTE, SalesPlottersChart};

/// Start the TUI. The table is loaded before the terminal switches modes so
/// load failures print normally.
pub fn run(config: &SessionConfig) -> Result<(), AppError> {
    let session = Session::open(config)?;
    let mut app = App::new(session, PathBuf::from("."));

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    session: Session,
    view: ViewKind,
    products: Vec<String>,
    selected: usize,
    /// Per-product forecast, or the failure message shown inline.
    forecasts: HashMap<String, Result<ForecastResult, String>>,
    export_dir: PathBuf,
    status: String,
}

impl App {
    fn new(session: Session, export_dir: PathBuf) -> Self {
        let products = session.table().product_ids();
        let status = loaded_status(&session);
        Self {
            session,
            view: ViewKind::Dashboard,
            products,
            selected: 0,
            forecasts: HashMap::new(),
            export_dir,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                self.prepare_view();
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => needs_redraw = true,
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                self.view = ViewKind::ALL[idx];
            }
            KeyCode::Tab => self.view = self.view.next(),
            KeyCode::BackTab => self.view = self.view.prev(),
            KeyCode::Left => self.step_product(-1),
            KeyCode::Right => self.step_product(1),
            KeyCode::Char('e') => self.export_selected(),
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
        false
    }

    fn selected_product(&self) -> Option<&str> {
        self.products.get(self.selected).map(String::as_str)
    }

    fn step_product(&mut self, delta: isize) {
        if self.products.is_empty() {
            return;
        }
        let n = self.products.len() as isize;
        self.selected = (self.selected as isize + delta).rem_euclid(n) as usize;
        if let Some(p) = self.selected_product() {
            self.status = format!("product: {p}");
        }
    }

    /// Compute whatever the current view needs that is not memoized yet.
    fn prepare_view(&mut self) {
        if matches!(self.view, ViewKind::Forecast) {
            self.ensure_forecast();
        }
    }

    fn ensure_forecast(&mut self) -> Option<&Result<ForecastResult, String>> {
        let product = self.selected_product()?.to_string();
        let table = Rc::clone(self.session.table());
        let entry = self.forecasts.entry(product).or_insert_with_key(|p| {
            crate::forecast::forecast_product(&table, p).map_err(|e| e.to_string())
        });
        Some(&*entry)
    }

    fn export_selected(&mut self) {
        let dir = self.export_dir.clone();
        self.status = match self.ensure_forecast() {
            None => "No product to export.".to_string(),
            Some(Err(msg)) => format!("Nothing to export: {msg}"),
            Some(Ok(result)) => match crate::io::export_forecast(&dir, result) {
                Ok(path) => format!("Exported {}", path.display()),
                Err(err) => {
                    warn!(error = %err, "forecast export failed");
                    format!("Export failed: {err}")
                }
            },
        };
    }

    fn reload(&mut self) {
        let before = Rc::clone(self.session.table());
        match self.session.reload() {
            Ok(()) => {
                if !Rc::ptr_eq(&before, self.session.table()) {
                    self.products = self.session.table().product_ids();
                    self.selected = 0;
                    self.forecasts.clear();
                }
                self.status = format!("Reloaded. {}", loaded_status(&self.session));
                info!("table reloaded from the source chain");
            }
            Err(err) => self.status = format!("Reload failed: {err}"),
        }
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut tabs = vec![Span::styled("sales ", Style::default().fg(Color::Cyan))];
        for (i, view) in ViewKind::ALL.iter().enumerate() {
            let style = if *view == self.view {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default().fg(Color::Gray)
            };
            tabs.push(Span::styled(format!(" {} {} ", i + 1, view.title()), style));
        }

        let product = match self.selected_product() {
            Some(p) => format!("product: ◀ {p} ▶ ({}/{})", self.selected + 1, self.products.len()),
            None => "product: -".to_string(),
        };

        let lines = vec![
            Line::from(tabs),
            Line::from(Span::styled(product, Style::default().fg(Color::Gray))),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let table = self.session.table();
        match self.view {
            ViewKind::Dashboard => self.draw_dashboard(frame, area, table),
            ViewKind::Product => self.draw_product(frame, area, table),
            ViewKind::Forecast => self.draw_forecast(frame, area, table),
            ViewKind::Promotion => {
                let text = report::format_promotion(&report::promotion_summary(table));
                draw_text(frame, area, self.view.title(), &text);
            }
            ViewKind::Insight => {
                let text = report::format_insight(report::weekly_insight(table).as_ref());
                draw_text(frame, area, self.view.title(), &text);
            }
        }
    }

    fn draw_dashboard(&self, frame: &mut ratatui::Frame<'_>, area: Rect, table: &SalesTable) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(area);

        let top = report::top_products(table.records(), report::TOP_N);
        let mut trends = report::daily_trend(table);
        let series: Vec<(String, Vec<(NaiveDate, f64)>)> = top
            .iter()
            .map(|p| {
                let pts = trends
                    .remove(&p.product_id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(d, u)| (d, u as f64))
                    .collect();
                (p.product_id.clone(), pts)
            })
            .collect();
        draw_date_chart(frame, cols[0], "Daily units (top products)", table.first_date(), &series, None);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(report::TOP_N as u16 + 2), Constraint::Min(0)])
            .split(cols[1]);

        let items: Vec<ListItem> = top
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let color = plotters_to_ratatui(PALETTE[i % PALETTE.len()]);
                ListItem::new(Line::from(vec![
                    Span::styled("■ ", Style::default().fg(color)),
                    Span::raw(format!("{:<16} {:>8}", p.product_id, p.total_units)),
                ]))
            })
            .collect();
        frame.render_widget(
            List::new(items).block(Block::default().title("Top products").borders(Borders::ALL)),
            right[0],
        );

        let regions: Vec<ListItem> = report::region_totals(table.records())
            .into_iter()
            .map(|r| {
                ListItem::new(format!(
                    "{:<12} {:>8} {:>6.1}%",
                    r.region,
                    r.total_units,
                    r.share * 100.0
                ))
            })
            .collect();
        frame.render_widget(
            List::new(regions).block(Block::default().title("Regions").borders(Borders::ALL)),
            right[1],
        );
    }

    fn draw_product(&self, frame: &mut ratatui::Frame<'_>, area: Rect, table: &SalesTable) {
        let Some(summary) = self.selected_product().and_then(|p| report::product_summary(table, p)) else {
            draw_text(frame, area, self.view.title(), "No products in the table.");
            return;
        };

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0)])
            .split(area);

        let stats = vec![
            Line::from(format!("Total units sold : {}", summary.total_units)),
            Line::from(format!(
                "Daily average    : {}",
                summary.mean_units.map(|m| format!("{m:.2}")).unwrap_or_else(|| "n/a".to_string())
            )),
            Line::from(format!(
                "Top region       : {}",
                summary.top_region.as_deref().unwrap_or("n/a")
            )),
        ];
        frame.render_widget(
            Paragraph::new(stats).block(
                Block::default()
                    .title(format!("{}: {}", self.view.title(), summary.product_id))
                    .borders(Borders::ALL),
            ),
            rows[0],
        );

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(rows[1]);

        let trend: Vec<(NaiveDate, f64)> = report::daily_trend(table)
            .remove(&summary.product_id)
            .unwrap_or_default()
            .into_iter()
            .map(|(d, u)| (d, u as f64))
            .collect();
        draw_date_chart(
            frame,
            cols[0],
            "Daily units",
            table.first_date(),
            &[(summary.product_id.clone(), trend)],
            None,
        );

        let items: Vec<ListItem> = summary
            .rows
            .iter()
            .rev()
            .map(|r| {
                ListItem::new(format!(
                    "{} {:<11} {:<3} {:>5}",
                    r.date,
                    r.region.as_deref().unwrap_or("-"),
                    match r.promotion {
                        Some(true) => "yes",
                        Some(false) => "no",
                        None => "-",
                    },
                    r.units_sold.map(|u| u.to_string()).unwrap_or_else(|| "-".to_string()),
                ))
            })
            .collect();
        frame.render_widget(
            List::new(items).block(Block::default().title("Rows (newest first)").borders(Borders::ALL)),
            cols[1],
        );
    }

    fn draw_forecast(&self, frame: &mut ratatui::Frame<'_>, area: Rect, table: &SalesTable) {
        let Some(product) = self.selected_product() else {
            draw_text(frame, area, self.view.title(), "No products in the table.");
            return;
        };
        let result = match self.forecasts.get(product) {
            Some(Ok(result)) => result,
            Some(Err(msg)) => {
                let p = Paragraph::new(msg.as_str())
                    .style(Style::default().fg(Color::Red))
                    .wrap(Wrap { trim: true })
                    .block(Block::default().title(self.view.title()).borders(Borders::ALL));
                frame.render_widget(p, area);
                return;
            }
            None => {
                draw_text(frame, area, self.view.title(), "Fitting model...");
                return;
            }
        };

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(area);

        let history: Vec<(NaiveDate, f64)> = report::daily_trend(table)
            .remove(product)
            .unwrap_or_default()
            .into_iter()
            .map(|(d, u)| (d, u as f64))
            .collect();
        let projected: Vec<(NaiveDate, f64)> = result.points.iter().map(|p| (p.date, p.predicted_units)).collect();
        draw_date_chart(
            frame,
            cols[0],
            "History and 7-day forecast",
            history.first().map(|&(d, _)| d),
            &[(product.to_string(), history)],
            Some(&projected),
        );

        let mut lines = vec![
            Line::from(Span::styled(
                format!("ARIMA(1,1,1)  n={}", result.model.n_obs),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("ar={:.4} ma={:.4}", result.model.ar, result.model.ma)),
            Line::from(format!("sigma2={:.3}", result.model.sigma2)),
            Line::from(""),
        ];
        for p in &result.points {
            lines.push(Line::from(format!("{}  {:>10.2}", p.date, p.predicted_units)));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "press e to export CSV",
            Style::default().fg(Color::Gray),
        )));
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().title(product.to_string()).borders(Borders::ALL)),
            cols[1],
        );
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "1-5/Tab view  ←/→ product  e export  r reload  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Provenance line, plus any source that was passed over on the way.
fn loaded_status(session: &Session) -> String {
    let mut status = report::format_provenance(session.table()).trim_end().to_string();
    if !session.skipped_sources().is_empty() {
        status.push_str(&format!(" | skipped {}", session.skipped_sources().join("; ")));
    }
    status
}

fn draw_text(frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, text: &str) {
    let p = Paragraph::new(text.to_string())
        .wrap(Wrap { trim: false })
        .block(Block::default().title(title.to_string()).borders(Borders::ALL));
    frame.render_widget(p, area);
}

/// Draw dated series (one colored line each) plus an optional dotted forecast.
fn draw_date_chart(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    base: Option<NaiveDate>,
    series: &[(String, Vec<(NaiveDate, f64)>)],
    forecast: Option<&[(NaiveDate, f64)]>,
) {
    let block = Block::default().title(title.to_string()).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    let Some(base) = base else {
        frame.render_widget(
            Paragraph::new("No data.").style(Style::default().fg(Color::Yellow)),
            inner,
        );
        return;
    };

    let to_xy = |pts: &[(NaiveDate, f64)]| -> Vec<(f64, f64)> {
        pts.iter().map(|&(d, y)| ((d - base).num_days() as f64, y)).collect()
    };
    let mut xy: Vec<(Vec<(f64, f64)>, bool)> = series.iter().map(|(_, pts)| (to_xy(pts), false)).collect();
    if let Some(f) = forecast {
        xy.push((to_xy(f), true));
    }

    let lines: Vec<ChartLine<'_>> = xy
        .iter()
        .enumerate()
        .map(|(i, (points, dotted))| ChartLine {
            points: points.as_slice(),
            color: if *dotted { PALETTE[4] } else { PALETTE[i % PALETTE.len()] },
            dotted: *dotted,
        })
        .collect();
    let (x_bounds, y_bounds) = plotters_chart::bounds(&lines);
    let fmt_x = move |v: f64| {
        (base + chrono::Duration::days(v.round() as i64))
            .format("%m-%d")
            .to_string()
    };

    frame.render_widget(
        SalesPlottersChart {
            lines: &lines,
            x_bounds,
            y_bounds,
            fmt_x: &fmt_x,
        },
        inner,
    );
}

fn plotters_to_ratatui(c: plotters::style::RGBColor) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ratatui::backend::TestBackend;

    use super::*;
    use crate::data::{LocalSource, SourceChain, SourceProvider, UploadedFile};

    fn app(csv: &str) -> (App, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sales.csv"), csv).unwrap();
        let chain = SourceChain::new(vec![Box::new(LocalSource::new(dir.path(), "sales"))]);
        let session = Session::with_chain(chain, Some(9)).unwrap();
        (App::new(session, dir.path().to_path_buf()), dir)
    }

    fn two_products() -> String {
        let mut csv = String::from("date,product_id,region,promotion_flag,units_sold\n");
        for day in 1..=20 {
            let a = 50 + (day * 37 % 23) + day / 2;
            let b = 10 + (day * 29 % 17);
            csv.push_str(&format!("2024-03-{day:02},A,Medan,{},{a}\n", day % 2));
            csv.push_str(&format!("2024-03-{day:02},B,Jakarta,0,{b}\n"));
        }
        csv.push_str("2024-03-01,C,Bandung,1,5\n");
        csv
    }

    #[test]
    fn view_keys_switch_views() {
        let (mut app, _dir) = app(&two_products());
        assert_eq!(app.view, ViewKind::Dashboard);
        assert!(!app.handle_key(KeyCode::Char('3')));
        assert_eq!(app.view, ViewKind::Forecast);
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.view, ViewKind::Promotion);
        app.handle_key(KeyCode::BackTab);
        app.handle_key(KeyCode::BackTab);
        assert_eq!(app.view, ViewKind::Product);
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn product_selection_wraps() {
        let (mut app, _dir) = app(&two_products());
        assert_eq!(app.selected_product(), Some("A"));
        app.handle_key(KeyCode::Left);
        assert_eq!(app.selected_product(), Some("C"));
        app.handle_key(KeyCode::Right);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.selected_product(), Some("B"));
    }

    #[test]
    fn forecast_is_memoized_and_failure_is_inline() {
        let (mut app, _dir) = app(&two_products());
        app.handle_key(KeyCode::Char('3'));
        app.prepare_view();
        assert!(matches!(app.forecasts.get("A"), Some(Ok(r)) if r.points.len() == 7));

        // C has a single row: the fit fails but the session continues.
        app.handle_key(KeyCode::Left);
        app.prepare_view();
        assert!(matches!(app.forecasts.get("C"), Some(Err(_))));
        assert!(!app.handle_key(KeyCode::Char('1')));
        assert_eq!(app.forecasts.len(), 2);
    }

    #[test]
    fn export_writes_csv_into_export_dir() {
        let (mut app, dir) = app(&two_products());
        app.handle_key(KeyCode::Char('e'));
        assert!(app.status.starts_with("Exported"), "{}", app.status);
        assert!(dir.path().join("forecast_A.csv").is_file());
    }

    #[test]
    fn reload_keeps_cached_table() {
        let (mut app, _dir) = app(&two_products());
        app.handle_key(KeyCode::Char('3'));
        app.prepare_view();
        app.handle_key(KeyCode::Char('r'));
        assert!(app.status.starts_with("Reloaded."));
        assert_eq!(app.forecasts.len(), 1);
    }

    #[test]
    fn unusable_upload_is_named_in_status() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sales.csv"), two_products()).unwrap();
        let upload = UploadedFile::new("mine.xlsx", b"not really a workbook".to_vec()).unwrap();
        let providers: Vec<Box<dyn SourceProvider>> =
            vec![Box::new(upload), Box::new(LocalSource::new(dir.path(), "sales"))];
        let session = Session::with_chain(SourceChain::new(providers), Some(9)).unwrap();
        let app = App::new(session, dir.path().to_path_buf());

        assert!(app.status.starts_with("Source: local file"), "{}", app.status);
        assert!(app.status.contains("skipped uploaded file mine.xlsx:"), "{}", app.status);
    }

    #[test]
    fn text_views_render() {
        let (mut app, _dir) = app(&two_products());
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        for key in ['4', '5'] {
            app.handle_key(KeyCode::Char(key));
            terminal.draw(|f| app.draw(f)).unwrap();
        }
        let buffer = terminal.backend().buffer().clone();
        let text: String = buffer.content.iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Weekly Insight"));
    }
}
