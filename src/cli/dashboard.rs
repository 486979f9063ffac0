use std::path::Path;

use chrono::NaiveDateTime;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame,
};

use super::FilterArgs;
use crate::error::Result;
use crate::exporter::{export_csv, DEFAULT_EXPORT_NAME};
use crate::filter::{apply_filters, DateRange, FilterCriteria};
use crate::fmt::{compact, number};
use crate::models::CleanedTable;
use crate::reports::{summarize, RankedItem, SalesSummary};
use crate::settings::{load_settings, Settings};
use crate::tui::{
    install_panic_hook, money_span, FOOTER_STYLE, HEADER_STYLE, SELECTED_STYLE, TITLE_STYLE,
    WARNING_STYLE,
};

const BANNER: &str = " SmartMed Sales Dashboard";

/// Rows shown in the expiring-stock panel.
const EXPIRY_ROWS: usize = 8;

struct Dashboard<'t> {
    table: &'t CleanedTable,
    settings: Settings,
    source: String,
    now: NaiveDateTime,
    date_range: Option<DateRange>,
    customers: Vec<String>,
    products: Vec<String>,
    customer: Option<String>,
    product: Option<String>,
    summary: SalesSummary,
    status_message: Option<String>,
}

/// Step through `options` after (or before) `current`; stepping past either
/// end clears the selection, which means "All".
fn cycle(options: &[String], current: Option<&str>, forward: bool) -> Option<String> {
    if options.is_empty() {
        return None;
    }
    let pos = current.and_then(|c| options.iter().position(|o| o == c));
    let next = match (pos, forward) {
        (None, true) => Some(0),
        (None, false) => Some(options.len() - 1),
        (Some(i), true) => (i + 1 < options.len()).then_some(i + 1),
        (Some(i), false) => i.checked_sub(1),
    };
    next.map(|i| options[i].clone())
}

impl<'t> Dashboard<'t> {
    fn new(table: &'t CleanedTable, settings: Settings, source: String, criteria: FilterCriteria) -> Self {
        let now = chrono::Local::now().naive_local();
        let view = apply_filters(table, &criteria);
        let summary = summarize(&view, now, &settings.summary_options());
        Self {
            table,
            customers: table.customers(),
            products: table.products(),
            settings,
            source,
            now,
            date_range: criteria.date_range,
            customer: criteria.customer,
            product: criteria.product,
            summary,
            status_message: None,
        }
    }

    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            date_range: self.date_range,
            customer: self.customer.clone(),
            product: self.product.clone(),
        }
    }

    fn recompute(&mut self) {
        let view = apply_filters(self.table, &self.criteria());
        self.summary = summarize(&view, self.now, &self.settings.summary_options());
    }

    fn export(&self) -> Result<String> {
        let view = apply_filters(self.table, &self.criteria());
        let path = Path::new(DEFAULT_EXPORT_NAME);
        let written = export_csv(&view, path)?;
        Ok(format!("Wrote {written} records to {}", path.display()))
    }

    /// Returns true when the dashboard should close.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        self.status_message = None;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('c') | KeyCode::Char('C') => {
                let forward = code == KeyCode::Char('c');
                self.customer = cycle(&self.customers, self.customer.as_deref(), forward);
            }
            KeyCode::Char('p') | KeyCode::Char('P') => {
                let forward = code == KeyCode::Char('p');
                self.product = cycle(&self.products, self.product.as_deref(), forward);
            }
            KeyCode::Char('r') => {
                self.customer = None;
                self.product = None;
            }
            KeyCode::Char('e') => {
                self.status_message = Some(match self.export() {
                    Ok(msg) => msg,
                    Err(e) => format!("Export failed: {e}"),
                });
                return false;
            }
            _ => return false,
        }
        self.recompute();
        false
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let border_style = Style::default().fg(Color::DarkGray);

        let [header_area, filter_area, sep1, stats_area, sep2, charts_area, sep3, lists_area, hints_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(5),
                Constraint::Length(1),
                Constraint::Fill(1),
                Constraint::Length(1),
                Constraint::Length(list_rows(self.settings.top_n)),
                Constraint::Length(1),
            ])
            .areas(area);

        frame.render_widget(
            Paragraph::new(format!("{BANNER}  {}", self.source)).style(HEADER_STYLE),
            header_area,
        );
        frame.render_widget(Paragraph::new(self.filter_line()), filter_area);

        let sep_line = "━".repeat(area.width as usize);
        let sep_widget = Paragraph::new(sep_line.as_str()).style(border_style);
        frame.render_widget(sep_widget.clone(), sep1);
        frame.render_widget(sep_widget.clone(), sep2);
        frame.render_widget(sep_widget, sep3);

        let [stats_left, stats_right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(stats_area);
        frame.render_widget(Paragraph::new(self.kpi_lines()), stats_left);
        frame.render_widget(Paragraph::new(self.discount_lines()), stats_right);

        let [chart_left, chart_right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(charts_area);
        self.draw_trend(frame, chart_left);
        let title = format!(" Top {} Customers by Revenue", self.settings.top_n);
        frame.render_widget(
            Paragraph::new(self.ranked_lines(&title, &self.summary.top_customers, true)),
            chart_right,
        );

        let [lists_left, lists_right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(lists_area);
        if let Some(products) = &self.summary.top_products {
            let title = format!(" Top {} Products by Quantity", self.settings.top_n);
            frame.render_widget(Paragraph::new(self.ranked_lines(&title, products, false)), lists_left);
        }
        frame.render_widget(Paragraph::new(self.expiry_lines()), lists_right);

        if let Some(msg) = &self.status_message {
            frame.render_widget(
                Paragraph::new(format!(" {msg}")).style(Style::default().fg(Color::Yellow)),
                hints_area,
            );
        } else {
            frame.render_widget(
                Paragraph::new(" c/C=customer  p/P=product  r=reset  e=export CSV  q=quit").style(FOOTER_STYLE),
                hints_area,
            );
        }
    }

    fn filter_line(&self) -> Line<'static> {
        let range = match &self.date_range {
            Some(r) => format!("{} to {}", r.start, r.end),
            None => "all dates".to_string(),
        };
        let selected = |value: &Option<String>| match value {
            Some(v) => Span::styled(v.clone(), SELECTED_STYLE),
            None => Span::raw("All"),
        };
        Line::from(vec![
            Span::raw(format!(" {range}   Customer: ")),
            selected(&self.customer),
            Span::raw("   Product: "),
            selected(&self.product),
            Span::styled(format!("   {} records", number(self.summary.record_count as i64)), FOOTER_STYLE),
        ])
    }

    fn kpi_lines(&self) -> Vec<Line<'static>> {
        let sym = self.settings.currency_symbol.as_str();
        let s = &self.summary;
        let mut lines = vec![Line::from(vec![Span::raw(" Total Sales       "), money_span(s.total_amount, sym)])];
        if let Some(qty) = s.total_qty {
            lines.push(Line::from(format!(" Quantity Sold     {}", number(qty))));
        }
        lines.push(match s.avg_discount {
            Some(d) => Line::from(vec![Span::raw(" Avg Discount      "), money_span(d, sym)]),
            None => Line::from(" Avg Discount      -"),
        });
        if let Some(n) = s.expiring_batches {
            let style = if n > 0 { WARNING_STYLE } else { Style::default() };
            lines.push(Line::from(vec![
                Span::raw(" Expiring Batches  "),
                Span::styled(n.to_string(), style),
            ]));
        }
        lines
    }

    fn discount_lines(&self) -> Vec<Line<'static>> {
        let sym = self.settings.currency_symbol.as_str();
        let mut lines = vec![Line::from(Span::styled(" Discount Effectiveness", TITLE_STYLE))];
        for b in &self.summary.discount_buckets {
            lines.push(Line::from(vec![
                Span::raw(format!(
                    " {:<7} {:<10} {:>5} lines  ",
                    b.level.name(),
                    format!("({sym}{})", b.level.range()),
                    b.count
                )),
                money_span(b.amount, sym),
            ]));
        }
        lines
    }

    fn ranked_lines(&self, title: &str, items: &[RankedItem], as_money: bool) -> Vec<Line<'static>> {
        let sym = self.settings.currency_symbol.as_str();
        let name_width = items.iter().map(|i| i.name.chars().count()).max().unwrap_or(10);
        let mut lines = vec![Line::from(Span::styled(title.to_string(), TITLE_STYLE))];
        for item in items {
            let value = if as_money {
                money_span(item.total, sym)
            } else {
                Span::raw(number(item.total as i64))
            };
            lines.push(Line::from(vec![
                Span::raw(format!(" {:<width$}  ", item.name, width = name_width)),
                value,
            ]));
        }
        if items.is_empty() {
            lines.push(Line::from(Span::styled(" No matching sales.", FOOTER_STYLE)));
        }
        lines
    }

    fn expiry_lines(&self) -> Vec<Line<'static>> {
        let Some(groups) = &self.summary.expiring_soon else {
            return Vec::new();
        };
        let sym = self.settings.currency_symbol.as_str();
        let mut lines = vec![Line::from(Span::styled(
            format!(" Nearing Expiry (Next {} Days)", self.settings.expiry_window_days),
            TITLE_STYLE,
        ))];
        if groups.is_empty() {
            lines.push(Line::from(format!(
                " No stock expiring in the next {} days.",
                self.settings.expiry_window_days
            )));
            return lines;
        }
        for g in groups.iter().take(EXPIRY_ROWS) {
            lines.push(Line::from(vec![
                Span::styled(format!(" {}  ", g.exp_date), WARNING_STYLE),
                Span::raw(format!("{:<24}  ", g.product)),
                money_span(g.amount, sym),
            ]));
        }
        if groups.len() > EXPIRY_ROWS {
            lines.push(Line::from(Span::styled(
                format!(" ...and {} more", groups.len() - EXPIRY_ROWS),
                FOOTER_STYLE,
            )));
        }
        lines
    }

    fn draw_trend(&self, frame: &mut Frame, area: Rect) {
        let trend = &self.summary.monthly_trend;
        if trend.is_empty() {
            frame.render_widget(
                Paragraph::new(vec![
                    Line::from(Span::styled(" Monthly Sales Trend", TITLE_STYLE)),
                    Line::from(Span::styled(" No dated sales.", FOOTER_STYLE)),
                ]),
                area,
            );
            return;
        }

        let max_val = trend.iter().map(|m| m.amount).fold(1.0, f64::max);
        let (top_tick, mid_tick) = y_axis_ticks(max_val);
        let top_label = compact(top_tick);
        let mid_label = compact(mid_tick);
        let y_label_width = top_label.len().max(mid_label.len()) as u16 + 1;

        let [y_axis_area, bar_area] =
            Layout::horizontal([Constraint::Length(y_label_width), Constraint::Fill(1)]).areas(area);

        // Top tick on the first bar row, mid tick halfway down.
        let inner_height = bar_area.height.saturating_sub(2);
        let mid_row = inner_height / 2;
        let mut y_lines: Vec<Line> = vec![Line::from("")];
        for row in 0..inner_height {
            let label = if row == 0 {
                top_label.as_str()
            } else if row == mid_row {
                mid_label.as_str()
            } else {
                ""
            };
            y_lines.push(Line::from(Span::styled(
                format!("{:>width$}", label, width = y_label_width as usize),
                FOOTER_STYLE,
            )));
        }
        frame.render_widget(Paragraph::new(y_lines), y_axis_area);

        let bar_style = Style::default().fg(Color::Rgb(80, 220, 100));
        let bars: Vec<Bar> = trend
            .iter()
            .map(|m| {
                Bar::default()
                    .value(m.amount.max(0.0).round() as u64)
                    .text_value(compact(m.amount))
                    .label(Line::from(m.label.clone()))
                    .style(bar_style)
            })
            .collect();

        let block = Block::default()
            .title("Monthly Sales Trend")
            .title_style(TITLE_STYLE)
            .borders(Borders::NONE);
        let chart = BarChart::default()
            .block(block)
            .bar_width(8)
            .bar_gap(1)
            .max(top_tick.round() as u64)
            .data(BarGroup::default().bars(&bars));
        frame.render_widget(chart, bar_area);
    }
}

/// Height of the bottom panels: a title, the longer list, and an overflow line.
fn list_rows(top_n: usize) -> u16 {
    u16::try_from(top_n.max(EXPIRY_ROWS))
        .unwrap_or(u16::MAX)
        .saturating_add(2)
}

/// Round y-axis tick values (top and mid) for a given max data value.
fn y_axis_ticks(max_val: f64) -> (f64, f64) {
    let mut step = 100.0;
    let top = loop {
        let found = [1.0, 2.5, 5.0]
            .iter()
            .map(|m| m * step)
            .find(|&s| s >= max_val);
        if let Some(top) = found {
            break top;
        }
        step *= 10.0;
    };
    (top, top / 2.0)
}

pub fn run(file: &str, filters: &FilterArgs) -> Result<()> {
    let settings = load_settings();
    let table = super::load_table(file, &settings)?;
    let criteria = filters.criteria(&table)?;
    let source = Path::new(file)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string());
    let mut dashboard = Dashboard::new(&table, settings, source, criteria);

    install_panic_hook();
    let mut terminal = ratatui::init();

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| dashboard.draw(frame)) {
            break Err(e.into());
        }
        match event::read() {
            Err(e) => break Err(e.into()),
            Ok(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                    break Ok(());
                }
                if dashboard.handle_key(key.code) {
                    break Ok(());
                }
            }
            _ => {}
        }
    };

    drop(terminal);
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cell, RawTable};
    use crate::normalizer::{normalize, Schema};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sample_table() -> CleanedTable {
        let raw = RawTable::new(
            names(&["Vch_date", "Particulars", "Unnamed: 1", "Qty", "Amount"]),
            [
                ["2025-01-01", "A", "P1", "1", "100"],
                ["2025-01-02", "B", "P2", "2", "200"],
                ["2025-02-03", "A", "P2", "3", "50"],
            ]
            .iter()
            .map(|r| r.iter().map(|c| Cell::from_text(c)).collect())
            .collect(),
        );
        normalize(&raw, &Schema::default()).unwrap()
    }

    #[test]
    fn test_cycle_wraps_through_all() {
        let opts = names(&["A", "B"]);
        assert_eq!(cycle(&opts, None, true).as_deref(), Some("A"));
        assert_eq!(cycle(&opts, Some("A"), true).as_deref(), Some("B"));
        assert_eq!(cycle(&opts, Some("B"), true), None);
        assert_eq!(cycle(&opts, None, false).as_deref(), Some("B"));
        assert_eq!(cycle(&opts, Some("A"), false), None);
        assert_eq!(cycle(&opts, Some("gone"), true).as_deref(), Some("A"));
        assert_eq!(cycle(&[], None, true), None);
    }

    #[test]
    fn test_y_axis_ticks_round_up() {
        assert_eq!(y_axis_ticks(80.0), (100.0, 50.0));
        assert_eq!(y_axis_ticks(1800.0), (2500.0, 1250.0));
        assert_eq!(y_axis_ticks(420_000.0), (500_000.0, 250_000.0));
    }

    #[test]
    fn test_list_rows_saturates() {
        assert_eq!(list_rows(5), EXPIRY_ROWS as u16 + 2);
        assert_eq!(list_rows(20), 22);
        assert_eq!(list_rows(65_534), u16::MAX);
        assert_eq!(list_rows(usize::MAX), u16::MAX);
    }

    #[test]
    fn test_keys_recompute_summary() {
        let table = sample_table();
        let mut dash = Dashboard::new(&table, Settings::default(), "s.csv".into(), FilterCriteria::default());
        assert_eq!(dash.summary.total_amount, 350.0);

        assert!(!dash.handle_key(KeyCode::Char('c')));
        assert_eq!(dash.customer.as_deref(), Some("A"));
        assert_eq!(dash.summary.total_amount, 150.0);

        dash.handle_key(KeyCode::Char('p'));
        assert_eq!(dash.product.as_deref(), Some("P1"));
        assert_eq!(dash.summary.record_count, 1);

        dash.handle_key(KeyCode::Char('r'));
        assert_eq!(dash.customer, None);
        assert_eq!(dash.summary.total_amount, 350.0);

        assert!(dash.handle_key(KeyCode::Char('q')));
    }
}
