//! Ratatui widgets for the viability report.
//!
//! One bordered [`Table`] per report table and two grouped [`BarChart`]s:
//! monthly volume by client category and estimated monthly revenue.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use viability_core::formatting::{format_currency, format_number};
use viability_core::models::MONTH_LABELS;
use viability_data::aggregator::MonthlySeries;
use viability_data::reports::{CellFormat, ReportTable, ViabilityReport};

use crate::themes::Theme;

const LABEL_WIDTH: u16 = 36;
const VALUE_WIDTH: u16 = 14;

// ── Section ───────────────────────────────────────────────────────────────────

/// Which part of the report fills the body of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Volumetry,
    Operational,
    Revenue,
    Charts,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Volumetry,
        Section::Operational,
        Section::Revenue,
        Section::Charts,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Section::Volumetry => "Volumetry",
            Section::Operational => "Operational",
            Section::Revenue => "Revenue",
            Section::Charts => "Charts",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// Next section, wrapping around.
    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Section for a 1-based number key.
    pub fn from_digit(digit: char) -> Option<Self> {
        let n = digit.to_digit(10)? as usize;
        Self::ALL.get(n.checked_sub(1)?).copied()
    }
}

/// Render a value the way its table asks for.
pub fn format_cell(value: f64, format: CellFormat) -> String {
    match format {
        CellFormat::Currency => format_currency(value),
        CellFormat::Number => format_number(value, 2),
    }
}

// ── Tables ────────────────────────────────────────────────────────────────────

/// Render one report table into `area`.
///
/// Columns: row label, the twelve months, then the table's summary columns.
/// Emphasized rows use the totals style.
pub fn render_report_table(frame: &mut Frame, area: Rect, table: &ReportTable, theme: &Theme) {
    let header_cells = std::iter::once(String::new())
        .chain(MONTH_LABELS.iter().map(|m| m.to_string()))
        .chain(table.summary_headers.iter().cloned())
        .map(|h| Cell::from(h).style(theme.table_header));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let cells = std::iter::once(Cell::from(row.label.clone()))
                .chain(
                    row.months
                        .values()
                        .iter()
                        .chain(row.summary.iter())
                        .map(|v| Cell::from(format_cell(*v, table.format))),
                );
            Row::new(cells).style(theme.row_style(i, row.emphasized))
        })
        .collect();

    let widths: Vec<Constraint> = std::iter::once(Constraint::Length(LABEL_WIDTH))
        .chain(
            std::iter::repeat(Constraint::Length(VALUE_WIDTH))
                .take(MONTH_LABELS.len() + table.summary_headers.len()),
        )
        .collect();

    let widget = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} ", table.title)),
        )
        .style(theme.text);

    frame.render_widget(widget, area);
}

// ── Charts ────────────────────────────────────────────────────────────────────

fn bar(value: f64, style: ratatui::style::Style) -> Bar<'static> {
    Bar::default()
        .value(value.max(0.0).round() as u64)
        .text_value(format_number(value, 0))
        .style(style)
}

/// Grouped bars: one group per month, public and private volume side by side.
pub fn render_volume_chart(
    frame: &mut Frame,
    area: Rect,
    public: &MonthlySeries,
    private: &MonthlySeries,
    theme: &Theme,
) {
    let mut chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(Line::from(vec![
                    Span::raw(" Monthly volume by category: "),
                    Span::styled("public", theme.public_bar),
                    Span::raw(" / "),
                    Span::styled("private ", theme.private_bar),
                ])),
        )
        .bar_width(4)
        .bar_gap(0)
        .group_gap(2);

    for (i, label) in MONTH_LABELS.iter().enumerate() {
        let month = i as u32 + 1;
        let bars = [
            bar(public.get(month), theme.public_bar),
            bar(private.get(month), theme.private_bar),
        ];
        chart = chart.data(
            BarGroup::default()
                .label(Line::from(label.to_string()))
                .bars(&bars),
        );
    }

    frame.render_widget(chart, area);
}

/// One bar per month with the estimated total revenue.
pub fn render_revenue_chart(frame: &mut Frame, area: Rect, revenue: &MonthlySeries, theme: &Theme) {
    let bars: Vec<Bar> = MONTH_LABELS
        .iter()
        .zip(revenue.values().iter())
        .map(|(label, value)| bar(*value, theme.revenue_bar).label(Line::from(label.to_string())))
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(" Estimated monthly revenue "),
        )
        .bar_width(7)
        .bar_gap(1)
        .data(BarGroup::default().bars(&bars));

    frame.render_widget(chart, area);
}

// ── Whole report ──────────────────────────────────────────────────────────────

/// Render `section` of `report` into `area`.
pub fn render_section(
    frame: &mut Frame,
    area: Rect,
    report: &ViabilityReport,
    section: Section,
    theme: &Theme,
) {
    match section {
        Section::Volumetry => render_report_table(frame, area, &report.volumetry, theme),
        Section::Operational => render_report_table(frame, area, &report.operational, theme),
        Section::Revenue => render_report_table(frame, area, &report.revenue, theme),
        Section::Charts => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(area);
            render_volume_chart(
                frame,
                chunks[0],
                &report.public_volume,
                &report.private_volume,
                theme,
            );
            render_revenue_chart(frame, chunks[1], &report.revenue_trend, theme);
        }
    }
}

/// Render a placeholder when there is no report to show.
pub fn render_no_data(frame: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No transaction data found", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(message.to_string(), theme.dim)),
        Line::from(Span::styled(
            "Press 'r' to reload, 'q' or Ctrl+C to exit",
            theme.dim,
        )),
    ];
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Viability Report "),
        ),
        area,
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────
