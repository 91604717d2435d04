//! Plain-text rendering of the report for stdout.

use std::fmt::Write as _;

use unicode_width::UnicodeWidthStr;

use viability_core::formatting::format_currency;
use viability_core::models::MONTH_LABELS;
use viability_data::aggregator::TopClient;
use viability_data::reader::LoadReport;
use viability_data::reports::{ReportTable, ViabilityReport};

use crate::report_view::format_cell;

fn pad_left(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{}{}", " ".repeat(fill), s)
}

fn pad_right(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{}{}", s, " ".repeat(fill))
}

/// Lay out one table as aligned text: label column on the left, values
/// right-aligned, every value column as wide as its widest cell.
pub fn render_table_text(table: &ReportTable) -> String {
    let headers: Vec<String> = MONTH_LABELS
        .iter()
        .map(|m| m.to_string())
        .chain(table.summary_headers.iter().cloned())
        .collect();

    let body: Vec<(String, Vec<String>)> = table
        .rows
        .iter()
        .map(|row| {
            let cells = row
                .months
                .values()
                .iter()
                .chain(row.summary.iter())
                .map(|v| format_cell(*v, table.format))
                .collect();
            (row.label.clone(), cells)
        })
        .collect();

    let label_width = body.iter().map(|(l, _)| l.width()).max().unwrap_or(0);
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(col, h)| {
            body.iter()
                .filter_map(|(_, cells)| cells.get(col))
                .map(|c| c.width())
                .chain(std::iter::once(h.width()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "{}", table.title);
    let _ = writeln!(out, "{}", "=".repeat(table.title.width()));

    let mut line = pad_right("", label_width);
    for (h, w) in headers.iter().zip(&widths) {
        line.push_str("  ");
        line.push_str(&pad_left(h, *w));
    }
    let _ = writeln!(out, "{}", line.trim_end());

    for (label, cells) in &body {
        let mut line = pad_right(label, label_width);
        for (c, w) in cells.iter().zip(&widths) {
            line.push_str("  ");
            line.push_str(&pad_left(c, *w));
        }
        let _ = writeln!(out, "{}", line);
    }
    out
}

fn top_client_line(label: &str, top: Option<&TopClient>) -> String {
    match top {
        Some(t) => format!("{}: {} ({})", label, t.name, format_currency(t.total)),
        None => format!("{}: none", label),
    }
}

/// The whole report: heading, top clients and the three tables.
pub fn render_report_text(report: &ViabilityReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Viability report for {} ({} transactions)",
        report.year, report.transaction_count
    );
    let _ = writeln!(out, "{}", top_client_line("Top public client", report.top_public.as_ref()));
    let _ = writeln!(
        out,
        "{}",
        top_client_line("Top private client", report.top_private.as_ref())
    );

    for table in [&report.volumetry, &report.operational, &report.revenue] {
        out.push('\n');
        out.push_str(&render_table_text(table));
    }
    out
}

/// One-paragraph summary of what the loader read and skipped.
pub fn render_load_summary(report: &LoadReport) -> String {
    let mut out = format!(
        "Files: {} found, {} read, {} failed. Records: {} seen, {} dropped. Clients: {}.",
        report.files_found,
        report.files_read,
        report.files_failed.len(),
        report.records_seen,
        report.records_dropped(),
        report.clients_loaded,
    );
    for path in &report.files_failed {
        let _ = write!(out, "\n  skipped {}", path.display());
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report_view::tests::sample_report;
    use std::path::PathBuf;

    #[test]
    fn test_pad_helpers_use_display_width() {
        assert_eq!(pad_left("ab", 4), "  ab");
        assert_eq!(pad_right("é", 3), "é  ");
        assert_eq!(pad_left("toolong", 3), "toolong");
    }

    #[test]
    fn test_render_table_text_aligns_columns() {
        let report = sample_report();
        let text = render_table_text(&report.revenue);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "3. Revenue estimate");
        assert!(lines[2].contains("01-Jan"));
        assert!(lines[2].ends_with("Total"));
        let widths: Vec<usize> = lines[3..].iter().map(|l| l.width()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{widths:?}");
    }

    #[test]
    fn test_render_report_text_sections() {
        let text = render_report_text(&sample_report());
        assert!(text.starts_with("Viability report for 2024 (2 transactions)"));
        assert!(text.contains("Top public client: CITY HALL (R$ 1,000.00)"));
        assert!(text.contains("Top private client: ACME (R$ 250.00)"));
        assert!(text.contains("1. Overall volumetry (2024)"));
        assert!(text.contains("2. Operational detail"));
        assert!(text.contains("3. Revenue estimate"));
    }

    #[test]
    fn test_render_load_summary_lists_failed_files() {
        let mut report = LoadReport {
            files_found: 2,
            files_read: 1,
            records_seen: 5,
            clients_loaded: 3,
            ..LoadReport::default()
        };
        report.files_failed.push(PathBuf::from("dados_api/transacoes_bad.json"));
        let text = render_load_summary(&report);
        assert!(text.starts_with("Files: 2 found, 1 read, 1 failed."));
        assert!(text.contains("Clients: 3."));
        assert!(text.contains("skipped dados_api/transacoes_bad.json"));
    }
}
