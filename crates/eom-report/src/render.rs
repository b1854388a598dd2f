//! Plain-text tables for terminal output.
//!
//! One row per category or network, a share-of-total column and a totals
//! row, padded by display width so non-ASCII labels line up.

use report_core::formatting::{format_count, format_share};
use report_core::models::{AggregateTable, SummaryTable};
use unicode_width::UnicodeWidthStr;

/// A rendered row: label, count, share.
type Row = [String; 3];

/// Render the combined-run summary.
pub fn render_summary(summary: &SummaryTable) -> String {
    let total = summary.total();
    let rows: Vec<Row> = summary
        .rows()
        .iter()
        .map(|r| [r.label.clone(), format_count(r.count), format_share(r.count, total, 1)])
        .collect();
    render(["Category", "Net Counted Ads", "Share"], rows, total)
}

/// Render one extraction's per-network totals.
pub fn render_aggregate(table: &AggregateTable) -> String {
    let total = table.total();
    let rows: Vec<Row> = table
        .iter()
        .map(|(network, count)| {
            [network.to_string(), format_count(count), format_share(count, total, 1)]
        })
        .collect();
    render(["Network", "Net Counted Ads", "Share"], rows, total)
}

fn render(headers: [&str; 3], rows: Vec<Row>, total: i64) -> String {
    let header: Row = headers.map(str::to_string);
    let footer: Row = [
        "Total".to_string(),
        format_count(total),
        if rows.is_empty() { "-".to_string() } else { "100.0%".to_string() },
    ];

    let mut widths = [0usize; 3];
    for row in std::iter::once(&header).chain(&rows).chain(std::iter::once(&footer)) {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.width());
        }
    }

    let rule = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join("-+-");

    let mut out = String::new();
    out.push_str(&line(&header, &widths));
    out.push_str(&rule);
    out.push('\n');
    for row in &rows {
        out.push_str(&line(row, &widths));
    }
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&line(&footer, &widths));
    out
}

/// First column left-aligned, the rest right-aligned.
fn line(row: &Row, widths: &[usize; 3]) -> String {
    let cells: Vec<String> = row
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, &w))| {
            let pad = " ".repeat(w.saturating_sub(cell.width()));
            if i == 0 {
                format!("{cell}{pad}")
            } else {
                format!("{pad}{cell}")
            }
        })
        .collect();
    format!("{}\n", cells.join(" | ").trim_end())
}
