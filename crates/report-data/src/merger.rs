//! Per-file summary sums and the cross-category merge.

use report_core::data_processors::CountParser;
use report_core::error::Result;
use report_core::models::{SummaryRow, SummaryTable, Table, NET_COUNTED_ADS_COLUMN};

/// Label of the merged VOD + LSA summary row.
pub const MERGED_LABEL: &str = "VOD & LSA";

const MERGE_SOURCES: [&str; 2] = ["VOD", "LSA"];

/// Sum "Net Counted Ads" over `table`, skipping blank cells.
pub fn summarize_table(table: &Table, source_name: &str) -> Result<i64> {
    let idx = table.require_column(NET_COUNTED_ADS_COLUMN, source_name)?;
    CountParser::sum_column(table.column_values(idx), NET_COUNTED_ADS_COLUMN)
}

/// Fold VOD and LSA rows into a single trailing [`MERGED_LABEL`] row.
///
/// Applies only when both labels are present; otherwise the table is
/// returned unchanged. Remaining rows keep their relative order.
pub fn merge_vod_lsa(summary: SummaryTable) -> Result<SummaryTable> {
    let has_all = MERGE_SOURCES.iter().all(|l| summary.contains_label(l));
    if !has_all {
        return Ok(summary);
    }

    let mut merged = 0;
    let mut rows: Vec<SummaryRow> = Vec::with_capacity(summary.len());
    for row in summary.rows() {
        if MERGE_SOURCES.contains(&row.label.as_str()) {
            merged = CountParser::checked_sum(merged, row.count, MERGED_LABEL)?;
        } else {
            rows.push(row.clone());
        }
    }
    rows.push(SummaryRow {
        label: MERGED_LABEL.to_string(),
        count: merged,
    });
    Ok(rows.into_iter().collect())
}
