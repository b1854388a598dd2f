//! Per-network aggregation of Net Counted Ads.

use report_core::data_processors::CountParser;
use report_core::error::Result;
use report_core::models::{AggregateTable, ReportRow, ResolvedRow, Table, NET_COUNTED_ADS_COLUMN};
use tracing::debug;

/// Pull `(label, count)` rows out of `table`.
///
/// Every count cell must parse; a bad or blank cell fails the whole table.
pub fn extract_report_rows(
    table: &Table,
    label_column: &str,
    source_name: &str,
) -> Result<Vec<ReportRow>> {
    let label_idx = table.require_column(label_column, source_name)?;
    let count_idx = table.require_column(NET_COUNTED_ADS_COLUMN, source_name)?;

    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let count = CountParser::parse_required(&row[count_idx], NET_COUNTED_ADS_COLUMN, i + 1)?;
            Ok(ReportRow {
                label: row[label_idx].clone(),
                count,
            })
        })
        .collect()
}

/// Stateless helper that groups resolved rows by network.
pub struct NetworkAggregator;

impl NetworkAggregator {
    /// Sum counts per resolved network. Rows resolved to "Unknown" never
    /// contribute. Output is ordered by network name.
    ///
    /// A per-network total that overflows fails the whole aggregation.
    pub fn aggregate(rows: &[ResolvedRow]) -> Result<AggregateTable> {
        let mut table = AggregateTable::new();
        let mut skipped = 0usize;
        for resolved in rows {
            if resolved.network.is_unknown() {
                skipped += 1;
                continue;
            }
            table.add(resolved.network.as_str(), resolved.row.count)?;
        }
        debug!(
            "Aggregated {} rows into {} networks ({} unknown skipped)",
            rows.len() - skipped,
            table.len(),
            skipped
        );
        Ok(table)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use report_core::error::ReportError;
    use report_core::models::{Resolution, UNKNOWN_NETWORK};

    fn resolved(network: Option<&str>, count: i64) -> ResolvedRow {
        ResolvedRow {
            row: ReportRow {
                label: network.unwrap_or("raw").to_string(),
                count,
            },
            network: match network {
                Some(n) => Resolution::Network(n.to_string()),
                None => Resolution::Unknown,
            },
        }
    }

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    // ── aggregate ─────────────────────────────────────────────────────────────

    #[test]
    fn test_aggregate_sums_per_network() {
        let rows = vec![
            resolved(Some("TNT"), 10),
            resolved(Some("AMC"), 3),
            resolved(Some("TNT"), 5),
        ];
        let table = NetworkAggregator::aggregate(&rows).unwrap();
        let pairs: Vec<(&str, i64)> = table.iter().collect();
        assert_eq!(pairs, vec![("AMC", 3), ("TNT", 15)]);
    }

    #[test]
    fn test_aggregate_excludes_unknown() {
        let rows = vec![resolved(None, 100), resolved(Some("CNN"), 1)];
        let table = NetworkAggregator::aggregate(&rows).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(UNKNOWN_NETWORK), None);
        assert_eq!(table.total(), 1);
    }

    #[test]
    fn test_aggregate_empty_input() {
        assert!(NetworkAggregator::aggregate(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_aggregate_order_independent() {
        let mut rows = vec![
            resolved(Some("A"), 1),
            resolved(Some("B"), 2),
            resolved(None, 7),
            resolved(Some("A"), 3),
            resolved(Some("C"), -4),
            resolved(Some("B"), 5),
        ];
        let expected = NetworkAggregator::aggregate(&rows).unwrap();
        rows.reverse();
        assert_eq!(NetworkAggregator::aggregate(&rows).unwrap(), expected);
        rows.rotate_left(2);
        assert_eq!(NetworkAggregator::aggregate(&rows).unwrap(), expected);
        rows.swap(0, 4);
        assert_eq!(NetworkAggregator::aggregate(&rows).unwrap(), expected);
    }

    #[test]
    fn test_aggregate_overflow_is_error() {
        let rows = vec![resolved(Some("TNT"), i64::MAX), resolved(Some("TNT"), 1)];
        let err = NetworkAggregator::aggregate(&rows).unwrap_err();
        assert!(matches!(err, ReportError::CountOverflow { ref label } if label == "TNT"));
    }

    // ── extract_report_rows ───────────────────────────────────────────────────

    #[test]
    fn test_extract_rows_strips_separators() {
        let t = table(
            &["Video Group Name", "Net Counted Ads"],
            &[&["ESPN", "1,234"], &["CNN", "7"]],
        );
        let rows = extract_report_rows(&t, "Video Group Name", "vod.csv").unwrap();
        assert_eq!(rows[0], ReportRow { label: "ESPN".into(), count: 1234 });
        assert_eq!(rows[1].count, 7);
    }

    #[test]
    fn test_extract_rows_non_numeric_fails() {
        let t = table(
            &["Video Group Name", "Net Counted Ads"],
            &[&["ESPN", "1"], &["CNN", "N/A"]],
        );
        let err = extract_report_rows(&t, "Video Group Name", "vod.csv").unwrap_err();
        assert!(matches!(err, ReportError::TypeCoercion { row: 2, .. }));
    }

    #[test]
    fn test_extract_rows_missing_label_column() {
        let t = table(&["Site Section Name", "Net Counted Ads"], &[]);
        let err = extract_report_rows(&t, "Video Group Name", "tve.csv").unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn { .. }));
    }

    #[test]
    fn test_extract_rows_missing_count_column() {
        let t = table(&["Video Group Name"], &[&["ESPN"]]);
        let err = extract_report_rows(&t, "Video Group Name", "vod.csv").unwrap_err();
        assert!(err.to_string().contains("Net Counted Ads"));
    }
}
