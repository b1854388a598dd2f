//! CSV and workbook output.

use std::path::{Path, PathBuf};

use report_core::data_processors::{CellFormatter, CountParser};
use report_core::error::{ReportError, Result};
use report_core::formatting::truncate_chars;
use report_core::models::{
    AggregateTable, CategoryBucket, ExtractionKind, Table, NETWORKS_COLUMN, NET_COUNTED_ADS_COLUMN,
};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::{debug, info};

/// Longest sheet name a spreadsheet accepts.
pub const MAX_SHEET_NAME_CHARS: usize = 31;

// ── Single-file CSV ───────────────────────────────────────────────────────────

/// `<output_dir>/<input stem><suffix>.csv` for one extraction pass.
pub fn output_csv_path(output_dir: &Path, input: &Path, kind: ExtractionKind) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_dir.join(format!("{stem}{}.csv", kind.output_suffix()))
}

/// Write `table` as a two-column `Networks,Net Counted Ads` CSV.
pub fn write_aggregate_csv(path: &Path, table: &AggregateTable) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([NETWORKS_COLUMN, NET_COUNTED_ADS_COLUMN])?;
    for (network, count) in table.iter() {
        writer.write_record([network, count.to_string().as_str()])?;
    }
    writer.flush()?;

    debug!("Wrote {} networks to {}", table.len(), path.display());
    Ok(())
}

/// Parse a CSV produced by [`write_aggregate_csv`].
pub fn read_aggregate_csv(path: &Path) -> Result<AggregateTable> {
    if !path.is_file() {
        return Err(ReportError::MissingInputFile(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let source_name = path.display().to_string();

    let headers = reader.headers()?.clone();
    let header_table = Table::new(headers.iter().map(str::to_string).collect(), Vec::new());
    let network_idx = header_table.require_column(NETWORKS_COLUMN, &source_name)?;
    let count_idx = header_table.require_column(NET_COUNTED_ADS_COLUMN, &source_name)?;

    let mut table = AggregateTable::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let network = record.get(network_idx).unwrap_or_default();
        let count = CountParser::parse_required(
            record.get(count_idx).unwrap_or_default(),
            NET_COUNTED_ADS_COLUMN,
            i + 1,
        )?;
        table.add(network, count)?;
    }
    Ok(table)
}

// ── Multi-file workbook ───────────────────────────────────────────────────────

/// Sheet name for `category`, cut to [`MAX_SHEET_NAME_CHARS`].
///
/// Two categories that share their first 31 characters collide; the
/// workbook writer then rejects the duplicate name.
pub fn sheet_name(category: &str) -> &str {
    truncate_chars(category, MAX_SHEET_NAME_CHARS)
}

/// Build an in-memory workbook with one sheet per non-empty category.
///
/// Each sheet holds the category's tables stacked vertically under a bold
/// header row. Cells that look numeric are written as numbers; empty cells
/// are left blank.
pub fn build_workbook(bucket: &CategoryBucket) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let header_fmt = Format::new().set_bold();

    for (category, tables) in bucket.non_empty() {
        let combined = Table::concat(tables);
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(category)).map_err(workbook_error)?;

        for (col, header) in combined.headers.iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, header, &header_fmt)
                .map_err(workbook_error)?;
        }

        for (r, row) in combined.rows.iter().enumerate() {
            let row_num = (r + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                match CellFormatter::as_number(cell) {
                    Some(n) => sheet.write_number(row_num, col as u16, n),
                    None => sheet.write_string(row_num, col as u16, cell),
                }
                .map_err(workbook_error)?;
            }
        }

        debug!(
            "Sheet '{}': {} rows from {} files",
            sheet_name(category),
            combined.len(),
            tables.len()
        );
    }

    Ok(workbook)
}

/// Write the combined workbook to `path`.
pub fn write_workbook(path: &Path, bucket: &CategoryBucket) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut workbook = build_workbook(bucket)?;
    workbook.save(path).map_err(workbook_error)?;
    info!("Combined workbook saved to {}", path.display());
    Ok(())
}

/// Serialize the combined workbook to bytes.
pub fn workbook_bytes(bucket: &CategoryBucket) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(bucket)?;
    workbook.save_to_buffer().map_err(workbook_error)
}

fn workbook_error(e: XlsxError) -> ReportError {
    ReportError::Workbook(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::TableReader;
    use calamine::Reader;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_output_csv_path() {
        let path = output_csv_path(
            Path::new("/out"),
            Path::new("/in/April Report.xlsx"),
            ExtractionKind::Tve,
        );
        assert_eq!(path, PathBuf::from("/out/April Report_TVE_Output.csv"));
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report_VOD_Output.csv");
        let table =
            AggregateTable::from_counts(vec![("ESPN", 1234), ("A&E", 7), ("Food, Network", 0)])
                .unwrap();

        write_aggregate_csv(&path, &table).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Networks,Net Counted Ads\n"));

        let back = read_aggregate_csv(&path).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_csv_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("x.csv");
        write_aggregate_csv(&path, &AggregateTable::new()).unwrap();
        assert!(read_aggregate_csv(&path).unwrap().is_empty());
    }

    #[test]
    fn test_read_aggregate_csv_missing() {
        let err = read_aggregate_csv(Path::new("/tmp/eom-report-missing-output.csv")).unwrap_err();
        assert!(matches!(err, ReportError::MissingInputFile(_)));
    }

    #[test]
    fn test_sheet_name_truncation() {
        let long = "Reach-Frequency By Daypart And Network";
        assert_eq!(sheet_name(long).chars().count(), 31);
        assert_eq!(sheet_name(long), "Reach-Frequency By Daypart And ");
        assert_eq!(sheet_name("VOD"), "VOD");
    }

    #[test]
    fn test_sheet_name_collision_is_an_error() {
        let base = "A".repeat(31);
        let mut bucket = CategoryBucket::default();
        bucket.push(&format!("{base}1"), table(&["x"], &[&["1"]]));
        bucket.push(&format!("{base}2"), table(&["x"], &[&["2"]]));
        let err = workbook_bytes(&bucket).unwrap_err();
        assert!(matches!(err, ReportError::Workbook(_)));
    }

    #[test]
    fn test_workbook_sheets_in_bucket_order() {
        let mut bucket = CategoryBucket::with_categories(["VOD", "LSA", "Geo"]);
        bucket.push("Geo", table(&["Region", "Net Counted Ads"], &[&["East", "5"]]));
        bucket.push(
            "VOD",
            table(&["Video Group Name", "Net Counted Ads"], &[&["ESPN", "10"]]),
        );
        bucket.push(
            "VOD",
            table(&["Video Group Name", "Net Counted Ads"], &[&["CNN", "3"]]),
        );

        let bytes = workbook_bytes(&bucket).unwrap();
        let workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.clone())).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["VOD".to_string(), "Geo".to_string()]);

        let first = TableReader::default().read_bytes("combined.xlsx", &bytes).unwrap();
        assert_eq!(first.headers, vec!["Video Group Name", "Net Counted Ads"]);
        assert_eq!(first.rows, vec![vec!["ESPN", "10"], vec!["CNN", "3"]]);
    }

    #[test]
    fn test_workbook_numeric_cells_are_numbers() {
        let mut bucket = CategoryBucket::default();
        bucket.push("Daily", table(&["Date", "Count", "Id"], &[&["2024-04-01", "42", "007"]]));
        let bytes = workbook_bytes(&bucket).unwrap();

        let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        assert_eq!(range.get_value((1, 1)), Some(&calamine::Data::Float(42.0)));
        assert_eq!(
            range.get_value((1, 2)),
            Some(&calamine::Data::String("007".to_string()))
        );
    }

    #[test]
    fn test_write_workbook_to_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("combined_output.xlsx");
        let mut bucket = CategoryBucket::default();
        bucket.push("LSA", table(&["Television Network Name"], &[&["ESPN"]]));
        write_workbook(&path, &bucket).unwrap();
        assert!(path.is_file());
    }
}
