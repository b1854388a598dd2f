//! Tabular file loading with header recovery.
//!
//! Reads delimited and spreadsheet exports into a [`Table`]. Vendor exports
//! sometimes prepend report-metadata banner rows before the real header; when
//! the first parse yields placeholder headers or ragged rows, the source is
//! re-parsed with a fixed number of leading rows skipped.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader};
use regex::Regex;
use report_core::data_processors::CellFormatter;
use report_core::error::{ReportError, Result};
use report_core::models::Table;
use report_core::settings::DEFAULT_BANNER_ROWS;
use tracing::{debug, warn};

// ── Encodings ─────────────────────────────────────────────────────────────────

/// Text encodings tried, in order, when decoding delimited sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8, with an optional byte-order mark.
    Utf8,
    /// ISO-8859-1; every byte maps to the code point of the same value.
    Latin1,
}

impl TextEncoding {
    /// Decode `bytes`, or `None` when they are not valid in this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => {
                let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                std::str::from_utf8(body).ok().map(str::to_string)
            }
            TextEncoding::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// Decode with the first encoding in `chain` that accepts `bytes`.
pub fn decode_text(bytes: &[u8], chain: &[TextEncoding]) -> Option<(String, TextEncoding)> {
    chain.iter().find_map(|&enc| {
        let text = enc.decode(bytes)?;
        Some((text, enc))
    })
}

// ── Formats ───────────────────────────────────────────────────────────────────

/// Physical layout of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,
    Spreadsheet,
}

impl SourceFormat {
    /// Infer the format from a file name's extension. Anything that is not a
    /// known spreadsheet extension is read as delimited text.
    pub fn from_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => SourceFormat::Spreadsheet,
            _ => SourceFormat::Delimited,
        }
    }

    /// `true` for extensions the multi-file mode accepts.
    pub fn is_supported_name(name: &str) -> bool {
        let ext = Path::new(name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        matches!(ext.as_str(), "csv" | "xlsx" | "xlsm" | "xls")
    }
}

// ── ReadOptions ───────────────────────────────────────────────────────────────

/// Knobs for [`TableReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Leading rows skipped on the recovery parse: source lines for delimited
    /// files, sheet rows from A1 for spreadsheets. This approximates the
    /// banner height of known vendor exports; the true offset is not detected.
    pub banner_rows: usize,
    /// Encodings tried in order for delimited sources.
    pub encodings: Vec<TextEncoding>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            banner_rows: DEFAULT_BANNER_ROWS,
            encodings: vec![TextEncoding::Utf8, TextEncoding::Latin1],
        }
    }
}

impl ReadOptions {
    pub fn with_banner_rows(banner_rows: usize) -> Self {
        Self {
            banner_rows,
            ..Self::default()
        }
    }
}

// ── TableReader ───────────────────────────────────────────────────────────────

/// Loads input files into [`Table`]s, recovering from banner rows.
#[derive(Debug, Clone, Default)]
pub struct TableReader {
    options: ReadOptions,
}

impl TableReader {
    pub fn new(options: ReadOptions) -> Self {
        Self { options }
    }

    /// Read the file at `path`.
    pub fn read_path(&self, path: &Path) -> Result<Table> {
        if !path.is_file() {
            return Err(ReportError::MissingInputFile(path.to_path_buf()));
        }
        let bytes = std::fs::read(path).map_err(|e| ReportError::UnreadableInput {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let name = path.to_string_lossy();
        self.read_bytes(&name, &bytes)
    }

    /// Read an in-memory file. `name` selects the format and labels errors.
    pub fn read_bytes(&self, name: &str, bytes: &[u8]) -> Result<Table> {
        let table = match SourceFormat::from_name(name) {
            SourceFormat::Delimited => {
                let text = self.decode(name, bytes)?;
                let grid = delimited_grid(name, &text)?;
                self.recover(name, &grid, |skip| {
                    delimited_grid(name, skip_lines(&text, skip))
                })?
            }
            SourceFormat::Spreadsheet => {
                let grid = spreadsheet_grid(name, bytes)?;
                self.normalize(name, &grid)?
            }
        };
        debug!(
            "Read {}: {} columns, {} rows",
            name,
            table.headers.len(),
            table.len()
        );
        Ok(table)
    }

    /// Turn a raw cell grid into a table with a sane header row.
    ///
    /// The first parse uses row 0 as header. If it fails or any header is a
    /// placeholder, the grid is re-parsed with `banner_rows` rows skipped.
    pub fn normalize(&self, name: &str, grid: &[Vec<String>]) -> Result<Table> {
        self.recover(name, grid, |skip| Ok(grid.iter().skip(skip).cloned().collect()))
    }

    /// Parse `grid`, falling back to the grid `skipped(banner_rows)` yields.
    fn recover<F>(&self, name: &str, grid: &[Vec<String>], skipped: F) -> Result<Table>
    where
        F: FnOnce(usize) -> Result<Vec<Vec<String>>>,
    {
        let placeholder = placeholder_pattern();

        let first_failure = match build_table(grid) {
            Ok(table) => match table.headers.iter().find(|h| is_placeholder(&placeholder, h)) {
                None => return Ok(table),
                Some(h) => format!("placeholder header {:?}", h),
            },
            Err(reason) => reason,
        };

        let skip = self.options.banner_rows;
        if skip == 0 {
            return Err(schema_drift(name, first_failure));
        }
        debug!(
            "{}: {}; retrying with {} banner rows skipped",
            name, first_failure, skip
        );

        let retry = skipped(skip)?;
        match build_table(&retry) {
            Ok(table) => {
                if table.headers.iter().any(|h| is_placeholder(&placeholder, h)) {
                    warn!(
                        "{}: header still has unnamed columns after skipping {} rows",
                        name, skip
                    );
                }
                Ok(table)
            }
            Err(reason) => Err(schema_drift(
                name,
                format!("{first_failure}; after skipping {skip} rows: {reason}"),
            )),
        }
    }

    fn decode(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let (text, encoding) =
            decode_text(bytes, &self.options.encodings).ok_or_else(|| {
                ReportError::UnreadableInput {
                    path: PathBuf::from(name),
                    reason: "not decodable with any configured encoding".to_string(),
                }
            })?;
        if encoding != self.options.encodings[0] {
            debug!("{}: decoded with fallback encoding {:?}", name, encoding);
        }
        Ok(text)
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn delimited_grid(name: &str, text: &str) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReportError::UnreadableInput {
            path: PathBuf::from(name),
            reason: e.to_string(),
        })?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(grid)
}

/// `text` without its first `n` lines. Empty lines count.
fn skip_lines(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        match rest.find('\n') {
            Some(i) => rest = &rest[i + 1..],
            None => return "",
        }
    }
    rest
}

/// Read the first worksheet into a grid anchored at cell A1, so that row
/// offsets match what a user sees in the spreadsheet.
fn spreadsheet_grid(name: &str, bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let unreadable = |reason: String| ReportError::UnreadableInput {
        path: PathBuf::from(name),
        reason,
    };

    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| unreadable(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| unreadable("workbook has no worksheets".to_string()))?
        .map_err(|e| unreadable(e.to_string()))?;

    let Some((start_row, start_col)) = range.start() else {
        return Ok(Vec::new());
    };

    let mut grid: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![String::new(); start_col as usize];
        cells.extend(row.iter().map(cell_to_string));
        grid.push(cells);
    }
    Ok(grid)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => CellFormatter::number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Build a table from `grid`, using the first non-blank row as the header.
///
/// Blank rows are dropped. A data row with non-empty cells beyond the header
/// width means the header is not where it was assumed to be.
fn build_table(grid: &[Vec<String>]) -> std::result::Result<Table, String> {
    let mut rows = grid.iter().filter(|row| !is_blank_row(row));

    let headers = dedupe_headers(
        rows.next()
            .ok_or_else(|| "no header row".to_string())?
            .iter()
            .map(|h| h.trim().to_string()),
    );

    let mut data = Vec::new();
    for (i, row) in rows.enumerate() {
        if row.len() > headers.len() && row[headers.len()..].iter().any(|c| !c.is_empty()) {
            return Err(format!(
                "data row {} has {} fields, header has {}",
                i + 1,
                row.len(),
                headers.len()
            ));
        }
        data.push(row.clone());
    }

    Ok(Table::new(headers, data))
}

/// Suffix repeated non-empty header names `.1`, `.2`, ... so every named
/// column stays addressable.
fn dedupe_headers(headers: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for h in headers {
        if h.is_empty() || !out.contains(&h) {
            out.push(h);
            continue;
        }
        let mut n = 1;
        while out.contains(&format!("{h}.{n}")) {
            n += 1;
        }
        out.push(format!("{h}.{n}"));
    }
    out
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

fn placeholder_pattern() -> Regex {
    Regex::new(r"^Unnamed(:\s*\d+)?").expect("regex is valid")
}

fn is_placeholder(pattern: &Regex, header: &str) -> bool {
    header.is_empty() || pattern.is_match(header)
}

fn schema_drift(name: &str, reason: String) -> ReportError {
    ReportError::SchemaDrift {
        path: PathBuf::from(name),
        reason,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn reader() -> TableReader {
        TableReader::default()
    }

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    // ── decoding ──────────────────────────────────────────────────────────────

    #[test]
    fn test_decode_utf8_strips_bom() {
        let (text, enc) = decode_text(b"\xEF\xBB\xBFa,b", &[TextEncoding::Utf8]).unwrap();
        assert_eq!(text, "a,b");
        assert_eq!(enc, TextEncoding::Utf8);
    }

    #[test]
    fn test_decode_falls_back_to_latin1() {
        // 0xE9 is 'é' in Latin-1 and invalid as a lone UTF-8 byte.
        let bytes = b"Caf\xE9";
        let (text, enc) =
            decode_text(bytes, &[TextEncoding::Utf8, TextEncoding::Latin1]).unwrap();
        assert_eq!(text, "Café");
        assert_eq!(enc, TextEncoding::Latin1);
    }

    #[test]
    fn test_decode_without_fallback_fails() {
        assert!(decode_text(b"Caf\xE9", &[TextEncoding::Utf8]).is_none());
    }

    // ── formats ───────────────────────────────────────────────────────────────

    #[test]
    fn test_source_format_from_name() {
        assert_eq!(SourceFormat::from_name("a.csv"), SourceFormat::Delimited);
        assert_eq!(SourceFormat::from_name("a.XLSX"), SourceFormat::Spreadsheet);
        assert_eq!(SourceFormat::from_name("noext"), SourceFormat::Delimited);
        assert!(SourceFormat::is_supported_name("Geo.xlsx"));
        assert!(!SourceFormat::is_supported_name("notes.txt"));
    }

    // ── normalize ─────────────────────────────────────────────────────────────

    #[test]
    fn test_clean_header_parsed_directly() {
        let g = grid(&[&["Video Group Name", "Net Counted Ads"], &["ESPN", "10"]]);
        let table = reader().normalize("x.csv", &g).unwrap();
        assert_eq!(table.headers, vec!["Video Group Name", "Net Counted Ads"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_banner_rows_skipped_on_placeholder_header() {
        let g = grid(&[
            &["Report: Delivery", ""],
            &["Generated", "2024-05-01"],
            &["", ""],
            &["Advertiser", "Acme"],
            &["Site Section Name", "Net Counted Ads"],
            &["espn_live", "1,200"],
        ]);
        let table = reader().normalize("x.csv", &g).unwrap();
        assert_eq!(table.headers, vec!["Site Section Name", "Net Counted Ads"]);
        assert_eq!(table.rows, vec![vec!["espn_live", "1,200"]]);
    }

    #[test]
    fn test_banner_rows_skipped_on_ragged_rows() {
        let g = grid(&[
            &["Delivery Report"],
            &["Run date 2024-05-01"],
            &["Advertiser Acme"],
            &["Period April"],
            &["Video Group Name", "Net Counted Ads"],
            &["ESPN", "5"],
        ]);
        let table = reader().normalize("x.csv", &g).unwrap();
        assert_eq!(table.headers, vec!["Video Group Name", "Net Counted Ads"]);
    }

    #[test]
    fn test_unnamed_marker_detected() {
        let g = grid(&[
            &["Unnamed: 0", "Net Counted Ads"],
            &["a", "1"],
            &["b", "2"],
            &["c", "3"],
            &["Network", "Net Counted Ads"],
            &["ESPN", "4"],
        ]);
        let table = reader().normalize("x.csv", &g).unwrap();
        assert_eq!(table.headers[0], "Network");
    }

    #[test]
    fn test_configurable_banner_rows() {
        let g = grid(&[
            &["Banner", ""],
            &["Network", "Net Counted Ads"],
            &["ESPN", "4"],
        ]);
        let table = TableReader::new(ReadOptions::with_banner_rows(1))
            .normalize("x.csv", &g)
            .unwrap();
        assert_eq!(table.headers, vec!["Network", "Net Counted Ads"]);
    }

    #[test]
    fn test_retry_failure_is_schema_drift() {
        let g = grid(&[&["Banner"], &["a", "b", "c"]]);
        let err = reader().normalize("x.csv", &g).unwrap_err();
        assert!(matches!(err, ReportError::SchemaDrift { .. }));
    }

    #[test]
    fn test_empty_grid_is_schema_drift() {
        let err = reader().normalize("x.csv", &[]).unwrap_err();
        assert!(matches!(err, ReportError::SchemaDrift { .. }));
    }

    #[test]
    fn test_repeated_headers_are_suffixed() {
        let g = grid(&[
            &["Date", "Net Counted Ads", "Net Counted Ads", "Date"],
            &["2024-04-01", "1", "2", "x"],
        ]);
        let table = reader().normalize("x.csv", &g).unwrap();
        assert_eq!(
            table.headers,
            vec!["Date", "Net Counted Ads", "Net Counted Ads.1", "Date.1"]
        );
        assert_eq!(table.rows[0], vec!["2024-04-01", "1", "2", "x"]);
    }

    #[test]
    fn test_trailing_empty_cells_tolerated() {
        let g = grid(&[&["A", "B"], &["1", "2", ""]]);
        let table = reader().normalize("x.csv", &g).unwrap();
        assert_eq!(table.rows[0], vec!["1", "2"]);
    }

    // ── read_bytes / read_path ────────────────────────────────────────────────

    #[test]
    fn test_read_bytes_csv_with_quoted_separators() {
        let csv = "Video Group Name,Net Counted Ads\nESPN,\"1,234\"\nCNN,10\n";
        let table = reader().read_bytes("vod.csv", csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0], vec!["ESPN", "1,234"]);
        assert_eq!(table.rows[1], vec!["CNN", "10"]);
    }

    #[test]
    fn test_read_bytes_banner_with_empty_line() {
        let csv = "Delivery Report\n\nAdvertiser: Acme\nPeriod: April\n\
                   Video Group Name,Net Counted Ads\nCNN,8\nESPN,3\n";
        let table = reader().read_bytes("x.csv", csv.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Video Group Name", "Net Counted Ads"]);
        assert_eq!(table.rows, vec![vec!["CNN", "8"], vec!["ESPN", "3"]]);
    }

    #[test]
    fn test_skip_lines_counts_empty_lines() {
        assert_eq!(skip_lines("a\n\nb\nc", 2), "b\nc");
        assert_eq!(skip_lines("a\r\n\r\nb", 2), "b");
        assert_eq!(skip_lines("a\nb", 5), "");
        assert_eq!(skip_lines("a", 0), "a");
    }

    #[test]
    fn test_read_bytes_banner_with_crlf_and_empty_lines() {
        let csv = "Delivery Report\r\n\r\n\r\nPeriod: April\r\n\
                   Region,Net Counted Ads\r\nEast,5\r\n";
        let table = reader().read_bytes("Geo.csv", csv.as_bytes()).unwrap();
        assert_eq!(table.headers, vec!["Region", "Net Counted Ads"]);
        assert_eq!(table.rows, vec![vec!["East", "5"]]);
    }

    #[test]
    fn test_read_bytes_latin1_csv() {
        let bytes = b"Video Group Name,Net Counted Ads\nT\xE9l\xE9,3\n";
        let table = reader().read_bytes("vod.csv", bytes).unwrap();
        assert_eq!(table.rows[0][0], "Télé");
    }

    #[test]
    fn test_read_path_missing_file() {
        let err = reader()
            .read_path(Path::new("/tmp/eom-report-missing-input.csv"))
            .unwrap_err();
        assert!(matches!(err, ReportError::MissingInputFile(_)));
    }

    #[test]
    fn test_read_path_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("april.csv");
        std::fs::write(&path, "A,B\n1,2\n").unwrap();
        let table = reader().read_path(&path).unwrap();
        assert_eq!(table.headers, vec!["A", "B"]);
    }

    #[test]
    fn test_read_bytes_corrupt_spreadsheet() {
        let err = reader()
            .read_bytes("Geo.xlsx", b"definitely not a zip")
            .unwrap_err();
        assert!(matches!(err, ReportError::UnreadableInput { .. }));
    }

    #[test]
    fn test_read_bytes_spreadsheet_round_trip() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Television Network Name").unwrap();
        sheet.write_string(0, 1, "Net Counted Ads").unwrap();
        sheet.write_string(1, 0, "ESPN").unwrap();
        sheet.write_number(1, 1, 1500.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let table = reader().read_bytes("LSA.xlsx", &bytes).unwrap();
        assert_eq!(table.headers, vec!["Television Network Name", "Net Counted Ads"]);
        assert_eq!(table.rows, vec![vec!["ESPN", "1500"]]);
    }

    #[test]
    fn test_read_bytes_spreadsheet_banner_offset_from_a1() {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        // Rows 0-1 empty; banner in rows 2-3; header in row 4.
        sheet.write_string(2, 0, "Campaign Delivery").unwrap();
        sheet.write_string(3, 0, "April").unwrap();
        sheet.write_string(4, 0, "Placement Name").unwrap();
        sheet.write_string(4, 1, "Net Counted Ads").unwrap();
        sheet.write_string(5, 0, "Linear A").unwrap();
        sheet.write_number(5, 1, 7.0).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let table = reader().read_bytes("Delivery.xlsx", &bytes).unwrap();
        assert_eq!(table.headers, vec!["Placement Name", "Net Counted Ads"]);
        assert_eq!(table.rows, vec![vec!["Linear A", "7"]]);
    }
}
