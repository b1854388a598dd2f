//! Single-file extraction: one report in, one aggregated CSV per kind out.
//!
//! The input is read once. Each requested [`ExtractionKind`] then runs its
//! own pipeline over a copy of the table:
//!
//! 1. Apply the kind's row rules.
//! 2. Extract `(label, count)` rows.
//! 3. Resolve labels to canonical networks.
//! 4. Aggregate, dropping unresolved rows, and apply post-fixes.
//! 5. Write `<stem>_<KIND>_Output.csv`.
//!
//! A failure in one kind is reported and does not stop the next.

use std::path::{Path, PathBuf};

use report_core::error::Result;
use report_core::models::{AggregateTable, ExtractionKind, Issue, ReportType, Table};
use report_data::aggregator::{extract_report_rows, NetworkAggregator};
use report_data::reader::{ReadOptions, TableReader};
use report_data::reference::ReferenceSet;
use report_data::resolver::NetworkResolver;
use report_data::rules::RuleSet;
use report_data::writer::{output_csv_path, write_aggregate_csv};
use tracing::{debug, info, warn};

use crate::metadata::RunMetadata;

/// Everything a single-file run needs besides reference data.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub input: PathBuf,
    pub report_type: ReportType,
    pub output_dir: PathBuf,
    pub read_options: ReadOptions,
}

impl ExtractionRequest {
    pub fn new(input: impl Into<PathBuf>, report_type: ReportType) -> Self {
        Self {
            input: input.into(),
            report_type,
            output_dir: PathBuf::from("."),
            read_options: ReadOptions::default(),
        }
    }
}

/// Per-kind counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub unknown_rows: usize,
}

/// One successful extraction pass.
#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    pub kind: ExtractionKind,
    pub table: AggregateTable,
    pub path: PathBuf,
    pub stats: ExtractionStats,
}

/// Outcome of [`run_extraction`].
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub outputs: Vec<ExtractionOutput>,
    pub issues: Vec<Issue>,
    pub metadata: RunMetadata,
    requested: usize,
}

impl ExtractionResult {
    /// `true` when every requested kind wrote its CSV.
    pub fn is_success(&self) -> bool {
        self.requested > 0 && self.outputs.len() == self.requested
    }
}

/// Run one extraction kind over an already-loaded table.
///
/// Pure apart from logging: nothing is written.
pub fn extract(
    table: &Table,
    kind: ExtractionKind,
    refs: &ReferenceSet,
    source_name: &str,
) -> Result<(AggregateTable, ExtractionStats)> {
    let mut table = table.clone();
    let mut stats = ExtractionStats {
        rows_read: table.len(),
        ..ExtractionStats::default()
    };

    stats.rows_dropped = RuleSet::for_extraction(kind).apply(&mut table);
    let rows = extract_report_rows(&table, kind.label_column(), source_name)?;

    let resolver = NetworkResolver::new(refs.networks_for(kind), &refs.renames, kind.into());
    let resolved = resolver.resolve_rows(rows);
    stats.unknown_rows = resolved.iter().filter(|r| r.network.is_unknown()).count();

    let mut aggregate = NetworkAggregator::aggregate(&resolved)?;
    resolver.apply_post_fixes(&mut aggregate)?;

    debug!(
        "{} {}: {} rows, {} dropped, {} unknown, {} networks",
        source_name,
        kind,
        stats.rows_read,
        stats.rows_dropped,
        stats.unknown_rows,
        aggregate.len()
    );
    Ok((aggregate, stats))
}

/// Read `request.input` and write one CSV per requested kind.
pub fn run_extraction(request: &ExtractionRequest, refs: &ReferenceSet) -> ExtractionResult {
    let mut metadata = RunMetadata::start();
    let kinds = request.report_type.kinds();
    let mut result = ExtractionResult {
        outputs: Vec::new(),
        issues: Vec::new(),
        metadata: metadata.clone(),
        requested: kinds.len(),
    };
    let source_name = display_name(&request.input);

    info!(
        "Extracting {} from {}",
        request.report_type,
        request.input.display()
    );

    let reader = TableReader::new(request.read_options.clone());
    let table = match reader.read_path(&request.input) {
        Ok(table) => table,
        Err(e) => {
            warn!("{}", e);
            result.issues.push(Issue::from_error(Some(&source_name), &e));
            metadata.files_skipped = 1;
            metadata.log("Extraction");
            result.metadata = metadata;
            return result;
        }
    };
    metadata.rows_read = table.len();

    for &kind in kinds {
        match run_kind(&table, kind, refs, request, &source_name) {
            Ok(output) => {
                metadata.rows_dropped += output.stats.rows_dropped;
                metadata.unknown_rows += output.stats.unknown_rows;
                info!("{} output saved to {}", kind, output.path.display());
                result.outputs.push(output);
            }
            Err(e) => {
                warn!("{} extraction failed: {}", kind, e);
                result.issues.push(Issue::from_error(Some(&source_name), &e));
            }
        }
    }

    if result.outputs.is_empty() {
        metadata.files_skipped = 1;
    } else {
        metadata.files_processed = 1;
    }
    metadata.log("Extraction");
    result.metadata = metadata;
    result
}

fn run_kind(
    table: &Table,
    kind: ExtractionKind,
    refs: &ReferenceSet,
    request: &ExtractionRequest,
    source_name: &str,
) -> Result<ExtractionOutput> {
    let (aggregate, stats) = extract(table, kind, refs, source_name)?;
    let path = output_csv_path(&request.output_dir, &request.input, kind);
    write_aggregate_csv(&path, &aggregate)?;
    Ok(ExtractionOutput {
        kind,
        table: aggregate,
        path,
        stats,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use report_core::error::ReportError;
    use report_core::models::{IssueLevel, UNKNOWN_NETWORK};
    use report_data::reference::{RENAME_FILE, TVE_NETWORKS_FILE, VOD_NETWORKS_FILE};
    use report_data::writer::read_aggregate_csv;
    use tempfile::TempDir;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn refs(dir: &Path) -> ReferenceSet {
        std::fs::write(dir.join(VOD_NETWORKS_FILE), "ESPN\nESPN2\nCNN\n").unwrap();
        std::fs::write(dir.join(TVE_NETWORKS_FILE), "AE\nA&E\nDiscovery\n").unwrap();
        std::fs::write(dir.join(RENAME_FILE), "ESPN2,ESPN\n").unwrap();
        ReferenceSet::load(dir)
    }

    #[test]
    fn test_vod_extract_renames_and_sums() {
        let dir = TempDir::new().unwrap();
        let refs = refs(dir.path());
        let t = table(
            &["Video Group Name", "Net Counted Ads"],
            &[
                &["ESPN", "1,000"],
                &["ESPN2", "234"],
                &["CNN", "5"],
                &["Mystery", "99"],
            ],
        );
        let (agg, stats) = extract(&t, ExtractionKind::Vod, &refs, "vod.csv").unwrap();
        let pairs: Vec<(&str, i64)> = agg.iter().collect();
        assert_eq!(pairs, vec![("CNN", 5), ("ESPN", 1234)]);
        assert_eq!(stats.unknown_rows, 1);
        assert_eq!(agg.get(UNKNOWN_NETWORK), None);
    }

    #[test]
    fn test_tve_extract_filters_and_post_fixes() {
        let dir = TempDir::new().unwrap();
        let refs = refs(dir.path());
        let t = table(
            &["Site Section Name", "Net Counted Ads"],
            &[
                &["cox_legacy_section_live", "500"],
                &["cox_A&E_section_live", "10"],
                &["cox_A+E_section_live", "3"],
                &["discovery_vod", "7"],
            ],
        );
        let (agg, stats) = extract(&t, ExtractionKind::Tve, &refs, "tve.csv").unwrap();
        // "A+E" is normalized to "AE"; "A&E" matches its own entry and is
        // renamed to "AE" after aggregation.
        assert_eq!(agg.get("AE"), Some(13));
        assert_eq!(agg.get("A&E"), None);
        assert_eq!(agg.get("Discovery"), Some(7));
        assert_eq!(stats.rows_dropped, 1);
        assert_eq!(stats.unknown_rows, 0);
    }

    #[test]
    fn test_extract_bad_count_fails() {
        let refs = ReferenceSet::default();
        let t = table(&["Video Group Name", "Net Counted Ads"], &[&["ESPN", "N/A"]]);
        assert!(extract(&t, ExtractionKind::Vod, &refs, "vod.csv").is_err());
    }

    #[test]
    fn test_extract_overflowing_total_fails() {
        let dir = TempDir::new().unwrap();
        let refs = refs(dir.path());
        let t = table(
            &["Video Group Name", "Net Counted Ads"],
            &[&["ESPN", "9223372036854775807"], &["ESPN2", "1"]],
        );
        let err = extract(&t, ExtractionKind::Vod, &refs, "vod.csv").unwrap_err();
        assert!(matches!(err, ReportError::CountOverflow { ref label } if label == "ESPN"));
    }

    #[test]
    fn test_run_both_kinds_writes_two_files() {
        let dir = TempDir::new().unwrap();
        let refs = refs(dir.path());
        let input = dir.path().join("April.csv");
        std::fs::write(
            &input,
            "Video Group Name,Site Section Name,Net Counted Ads\n\
             ESPN,discovery_live,10\n\
             CNN,cox_watermark_c2_section_live,4\n",
        )
        .unwrap();

        let mut request = ExtractionRequest::new(&input, ReportType::Both);
        request.output_dir = dir.path().join("out");
        let result = run_extraction(&request, &refs);

        assert!(result.is_success(), "issues: {:?}", result.issues);
        assert_eq!(result.outputs.len(), 2);
        assert_eq!(result.outputs[0].kind, ExtractionKind::Vod);
        assert_eq!(result.metadata.files_processed, 1);
        assert_eq!(result.metadata.rows_read, 2);

        let vod = read_aggregate_csv(&dir.path().join("out").join("April_VOD_Output.csv")).unwrap();
        assert_eq!(vod.total(), 14);
        let tve = read_aggregate_csv(&dir.path().join("out").join("April_TVE_Output.csv")).unwrap();
        assert_eq!(tve.get("Discovery"), Some(10));
        assert_eq!(tve.len(), 1);
    }

    #[test]
    fn test_one_kind_failing_does_not_stop_the_other() {
        let dir = TempDir::new().unwrap();
        let refs = refs(dir.path());
        let input = dir.path().join("vod_only.csv");
        std::fs::write(&input, "Video Group Name,Net Counted Ads\nESPN,1\n").unwrap();

        let mut request = ExtractionRequest::new(&input, ReportType::Both);
        request.output_dir = dir.path().to_path_buf();
        let result = run_extraction(&request, &refs);

        assert!(!result.is_success());
        assert_eq!(result.outputs.len(), 1);
        assert_eq!(result.outputs[0].kind, ExtractionKind::Vod);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].level, IssueLevel::Error);
        assert!(result.issues[0].message.contains("Site Section Name"));
    }

    #[test]
    fn test_missing_input_is_reported() {
        let dir = TempDir::new().unwrap();
        let request = ExtractionRequest::new(dir.path().join("nope.csv"), ReportType::Vod);
        let result = run_extraction(&request, &ReferenceSet::default());
        assert!(!result.is_success());
        assert!(result.outputs.is_empty());
        assert_eq!(result.issues[0].file.as_deref(), Some("nope.csv"));
        assert_eq!(result.metadata.files_skipped, 1);
    }

    #[test]
    fn test_banner_rows_are_skipped() {
        let dir = TempDir::new().unwrap();
        let refs = refs(dir.path());
        let input = dir.path().join("banner.csv");
        std::fs::write(
            &input,
            "Report: April\n,\nAdvertiser: Acme,,\n,,\n\
             Video Group Name,Net Counted Ads\nCNN,8\n",
        )
        .unwrap();

        let mut request = ExtractionRequest::new(&input, ReportType::Vod);
        request.output_dir = dir.path().to_path_buf();
        let result = run_extraction(&request, &refs);
        assert!(result.is_success(), "issues: {:?}", result.issues);
        assert_eq!(result.outputs[0].table.get("CNN"), Some(8));
    }

    #[test]
    fn test_banner_with_empty_line_is_skipped_by_line() {
        let dir = TempDir::new().unwrap();
        let refs = refs(dir.path());
        let input = dir.path().join("banner.csv");
        std::fs::write(
            &input,
            "Delivery Report\n\nAdvertiser: Acme\nPeriod: April\n\
             Video Group Name,Net Counted Ads\nCNN,8\nESPN,3\n",
        )
        .unwrap();

        let mut request = ExtractionRequest::new(&input, ReportType::Vod);
        request.output_dir = dir.path().to_path_buf();
        let result = run_extraction(&request, &refs);
        assert!(result.is_success(), "issues: {:?}", result.issues);
        assert_eq!(result.outputs[0].table.get("CNN"), Some(8));
        assert_eq!(result.outputs[0].table.get("ESPN"), Some(3));
    }
}
