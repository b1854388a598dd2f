//! Multi-file combination: many campaign exports in, one summary table and
//! one multi-sheet workbook out.
//!
//! The run is a fold over independent stages:
//!
//! 1. **classify** every file name against the ranked keyword list (pure);
//! 2. **prepare** each matched file: read it, apply its category rules and,
//!    for summary categories, sum "Net Counted Ads";
//! 3. **collect** prepared files into the summary table and category bucket;
//! 4. **merge** VOD and LSA summary rows;
//! 5. **write** the workbook.
//!
//! A file that fails stage 2 is reported and left out; the others continue.

use std::path::{Path, PathBuf};

use report_core::error::{ReportError, Result};
use report_core::models::{CampaignType, CategoryBucket, Issue, SummaryTable, Table};
use report_core::settings::DEFAULT_WORKBOOK_NAME;
use report_data::classifier::{classify_all, is_summary_keyword, Classified, KeywordList};
use report_data::merger::{merge_vod_lsa, summarize_table};
use report_data::reader::{ReadOptions, TableReader};
use report_data::rules::CategoryRules;
use report_data::writer::{sheet_name, workbook_bytes, write_workbook};
use tracing::{debug, info, warn};

use crate::metadata::RunMetadata;

// ── Inputs ────────────────────────────────────────────────────────────────────

/// Where an input file's content comes from.
#[derive(Debug, Clone)]
pub enum InputSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// A named input. The name drives classification and format detection.
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub source: InputSource,
}

impl InputFile {
    /// Input read from disk, named after its file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            source: InputSource::Path(path),
        }
    }

    /// Input already held in memory.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: InputSource::Bytes(bytes),
        }
    }

    fn read(&self, reader: &TableReader) -> Result<Table> {
        match &self.source {
            InputSource::Path(path) => reader.read_path(path),
            InputSource::Bytes(bytes) => reader.read_bytes(&self.name, bytes),
        }
    }
}

/// Where the combined workbook goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbookTarget {
    File(PathBuf),
    Memory,
}

impl WorkbookTarget {
    /// `<output_dir>/combined_output.xlsx`.
    pub fn in_dir(output_dir: &Path) -> Self {
        WorkbookTarget::File(output_dir.join(DEFAULT_WORKBOOK_NAME))
    }
}

/// Configuration for [`run_combination`].
#[derive(Debug, Clone)]
pub struct CombineRequest {
    pub keywords: KeywordList,
    pub read_options: ReadOptions,
    pub category_rules: CategoryRules,
    pub target: WorkbookTarget,
}

impl CombineRequest {
    /// Defaults for `campaign`: its keyword list, standard category rules.
    pub fn new(campaign: CampaignType, target: WorkbookTarget) -> Self {
        Self {
            keywords: KeywordList::for_campaign(campaign),
            read_options: ReadOptions::default(),
            category_rules: CategoryRules::default(),
            target,
        }
    }
}

// ── Outputs ───────────────────────────────────────────────────────────────────

/// What happened to the workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbookArtifact {
    Written(PathBuf),
    Bytes(Vec<u8>),
    /// No file matched any category, or writing failed.
    NotWritten,
}

/// Outcome of [`run_combination`].
#[derive(Debug, Clone)]
pub struct CombineResult {
    /// Per-file category sums after the VOD/LSA merge.
    pub summary: SummaryTable,
    /// Sheet names in workbook order.
    pub sheets: Vec<String>,
    pub workbook: WorkbookArtifact,
    pub issues: Vec<Issue>,
    pub metadata: RunMetadata,
}

impl CombineResult {
    /// `true` when the workbook was produced.
    pub fn is_success(&self) -> bool {
        self.workbook != WorkbookArtifact::NotWritten
    }
}

/// A matched file after reading and rule application.
#[derive(Debug, Clone)]
struct PreparedFile {
    name: String,
    category: String,
    table: Table,
    rows_read: usize,
    rows_dropped: usize,
    summary: Option<i64>,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Combine `files` per `request`. Files are processed in the given order.
pub fn run_combination(request: &CombineRequest, files: Vec<InputFile>) -> CombineResult {
    let mut metadata = RunMetadata::start();
    let mut issues = Vec::new();
    info!("Combining {} files", files.len());

    // 1. classify
    let named = files.into_iter().map(|f| (f.name.clone(), f)).collect();
    let classified = classify_all(&request.keywords, named);

    // 2. prepare
    let reader = TableReader::new(request.read_options.clone());
    let mut prepared = Vec::new();
    for file in classified {
        let Some(category) = file.category.clone() else {
            let err = ReportError::UnmatchedFile(file.name.clone());
            warn!("{}", err);
            issues.push(Issue::from_error(Some(&file.name), &err));
            metadata.files_skipped += 1;
            continue;
        };
        match prepare(&reader, &request.category_rules, &file, &category) {
            Ok(p) => prepared.push(p),
            Err(e) => {
                warn!("Skipping {}: {}", file.name, e);
                issues.push(Issue::from_error(Some(&file.name), &e));
                metadata.files_skipped += 1;
            }
        }
    }

    // 3. collect
    let mut summary = SummaryTable::new();
    let mut bucket = CategoryBucket::with_categories(request.keywords.iter().cloned());
    for p in prepared {
        metadata.files_processed += 1;
        metadata.rows_read += p.rows_read;
        metadata.rows_dropped += p.rows_dropped;
        if let Some(count) = p.summary {
            summary.push(p.category.as_str(), count);
        }
        debug!("{} -> {}", p.name, p.category);
        bucket.push(&p.category, p.table);
    }

    // 4. merge; an overflowing merge leaves the per-category rows in place
    let summary = match merge_vod_lsa(summary.clone()) {
        Ok(merged) => merged,
        Err(e) => {
            warn!("{}", e);
            issues.push(Issue::from_error(None, &e));
            summary
        }
    };

    // 5. write
    let sheets: Vec<String> = bucket
        .non_empty()
        .map(|(category, _)| sheet_name(category).to_string())
        .collect();
    let workbook = if bucket.is_empty() {
        warn!("No files matched any category; workbook not written");
        issues.push(Issue::warning(
            None,
            "no files matched any category; workbook not written",
        ));
        WorkbookArtifact::NotWritten
    } else {
        match emit_workbook(&request.target, &bucket) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!("{}", e);
                issues.push(Issue::from_error(None, &e));
                WorkbookArtifact::NotWritten
            }
        }
    };

    metadata.log("Combination");
    CombineResult {
        summary,
        sheets,
        workbook,
        issues,
        metadata,
    }
}

fn prepare(
    reader: &TableReader,
    rules: &CategoryRules,
    file: &Classified<InputFile>,
    category: &str,
) -> Result<PreparedFile> {
    let mut table = file.source.read(reader)?;
    let rows_read = table.len();
    let rows_dropped = rules.apply(category, &mut table);
    let summary = if is_summary_keyword(category) {
        Some(summarize_table(&table, &file.name)?)
    } else {
        None
    };
    Ok(PreparedFile {
        name: file.name.clone(),
        category: category.to_string(),
        table,
        rows_read,
        rows_dropped,
        summary,
    })
}

fn emit_workbook(target: &WorkbookTarget, bucket: &CategoryBucket) -> Result<WorkbookArtifact> {
    match target {
        WorkbookTarget::File(path) => {
            write_workbook(path, bucket)?;
            Ok(WorkbookArtifact::Written(path.clone()))
        }
        WorkbookTarget::Memory => Ok(WorkbookArtifact::Bytes(workbook_bytes(bucket)?)),
    }
}
