use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::{ReportError, Result};

// ── Column names ──────────────────────────────────────────────────────────────

/// Raw label column in VOD exports.
pub const VIDEO_GROUP_COLUMN: &str = "Video Group Name";
/// Raw label column in TVE exports.
pub const SITE_SECTION_COLUMN: &str = "Site Section Name";
/// Count metric present in every report type.
pub const NET_COUNTED_ADS_COLUMN: &str = "Net Counted Ads";
/// Placement column used to exclude VOD rows from LSA exports.
pub const PLACEMENT_COLUMN: &str = "Placement Name";
/// Network column retained by the LSA projection.
pub const TELEVISION_NETWORK_COLUMN: &str = "Television Network Name";
/// Secondary completion count retained by the LSA projection.
pub const COMPLETED_ADS_COLUMN: &str = "Video Ads 100% Complete";
/// Header of the network column in single-file CSV outputs.
pub const NETWORKS_COLUMN: &str = "Networks";

/// Sentinel for labels that resolve to no canonical network.
pub const UNKNOWN_NETWORK: &str = "Unknown";

// ── ReportType ────────────────────────────────────────────────────────────────

/// Which extraction(s) a single-file run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportType {
    Vod,
    Tve,
    /// Run the VOD extraction, then the TVE extraction, on the same file.
    Both,
}

impl ReportType {
    /// The concrete extraction kinds this selection expands to, in run order.
    pub fn kinds(self) -> &'static [ExtractionKind] {
        match self {
            ReportType::Vod => &[ExtractionKind::Vod],
            ReportType::Tve => &[ExtractionKind::Tve],
            ReportType::Both => &[ExtractionKind::Vod, ExtractionKind::Tve],
        }
    }
}

impl FromStr for ReportType {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "VOD" => Ok(ReportType::Vod),
            "TVE" => Ok(ReportType::Tve),
            "VOD/TVE" | "BOTH" => Ok(ReportType::Both),
            other => Err(ReportError::Config(format!("invalid report type: {other}"))),
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportType::Vod => write!(f, "VOD"),
            ReportType::Tve => write!(f, "TVE"),
            ReportType::Both => write!(f, "VOD/TVE"),
        }
    }
}

/// A single extraction pass over one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtractionKind {
    Vod,
    Tve,
}

impl ExtractionKind {
    /// Column holding the raw network label.
    pub fn label_column(self) -> &'static str {
        match self {
            ExtractionKind::Vod => VIDEO_GROUP_COLUMN,
            ExtractionKind::Tve => SITE_SECTION_COLUMN,
        }
    }

    /// Suffix appended to the input stem to name the CSV output.
    pub fn output_suffix(self) -> &'static str {
        match self {
            ExtractionKind::Vod => "_VOD_Output",
            ExtractionKind::Tve => "_TVE_Output",
        }
    }
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionKind::Vod => write!(f, "VOD"),
            ExtractionKind::Tve => write!(f, "TVE"),
        }
    }
}

// ── CampaignType ──────────────────────────────────────────────────────────────

/// Campaign flavour selecting the keyword list for multi-file runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CampaignType {
    Addressable,
    NonAddressable,
}

impl FromStr for CampaignType {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "addressable" => Ok(CampaignType::Addressable),
            "non-addressable" => Ok(CampaignType::NonAddressable),
            other => Err(ReportError::Config(format!("invalid campaign type: {other}"))),
        }
    }
}

impl fmt::Display for CampaignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CampaignType::Addressable => write!(f, "Addressable"),
            CampaignType::NonAddressable => write!(f, "Non-Addressable"),
        }
    }
}

// ── Table ─────────────────────────────────────────────────────────────────────

/// A parsed tabular source: one header row plus string-valued data rows.
///
/// Every data row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, padding short rows with empty cells and truncating long
    /// ones to the header width.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column named exactly `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Like [`column_index`](Self::column_index) but reports a
    /// [`ReportError::MissingColumn`] naming `source_name`.
    pub fn require_column(&self, name: &str, source_name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ReportError::MissingColumn {
                column: name.to_string(),
                source_name: source_name.to_string(),
            })
    }

    /// Iterate the cells of column `idx`.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| row[idx].as_str())
    }

    /// Keep only rows for which `keep` returns `true`.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[String]) -> bool) {
        self.rows.retain(|row| keep(row));
    }

    /// Restrict the table to `columns`, in that order, skipping names that do
    /// not exist. A projection that matches no column leaves the table as is.
    pub fn project(&mut self, columns: &[&str]) {
        let picks: Vec<usize> = columns
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect();
        if picks.is_empty() {
            return;
        }
        self.headers = picks.iter().map(|&i| self.headers[i].clone()).collect();
        self.rows = self
            .rows
            .iter()
            .map(|row| picks.iter().map(|&i| row[i].clone()).collect())
            .collect();
    }

    /// Stack `tables` vertically.
    ///
    /// Columns are the union of all headers in first-seen order; cells a
    /// source table lacks are left empty. A name repeated within one table
    /// keeps one column per occurrence, matched by occurrence across tables.
    pub fn concat(tables: &[Table]) -> Table {
        let mut headers: Vec<String> = Vec::new();
        for table in tables {
            let mut seen: HashMap<&str, usize> = HashMap::new();
            for h in &table.headers {
                let nth = seen.entry(h.as_str()).or_insert(0);
                if headers.iter().filter(|x| *x == h).count() <= *nth {
                    headers.push(h.clone());
                }
                *nth += 1;
            }
        }

        let mut rows = Vec::with_capacity(tables.iter().map(Table::len).sum());
        for table in tables {
            let mut seen: HashMap<&str, usize> = HashMap::new();
            let mapping: Vec<Option<usize>> = table
                .headers
                .iter()
                .map(|h| {
                    let nth = seen.entry(h.as_str()).or_insert(0);
                    let dst = headers
                        .iter()
                        .enumerate()
                        .filter(|(_, x)| *x == h)
                        .nth(*nth)
                        .map(|(i, _)| i);
                    *nth += 1;
                    dst
                })
                .collect();
            for row in &table.rows {
                let mut out = vec![String::new(); headers.len()];
                for (cell, dst) in row.iter().zip(&mapping) {
                    if let Some(dst) = dst {
                        out[*dst] = cell.clone();
                    }
                }
                rows.push(out);
            }
        }

        Table { headers, rows }
    }
}

// ── Reference data ────────────────────────────────────────────────────────────

/// Ordered canonical network names. Order is resolution priority.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkList(Vec<String>);

impl NetworkList {
    pub fn new(entries: Vec<String>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for NetworkList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Raw label → canonical name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap(HashMap<String, String>);

impl RenameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a mapping; a repeated raw label overwrites the earlier one.
    pub fn insert(&mut self, raw: impl Into<String>, canonical: impl Into<String>) {
        self.0.insert(raw.into(), canonical.into());
    }

    pub fn get(&self, raw: &str) -> Option<&str> {
        self.0.get(raw).map(String::as_str)
    }

    /// Map `name` through the table, passing unknown names through unchanged.
    pub fn apply(&self, name: &str) -> String {
        self.get(name).unwrap_or(name).to_string()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RenameMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = RenameMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

// ── Rows ──────────────────────────────────────────────────────────────────────

/// The two fields of an input row the extraction pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub label: String,
    pub count: i64,
}

/// Outcome of resolving a raw label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resolution {
    Network(String),
    Unknown,
}

impl Resolution {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Resolution::Unknown)
    }

    /// Canonical name, or the `"Unknown"` sentinel.
    pub fn as_str(&self) -> &str {
        match self {
            Resolution::Network(name) => name.as_str(),
            Resolution::Unknown => UNKNOWN_NETWORK,
        }
    }
}

/// A [`ReportRow`] together with its resolved network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRow {
    pub row: ReportRow,
    pub network: Resolution,
}

// ── AggregateTable ────────────────────────────────────────────────────────────

/// Summed counts per canonical network, ordered by network name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateTable(BTreeMap<String, i64>);

impl AggregateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(network, count)` pairs, summing repeats.
    pub fn from_counts<S, I>(counts: I) -> Result<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, i64)>,
    {
        let mut table = AggregateTable::new();
        for (network, count) in counts {
            table.add(network, count)?;
        }
        Ok(table)
    }

    /// Add `count` to `network`'s running total. On overflow the total is
    /// left unchanged and [`ReportError::CountOverflow`] is returned.
    pub fn add(&mut self, network: impl Into<String>, count: i64) -> Result<()> {
        let network = network.into();
        let current = self.0.get(&network).copied().unwrap_or(0);
        let total = current
            .checked_add(count)
            .ok_or_else(|| ReportError::CountOverflow {
                label: network.clone(),
            })?;
        self.0.insert(network, total);
        Ok(())
    }

    pub fn get(&self, network: &str) -> Option<i64> {
        self.0.get(network).copied()
    }

    /// Move `from`'s total onto `to`, merging with any existing `to` total.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        match self.0.remove(from) {
            Some(count) => self.add(to, count),
            None => Ok(()),
        }
    }

    /// `(network, count)` pairs in ascending network order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Grand total for display; saturates at the `i64` bounds.
    pub fn total(&self) -> i64 {
        self.0.values().fold(0i64, |acc, n| acc.saturating_add(*n))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── CategoryBucket ────────────────────────────────────────────────────────────

/// Per-category tables awaiting concatenation, in keyword-list order.
#[derive(Debug, Clone, Default)]
pub struct CategoryBucket {
    categories: Vec<(String, Vec<Table>)>,
}

impl CategoryBucket {
    /// One empty slot per category, in the given order.
    pub fn with_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: categories
                .into_iter()
                .map(|c| (c.into(), Vec::new()))
                .collect(),
        }
    }

    /// Append `table` under `category`, creating the slot at the end if it
    /// was not declared up front.
    pub fn push(&mut self, category: &str, table: Table) {
        match self.categories.iter_mut().find(|(c, _)| c == category) {
            Some((_, tables)) => tables.push(table),
            None => self
                .categories
                .push((category.to_string(), vec![table])),
        }
    }

    /// Categories holding at least one table, in declaration order.
    pub fn non_empty(&self) -> impl Iterator<Item = (&str, &[Table])> {
        self.categories
            .iter()
            .filter(|(_, tables)| !tables.is_empty())
            .map(|(c, tables)| (c.as_str(), tables.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.non_empty().next().is_none()
    }
}

// ── SummaryTable ──────────────────────────────────────────────────────────────

/// One `(category, summed count)` row of the on-screen summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub label: String,
    pub count: i64,
}

/// Ordered per-file category sums.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTable {
    rows: Vec<SummaryRow>,
}

impl SummaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, count: i64) {
        self.rows.push(SummaryRow {
            label: label.into(),
            count,
        });
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.rows.iter().any(|r| r.label == label)
    }

    /// Grand total for display; saturates at the `i64` bounds.
    pub fn total(&self) -> i64 {
        self.rows.iter().fold(0i64, |acc, r| acc.saturating_add(r.count))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<SummaryRow> for SummaryTable {
    fn from_iter<I: IntoIterator<Item = SummaryRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

// ── Issues ────────────────────────────────────────────────────────────────────

/// Severity of a reported [`Issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueLevel {
    Warning,
    Error,
}

/// A human-readable problem encountered during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub level: IssueLevel,
    /// File the problem relates to, when there is one.
    pub file: Option<String>,
    pub message: String,
}

impl Issue {
    pub fn warning(file: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Warning,
            file: file.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn error(file: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Error,
            file: file.map(str::to_string),
            message: message.into(),
        }
    }

    /// Wrap `err`, grading degradations as warnings.
    pub fn from_error(file: Option<&str>, err: &ReportError) -> Self {
        if err.is_degradation() {
            Self::warning(file, err.to_string())
        } else {
            Self::error(file, err.to_string())
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            IssueLevel::Warning => "warning",
            IssueLevel::Error => "error",
        };
        match &self.file {
            Some(file) => write!(f, "{tag}: {file}: {}", self.message),
            None => write!(f, "{tag}: {}", self.message),
        }
    }
}
