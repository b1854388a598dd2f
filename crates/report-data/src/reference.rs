//! Reference list and rename table loading.

use std::path::{Path, PathBuf};

use report_core::error::{ReportError, Result};
use report_core::models::{ExtractionKind, Issue, NetworkList, RenameMap};
use tracing::{debug, warn};

use crate::reader::{decode_text, ReadOptions};

/// Canonical networks for exact (VOD) resolution.
pub const VOD_NETWORKS_FILE: &str = "VideoGroups.csv";
/// Canonical networks for substring (TVE) resolution.
pub const TVE_NETWORKS_FILE: &str = "tve_networks.csv";
/// Two-column raw label → canonical name table.
pub const RENAME_FILE: &str = "FF_VideoGroups.csv";

/// Load a single-column network list.
///
/// Every row whose first field is not blank contributes that field, in file
/// order. Duplicates are kept.
pub fn load_network_list(path: &Path) -> Result<NetworkList> {
    let records = read_records(path)?;
    let firsts: Vec<String> = records
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .collect();
    let total = firsts.len();
    let list: NetworkList = firsts
        .into_iter()
        .filter(|first| !first.trim().is_empty())
        .collect();
    if list.len() < total {
        debug!(
            "Skipped {} rows with a blank first field in {}",
            total - list.len(),
            path.display()
        );
    }
    debug!("Loaded {} networks from {}", list.len(), path.display());
    Ok(list)
}

/// Load a two-column rename table. Short rows are skipped; both fields are
/// trimmed; a repeated raw label keeps its last mapping.
pub fn load_rename_map(path: &Path) -> Result<RenameMap> {
    let records = read_records(path)?;
    let map: RenameMap = records
        .into_iter()
        .filter(|row| row.len() >= 2)
        .map(|row| (row[0].trim().to_string(), row[1].trim().to_string()))
        .collect();
    debug!("Loaded {} renames from {}", map.len(), path.display());
    Ok(map)
}

/// Read a header-less delimited file into raw records.
fn read_records(path: &Path) -> Result<Vec<Vec<String>>> {
    if !path.is_file() {
        return Err(ReportError::MissingReferenceFile(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let (text, _) = decode_text(&bytes, &ReadOptions::default().encodings).ok_or_else(|| {
        ReportError::UnreadableInput {
            path: path.to_path_buf(),
            reason: "not decodable with any configured encoding".to_string(),
        }
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?.iter().map(str::to_string).collect());
    }
    Ok(records)
}

// ── ReferenceSet ──────────────────────────────────────────────────────────────

/// All reference data for one run, loaded once and read-only afterwards.
///
/// Missing or unreadable files degrade to empty containers; the problems are
/// kept in [`issues`](Self::issues) for the caller to report.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    pub vod_networks: NetworkList,
    pub tve_networks: NetworkList,
    pub renames: RenameMap,
    pub issues: Vec<Issue>,
}

impl ReferenceSet {
    /// Load the three standard reference files from `dir`.
    pub fn load(dir: &Path) -> Self {
        let mut issues = Vec::new();

        let vod_networks = degrade(
            load_network_list(&dir.join(VOD_NETWORKS_FILE)),
            VOD_NETWORKS_FILE,
            &mut issues,
        );
        let tve_networks = degrade(
            load_network_list(&dir.join(TVE_NETWORKS_FILE)),
            TVE_NETWORKS_FILE,
            &mut issues,
        );
        let renames = degrade(
            load_rename_map(&dir.join(RENAME_FILE)),
            RENAME_FILE,
            &mut issues,
        );

        Self {
            vod_networks,
            tve_networks,
            renames,
            issues,
        }
    }

    /// The resolution universe for `kind`.
    pub fn networks_for(&self, kind: ExtractionKind) -> &NetworkList {
        match kind {
            ExtractionKind::Vod => &self.vod_networks,
            ExtractionKind::Tve => &self.tve_networks,
        }
    }

    /// Paths the set is loaded from, in load order.
    pub fn paths(dir: &Path) -> [PathBuf; 3] {
        [
            dir.join(VOD_NETWORKS_FILE),
            dir.join(TVE_NETWORKS_FILE),
            dir.join(RENAME_FILE),
        ]
    }
}

fn degrade<T: Default>(result: Result<T>, file: &str, issues: &mut Vec<Issue>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("{}; continuing with an empty table", e);
            issues.push(Issue::from_error(Some(file), &e));
            T::default()
        }
    }
}
