//! Input path expansion for multi-file runs.

use std::path::{Path, PathBuf};

use report_data::reader::SourceFormat;
use tracing::debug;

/// Expand `paths` into the list of files to process.
///
/// Directories are walked recursively and contribute their supported
/// report files sorted by path. Anything else is kept as given, in
/// command-line order, so that a missing file is reported when it is read.
pub fn expand_inputs(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            let found = discover_reports(path);
            debug!("{}: {} report files", path.display(), found.len());
            out.extend(found);
        } else {
            out.push(path.clone());
        }
    }
    out
}

/// Supported report files under `dir`, sorted.
pub fn discover_reports(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| !name.starts_with("~$") && SourceFormat::is_supported_name(name))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}
