use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the report builder.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A configured reference list or rename table does not exist.
    #[error("Reference file not found: {0}")]
    MissingReferenceFile(PathBuf),

    /// An input report does not exist.
    #[error("Input file not found: {0}")]
    MissingInputFile(PathBuf),

    /// An input report could not be opened or decoded.
    #[error("Failed to read {path}: {reason}")]
    UnreadableInput { path: PathBuf, reason: String },

    /// The header row could not be located, even after skipping banner rows.
    #[error("Could not locate header row in {path}: {reason}")]
    SchemaDrift { path: PathBuf, reason: String },

    /// A file name matched none of the category keywords.
    #[error("No matching keyword found in file name: {0}")]
    UnmatchedFile(String),

    /// A count cell could not be converted to an integer.
    #[error("Invalid count {value:?} in column '{column}' at row {row}")]
    TypeCoercion {
        column: String,
        row: usize,
        value: String,
    },

    /// A column required by the selected mode is absent.
    #[error("Column '{column}' not found in {source_name}")]
    MissingColumn { column: String, source_name: String },

    /// A delimited file could not be parsed or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A spreadsheet could not be read or written.
    #[error("Workbook error: {0}")]
    Workbook(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A running count total left the `i64` range.
    #[error("Net Counted Ads total for '{label}' overflowed")]
    CountOverflow { label: String },
}

impl ReportError {
    /// `true` for errors that only degrade a run instead of abandoning work.
    pub fn is_degradation(&self) -> bool {
        matches!(
            self,
            ReportError::MissingReferenceFile(_) | ReportError::UnmatchedFile(_)
        )
    }
}

/// Convenience alias used throughout the report crates.
pub type Result<T> = std::result::Result<T, ReportError>;
