use tracing::debug;

use crate::error::{ReportError, Result};

// ── CountParser ───────────────────────────────────────────────────────────────

/// Parses count cells from the variety of renderings found in vendor exports.
pub struct CountParser;

impl CountParser {
    /// Parse a count cell into an integer.
    ///
    /// Handles:
    /// * thousands separators (`"1,234"` → `1234`)
    /// * surrounding whitespace
    /// * whole-number float renderings (`"1234.0"` → `1234`)
    ///
    /// A blank cell yields `Ok(None)`; anything else that is not an integer
    /// is a [`ReportError::TypeCoercion`] carrying `column` and the 1-based
    /// data `row`.
    pub fn parse(raw: &str, column: &str, row: usize) -> Result<Option<i64>> {
        let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
        if cleaned.is_empty() {
            return Ok(None);
        }

        if let Ok(n) = cleaned.parse::<i64>() {
            return Ok(Some(n));
        }

        if let Ok(f) = cleaned.parse::<f64>() {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                return Ok(Some(f as i64));
            }
        }

        debug!("CountParser: rejected {:?} in column '{}'", raw, column);
        Err(ReportError::TypeCoercion {
            column: column.to_string(),
            row,
            value: raw.to_string(),
        })
    }

    /// Like [`parse`](Self::parse) but a blank cell is also an error.
    pub fn parse_required(raw: &str, column: &str, row: usize) -> Result<i64> {
        Self::parse(raw, column, row)?.ok_or_else(|| ReportError::TypeCoercion {
            column: column.to_string(),
            row,
            value: raw.to_string(),
        })
    }

    /// Sum a column of count cells, skipping blanks.
    pub fn sum_column<'a>(values: impl Iterator<Item = &'a str>, column: &str) -> Result<i64> {
        let mut total = 0i64;
        for (i, raw) in values.enumerate() {
            if let Some(n) = Self::parse(raw, column, i + 1)? {
                total = Self::checked_sum(total, n, column)?;
            }
        }
        Ok(total)
    }

    /// `a + b`, or [`ReportError::CountOverflow`] naming `label`.
    pub fn checked_sum(a: i64, b: i64, label: &str) -> Result<i64> {
        a.checked_add(b).ok_or_else(|| ReportError::CountOverflow {
            label: label.to_string(),
        })
    }
}

// ── CellFormatter ─────────────────────────────────────────────────────────────

/// Converts typed spreadsheet values into the string cells of a [`Table`].
///
/// [`Table`]: crate::models::Table
pub struct CellFormatter;

impl CellFormatter {
    /// Render a float without a trailing `.0` when it holds a whole number.
    pub fn number(value: f64) -> String {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else {
            value.to_string()
        }
    }

    /// Interpret a string cell as a number for typed output, if it looks like
    /// one. Thousands separators are not accepted here so that labels such as
    /// `"1,2"` survive as text.
    pub fn as_number(cell: &str) -> Option<f64> {
        let trimmed = cell.trim();
        if trimmed.is_empty() || trimmed != cell {
            return None;
        }
        // Leading zeros mark identifiers ("007"), not quantities.
        let digits = trimmed.trim_start_matches('-');
        if digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.") {
            return None;
        }
        trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
    }
}
