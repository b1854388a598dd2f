//! Per-report row filtering and cosmetic normalization.
//!
//! Each rule pairs a [`Predicate`] on the table with a [`Transform`]. Rule
//! sets are looked up by extraction kind (single-file mode) or by category
//! keyword (multi-file mode), so resolution and aggregation never need to
//! know about report-specific quirks.

use report_core::models::{
    ExtractionKind, Table, COMPLETED_ADS_COLUMN, NET_COUNTED_ADS_COLUMN, PLACEMENT_COLUMN,
    SITE_SECTION_COLUMN, TELEVISION_NETWORK_COLUMN,
};
use tracing::debug;

/// Site sections that never carry billable delivery.
pub const TVE_DENIED_SECTIONS: [&str; 2] =
    ["cox_legacy_section_live", "cox_watermark_c2_section_live"];

/// When a rule applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Always,
    /// The table has a column with this exact name.
    HasColumn(String),
}

impl Predicate {
    pub fn holds(&self, table: &Table) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::HasColumn(column) => table.has_column(column),
        }
    }
}

/// What a rule does. Transforms naming a missing column do nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// Drop rows whose `column` equals one of `values` exactly.
    DropWhereIn { column: String, values: Vec<String> },
    /// Drop rows whose `column` contains `needle`, ignoring case.
    DropWhereContains { column: String, needle: String },
    /// Replace every occurrence of `from` with `to` inside `column`.
    Replace {
        column: String,
        from: String,
        to: String,
    },
    /// Keep only the listed columns that exist, in list order.
    Project { columns: Vec<String> },
}

impl Transform {
    /// Apply to `table`, returning the number of rows dropped.
    pub fn apply(&self, table: &mut Table) -> usize {
        let before = table.len();
        match self {
            Transform::DropWhereIn { column, values } => {
                if let Some(idx) = table.column_index(column) {
                    table.retain_rows(|row| !values.iter().any(|v| *v == row[idx]));
                }
            }
            Transform::DropWhereContains { column, needle } => {
                if let Some(idx) = table.column_index(column) {
                    let needle = needle.to_lowercase();
                    table.retain_rows(|row| !row[idx].to_lowercase().contains(&needle));
                }
            }
            Transform::Replace { column, from, to } => {
                if let Some(idx) = table.column_index(column) {
                    for row in &mut table.rows {
                        if row[idx].contains(from.as_str()) {
                            row[idx] = row[idx].replace(from.as_str(), to);
                        }
                    }
                }
            }
            Transform::Project { columns } => {
                let names: Vec<&str> = columns.iter().map(String::as_str).collect();
                table.project(&names);
            }
        }
        before - table.len()
    }
}

/// One predicate + transform pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRule {
    pub when: Predicate,
    pub transform: Transform,
}

impl TableRule {
    pub fn always(transform: Transform) -> Self {
        Self {
            when: Predicate::Always,
            transform,
        }
    }

    pub fn when_column(column: &str, transform: Transform) -> Self {
        Self {
            when: Predicate::HasColumn(column.to_string()),
            transform,
        }
    }
}

/// An ordered list of rules applied in sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<TableRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<TableRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule whose predicate holds, returning rows dropped.
    ///
    /// Predicates are evaluated against the table as it stands before the
    /// set runs, so a projection cannot switch off a later rule.
    pub fn apply(&self, table: &mut Table) -> usize {
        let active: Vec<bool> = self.rules.iter().map(|r| r.when.holds(table)).collect();
        let mut dropped = 0;
        for (rule, on) in self.rules.iter().zip(active) {
            if on {
                dropped += rule.transform.apply(table);
            }
        }
        if dropped > 0 {
            debug!("Rule set dropped {} rows", dropped);
        }
        dropped
    }

    /// Rules for a single-file extraction pass.
    pub fn for_extraction(kind: ExtractionKind) -> Self {
        match kind {
            ExtractionKind::Vod => Self::default(),
            ExtractionKind::Tve => Self::tve(),
        }
    }

    /// TVE: drop denied site sections, then normalize "A+E" to "AE".
    pub fn tve() -> Self {
        Self::new(vec![
            TableRule::always(Transform::DropWhereIn {
                column: SITE_SECTION_COLUMN.to_string(),
                values: TVE_DENIED_SECTIONS.iter().map(|s| s.to_string()).collect(),
            }),
            TableRule::always(Transform::Replace {
                column: SITE_SECTION_COLUMN.to_string(),
                from: "A+E".to_string(),
                to: "AE".to_string(),
            }),
        ])
    }

    /// LSA: drop VOD placements, then keep the network and count columns.
    pub fn lsa() -> Self {
        Self::new(vec![
            TableRule::when_column(
                PLACEMENT_COLUMN,
                Transform::DropWhereContains {
                    column: PLACEMENT_COLUMN.to_string(),
                    needle: "VOD".to_string(),
                },
            ),
            TableRule::when_column(
                PLACEMENT_COLUMN,
                Transform::Project {
                    columns: [
                        TELEVISION_NETWORK_COLUMN,
                        NET_COUNTED_ADS_COLUMN,
                        COMPLETED_ADS_COLUMN,
                    ]
                    .iter()
                    .map(|c| c.to_string())
                    .collect(),
                },
            ),
        ])
    }
}

/// Category keyword → rule set, for multi-file runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRules {
    entries: Vec<(String, RuleSet)>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self {
            entries: vec![("LSA".to_string(), RuleSet::lsa())],
        }
    }
}

impl CategoryRules {
    pub fn new(entries: Vec<(String, RuleSet)>) -> Self {
        Self { entries }
    }

    /// Rules for `category`, matched ignoring case.
    pub fn for_category(&self, category: &str) -> Option<&RuleSet> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(category))
            .map(|(_, rules)| rules)
    }

    /// Apply the rules for `category`, if any, returning rows dropped.
    pub fn apply(&self, category: &str, table: &mut Table) -> usize {
        self.for_category(category)
            .map(|rules| rules.apply(table))
            .unwrap_or(0)
    }
}
