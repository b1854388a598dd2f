//! Network-name resolution against reference lists.
//!
//! Two strategies exist. Exact matching requires the raw label to equal a
//! list entry. Substring matching picks the first list entry contained in
//! the raw label, ignoring case; list order is therefore priority. Either
//! way the match is then mapped through the rename table.

use report_core::error::Result;
use report_core::models::{
    AggregateTable, ExtractionKind, NetworkList, RenameMap, ReportRow, Resolution, ResolvedRow,
};

/// Canonical value renamed after substring-mode aggregation.
const AMPERSAND_AE: &str = "A&E";
/// Replacement for [`AMPERSAND_AE`].
const PLAIN_AE: &str = "AE";

/// How a raw label is matched against the network list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    Substring,
}

impl From<ExtractionKind> for MatchStrategy {
    fn from(kind: ExtractionKind) -> Self {
        match kind {
            ExtractionKind::Vod => MatchStrategy::Exact,
            ExtractionKind::Tve => MatchStrategy::Substring,
        }
    }
}

/// Resolves raw labels to canonical networks for one run.
pub struct NetworkResolver<'a> {
    networks: &'a NetworkList,
    renames: &'a RenameMap,
    strategy: MatchStrategy,
    /// Lower-cased copy of `networks`, same order.
    folded: Vec<String>,
}

impl<'a> NetworkResolver<'a> {
    pub fn new(networks: &'a NetworkList, renames: &'a RenameMap, strategy: MatchStrategy) -> Self {
        let folded = match strategy {
            MatchStrategy::Exact => Vec::new(),
            MatchStrategy::Substring => networks.iter().map(|n| n.to_lowercase()).collect(),
        };
        Self {
            networks,
            renames,
            strategy,
            folded,
        }
    }

    /// The network-list entry `label` matches, before renaming.
    pub fn match_network(&self, label: &str) -> Option<&'a str> {
        let networks: &'a NetworkList = self.networks;
        match self.strategy {
            MatchStrategy::Exact => networks.iter().find(|n| *n == label).map(String::as_str),
            MatchStrategy::Substring => {
                let haystack = label.to_lowercase();
                self.folded
                    .iter()
                    .position(|needle| haystack.contains(needle.as_str()))
                    .map(|i| networks.entries()[i].as_str())
            }
        }
    }

    /// Resolve `label` to a canonical network, applying the rename table.
    pub fn resolve(&self, label: &str) -> Resolution {
        match self.match_network(label) {
            Some(network) => Resolution::Network(self.renames.apply(network)),
            None => Resolution::Unknown,
        }
    }

    /// Resolve every row, keeping input order.
    pub fn resolve_rows(&self, rows: Vec<ReportRow>) -> Vec<ResolvedRow> {
        rows.into_iter()
            .map(|row| {
                let network = self.resolve(&row.label);
                ResolvedRow { row, network }
            })
            .collect()
    }

    /// Cosmetic renames applied to an aggregated table.
    ///
    /// Substring mode reports "A&E" as "AE"; a pre-existing "AE" total
    /// absorbs it.
    pub fn apply_post_fixes(&self, table: &mut AggregateTable) -> Result<()> {
        match self.strategy {
            MatchStrategy::Substring => table.rename(AMPERSAND_AE, PLAIN_AE),
            MatchStrategy::Exact => Ok(()),
        }
    }
}
