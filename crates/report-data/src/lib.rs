//! Data layer for the EOM/EOC report builder.
//!
//! Loads reference lists and vendor exports, resolves raw labels to canonical
//! networks, applies per-report row rules, aggregates counts, classifies
//! campaign files by name and writes CSV and workbook outputs.

pub mod aggregator;
pub mod classifier;
pub mod merger;
pub mod reader;
pub mod reference;
pub mod resolver;
pub mod rules;
pub mod writer;

pub use report_core as core;
