//! Shared foundation for the EOM/EOC report builder.
//!
//! Holds the error taxonomy, the tabular and reference data model, count
//! parsing, display formatting and command-line settings used by the data,
//! runtime and binary crates.

pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
