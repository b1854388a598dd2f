//! Run orchestration for the EOM/EOC report builder.
//!
//! Drives the single-file extraction and multi-file combination pipelines on
//! top of the data layer, collecting issues and run metadata for the CLI.

pub mod combination;
pub mod discovery;
pub mod extraction;
pub mod metadata;

pub use report_core as core;
pub use report_data as data;
