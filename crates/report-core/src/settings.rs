use clap::{CommandFactory, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::models::{CampaignType, ReportType};

/// Default number of banner rows skipped when a header row looks malformed.
pub const DEFAULT_BANNER_ROWS: usize = 4;

/// Default file name of the multi-file workbook.
pub const DEFAULT_WORKBOOK_NAME: &str = "combined_output.xlsx";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Build EOM/EOC delivery reports from VOD/TVE and campaign exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "eom-report",
    about = "Build EOM/EOC delivery reports from VOD/TVE and campaign exports",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory holding VideoGroups.csv, tve_networks.csv and FF_VideoGroups.csv
    #[arg(long, global = true, default_value = ".")]
    pub reference_dir: PathBuf,

    /// Directory output files are written to
    #[arg(long, global = true, default_value = ".")]
    pub output_dir: PathBuf,

    /// Leading rows skipped when a file's header row looks malformed
    #[arg(long, global = true, default_value_t = DEFAULT_BANNER_ROWS)]
    pub banner_rows: usize,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long, global = true)]
    pub clear: bool,

    /// Problems met while loading or saving last-used params. Loading runs
    /// before logging is set up, so the caller logs these afterwards.
    #[arg(skip)]
    pub load_warnings: Vec<String>,
}

/// Operating modes.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sum Net Counted Ads per network for one VOD/TVE export
    Extract {
        /// Input report (.csv / .xlsx)
        file: PathBuf,

        /// Report type
        #[arg(long, default_value = "VOD", value_parser = ["VOD", "TVE", "VOD/TVE"])]
        report_type: String,
    },

    /// Combine campaign exports into one workbook, one sheet per category
    Combine {
        /// Campaign type
        #[arg(long, default_value = "addressable", value_parser = ["addressable", "non-addressable"])]
        campaign: String,

        /// Ranked category keywords overriding the campaign's default list
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Workbook file name
        #[arg(long, default_value = DEFAULT_WORKBOOK_NAME)]
        workbook_name: String,

        /// Input files or directories (.csv / .xlsx)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

impl Command {
    /// Parsed report type of an `extract` command.
    pub fn report_type(&self) -> Option<Result<ReportType>> {
        match self {
            Command::Extract { report_type, .. } => Some(report_type.parse()),
            Command::Combine { .. } => None,
        }
    }

    /// Parsed campaign type of a `combine` command.
    pub fn campaign_type(&self) -> Option<Result<CampaignType>> {
        match self {
            Command::Combine { campaign, .. } => Some(campaign.parse()),
            Command::Extract { .. } => None,
        }
    }
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.eom-report/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner_rows: Option<usize>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    /// Uses `~/.eom-report/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".eom-report").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, fill options not given on the command line from
    /// the last-used params, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation: accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                settings
                    .load_warnings
                    .push(format!("Could not clear {}: {}", config_path.display(), e));
            }
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "reference_dir") {
            if let Some(v) = last.reference_dir {
                settings.reference_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "output_dir") {
            if let Some(v) = last.output_dir {
                settings.output_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "banner_rows") {
            if let Some(v) = last.banner_rows {
                settings.banner_rows = v;
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            settings.load_warnings.push(format!(
                "Could not persist settings to {}: {}",
                config_path.display(),
                e
            ));
        }

        settings
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            reference_dir: Some(s.reference_dir.clone()),
            output_dir: Some(s.output_dir.clone()),
            banner_rows: Some(s.banner_rows),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
