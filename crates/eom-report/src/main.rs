mod bootstrap;
mod render;

use std::path::Path;

use anyhow::{bail, Result};
use clap::CommandFactory;
use report_core::models::{Issue, ReportType};
use report_core::settings::{Command, Settings};
use report_data::classifier::KeywordList;
use report_data::reader::ReadOptions;
use report_data::reference::ReferenceSet;
use report_runtime::combination::{run_combination, CombineRequest, InputFile, WorkbookTarget};
use report_runtime::discovery::expand_inputs;
use report_runtime::extraction::{run_extraction, ExtractionRequest};

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("EOM report v{} starting", env!("CARGO_PKG_VERSION"));
    for warning in &settings.load_warnings {
        tracing::warn!("{}", warning);
    }

    let Some(command) = settings.command.clone() else {
        if !settings.clear {
            Settings::command().print_help()?;
        }
        return Ok(());
    };

    match &command {
        Command::Extract { file, .. } => {
            let report_type = command.report_type().unwrap_or(Ok(ReportType::Vod))?;
            extract(&settings, file, report_type)
        }
        Command::Combine {
            keywords,
            workbook_name,
            paths,
            ..
        } => {
            let Some(campaign) = command.campaign_type() else {
                bail!("combine requires a campaign type");
            };
            let mut request = CombineRequest::new(
                campaign?,
                WorkbookTarget::File(settings.output_dir.join(workbook_name)),
            );
            if !keywords.is_empty() {
                request.keywords = KeywordList::new(keywords.iter().cloned());
            }
            request.read_options = ReadOptions::with_banner_rows(settings.banner_rows);

            let files: Vec<InputFile> = expand_inputs(paths)
                .into_iter()
                .map(InputFile::from_path)
                .collect();
            let result = run_combination(&request, files);

            report_issues(&result.issues);
            if !result.summary.is_empty() {
                println!("{}", render::render_summary(&result.summary));
            }
            if !result.is_success() {
                bail!("no workbook was produced");
            }
            println!("Sheets: {}", result.sheets.join(", "));
            Ok(())
        }
    }
}

fn extract(settings: &Settings, file: &Path, report_type: ReportType) -> Result<()> {
    for path in ReferenceSet::paths(&settings.reference_dir) {
        tracing::debug!("Reference file: {}", path.display());
    }
    let refs = ReferenceSet::load(&settings.reference_dir);
    report_issues(&refs.issues);

    let mut request = ExtractionRequest::new(file, report_type);
    request.output_dir = settings.output_dir.clone();
    request.read_options = ReadOptions::with_banner_rows(settings.banner_rows);

    let result = run_extraction(&request, &refs);
    report_issues(&result.issues);

    for output in &result.outputs {
        println!("{} networks ({})", output.kind, output.path.display());
        println!("{}", render::render_aggregate(&output.table));
    }

    if !result.is_success() {
        bail!("extraction of {} did not complete", file.display());
    }
    Ok(())
}

fn report_issues(issues: &[Issue]) {
    for issue in issues {
        eprintln!("{issue}");
    }
}
