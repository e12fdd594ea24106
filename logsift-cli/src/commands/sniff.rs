//! `logsift sniff` command handler

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use logsift_core::config::LogsiftConfig;
use logsift_ingest::{ScoringConfig, SniffResult, sniff_file};

use crate::cli::SniffArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `sniff` command.
///
/// The report is rendered even when no format clears the threshold;
/// the command then fails with a detection error (exit code 3).
pub async fn execute(
    args: SniffArgs,
    config: &LogsiftConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let catalog = super::load_catalog(config).await?;
    let scoring = ScoringConfig::from_core(&config.sniffer);

    let result = sniff_file(&args.file, &catalog, &scoring).await;
    let report = SniffReport::new(&args.file, &result);
    writer.render(&report)?;

    match report.error {
        Some(error) if report.format.is_none() => Err(CliError::Detection(error)),
        _ => Ok(()),
    }
}

/// Detection outcome for one file.
#[derive(Debug, Serialize)]
pub struct SniffReport {
    pub path: String,
    pub format: Option<String>,
    pub format_name: Option<String>,
    pub confidence: f64,
    pub lines_tested: usize,
    pub error: Option<String>,
}

impl SniffReport {
    fn new(path: &std::path::Path, result: &SniffResult) -> Self {
        Self {
            path: path.display().to_string(),
            format: result.chosen_format.as_ref().map(|f| f.slug.clone()),
            format_name: result.chosen_format.as_ref().map(|f| f.name.clone()),
            confidence: result.confidence,
            lines_tested: result.lines_tested,
            error: result.error.clone(),
        }
    }
}

impl Render for SniffReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{} {}", "File:".bold(), self.path)?;
        match (&self.format, &self.format_name) {
            (Some(slug), Some(name)) => {
                writeln!(w, "{} {} ({})", "Format:".bold(), slug.green(), name)?
            }
            _ => writeln!(w, "{} {}", "Format:".bold(), "undetected".red())?,
        }
        writeln!(w, "{} {:.2}", "Confidence:".bold(), self.confidence)?;
        writeln!(w, "{} {}", "Lines tested:".bold(), self.lines_tested)?;
        if let Some(error) = &self.error {
            writeln!(w, "{} {}", "Reason:".bold(), error)?;
        }
        Ok(())
    }
}
