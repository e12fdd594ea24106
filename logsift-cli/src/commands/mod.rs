//! Command handlers -- one module per subcommand

pub mod config;
pub mod formats;
pub mod load;
pub mod shell;
pub mod sniff;

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use colored::Colorize;
use serde::Serialize;

use logsift_core::config::LogsiftConfig;
use logsift_core::metrics as m;
use logsift_core::types::QueryResult;
use logsift_ingest::{
    FormatCatalog, FormatDescriptor, IngestSummary, ScoringConfig, Session, SessionConfig,
    SniffResult, resolve_format,
};

use crate::error::CliError;
use crate::output::{Render, write_table};

/// Load the format catalog described by `[catalog]`.
pub(crate) async fn load_catalog(config: &LogsiftConfig) -> Result<FormatCatalog, CliError> {
    Ok(FormatCatalog::load(&config.catalog).await?)
}

/// Result of one timed SQL statement.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub sql: String,
    pub duration_ms: f64,
    pub result: QueryResult,
}

impl Render for QueryReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "{} {}", ">".dimmed(), self.sql)?;
        self.result.render_text(w)?;
        writeln!(
            w,
            "{}",
            format!(
                "({} rows, {:.1} ms)",
                self.result.row_count(),
                self.duration_ms
            )
            .dimmed()
        )
    }
}

/// Run `sql` against the session, recording latency and failures.
pub(crate) async fn timed_query(session: &mut Session, sql: &str) -> Result<QueryReport, CliError> {
    let started = Instant::now();
    let outcome = session.query(sql).await;
    let elapsed = started.elapsed();
    metrics::histogram!(m::QUERY_DURATION_SECONDS).record(elapsed.as_secs_f64());

    let duration_ms = elapsed.as_secs_f64() * 1000.0;
    match outcome {
        Ok(result) => {
            tracing::info!(
                session = %session.id(),
                rows = result.row_count(),
                duration_ms,
                "query finished"
            );
            Ok(QueryReport {
                sql: sql.to_owned(),
                duration_ms,
                result,
            })
        }
        Err(e) => {
            metrics::counter!(m::QUERY_ERRORS_TOTAL).increment(1);
            tracing::warn!(session = %session.id(), duration_ms, error = %e, "query failed");
            Err(e.into())
        }
    }
}

/// Detection details shown next to a loaded dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionInfo {
    pub confidence: f64,
    pub lines_tested: usize,
}

impl From<&SniffResult> for DetectionInfo {
    fn from(result: &SniffResult) -> Self {
        Self {
            confidence: result.confidence,
            lines_tested: result.lines_tested,
        }
    }
}

/// Summary of a freshly loaded dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    /// `None` when the format was given explicitly.
    pub detection: Option<DetectionInfo>,
    #[serde(flatten)]
    pub summary: IngestSummary,
}

impl Render for DatasetReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        let s = &self.summary;
        writeln!(w, "{} {}", "Source:".bold(), s.source.display())?;
        match &self.detection {
            Some(d) => writeln!(
                w,
                "{} {} (confidence {:.2}, {} lines tested)",
                "Format:".bold(),
                s.format_slug,
                d.confidence,
                d.lines_tested
            )?,
            None => writeln!(w, "{} {} (explicit)", "Format:".bold(), s.format_slug)?,
        }
        writeln!(w, "{} {}", "Strategy:".bold(), s.strategy)?;
        writeln!(
            w,
            "{} {} ({} rows)",
            "Table:".bold(),
            s.table_name,
            s.total_row_count
        )?;

        let rejects = format!("{} ({} rows)", s.rejects_table, s.reject_row_count);
        if s.reject_row_count > 0 {
            writeln!(w, "{} {}", "Rejects:".bold(), rejects.yellow())?;
        } else {
            writeln!(w, "{} {}", "Rejects:".bold(), rejects)?;
        }
        writeln!(w, "{} {}", "Columns:".bold(), s.columns.join(", "))?;

        if !s.preview_rows.columns.is_empty() {
            writeln!(w)?;
            write_table(w, &s.preview_rows.columns, &s.preview_rows.rows)?;
            writeln!(
                w,
                "{}",
                format!(
                    "(preview: {} of {} rows)",
                    s.preview_rows.row_count(),
                    s.total_row_count
                )
                .dimmed()
            )?;
        }
        Ok(())
    }
}

/// A dataset loaded into its own session.
pub(crate) struct OpenedDataset {
    pub session: Session,
    pub format: FormatDescriptor,
    pub report: DatasetReport,
}

/// Resolve the format of `path` and load it into a new session.
pub(crate) async fn open_dataset(
    path: &Path,
    explicit_format: Option<&str>,
    preview_rows: Option<usize>,
    config: &LogsiftConfig,
) -> Result<OpenedDataset, CliError> {
    let catalog = load_catalog(config).await?;
    let scoring = ScoringConfig::from_core(&config.sniffer);
    let (format, sniffed) = resolve_format(path, &catalog, &scoring, explicit_format).await?;

    let mut session_config = SessionConfig::from_core(&config.ingest)?;
    if let Some(rows) = preview_rows {
        session_config.preview_rows = rows;
    }

    let mut session = Session::new(session_config);
    let summary = session.ingest(path, &format).await?.clone();

    Ok(OpenedDataset {
        session,
        format,
        report: DatasetReport {
            detection: sniffed.as_ref().map(DetectionInfo::from),
            summary,
        },
    })
}

/// Close the session, logging instead of failing when teardown goes wrong.
pub(crate) async fn close_quietly(session: &mut Session) {
    if let Err(e) = session.close().await {
        tracing::warn!(session = %session.id(), error = %e, "failed to close session");
    }
}
