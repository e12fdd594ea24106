//! `logsift load` command handler

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use logsift_core::config::LogsiftConfig;
use logsift_core::types::QueryResult;
use logsift_ingest::sql::Ident;
use logsift_ingest::{Session, default_query};

use super::{DatasetReport, OpenedDataset, QueryReport, close_quietly, open_dataset, timed_query};
use crate::cli::LoadArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `load` command.
///
/// Statements run in order: the format's default query (when requested),
/// then each `--query`. The first failing statement stops the command.
/// The dataset is always closed before returning.
pub async fn execute(
    args: LoadArgs,
    config: &LogsiftConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let OpenedDataset {
        mut session,
        format,
        report,
    } = open_dataset(&args.file, args.format.as_deref(), args.preview, config).await?;

    let mut statements = Vec::with_capacity(args.queries.len() + 1);
    if args.default_query {
        let table = Ident::new(&report.summary.table_name)?;
        statements.push(default_query(&format, &table));
    }
    statements.extend(args.queries);

    let outcome = run_statements(&mut session, &statements, args.rejects).await;
    close_quietly(&mut session).await;
    let (queries, rejects) = outcome?;

    writer.render(&LoadReport {
        dataset: report,
        queries,
        rejects,
    })
}

async fn run_statements(
    session: &mut Session,
    statements: &[String],
    rejects: Option<usize>,
) -> Result<(Vec<QueryReport>, Option<QueryResult>), CliError> {
    let mut reports = Vec::with_capacity(statements.len());
    for sql in statements {
        reports.push(timed_query(session, sql).await?);
    }

    let rejects = match rejects {
        Some(limit) => Some(session.rejects(limit).await?),
        None => None,
    };
    Ok((reports, rejects))
}

/// Everything `load` produced.
#[derive(Debug, Serialize)]
pub struct LoadReport {
    pub dataset: DatasetReport,
    pub queries: Vec<QueryReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejects: Option<QueryResult>,
}

impl Render for LoadReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        self.dataset.render_text(w)?;

        for query in &self.queries {
            writeln!(w)?;
            query.render_text(w)?;
        }

        if let Some(rejects) = &self.rejects {
            writeln!(w)?;
            writeln!(
                w,
                "{}",
                format!("Rejected lines ({}):", self.dataset.summary.rejects_table).yellow()
            )?;
            if rejects.is_empty() {
                writeln!(w, "(none)")?;
            } else {
                rejects.render_text(w)?;
            }
        }
        Ok(())
    }
}
