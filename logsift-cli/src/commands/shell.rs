//! `logsift shell` command handler
//!
//! Loads one file, then reads SQL statements from stdin, one per line.
//! A failed statement prints the engine's message and leaves the dataset
//! and the last good result untouched.
//!
//! | Input            | Action                                 |
//! |------------------|----------------------------------------|
//! | `SELECT ...`     | run against the dataset                |
//! | `.last`          | re-render the last successful result   |
//! | `.rejects [N]`   | show up to N rejected lines (20)       |
//! | `.tables`        | list engine tables                     |
//! | `.help`          | list commands                          |
//! | `.quit`, `.exit` | leave the shell                        |

use std::io::{IsTerminal, Write};

use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use logsift_core::config::LogsiftConfig;
use logsift_core::types::{Cell, QueryResult};
use logsift_ingest::Session;

use super::{OpenedDataset, QueryReport, close_quietly, open_dataset, timed_query};
use crate::cli::ShellArgs;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Rows shown by `.rejects` without an argument.
const DEFAULT_REJECT_LIMIT: usize = 20;

const PROMPT: &str = "logsift> ";

const HELP: &str = "\
.last          re-render the last successful result
.rejects [N]   show up to N rejected lines
.tables        list tables
.quit          leave the shell
Any other line is run as SQL.";

/// Execute the `shell` command.
pub async fn execute(
    args: ShellArgs,
    config: &LogsiftConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let OpenedDataset {
        mut session,
        report,
        ..
    } = open_dataset(&args.file, args.format.as_deref(), None, config).await?;
    writer.render(&report)?;

    let interactive = std::io::stdin().is_terminal();
    let input = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    let outcome = run_shell(
        &mut session,
        input,
        writer,
        &mut stdout,
        &mut stderr,
        interactive,
    )
    .await;
    close_quietly(&mut session).await;

    let stats = outcome?;
    tracing::info!(
        statements = stats.statements,
        failed = stats.failed,
        "shell finished"
    );
    Ok(())
}

/// Counters for one shell run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShellStats {
    pub statements: usize,
    pub failed: usize,
}

/// A parsed shell input line.
#[derive(Debug, PartialEq, Eq)]
enum ShellInput<'a> {
    Skip,
    Quit,
    Last,
    Rejects(usize),
    Tables,
    Help,
    Unknown(&'a str),
    Sql(&'a str),
}

fn parse_line(line: &str) -> ShellInput<'_> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("--") {
        return ShellInput::Skip;
    }
    let Some(command) = line.strip_prefix('.') else {
        return ShellInput::Sql(line);
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("quit" | "exit"), None) => ShellInput::Quit,
        (Some("last"), None) => ShellInput::Last,
        (Some("tables"), None) => ShellInput::Tables,
        (Some("help"), None) => ShellInput::Help,
        (Some("rejects"), None) => ShellInput::Rejects(DEFAULT_REJECT_LIMIT),
        (Some("rejects"), Some(n)) => match n.parse() {
            Ok(limit) => ShellInput::Rejects(limit),
            Err(_) => ShellInput::Unknown(line),
        },
        _ => ShellInput::Unknown(line),
    }
}

/// Read statements from `input` until EOF or `.quit`.
///
/// Results go to `out`, errors to `err`; neither ends the loop.
pub async fn run_shell<R>(
    session: &mut Session,
    input: R,
    writer: &OutputWriter,
    out: &mut dyn Write,
    err: &mut dyn Write,
    interactive: bool,
) -> Result<ShellStats, CliError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut last: Option<QueryReport> = None;
    let mut stats = ShellStats::default();

    loop {
        if interactive {
            write!(err, "{PROMPT}")?;
            err.flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            ShellInput::Skip => {}
            ShellInput::Quit => break,
            ShellInput::Help => writeln!(out, "{HELP}")?,
            ShellInput::Last => match &last {
                Some(report) => writer.render_to(out, report)?,
                None => writeln!(err, "no successful query yet")?,
            },
            ShellInput::Rejects(limit) => match session.rejects(limit).await {
                Ok(result) => writer.render_to(out, &result)?,
                Err(e) => report_error(err, &CliError::from(e))?,
            },
            ShellInput::Tables => match session.table_names().await {
                Ok(names) => {
                    let result = QueryResult::new(
                        vec!["table_name".to_owned()],
                        names.into_iter().map(|n| vec![Cell::Text(n)]).collect(),
                    );
                    writer.render_to(out, &result)?;
                }
                Err(e) => report_error(err, &CliError::from(e))?,
            },
            ShellInput::Unknown(command) => {
                writeln!(err, "unknown command: {command} (try .help)")?;
            }
            ShellInput::Sql(sql) => {
                stats.statements += 1;
                match timed_query(session, sql).await {
                    Ok(report) => {
                        writer.render_to(out, &report)?;
                        last = Some(report);
                    }
                    Err(e) => {
                        stats.failed += 1;
                        report_error(err, &e)?;
                    }
                }
            }
        }
    }

    Ok(stats)
}

fn report_error(err: &mut dyn Write, e: &CliError) -> std::io::Result<()> {
    writeln!(err, "{} {e}", "error:".red().bold())
}
