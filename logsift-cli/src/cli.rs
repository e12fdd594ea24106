//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// logsift -- detect, load and query raw log files with SQL.
///
/// Use `logsift <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "logsift", version, about, long_about = None)]
pub struct Cli {
    /// Path to the logsift.toml configuration file (defaults apply when missing).
    #[arg(short, long, global = true, default_value = "logsift.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the formats in the catalog.
    Formats(FormatsArgs),

    /// Detect the format of a log file without loading it.
    Sniff(SniffArgs),

    /// Load a log file and run queries against it.
    Load(LoadArgs),

    /// Load a log file and read SQL statements from stdin.
    Shell(ShellArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- formats ----

/// List catalog formats.
#[derive(Args, Debug)]
pub struct FormatsArgs {
    /// Only show formats of this category (e.g. "web server", system, data).
    #[arg(long)]
    pub category: Option<String>,
}

// ---- sniff ----

/// Detect the format of a log file.
#[derive(Args, Debug)]
pub struct SniffArgs {
    /// Log file to inspect.
    pub file: PathBuf,
}

// ---- load ----

/// Load a log file into the embedded engine.
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Log file to load.
    pub file: PathBuf,

    /// Skip detection and use this catalog format.
    #[arg(short, long)]
    pub format: Option<String>,

    /// Number of preview rows to keep (overrides `ingest.preview_rows`).
    #[arg(long)]
    pub preview: Option<usize>,

    /// SQL to run after loading (repeatable, executed in order).
    #[arg(short, long = "query")]
    pub queries: Vec<String>,

    /// Show up to N rejected lines.
    #[arg(long, value_name = "N")]
    pub rejects: Option<usize>,

    /// Run the format's default query after loading.
    #[arg(long)]
    pub default_query: bool,
}

// ---- shell ----

/// Load a log file and query it interactively.
#[derive(Args, Debug)]
pub struct ShellArgs {
    /// Log file to load.
    pub file: PathBuf,

    /// Skip detection and use this catalog format.
    #[arg(short, long)]
    pub format: Option<String>,
}

// ---- config ----

/// Manage logsift configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, sniffer, ingest, catalog).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_load_with_repeated_queries() {
        let cli = Cli::try_parse_from([
            "logsift",
            "load",
            "access.log",
            "--format",
            "nginx_combined",
            "-q",
            "SELECT 1",
            "--query",
            "SELECT 2",
            "--rejects",
            "5",
            "--default-query",
        ])
        .expect("should parse load");

        match cli.command {
            Commands::Load(args) => {
                assert_eq!(args.file, PathBuf::from("access.log"));
                assert_eq!(args.format.as_deref(), Some("nginx_combined"));
                assert_eq!(args.queries, vec!["SELECT 1", "SELECT 2"]);
                assert_eq!(args.rejects, Some(5));
                assert!(args.default_query);
                assert_eq!(args.preview, None);
            }
            other => panic!("expected load, got {other:?}"),
        }
    }

    #[test]
    fn parse_defaults() {
        let cli = Cli::try_parse_from(["logsift", "sniff", "app.log"]).expect("should parse");
        assert_eq!(cli.config, PathBuf::from("logsift.toml"));
        assert_eq!(cli.output, OutputFormat::Text);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "logsift",
            "formats",
            "--category",
            "web",
            "--output",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("should parse");
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Formats(args) => assert_eq!(args.category.as_deref(), Some("web")),
            other => panic!("expected formats, got {other:?}"),
        }
    }

    #[test]
    fn config_show_section() {
        let cli = Cli::try_parse_from(["logsift", "config", "show", "--section", "ingest"])
            .expect("should parse");
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Show { section },
            }) => assert_eq!(section.as_deref(), Some("ingest")),
            other => panic!("expected config show, got {other:?}"),
        }
    }

    #[test]
    fn load_requires_file() {
        assert!(Cli::try_parse_from(["logsift", "load"]).is_err());
    }

    #[test]
    fn unknown_output_format_is_rejected() {
        assert!(Cli::try_parse_from(["logsift", "--output", "yaml", "formats"]).is_err());
    }
}
