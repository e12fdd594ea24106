use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use logsift_cli::cli::{Cli, Commands};
use logsift_cli::commands;
use logsift_cli::error::CliError;
use logsift_cli::logging::init_tracing;
use logsift_cli::output::OutputWriter;
use logsift_core::config::LogsiftConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let writer = OutputWriter::new(cli.output);

    // `config validate` must still be able to report a broken file,
    // so a load failure only becomes an error for the dataset commands.
    let loaded = LogsiftConfig::load_or_default(&cli.config).await;

    let mut general = loaded
        .as_ref()
        .map(|config| config.general.clone())
        .unwrap_or_default();
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    init_tracing(&general)?;
    logsift_core::metrics::describe_all();

    tracing::debug!(config = %cli.config.display(), "logsift starting");

    match cli.command {
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await?,
        Commands::Formats(args) => {
            let config = loaded.map_err(CliError::from)?;
            commands::formats::execute(args, &config, &writer).await?;
        }
        Commands::Sniff(args) => {
            let config = loaded.map_err(CliError::from)?;
            commands::sniff::execute(args, &config, &writer).await?;
        }
        Commands::Load(args) => {
            let config = loaded.map_err(CliError::from)?;
            commands::load::execute(args, &config, &writer).await?;
        }
        Commands::Shell(args) => {
            let config = loaded.map_err(CliError::from)?;
            commands::shell::execute(args, &config, &writer).await?;
        }
    }

    Ok(())
}
