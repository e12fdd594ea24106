//! `logsift config` command handler

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use tracing::info;

use logsift_core::config::LogsiftConfig;
use logsift_ingest::{FormatCatalog, ScoringConfig, SessionConfig};

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Sections accepted by `config show --section`.
const SECTIONS: [&str; 4] = ["general", "sniffer", "ingest", "catalog"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Execute the config validate subcommand.
///
/// Unlike the other commands, a missing file is reported as invalid here.
/// Beyond parsing, the derived session/scoring settings and the configured
/// catalog must load.
///
/// # Errors
///
/// Returns `CliError::Config` if any check fails.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let errors = match LogsiftConfig::load(config_path).await {
        Ok(config) => validate_derived(&config).await,
        Err(e) => vec![e.to_string()],
    };

    let report = ConfigValidationReport {
        source: config_path.display().to_string(),
        valid: errors.is_empty(),
        errors,
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Checks that only fail once the core config is turned into domain settings.
async fn validate_derived(config: &LogsiftConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if let Err(e) = SessionConfig::from_core(&config.ingest) {
        errors.push(e.to_string());
    }
    if let Err(e) = ScoringConfig::from_core(&config.sniffer).validate() {
        errors.push(e.to_string());
    }
    if let Err(e) = FormatCatalog::load(&config.catalog).await {
        errors.push(e.to_string());
    }

    errors
}

/// Execute the config show subcommand.
///
/// Loads and displays the effective configuration (file + env overrides + defaults).
///
/// # Errors
///
/// Returns `CliError::Core` if loading fails or `CliError::Command` if section name is invalid.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = LogsiftConfig::load_or_default(config_path).await?;
    let source = config_path.display().to_string();

    let report = match section.as_deref() {
        None => ConfigReport::new(source, None, &config)?,
        Some("general") => ConfigReport::new(source, section.clone(), &config.general)?,
        Some("sniffer") => ConfigReport::new(source, section.clone(), &config.sniffer)?,
        Some("ingest") => ConfigReport::new(source, section.clone(), &config.ingest)?,
        Some("catalog") => ConfigReport::new(source, section.clone(), &config.catalog)?,
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: {})",
                SECTIONS.join(", ")
            )));
        }
    };

    writer.render(&report)?;

    Ok(())
}

/// Configuration display report.
///
/// Text output shows the TOML rendering, JSON output the structured value.
#[derive(Serialize)]
pub struct ConfigReport {
    /// Configuration file path
    pub source: String,
    /// Optional section name (None = full config)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Effective values
    pub config: serde_json::Value,
    #[serde(skip)]
    pub config_toml: String,
}

impl ConfigReport {
    fn new<T: Serialize>(
        source: String,
        section: Option<String>,
        value: &T,
    ) -> Result<Self, CliError> {
        let config_toml = toml::to_string_pretty(value)
            .map_err(|e| CliError::Command(format!("failed to render configuration: {e}")))?;
        Ok(Self {
            source,
            section,
            config: serde_json::to_value(value)?,
            config_toml,
        })
    }
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path
    pub source: String,
    /// Whether the configuration is valid
    pub valid: bool,
    /// Validation error messages (empty if valid)
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
