//! CLI-specific error types and exit code mapping

use logsift_core::error::{EngineError, LogsiftError};
use logsift_ingest::LogIngestError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The file format could not be determined.
    #[error("detection failed: {0}")]
    Detection(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from logsift-core.
    #[error("{0}")]
    Core(#[from] LogsiftError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                     |
    /// |------|-----------------------------|
    /// | 0    | Success                     |
    /// | 1    | General / command error     |
    /// | 2    | Configuration error         |
    /// | 3    | Format detection failed     |
    /// | 10   | IO error                    |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Detection(_) => 3,
            Self::Io(_) => 10,
            Self::Core(core) => match core {
                LogsiftError::Config(_) => 2,
                LogsiftError::Detection(_) => 3,
                LogsiftError::Io(_) => 10,
                LogsiftError::Engine(_) | LogsiftError::Ingest(_) => 1,
            },
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<LogIngestError> for CliError {
    fn from(e: LogIngestError) -> Self {
        match e {
            // Engine messages are shown verbatim.
            LogIngestError::Engine(EngineError::Query(message)) => Self::Command(message),
            LogIngestError::Detection(e) => Self::Detection(e.to_string()),
            LogIngestError::Io(e) => Self::Io(e),
            e @ (LogIngestError::Config { .. } | LogIngestError::CatalogLoad { .. }) => {
                Self::Config(e.to_string())
            }
            other => Self::Command(other.to_string()),
        }
    }
}
