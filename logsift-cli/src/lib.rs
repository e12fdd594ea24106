//! logsift CLI -- argument parsing, command handlers and output rendering.
//!
//! The `logsift` binary is a thin shell over this library: it parses
//! [`cli::Cli`], loads the configuration, installs logging and dispatches
//! to one of the [`commands`] handlers.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
