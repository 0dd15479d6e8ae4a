//! Error types for launcher operations.
//!
//! Usage errors, environment errors and builder failures are all fatal; the
//! binary prints them with a fixed marker and exits with status 1.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for launcher operations
pub type Result<T> = std::result::Result<T, LauncherError>;

/// Main error type for all launcher operations
#[derive(Error, Debug)]
pub enum LauncherError {
    /// CLI argument errors
    #[error(transparent)]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image builder invocation errors
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Generic errors from anyhow
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    /// Flag not recognised by the parser
    #[error("Unexpected option: {flag}")]
    UnexpectedOption {
        /// Flag as typed on the command line
        flag: String,
    },

    /// Value-taking flag given without a value
    #[error("Option requires an argument: {flag}")]
    MissingArgument {
        /// Flag name
        flag: String,
    },

    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

/// Errors raised while preparing or running the external image builder
#[derive(Error, Debug)]
pub enum BuildError {
    /// Builder executable could not be located
    #[error("image builder '{program}' not found in PATH: {reason}")]
    ToolNotFound {
        /// Program name or path that was looked up
        program: String,
        /// Lookup failure
        reason: String,
    },

    /// Log directory or log file could not be prepared
    #[error("cannot prepare log file {}: {source}", path.display())]
    LogFile {
        /// Path that failed
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Child process could not be started or awaited
    #[error("failed to run {command}: {source}")]
    Spawn {
        /// Command that failed
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Builder exited with a non-zero status
    #[error("{command} failed with exit code {code}, see {}", log.display())]
    Failed {
        /// Command that failed
        command: String,
        /// Exit code, or -1 when terminated by a signal
        code: i32,
        /// Build transcript
        log: PathBuf,
    },
}
