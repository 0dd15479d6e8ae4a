//! Launcher for database guest VM image builds.
//!
//! Resolves build settings from flags, environment variables and defaults,
//! then drives the external `disk-image-create` tool with a derived argument
//! list, teeing its output to a build log.

pub mod builder;
pub mod cli;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use error::{BuildError, CliError, LauncherError, Result};
