//! External image builder invocation.
//!
//! Turns a resolved [`BuildConfig`](crate::config::BuildConfig) into a
//! `disk-image-create` command line and runs it, teeing its output to the
//! build log.

mod command;
mod runner;

pub use command::BuildCommand;
pub use runner::run_build;
