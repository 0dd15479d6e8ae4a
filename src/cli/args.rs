//! Command line argument parsing.
//!
//! Parsing is done with clap; its errors are folded into [`CliError`] so the
//! binary reports usage problems with one fixed wording and exit code.

use clap::Parser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use std::ffi::OsString;

use crate::error::CliError;

/// Build a database guest image with diskimage-builder
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "build-guest-image",
    version,
    args_override_self = true,
    about = "Build a database guest VM image with diskimage-builder",
    long_about = "Resolves build settings from flags, environment variables and defaults,
prints them for review, asks for confirmation and then runs disk-image-create.

Every setting can also be given through its upper-case environment variable
(DISTRO, DISTRO_RELEASE, DATASTORE, WORKSPACE, LOG_DIR, HOST_USERNAME, ...).

Usage:
  build-guest-image --datastore mysql --distro ubuntu --distro-release bionic
  build-guest-image --workspace /opt/stack --extra-elements 'pip-cache local-config'
  build-guest-image --output /tmp/guest -- --min-tmpfs 4"
)]
pub struct Args {
    /// Enable verbose diagnostic tracing
    #[arg(long)]
    pub debug: bool,

    /// Base directory for derived paths
    #[arg(long, value_name = "DIR", allow_hyphen_values = true, value_parser = flag_value)]
    pub workspace: Option<String>,

    /// Datastore (service type) the guest image runs [default: mariadb]
    #[arg(long, value_name = "NAME", allow_hyphen_values = true, value_parser = flag_value)]
    pub datastore: Option<String>,

    /// OS distribution [default: ubuntu]
    #[arg(long, value_name = "NAME", allow_hyphen_values = true, value_parser = flag_value)]
    pub distro: Option<String>,

    /// OS release codename [default: xenial]
    #[arg(long, value_name = "NAME", allow_hyphen_values = true, value_parser = flag_value)]
    pub distro_release: Option<String>,

    /// Controller address baked into the guest (auto-detected when omitted)
    #[arg(long, value_name = "IP", allow_hyphen_values = true, value_parser = flag_value)]
    pub controller_ip: Option<String>,

    /// Space-delimited extra elements appended to the build
    #[arg(long, value_name = "LIST", allow_hyphen_values = true, value_parser = flag_value)]
    pub extra_elements: Option<String>,

    /// Directory for the build transcript
    #[arg(long, value_name = "DIR", allow_hyphen_values = true, value_parser = flag_value)]
    pub log_dir: Option<String>,

    /// Output path of the built image
    #[arg(long, value_name = "PATH", allow_hyphen_values = true, value_parser = flag_value)]
    pub output: Option<String>,

    /// Arguments after `--`, passed to disk-image-create verbatim
    #[arg(last = true, value_name = "BUILDER_ARGS")]
    pub passthrough: Vec<String>,
}

/// Outcome of parsing the command line
#[derive(Debug)]
pub enum Parsed {
    /// Arguments are valid, continue to the build
    Run(Args),
    /// Help or version was requested; the text is already rendered
    Display(String),
}

impl Args {
    /// Parse process arguments
    pub fn parse_args() -> Result<Parsed, CliError> {
        Self::parse_from_iter(std::env::args_os())
    }

    /// Parse an explicit argument list (first item is the program name)
    pub fn parse_from_iter<I, T>(args: I) -> Result<Parsed, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match Self::try_parse_from(args) {
            Ok(args) => Ok(Parsed::Run(args)),
            Err(err) => match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    Ok(Parsed::Display(err.render().to_string()))
                }
                _ => Err(usage_error(&err)),
            },
        }
    }
}

/// Accepts a flag value unless it is empty or looks like another option.
///
/// Value-taking flags allow hyphen values so that this check, rather than
/// clap's flag detection, decides what a following `-` token means.
fn flag_value(value: &str) -> Result<String, String> {
    if value.is_empty() || value.starts_with('-') {
        Err(format!("'{}' is not a value", value))
    } else {
        Ok(value.to_string())
    }
}

/// Map a clap failure onto the launcher's usage errors.
fn usage_error(err: &clap::Error) -> CliError {
    let flag = match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(arg)) => arg
            .split(|c: char| c.is_whitespace() || c == '=')
            .next()
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    };

    match err.kind() {
        ErrorKind::UnknownArgument => CliError::UnexpectedOption { flag },
        ErrorKind::InvalidValue | ErrorKind::ValueValidation | ErrorKind::NoEquals
            if !flag.is_empty() =>
        {
            CliError::MissingArgument { flag }
        }
        _ => CliError::InvalidArguments {
            reason: err
                .render()
                .to_string()
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ")
                .to_string(),
        },
    }
}
