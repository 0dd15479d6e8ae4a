//! Command line interface for the guest image launcher.
//!
//! Runs the pipeline parse → resolve → summarize → confirm → build.

mod args;
mod output;
mod prompt;

pub use args::{Args, Parsed};
pub use output::OutputManager;

use crate::builder::{self, BuildCommand};
use crate::config::{BuildConfig, ProcessEnv};
use crate::error::Result;

/// Initializes logging; `--debug` raises the default level to debug.
///
/// `RUST_LOG` still takes precedence.
pub fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

/// Main CLI entry point, after argument parsing.
///
/// Returns the process exit code. Declining the confirmation is a success.
pub async fn run(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.debug, false);

    let config = BuildConfig::resolve(&args, &ProcessEnv).await?;
    let command = BuildCommand::new(&config);
    log::debug!("resolved configuration: {:?}", config);

    prompt::print_summary(&output, &config, &command)?;

    if !prompt::confirm(&output, &mut tokio::io::stdin()).await? {
        output.info("")?;
        output.warn("Build cancelled, no image was created")?;
        return Ok(0);
    }

    builder::run_build(&config, &command, &output).await?;

    output.success(&format!("Image built: {}", config.output.display()))?;
    output.verbose(&format!("Build log: {}", config.log_path.display()))?;
    Ok(0)
}
