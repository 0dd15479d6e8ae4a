//! Settings summary and interactive confirmation.

use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::OutputManager;
use super::output::SEPARATOR;
use crate::builder::BuildCommand;
use crate::config::BuildConfig;

/// Prints every resolved setting as `NAME=value`, then the builder command.
pub fn print_summary(
    output: &OutputManager,
    config: &BuildConfig,
    command: &BuildCommand,
) -> io::Result<()> {
    output.section("Guest image build settings")?;
    for (name, value) in config.summary() {
        output.info(&format!("{}={}", name, value))?;
    }
    output.info(SEPARATOR)?;
    output.info("Command:")?;
    output.indent(&command.to_string())?;
    output.info(SEPARATOR)
}

/// Asks for confirmation and reads a single byte of input.
///
/// Only `y` or `Y` confirms. End of input declines. A terminal in canonical
/// mode delivers input a line at a time, so the answer needs Enter.
pub async fn confirm<R>(output: &OutputManager, input: &mut R) -> io::Result<bool>
where
    R: AsyncRead + Unpin,
{
    output.prompt("Continue with the build? [y/N, then Enter] ")?;

    let mut answer = [0u8; 1];
    let confirmed = match input.read(&mut answer).await? {
        0 => false,
        _ => answer[0].eq_ignore_ascii_case(&b'y'),
    };
    log::debug!("confirmation answer: {:?}", confirmed);
    Ok(confirmed)
}
