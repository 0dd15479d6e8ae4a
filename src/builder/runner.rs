//! Builder process execution with output teeing.

use std::path::Path;
use std::process::Stdio;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::Command;
use tokio::sync::Mutex;

use super::BuildCommand;
use crate::cli::OutputManager;
use crate::config::BuildConfig;
use crate::error::{BuildError, Result};

/// Runs the image builder and waits for it to finish.
///
/// Creates the log directory, streams the child's stdout and stderr to the
/// terminal and to `config.log_path`, and turns a non-zero exit into
/// [`BuildError::Failed`]. Nothing is cleaned up on failure.
pub async fn run_build(
    config: &BuildConfig,
    command: &BuildCommand,
    output: &OutputManager,
) -> Result<()> {
    fs::create_dir_all(&config.log_dir)
        .await
        .map_err(|source| BuildError::LogFile {
            path: config.log_dir.clone(),
            source,
        })?;

    let program = which::which(&command.program).map_err(|e| BuildError::ToolNotFound {
        program: command.program.clone(),
        reason: e.to_string(),
    })?;
    log::debug!("using image builder at {}", program.display());

    let log_file = File::create(&config.log_path)
        .await
        .map_err(|source| BuildError::LogFile {
            path: config.log_path.clone(),
            source,
        })?;
    let log = Mutex::new(BufWriter::new(log_file));

    output.progress(&format!("Building image, log: {}", config.log_path.display()))?;

    let mut child = Command::new(&program)
        .args(&command.args)
        .envs(command.env.iter().map(|(name, value)| (*name, value.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| BuildError::Spawn {
            command: command.program.clone(),
            source,
        })?;

    // Drain both pipes together so neither can fill up and stall the child
    let (stdout_result, stderr_result) = tokio::join!(
        tee(child.stdout.take(), &log, &config.log_path, output),
        tee(child.stderr.take(), &log, &config.log_path, output),
    );

    let status = child.wait().await.map_err(|source| BuildError::Spawn {
        command: command.program.clone(),
        source,
    })?;

    log.into_inner()
        .flush()
        .await
        .map_err(|source| BuildError::LogFile {
            path: config.log_path.clone(),
            source,
        })?;
    stdout_result.and(stderr_result)?;

    if !status.success() {
        return Err(BuildError::Failed {
            command: command.program.clone(),
            code: status.code().unwrap_or(-1),
            log: config.log_path.clone(),
        }
        .into());
    }

    log::debug!("{} exited successfully", command.program);
    Ok(())
}

/// Copies a child stream line by line to the log and the terminal.
///
/// Non UTF-8 bytes are replaced rather than ending the copy early. Failures
/// reading the child or writing the log are reported against `log_path`;
/// terminal write failures surface as plain IO errors.
async fn tee<R, W>(
    stream: Option<R>,
    log: &Mutex<W>,
    log_path: &Path,
    output: &OutputManager,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    let Some(stream) = stream else {
        return Ok(());
    };

    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let log_error = |source: std::io::Error| BuildError::LogFile {
        path: log_path.to_path_buf(),
        source,
    };
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await.map_err(log_error)? == 0 {
            break;
        }
        {
            let mut log = log.lock().await;
            log.write_all(&buf).await.map_err(log_error)?;
            if !buf.ends_with(b"\n") {
                log.write_all(b"\n").await.map_err(log_error)?;
            }
        }
        let line = String::from_utf8_lossy(&buf);
        output.indent(line.trim_end_matches(['\n', '\r']))?;
    }
    Ok(())
}
