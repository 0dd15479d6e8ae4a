//! Colored terminal output.

use std::io::{self, IsTerminal, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Separator framing the settings summary
pub const SEPARATOR: &str = "====================================================================";

/// Writes user-facing progress to stdout, with color when stdout is a terminal.
#[derive(Debug, Clone)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
    color: ColorChoice,
}

impl OutputManager {
    /// Creates an output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        let color = if io::stdout().is_terminal() {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self {
            verbose,
            quiet,
            color,
        }
    }

    fn styled(&self, color: Option<Color>, bold: bool, prefix: &str, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut stdout = StandardStream::stdout(self.color);
        stdout.set_color(ColorSpec::new().set_fg(color).set_bold(bold))?;
        write!(stdout, "{}", prefix)?;
        stdout.reset()?;
        writeln!(stdout, "{}", message)
    }

    /// Plain informational line
    pub fn info(&self, message: &str) -> io::Result<()> {
        self.styled(None, false, "", message)
    }

    /// Only printed in verbose mode
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }
        self.styled(Some(Color::Cyan), false, "  ", message)
    }

    /// Step announcement, blue arrow prefix
    pub fn progress(&self, message: &str) -> io::Result<()> {
        self.styled(Some(Color::Blue), true, "→ ", message)
    }

    /// Completed step, green check prefix
    pub fn success(&self, message: &str) -> io::Result<()> {
        self.styled(Some(Color::Green), true, "✓ ", message)
    }

    /// Non-fatal problem, yellow warning prefix
    pub fn warn(&self, message: &str) -> io::Result<()> {
        self.styled(Some(Color::Yellow), true, "⚠ ", message)
    }

    /// Bold section header framed by separators
    pub fn section(&self, title: &str) -> io::Result<()> {
        self.info(SEPARATOR)?;
        self.styled(None, true, title, "")?;
        self.info(SEPARATOR)
    }

    /// Indented line, used for child process output
    pub fn indent(&self, message: &str) -> io::Result<()> {
        self.styled(None, false, "  ", message)
    }

    /// Writes a prompt without a trailing newline and flushes it.
    pub fn prompt(&self, question: &str) -> io::Result<()> {
        let mut stdout = StandardStream::stdout(self.color);
        stdout.set_color(ColorSpec::new().set_bold(true))?;
        write!(stdout, "{}", question)?;
        stdout.reset()?;
        stdout.flush()
    }
}
