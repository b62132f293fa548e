/// Terminal sinks
///
/// Where a dispatched command ends up. `StdoutSink` just prints it;
/// `ShellSink` runs it through the user's shell when auto-submit is set.

use crate::error::Result;
use crate::shell::Shell;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command;

/// Receives resolved commands
pub trait TerminalSink {
    fn send(&mut self, command: &str, auto_submit: bool) -> Result<()>;
}

/// Writes each command on its own line
pub struct StdoutSink<W: Write = io::Stdout> {
    out: W,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> StdoutSink<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TerminalSink for StdoutSink<W> {
    fn send(&mut self, command: &str, _auto_submit: bool) -> Result<()> {
        writeln!(self.out, "{}", command)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Runs commands in a child shell
pub struct ShellSink<W: Write = io::Stdout> {
    shell: Shell,
    cwd: Option<PathBuf>,
    preview: StdoutSink<W>,
    last_exit_code: Option<i32>,
}

impl ShellSink {
    pub fn new(shell: Shell) -> Self {
        Self::with_preview(shell, StdoutSink::new())
    }
}

impl<W: Write> ShellSink<W> {
    /// Commands that are not auto-submitted go to `preview`
    pub fn with_preview(shell: Shell, preview: StdoutSink<W>) -> Self {
        Self {
            shell,
            cwd: None,
            preview,
            last_exit_code: None,
        }
    }

    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Exit code of the last executed command, `None` if killed by a signal
    pub fn last_exit_code(&self) -> Option<i32> {
        self.last_exit_code
    }
}

impl<W: Write> TerminalSink for ShellSink<W> {
    fn send(&mut self, command: &str, auto_submit: bool) -> Result<()> {
        if !auto_submit {
            return self.preview.send(command, false);
        }

        let mut child = Command::new(self.shell.program());
        child.arg(self.shell.command_flag()).arg(command);
        if let Some(cwd) = &self.cwd {
            child.current_dir(cwd);
        }

        log::info!("Running via {}: {}", self.shell, command);
        let status = child.status()?;
        self.last_exit_code = status.code();

        if !status.success() {
            log::warn!("Command exited with {}", status);
        }
        Ok(())
    }
}
