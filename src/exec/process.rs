// src/exec/process.rs

//! Runs a directive as an external process.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::{GencacheError, Result};
use crate::exec::task::{Task, TaskFuture};

/// A discovered directive bound to its source file.
///
/// The command line is split on whitespace; there is no shell quoting, so an
/// argument containing spaces cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTask {
    file_path: PathBuf,
    command_line: String,
}

impl ProcessTask {
    pub fn new(file_path: impl Into<PathBuf>, command_line: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            command_line: command_line.into(),
        }
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Directory the process runs in: the one holding the source file.
    pub fn working_dir(&self) -> &Path {
        match self.file_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    fn failure(&self, reason: String, output: String) -> GencacheError {
        GencacheError::TaskExecution {
            path: self.file_path.clone(),
            command: self.command_line.clone(),
            reason,
            output,
        }
    }

    async fn run(&self, cancel: CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(GencacheError::Cancelled(self.command_line.clone()));
        }

        let mut args = self.command_line.split_whitespace();
        let Some(program) = args.next() else {
            debug!(path = ?self.file_path, "empty command line; nothing to run");
            return Ok(());
        };

        info!(
            path = ?self.file_path,
            cmd = %self.command_line,
            "starting generator process"
        );

        // Once spawned the process runs to completion even if `cancel` fires.
        let output = Command::new(program)
            .args(args)
            .current_dir(self.working_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.failure(format!("spawning `{program}`: {e}"), String::new()))?;

        let combined = labelled_output(&output.stdout, &output.stderr);

        let code = output.status.code().unwrap_or(-1);
        info!(
            path = ?self.file_path,
            exit_code = code,
            success = output.status.success(),
            "generator process exited"
        );

        if output.status.success() {
            Ok(())
        } else {
            Err(self.failure(output.status.to_string(), combined))
        }
    }
}

/// Failure output: each non-empty stream under its own `--- name ---` heading.
///
/// The streams are captured separately, so their relative interleaving is lost.
fn labelled_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut out = String::new();
    for (label, bytes) in [("stdout", stdout), ("stderr", stderr)] {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_end();
        if text.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("--- {label} ---\n{text}"));
    }
    out
}

impl fmt::Display for ProcessTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command_line())
    }
}

impl Task for ProcessTask {
    fn execute(&self, cancel: CancellationToken) -> TaskFuture<'_> {
        Box::pin(self.run(cancel))
    }

    fn file_path(&self) -> &Path {
        &self.file_path
    }
}
