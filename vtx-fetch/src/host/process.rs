//! Subprocess execution.
//!
//! Used for the `gcloud` CLI and for the Python interpreters that drive the
//! SDK backends. Output is always drained completely before the exit status
//! is read.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::error::ProcessError;

// ============================================================================
// Process Output
// ============================================================================

/// Output from a process execution.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Standard output content.
    pub stdout: String,
    /// Standard error content.
    pub stderr: String,
    /// Exit code (0 = success).
    pub exit_code: i32,
    /// How long the command took to execute.
    pub duration: Duration,
}

impl ProcessOutput {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the stdout if successful, otherwise an error.
    pub fn stdout_if_success(&self) -> Result<&str, ProcessError> {
        if self.success() {
            Ok(&self.stdout)
        } else {
            Err(ProcessError::NonZeroExit {
                code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

// ============================================================================
// Process Runner
// ============================================================================

/// API for running subprocesses.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    pub fn new() -> Self {
        Self
    }

    /// Run a command with timeout.
    #[instrument(skip(self, args), fields(cmd = %cmd, timeout = ?timeout))]
    pub async fn run_with_timeout(
        &self,
        cmd: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        self.run_internal(cmd, args, None, timeout).await
    }

    /// Run a command, write `input` to its stdin and close it, then collect
    /// the output. The child is killed if `timeout` elapses.
    #[instrument(skip(self, args, input), fields(cmd = %cmd, input_len = input.len()))]
    pub async fn run_with_stdin(
        &self,
        cmd: &str,
        args: &[&str],
        input: &[u8],
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        self.run_internal(cmd, args, Some(input), timeout).await
    }

    async fn run_internal(
        &self,
        cmd: &str,
        args: &[&str],
        input: Option<&[u8]>,
        timeout: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        // Script arguments can be long; log the count only.
        debug!(arg_count = args.len(), "Running command");

        let cmd_path = self.which(cmd).ok_or_else(|| {
            warn!(cmd = %cmd, "Command not found");
            ProcessError::NotFound(cmd.to_string())
        })?;

        let start = Instant::now();

        let mut command = Command::new(&cmd_path);
        command
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ProcessError::SpawnFailed {
            cmd: cmd.to_string(),
            source,
        })?;

        let exchange = async move {
            if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
                match stdin.write_all(input).await {
                    Ok(()) => {}
                    // The child may exit before reading everything; its
                    // output still tells us what happened.
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                        debug!("Child closed stdin early");
                    }
                    Err(e) => return Err(ProcessError::Io(e)),
                }
            }
            child.wait_with_output().await.map_err(ProcessError::Io)
        };

        let output = match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(cmd = %cmd, timeout = ?timeout, "Command timed out");
                return Err(ProcessError::Timeout(timeout));
            }
        };

        let duration = start.elapsed();
        let exit_code = output.status.code().unwrap_or(-1);

        let result = ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code,
            duration,
        };

        debug!(
            exit_code = exit_code,
            duration = ?duration,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "Command completed"
        );

        Ok(result)
    }

    /// Check if a command exists on PATH.
    pub fn command_exists(&self, cmd: &str) -> bool {
        self.which(cmd).is_some()
    }

    /// Find the path to a command. Paths containing a separator are
    /// checked directly.
    pub fn which(&self, cmd: &str) -> Option<PathBuf> {
        which::which(cmd).ok()
    }
}

// ============================================================================
// Tests
// ============================================================================
