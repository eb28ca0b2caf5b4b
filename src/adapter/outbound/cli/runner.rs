//! Process execution for the CLI-backed adapters.
//!
//! [`CommandRunner`] is the seam the adapters are tested through;
//! [`ProcessRunner`] spawns the real tool with piped stdio and a per-command
//! timeout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, trace, warn};

use crate::error::{ProvisionError, Result};

/// Maximum stdout or stderr size captured per stream (4 MiB).
const MAX_OUTPUT_BYTES: usize = 4 * 1024 * 1024;

/// A tool invocation: program, arguments and optional stdin payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `flag value` only if `value` is present.
    #[must_use]
    pub fn opt(self, flag: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.arg(flag).arg(value),
            None => self,
        }
    }

    #[must_use]
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// The command line, for logs and error messages.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful output carrying `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output carrying `stderr`.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs tool invocations.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` to completion.
    ///
    /// A non-zero exit status is not an error at this level; spawn failures
    /// and timeouts are.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let command_error = |reason: String| ProvisionError::Command {
            program: invocation.program.clone(),
            reason,
        };

        debug!(command = %invocation.display(), "Running command");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| command_error(e.to_string()))?;

        if let (Some(mut stdin), Some(input)) = (child.stdin.take(), invocation.stdin.as_ref()) {
            // The tool may close stdin early; its exit status tells the rest.
            let _ = stdin.write_all(input.as_bytes()).await;
            drop(stdin);
        }

        let stdout_task = tokio::spawn(read_capped(child.stdout.take(), MAX_OUTPUT_BYTES));
        let stderr_task = tokio::spawn(read_capped(child.stderr.take(), MAX_OUTPUT_BYTES));

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(command_error(e.to_string()).into()),
            Err(_) => {
                return Err(command_error(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                ))
                .into())
            }
        };

        let (stdout, stdout_truncated) = stdout_task.await.unwrap_or_default();
        let (stderr, stderr_truncated) = stderr_task.await.unwrap_or_default();
        for (stream, truncated) in [("stdout", stdout_truncated), ("stderr", stderr_truncated)] {
            if truncated {
                warn!(
                    command = %invocation.display(),
                    stream,
                    limit_bytes = MAX_OUTPUT_BYTES,
                    "Command output exceeded the capture limit and was truncated"
                );
            }
        }
        let output = CommandOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        };
        trace!(exit_code = output.exit_code, stdout = %output.stdout, "Command finished");
        Ok(output)
    }
}

/// Read at most `limit` bytes; the flag is set when more were available.
async fn read_capped<R: AsyncRead + Unpin>(handle: Option<R>, limit: usize) -> (Vec<u8>, bool) {
    let mut buf = Vec::new();
    let Some(handle) = handle else {
        return (buf, false);
    };
    let probe_limit = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let _ = handle.take(probe_limit).read_to_end(&mut buf).await;
    let truncated = buf.len() > limit;
    buf.truncate(limit);
    (buf, truncated)
}

/// Run `invocation` and treat a non-zero exit status as a command failure.
pub(crate) async fn run_checked(
    runner: &dyn CommandRunner,
    invocation: &Invocation,
) -> Result<CommandOutput> {
    let output = runner.run(invocation).await?;
    if output.success() {
        return Ok(output);
    }
    let stderr = output.stderr.trim();
    let reason = if stderr.is_empty() {
        format!("exited with status {}", output.exit_code)
    } else {
        format!("exited with status {}: {stderr}", output.exit_code)
    };
    Err(ProvisionError::Command {
        program: invocation.program.clone(),
        reason,
    }
    .into())
}

/// Parse the stdout of `program` as JSON.
pub(crate) fn parse_json(program: &str, stdout: &str) -> Result<Value> {
    serde_json::from_str(stdout.trim()).map_err(|e| {
        ProvisionError::UnexpectedResponse {
            program: program.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}
