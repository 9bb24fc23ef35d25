//! Shell driver — spawns a local process under allowlist and timeout.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};
use uuid::Uuid;

use super::allowlist::is_allowed;
use super::{DriverContext, DriverError, ShellInput, ShellOutcome};

/// Exit code reported when the real one is unknown (timeout, kill, spawn
/// failure).
const UNKNOWN_EXIT_CODE: i32 = 1;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Raw capture of one process invocation, before outcome assembly.
#[derive(Debug, Clone)]
pub struct RawExec {
    /// Exit code (`None` when the process was killed or the code is
    /// unavailable).
    pub exit_code: Option<i32>,
    /// Captured stdout text.
    pub stdout: String,
    /// Captured stderr text.
    pub stderr: String,
    /// Whether the process exceeded the timeout and was killed.
    pub timed_out: bool,
}

/// Raised when the process cannot be spawned or observed at all.
#[derive(Debug, thiserror::Error)]
#[error("failed to run '{command}': {message}")]
pub struct SpawnError {
    /// Program that could not be started.
    pub command: String,
    /// Underlying failure text.
    pub message: String,
}

/// Process-invocation seam for the shell driver.
///
/// The default implementation spawns a real process; tests and harnesses
/// substitute a fake. The runner is injected per driver instance — there is
/// no process-global substitution point.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` with `args`, honoring `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError`] only when the process cannot be started or
    /// observed. Anything the process itself did — including running past
    /// the timeout — is reported through [`RawExec`].
    async fn run(
        &self,
        command: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<RawExec, SpawnError>;
}

/// Default runner backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        command: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<RawExec, SpawnError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        cmd.creation_flags(CREATE_NO_WINDOW);

        let mut child = cmd.spawn().map_err(|err| SpawnError {
            command: command.to_owned(),
            message: err.to_string(),
        })?;

        let mut stdout_pipe = child.stdout.take().ok_or_else(|| SpawnError {
            command: command.to_owned(),
            message: "process stdout is unavailable".to_owned(),
        })?;
        let mut stderr_pipe = child.stderr.take().ok_or_else(|| SpawnError {
            command: command.to_owned(),
            message: "process stderr is unavailable".to_owned(),
        })?;

        let stdout_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            stdout_pipe.read_to_end(&mut buffer).await.map(|_| buffer)
        });
        let stderr_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            stderr_pipe.read_to_end(&mut buffer).await.map(|_| buffer)
        });

        let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(waited) => {
                let status = waited.map_err(|err| SpawnError {
                    command: command.to_owned(),
                    message: format!("failed waiting for process: {err}"),
                })?;
                (status.code(), false)
            }
            Err(_) => {
                // Kill closes the pipes, so the reader tasks drain whatever
                // partial output the process produced before expiry.
                let _ = child.kill().await;
                let _ = child.wait().await;
                (None, true)
            }
        };

        let stdout = collect_stream(stdout_task).await;
        let stderr = collect_stream(stderr_task).await;

        Ok(RawExec {
            exit_code,
            stdout,
            stderr,
            timed_out,
        })
    }
}

async fn collect_stream(task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>) -> String {
    match task.await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        _ => String::new(),
    }
}

/// Shell driver: validates input, enforces the allowlist, and runs the
/// command under the context's timeout.
#[derive(Clone)]
pub struct ShellDriver {
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for ShellDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellDriver").finish()
    }
}

impl Default for ShellDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellDriver {
    /// Create a driver backed by the real process runner.
    pub fn new() -> Self {
        Self::with_runner(Arc::new(TokioCommandRunner))
    }

    /// Create a driver with a substitute runner.
    ///
    /// This is the injection point test harnesses use to fake process
    /// invocation without touching global state.
    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Execute `input` under `ctx`'s policy and limits.
    ///
    /// # Errors
    ///
    /// Rejects with [`DriverError::Configuration`] for an empty command and
    /// with [`DriverError::PolicyViolation`] when the command fails the
    /// allowlist (the process is never spawned). Everything after the
    /// process starts — non-zero exit, timeout, spawn failure — resolves as
    /// a [`ShellOutcome`] value.
    pub async fn execute(
        &self,
        input: &ShellInput,
        ctx: &DriverContext,
    ) -> Result<ShellOutcome, DriverError> {
        if input.command.trim().is_empty() {
            return Err(DriverError::Configuration(
                "shell input requires a non-empty command".to_owned(),
            ));
        }
        if !is_allowed(&input.command, &ctx.allowlist) {
            warn!(command = %input.command, "shell command rejected by allowlist");
            return Err(DriverError::PolicyViolation {
                target: input.command.clone(),
            });
        }

        let timeout = ctx.limits.timeout();
        let invocation_id = Uuid::new_v4();
        debug!(
            %invocation_id,
            driver = ctx.driver_name.as_deref().unwrap_or("shell"),
            command = %input.command,
            timeout_ms = timeout.as_millis(),
            "shell invocation started"
        );

        let started = Instant::now();
        let outcome = match self.runner.run(&input.command, &input.args, timeout).await {
            Ok(raw) => assemble_outcome(input, raw, timeout, started.elapsed()),
            Err(err) => ShellOutcome {
                command: input.command.clone(),
                args: input.args.clone(),
                exit_code: UNKNOWN_EXIT_CODE,
                stdout: String::new(),
                stderr: err.to_string(),
                timed_out: false,
                duration_ms: elapsed_ms(started.elapsed()),
            },
        };

        debug!(
            %invocation_id,
            exit_code = outcome.exit_code,
            timed_out = outcome.timed_out,
            duration_ms = outcome.duration_ms,
            "shell invocation finished"
        );
        Ok(outcome)
    }
}

fn assemble_outcome(
    input: &ShellInput,
    raw: RawExec,
    timeout: Duration,
    elapsed: Duration,
) -> ShellOutcome {
    let stderr = if raw.stderr.is_empty() && raw.timed_out {
        format!(
            "command '{}' timed out after {}ms",
            input.command,
            timeout.as_millis()
        )
    } else {
        raw.stderr
    };
    ShellOutcome {
        command: input.command.clone(),
        args: input.args.clone(),
        exit_code: raw.exit_code.unwrap_or(UNKNOWN_EXIT_CODE),
        stdout: raw.stdout,
        stderr,
        timed_out: raw.timed_out,
        duration_ms: elapsed_ms(elapsed),
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
