//! Execution drivers: policy-checked, time-bounded external operations.
//!
//! A driver wraps one external operation kind (a local process, an HTTP
//! request) behind a common capability surface. Every call enforces the
//! allowlist policy and the context's timeout before touching the OS or the
//! network, and anything that goes wrong *during* the external operation is
//! captured as an outcome value rather than an error — so evidence capture
//! succeeds even for failed runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod allowlist;
pub mod http;
pub mod shell;

pub use http::HttpDriver;
pub use shell::ShellDriver;

/// Timeout applied when the context carries no explicit budget.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Per-call resource limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum wall-clock time for the external operation, in milliseconds.
    /// Defaults to [`DEFAULT_TIMEOUT_MS`] when absent.
    pub timeout_ms: Option<u64>,
    /// Advisory cap on captured data size. Carried for callers; the drivers
    /// do not enforce it.
    pub max_data_size: Option<u64>,
}

impl Limits {
    /// Resolve the effective timeout for a driver call.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }
}

/// Caller-supplied context for a single driver call.
///
/// Built per call and not retained by the driver. An empty `allowlist`
/// permits every target — see the [`allowlist`] module docs for the
/// default-open posture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverContext {
    /// Optional label used in logs and audit entries.
    pub driver_name: Option<String>,
    /// Ordered prefix allowlist. Uniqueness is not required.
    pub allowlist: Vec<String>,
    /// Timeout and data-size limits.
    pub limits: Limits,
    /// Opaque driver-specific bindings, passed through untouched.
    pub bindings: Option<serde_json::Value>,
}

/// Driver implementation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    /// Local process execution.
    Shell,
    /// Network request execution.
    Http,
}

impl std::fmt::Display for DriverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverKind::Shell => write!(f, "shell"),
            DriverKind::Http => write!(f, "http"),
        }
    }
}

/// Input for the shell driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellInput {
    /// Program to invoke. Must be non-empty.
    pub command: String,
    /// Arguments passed to the program verbatim.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ShellInput {
    /// Build an input for `command` with `args`.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

/// Input for the HTTP driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpInput {
    /// Target URL. Checked against the allowlist before any request is sent.
    pub url: String,
    /// HTTP method; defaults to `GET`.
    #[serde(default = "default_method")]
    pub method: String,
    /// Request headers as `(name, value)` pairs.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Optional request body.
    #[serde(default)]
    pub body: Option<String>,
}

impl HttpInput {
    /// Build a `GET` request input for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: Vec::new(),
            body: None,
        }
    }
}

fn default_method() -> String {
    "GET".to_owned()
}

/// Outcome of a shell invocation.
///
/// Always a value, never an error, for anything that happened after the
/// policy check: non-zero exits, timeouts, and spawn failures all land here
/// with `exit_code != 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellOutcome {
    /// Program that was invoked.
    pub command: String,
    /// Arguments the program received.
    pub args: Vec<String>,
    /// `0` only on process success; the process's own code otherwise, or
    /// `1` when unknown (timeout, kill, spawn failure).
    pub exit_code: i32,
    /// Captured stdout text.
    pub stdout: String,
    /// Captured stderr text; falls back to the failure's message when the
    /// process produced nothing.
    pub stderr: String,
    /// Whether the invocation exceeded the timeout and was killed.
    pub timed_out: bool,
    /// Wall-clock duration of the call in milliseconds.
    pub duration_ms: u64,
}

impl ShellOutcome {
    /// Returns `true` when the process exited successfully.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }

    /// Combined stdout+stderr output, newline-separated when both are
    /// non-empty.
    pub fn output(&self) -> String {
        if self.stdout.is_empty() {
            return self.stderr.clone();
        }
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Outcome of an HTTP request.
///
/// `status` is present iff a response arrived; transport failures and
/// deadline expiry resolve with `status: None` and a non-empty `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpOutcome {
    /// Target URL of the request.
    pub url: String,
    /// Response status code, when a response arrived.
    pub status: Option<u16>,
    /// Response body text; empty when no response arrived.
    pub body: String,
    /// Transport failure text, when the request did not complete.
    pub error: Option<String>,
    /// Whether the request deadline expired.
    pub timed_out: bool,
    /// Wall-clock duration of the call in milliseconds.
    pub duration_ms: u64,
}

impl HttpOutcome {
    /// Returns `true` when a response arrived with a 2xx status.
    pub fn success(&self) -> bool {
        matches!(self.status, Some(code) if (200..300).contains(&code))
    }
}

/// Closed set of driver inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverInput {
    /// Input for [`ShellDriver`].
    Shell(ShellInput),
    /// Input for [`HttpDriver`].
    Http(HttpInput),
}

impl DriverInput {
    /// The driver kind this input belongs to.
    pub fn kind(&self) -> DriverKind {
        match self {
            DriverInput::Shell(_) => DriverKind::Shell,
            DriverInput::Http(_) => DriverKind::Http,
        }
    }
}

/// Closed set of driver outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverOutcome {
    /// Outcome of a shell invocation.
    Shell(ShellOutcome),
    /// Outcome of an HTTP request.
    Http(HttpOutcome),
}

impl DriverOutcome {
    /// Returns `true` when the external operation succeeded.
    pub fn success(&self) -> bool {
        match self {
            DriverOutcome::Shell(outcome) => outcome.success(),
            DriverOutcome::Http(outcome) => outcome.success(),
        }
    }
}

/// Call-level driver errors.
///
/// These reject the call before the external operation starts. Everything
/// that happens *during* the operation — non-zero exit, timeout, transport
/// failure — is captured in the outcome value instead; see [`ShellOutcome`]
/// and [`HttpOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Malformed input for the selected driver.
    #[error("invalid driver input: {0}")]
    Configuration(String),
    /// The requested target is not permitted by the allowlist.
    #[error("target '{target}' is not permitted by the allowlist")]
    PolicyViolation {
        /// The rejected command name or URL.
        target: String,
    },
}

/// Unified capability surface over the concrete drivers.
///
/// Each variant wraps one strongly typed driver; `execute` dispatches a
/// [`DriverInput`] to the matching driver and rejects kind mismatches as
/// configuration errors.
#[derive(Debug, Clone)]
pub enum Driver {
    /// Local process driver.
    Shell(ShellDriver),
    /// Network request driver.
    Http(HttpDriver),
}

impl Driver {
    /// Concrete driver kind.
    pub fn kind(&self) -> DriverKind {
        match self {
            Driver::Shell(_) => DriverKind::Shell,
            Driver::Http(_) => DriverKind::Http,
        }
    }

    /// Execute `input` under `ctx`'s policy and limits.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Configuration`] when the input variant does
    /// not match the driver kind, and propagates the concrete driver's
    /// configuration and policy rejections.
    pub async fn execute(
        &self,
        input: DriverInput,
        ctx: &DriverContext,
    ) -> Result<DriverOutcome, DriverError> {
        match (self, input) {
            (Driver::Shell(driver), DriverInput::Shell(input)) => {
                driver.execute(&input, ctx).await.map(DriverOutcome::Shell)
            }
            (Driver::Http(driver), DriverInput::Http(input)) => {
                driver.execute(&input, ctx).await.map(DriverOutcome::Http)
            }
            (driver, input) => Err(DriverError::Configuration(format!(
                "{} driver cannot execute {} input",
                driver.kind(),
                input.kind()
            ))),
        }
    }
}
