//! Proofgate — restricted execution with evidence capture.
//!
//! Invoke an external operation (a local process or an HTTP request) under
//! an explicit allowlist and a bounded time budget, then persist a
//! redacted, optionally HMAC-signed record of what happened.
//!
//! Call-level failures (bad input, allowlist rejection) are errors;
//! anything that goes wrong *during* the external operation resolves as an
//! outcome value, so evidence capture succeeds even for failed runs.
//!
//! See `DESIGN.md` for full architecture documentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod driver;
pub mod evidence;
pub mod logging;
