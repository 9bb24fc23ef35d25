//! Audit trail for driver invocations and evidence writes.
//!
//! Writes structured JSON entries, one per line, to an append-only sink.
//! Secrets never reach this log; outcome summaries are redacted before the
//! caller hands them over.

use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;

/// Audit event type discriminator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A driver ran an external operation.
    DriverInvoked,
    /// A target was rejected by the allowlist.
    PolicyViolation,
    /// A redacted artifact was persisted.
    ArtifactWritten,
}

/// A single structured audit log entry.
#[derive(Debug, Serialize)]
struct AuditEntry {
    timestamp: String,
    event_type: AuditEventType,
    details: serde_json::Value,
}

/// Audit logger writing structured JSON to an append-only sink.
pub struct AuditLogger {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl AuditLogger {
    /// Create an audit logger that appends to the given file path.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be opened for appending.
    pub fn new(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            writer: Mutex::new(Box::new(file)),
        })
    }

    /// Create an audit logger from an arbitrary writer (for testing).
    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Log a completed driver invocation.
    ///
    /// # Errors
    ///
    /// Returns an error when the entry cannot be written.
    pub fn log_driver_invoked(
        &self,
        kind: &str,
        target: &str,
        success: bool,
        duration_ms: u64,
    ) -> anyhow::Result<()> {
        self.write_entry(
            AuditEventType::DriverInvoked,
            serde_json::json!({
                "kind": kind,
                "target": target,
                "success": success,
                "duration_ms": duration_ms,
            }),
        )
    }

    /// Log an allowlist rejection.
    ///
    /// # Errors
    ///
    /// Returns an error when the entry cannot be written.
    pub fn log_policy_violation(&self, target: &str) -> anyhow::Result<()> {
        self.write_entry(
            AuditEventType::PolicyViolation,
            serde_json::json!({
                "target": target,
            }),
        )
    }

    /// Log a persisted evidence artifact.
    ///
    /// # Errors
    ///
    /// Returns an error when the entry cannot be written.
    pub fn log_artifact_written(&self, path: &Path) -> anyhow::Result<()> {
        self.write_entry(
            AuditEventType::ArtifactWritten,
            serde_json::json!({
                "path": path.display().to_string(),
            }),
        )
    }

    /// Write a single JSON line to the audit log.
    fn write_entry(
        &self,
        event_type: AuditEventType,
        details: serde_json::Value,
    ) -> anyhow::Result<()> {
        let entry = AuditEntry {
            timestamp: Utc::now().to_rfc3339(),
            event_type,
            details,
        };
        let line = serde_json::to_string(&entry)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| anyhow::anyhow!("audit lock poisoned: {e}"))?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}
