//! Evidence capture: per-run directories of redacted JSON artifacts.
//!
//! Layout: `<root>/artifacts/<namespace>/<request_id>/runs/<run_id>/<artifact>`.
//! Directories are created lazily and idempotently, and never deleted by
//! this layer. Every value is redacted before a byte reaches storage.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod audit;
pub mod redactor;
pub mod signer;

pub use audit::AuditLogger;
pub use redactor::{Redactor, REDACTION_MARKER};
pub use signer::{sign, verify, SignedPayload};

/// Directory under the evidence root that scopes all artifacts.
pub const ARTIFACTS_DIR: &str = "artifacts";

/// Errors raised by evidence persistence.
///
/// Loss of evidence is never silently swallowed: every directory or write
/// failure surfaces here, and nothing is retried internally.
#[derive(Debug, Error)]
pub enum EvidenceError {
    /// A request, run, or artifact identifier is not a single path
    /// component.
    #[error("invalid evidence identifier '{0}': must be a single path component")]
    InvalidIdentifier(String),
    /// The run directory could not be created.
    #[error("failed to create evidence directory for request '{request_id}' run '{run_id}': {source}")]
    CreateDir {
        /// Request scope of the failed directory.
        request_id: String,
        /// Run scope of the failed directory.
        run_id: String,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// An artifact could not be serialized.
    #[error("failed to serialize artifact '{filename}': {source}")]
    Serialize {
        /// Artifact filename.
        filename: String,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
    /// An artifact could not be written.
    #[error("failed to write artifact '{filename}': {source}")]
    WriteArtifact {
        /// Artifact filename.
        filename: String,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
}

/// Writes redacted evidence artifacts under a namespaced directory tree.
#[derive(Debug, Clone)]
pub struct EvidenceWriter {
    root: PathBuf,
    namespace: String,
    redactor: Redactor,
}

impl EvidenceWriter {
    /// Create a writer rooted at `root` for `namespace`.
    pub fn new(root: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            namespace: namespace.into(),
            redactor: Redactor::default(),
        }
    }

    /// Replace the default redactor, e.g. to register known secret values.
    #[must_use]
    pub fn with_redactor(mut self, redactor: Redactor) -> Self {
        self.redactor = redactor;
        self
    }

    /// Idempotently ensure the run directory for `(request_id, run_id)`
    /// exists and return its path.
    ///
    /// Safe under concurrent calls with equal or distinct id pairs.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::InvalidIdentifier`] when either id is not a
    /// single path component and [`EvidenceError::CreateDir`] when the
    /// directory cannot be created.
    pub async fn create_run_directory(
        &self,
        request_id: &str,
        run_id: &str,
    ) -> Result<PathBuf, EvidenceError> {
        validate_component(request_id)?;
        validate_component(run_id)?;
        let dir = self
            .root
            .join(ARTIFACTS_DIR)
            .join(&self.namespace)
            .join(request_id)
            .join("runs")
            .join(run_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| EvidenceError::CreateDir {
                request_id: request_id.to_owned(),
                run_id: run_id.to_owned(),
                source,
            })?;
        Ok(dir)
    }

    /// Redact `value` and write it as pretty-printed JSON at
    /// `dir/filename`, returning the written path.
    ///
    /// The parent directory is created when missing. Redaction always
    /// happens before any byte reaches storage. Concurrent writes to the
    /// same filename are not mutually exclusive and may race.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::InvalidIdentifier`] for a filename that is
    /// not a single path component, [`EvidenceError::Serialize`] when the
    /// redacted value cannot be rendered, and
    /// [`EvidenceError::WriteArtifact`] when the bytes cannot be written.
    pub async fn write_artifact(
        &self,
        dir: &Path,
        filename: &str,
        value: &Value,
    ) -> Result<PathBuf, EvidenceError> {
        validate_component(filename)?;
        let sanitized = self.redactor.redact(value);
        let rendered =
            serde_json::to_vec_pretty(&sanitized).map_err(|source| EvidenceError::Serialize {
                filename: filename.to_owned(),
                source,
            })?;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| EvidenceError::WriteArtifact {
                filename: filename.to_owned(),
                source,
            })?;
        let path = dir.join(filename);
        tokio::fs::write(&path, rendered)
            .await
            .map_err(|source| EvidenceError::WriteArtifact {
                filename: filename.to_owned(),
                source,
            })?;
        debug!(path = %path.display(), "evidence artifact written");
        Ok(path)
    }
}

fn validate_component(id: &str) -> Result<(), EvidenceError> {
    let is_single_component =
        !id.is_empty() && id != "." && id != ".." && !id.contains('/') && !id.contains('\\');
    if is_single_component {
        Ok(())
    } else {
        Err(EvidenceError::InvalidIdentifier(id.to_owned()))
    }
}
