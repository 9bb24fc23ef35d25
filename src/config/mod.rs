//! Configuration loading and management.
//!
//! Loads proofgate configuration from `./proofgate.toml` (or
//! `$PROOFGATE_CONFIG_PATH`). Environment variables override file values;
//! file values override defaults.
//!
//! Precedence: env vars > config file > defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::driver::DEFAULT_TIMEOUT_MS;

/// Top-level proofgate configuration loaded from TOML.
///
/// Path: `./proofgate.toml` or `$PROOFGATE_CONFIG_PATH`.
/// Env vars override file values; file values override defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProofgateConfig {
    /// Filesystem paths for evidence and audit output (`[paths]`).
    pub paths: PathsConfig,
    /// Evidence namespace settings (`[evidence]`).
    pub evidence: EvidenceConfig,
    /// Default driver limits (`[limits]`).
    pub limits: LimitsConfig,
}

/// Filesystem paths for persistent output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root directory under which `artifacts/` is created.
    pub artifacts_root: String,
    /// Append-only audit log path.
    pub audit_log: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let base = directories::ProjectDirs::from("io", "proofgate", "proofgate")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            artifacts_root: base.display().to_string(),
            audit_log: base.join("audit.log").display().to_string(),
        }
    }
}

/// Evidence namespace settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    /// Namespace under `artifacts/` that scopes this deployment's evidence.
    pub namespace: String,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_owned(),
        }
    }
}

/// Default driver limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Default per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ProofgateConfig {
    /// Load configuration with precedence: env vars > TOML file > defaults.
    ///
    /// Config file path: `$PROOFGATE_CONFIG_PATH` or `./proofgate.toml`.
    /// If the file does not exist, returns defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when the config file exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from TOML file only, no env overrides.
    fn load_from_file() -> Result<Self> {
        let path = Self::config_path_with(|key| std::env::var(key).ok());
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                let config: ProofgateConfig =
                    toml::from_str(&contents).context("failed to parse config TOML")?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                Ok(ProofgateConfig::default())
            }
            Err(e) => Err(anyhow::anyhow!("failed to read config file: {e}")),
        }
    }

    /// Resolve config path using a custom env resolver (for testing).
    fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        if let Some(p) = env("PROOFGATE_CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("proofgate.toml")
    }

    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability (avoids unsafe `set_var`
    /// in tests).
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("PROOFGATE_ARTIFACTS_ROOT") {
            self.paths.artifacts_root = v;
        }
        if let Some(v) = env("PROOFGATE_AUDIT_LOG") {
            self.paths.audit_log = v;
        }
        if let Some(v) = env("PROOFGATE_NAMESPACE") {
            self.evidence.namespace = v;
        }
        if let Some(v) = env("PROOFGATE_TIMEOUT_MS") {
            match v.parse() {
                Ok(n) => self.limits.timeout_ms = n,
                Err(_) => tracing::warn!(
                    var = "PROOFGATE_TIMEOUT_MS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
    }
}
