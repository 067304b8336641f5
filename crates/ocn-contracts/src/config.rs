//! Contract validation configuration.

use std::path::PathBuf;

/// Configuration for a [`crate::ContractValidator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractsConfig {
    /// Directory holding `events/` and `mandates/` schema trees.
    /// Files found here take precedence over bundled schemas.
    pub schema_root: Option<PathBuf>,

    /// Register the first-party event types and bundled schemas
    pub install_builtin: bool,

    /// Record Prometheus metrics
    pub emit_metrics: bool,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            schema_root: None,
            install_builtin: true,
            emit_metrics: true,
        }
    }
}

impl ContractsConfig {
    /// Create config from environment variables
    ///
    /// - `OCN_SCHEMA_ROOT`: schema directory (default: bundled schemas only)
    /// - `OCN_CONTRACTS_BUILTIN`: install first-party registrations (default `true`)
    /// - `OCN_CONTRACTS_METRICS`: record metrics (default `true`)
    pub fn from_env() -> Self {
        Self {
            schema_root: std::env::var("OCN_SCHEMA_ROOT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            install_builtin: std::env::var("OCN_CONTRACTS_BUILTIN")
                .map(|v| v.parse().unwrap_or(true))
                .unwrap_or(true),
            emit_metrics: std::env::var("OCN_CONTRACTS_METRICS")
                .map(|v| v.parse().unwrap_or(true))
                .unwrap_or(true),
        }
    }

    /// Set the schema root directory
    pub fn with_schema_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.schema_root = Some(root.into());
        self
    }

    /// Enable or disable the first-party registrations
    pub fn with_builtin(mut self, install: bool) -> Self {
        self.install_builtin = install;
        self
    }

    /// Enable or disable metrics
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.emit_metrics = enabled;
        self
    }
}
