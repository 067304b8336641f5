//! Prometheus metrics for contract validation
//!
//! - `ocn_contracts_validations_total` (counter) - Validations by event type and outcome
//! - `ocn_contracts_validation_errors_total` (counter) - Reported errors by violated rule
//! - `ocn_contracts_schema_cache_total` (counter) - Schema cache lookups by result
//! - `ocn_contracts_schema_reloads_total` (counter) - Explicit reloads by outcome
//!
//! Each [`ContractMetrics`] owns its own [`Registry`]; services that expose a
//! `/metrics` endpoint render it with [`ContractMetrics::encode`].

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::fmt;

use crate::result::ValidationResult;

const NAMESPACE: &str = "ocn_contracts";

/// Outcome label for a validation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Valid,
    Invalid,
    /// The call failed with a configuration error
    Error,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Valid => "valid",
            Outcome::Invalid => "invalid",
            Outcome::Error => "error",
        }
    }
}

/// Contract validation metrics
pub struct ContractMetrics {
    registry: Registry,

    /// Validation calls (by event_type, outcome)
    validations_total: IntCounterVec,

    /// Reported validation errors (by rule)
    validation_errors_total: IntCounterVec,

    /// Schema cache lookups (by result: hit, miss)
    schema_cache_total: IntCounterVec,

    /// Schema reloads (by outcome: ok, error)
    schema_reloads_total: IntCounterVec,
}

impl fmt::Debug for ContractMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractMetrics").finish_non_exhaustive()
    }
}

impl ContractMetrics {
    /// Create the metrics and register them with a fresh registry.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let validations_total = IntCounterVec::new(
            Opts::new("validations_total", "Total number of contract validations")
                .namespace(NAMESPACE),
            &["event_type", "outcome"],
        )?;

        let validation_errors_total = IntCounterVec::new(
            Opts::new(
                "validation_errors_total",
                "Total number of reported validation errors by violated rule",
            )
            .namespace(NAMESPACE),
            &["rule"],
        )?;

        let schema_cache_total = IntCounterVec::new(
            Opts::new("schema_cache_total", "Schema cache lookups by result").namespace(NAMESPACE),
            &["result"],
        )?;

        let schema_reloads_total = IntCounterVec::new(
            Opts::new("schema_reloads_total", "Explicit schema reloads by outcome")
                .namespace(NAMESPACE),
            &["outcome"],
        )?;

        registry.register(Box::new(validations_total.clone()))?;
        registry.register(Box::new(validation_errors_total.clone()))?;
        registry.register(Box::new(schema_cache_total.clone()))?;
        registry.register(Box::new(schema_reloads_total.clone()))?;

        Ok(Self {
            registry,
            validations_total,
            validation_errors_total,
            schema_cache_total,
            schema_reloads_total,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a completed validation and each error it reported.
    pub fn record_validation(&self, event_type: &str, result: &ValidationResult) {
        let outcome = if result.is_valid() {
            Outcome::Valid
        } else {
            Outcome::Invalid
        };
        self.record_outcome(event_type, outcome);

        for error in result.errors() {
            self.validation_errors_total
                .with_label_values(&[error.schema_rule.as_str()])
                .inc();
        }
    }

    pub fn record_outcome(&self, event_type: &str, outcome: Outcome) {
        self.validations_total
            .with_label_values(&[event_type, outcome.as_str()])
            .inc();
    }

    pub fn record_cache_hit(&self) {
        self.schema_cache_total.with_label_values(&["hit"]).inc();
    }

    pub fn record_cache_miss(&self) {
        self.schema_cache_total.with_label_values(&["miss"]).inc();
    }

    pub fn record_reload(&self, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.schema_reloads_total.with_label_values(&[outcome]).inc();
    }

    /// Validations recorded for `event_type` with `outcome`.
    pub fn validations(&self, event_type: &str, outcome: Outcome) -> u64 {
        self.validations_total
            .with_label_values(&[event_type, outcome.as_str()])
            .get()
    }

    /// Errors recorded for `rule`.
    pub fn errors_for_rule(&self, rule: &str) -> u64 {
        self.validation_errors_total.with_label_values(&[rule]).get()
    }

    /// Cache hits and misses recorded so far.
    pub fn cache_lookups(&self) -> (u64, u64) {
        (
            self.schema_cache_total.with_label_values(&["hit"]).get(),
            self.schema_cache_total.with_label_values(&["miss"]).get(),
        )
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn encode(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
