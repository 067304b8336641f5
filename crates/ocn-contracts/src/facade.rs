//! Contract validation facade
//!
//! [`ContractValidator`] ties the registry, schema store, envelope validator
//! and payload validator together. One instance owns all shared state; the
//! process-wide default is reached through [`crate::get_contract_validator`],
//! while tests and embedded uses construct their own.
//!
//! # Validation flow
//!
//! ```text
//! CloudEvent
//!   ├─ EnvelopeValidator: attribute errors (collected)
//!   ├─ ContractRegistry::resolve(type)
//!   │     └─ unknown type: one `/type` error, payload skipped
//!   ├─ SchemaStore::get_schema(key)   configuration errors abort the call
//!   └─ SchemaValidator on `data`      errors prefixed with `/data`
//! ```

use ocn_trace::{get_current_trace_id, TraceId};
use serde::Deserialize;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::builtin;
use crate::config::ContractsConfig;
use crate::envelope::{CloudEvent, EnvelopeValidator};
use crate::error::{ContractError, Result};
use crate::key::{SchemaCategory, SchemaKey};
use crate::metrics::{ContractMetrics, Outcome};
use crate::registry::{ContractRegistration, ContractRegistry};
use crate::result::{ValidationError, ValidationResult};
use crate::store::{SchemaDocument, SchemaSource, SchemaStore};
use crate::validator::{json_type_name, SchemaValidator};

/// Metric label for event types that are not registered.
const UNKNOWN_LABEL: &str = "unknown";

/// Contract validation context
#[derive(Debug)]
pub struct ContractValidator {
    config: ContractsConfig,
    registry: ContractRegistry,
    store: SchemaStore,
    envelope: EnvelopeValidator,
    payload: SchemaValidator,
    metrics: Option<Arc<ContractMetrics>>,
}

impl Default for ContractValidator {
    fn default() -> Self {
        Self::new(ContractsConfig::default())
    }
}

impl ContractValidator {
    pub fn new(config: ContractsConfig) -> Self {
        let metrics = if config.emit_metrics {
            match ContractMetrics::new() {
                Ok(metrics) => Some(Arc::new(metrics)),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to create contract metrics; continuing without");
                    None
                }
            }
        } else {
            None
        };

        let mut store = SchemaStore::new(config.schema_root.clone());
        if let Some(metrics) = &metrics {
            store = store.with_metrics(Arc::clone(metrics));
        }

        let registry = ContractRegistry::new();
        if config.install_builtin {
            builtin::install(&registry, &store);
        }

        tracing::info!(
            schema_root = ?config.schema_root,
            builtin = config.install_builtin,
            event_types = registry.len(),
            "Contract validator initialized"
        );

        Self {
            config,
            registry,
            store,
            envelope: EnvelopeValidator::new(),
            payload: SchemaValidator::new(),
            metrics,
        }
    }

    /// Create a validator configured from the environment
    pub fn from_env() -> Self {
        Self::new(ContractsConfig::from_env())
    }

    pub fn config(&self) -> &ContractsConfig {
        &self.config
    }

    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    pub fn store(&self) -> &SchemaStore {
        &self.store
    }

    pub fn metrics(&self) -> Option<&ContractMetrics> {
        self.metrics.as_deref()
    }

    /// Validate a CloudEvent envelope and its payload.
    ///
    /// Validation failures are returned as data. Only configuration problems
    /// (missing or malformed schema) are errors.
    pub fn validate_cloudevent(&self, envelope: &CloudEvent) -> Result<ValidationResult> {
        let active = get_current_trace_id();
        let span = tracing::debug_span!(
            "validate_cloudevent",
            event_type = %envelope.event_type,
            event_id = %envelope.id,
            trace_id = active.as_ref().map(TraceId::as_str).unwrap_or("-"),
        );
        let _entered = span.enter();

        let outcome = self.check_cloudevent(envelope);
        self.record(self.metric_label(&envelope.event_type), &outcome);
        outcome
    }

    /// Validate a CloudEvent given as a JSON value.
    ///
    /// A value that is not a well-formed envelope yields an invalid result
    /// with a `format` error.
    pub fn validate_cloudevent_value(&self, value: &Value) -> Result<ValidationResult> {
        if !value.is_object() {
            return Ok(self.malformed(format!(
                "expected a CloudEvent object, found {}",
                json_type_name(value)
            )));
        }

        match CloudEvent::deserialize(value) {
            Ok(envelope) => self.validate_cloudevent(&envelope),
            Err(e) => Ok(self.malformed(format!("invalid CloudEvent: {}", e))),
        }
    }

    /// Validate a CloudEvent given as JSON text.
    pub fn validate_cloudevent_str(&self, text: &str) -> Result<ValidationResult> {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.validate_cloudevent_value(&value),
            Err(e) => Ok(self.malformed(format!("invalid JSON payload: {}", e))),
        }
    }

    /// Validate an AP2 mandate document against its schema.
    pub fn validate_mandate(&self, name: &str, document: &Value) -> Result<ValidationResult> {
        self.validate_document(&SchemaKey::mandate(name), document)
    }

    /// Validate any document against the schema stored under `key`.
    pub fn validate_document(&self, key: &SchemaKey, document: &Value) -> Result<ValidationResult> {
        let outcome = self
            .store
            .get_schema(key)
            .map(|schema| self.payload.validate_payload(document, &schema));

        let label = match &outcome {
            Ok(_) => key.event_type(),
            Err(_) => UNKNOWN_LABEL,
        };
        self.record(label, &outcome);
        outcome
    }

    /// Register or replace an event type at runtime.
    ///
    /// With a `schema_path` the schema is read from that file (relative paths
    /// resolve against the schema root); without one the conventional
    /// location is used.
    ///
    /// The schema source is switched before the type becomes resolvable, so
    /// a concurrent validation sees either the old registration or the new
    /// one with its new schema.
    pub fn register_event_type(
        &self,
        event_type: &str,
        schema_path: Option<PathBuf>,
        category: SchemaCategory,
    ) {
        let key = ContractRegistration {
            event_type: event_type.to_string(),
            schema_path: None,
            category,
        }
        .schema_key();
        match &schema_path {
            Some(path) => self.store.bind(key, SchemaSource::File(path.clone())),
            None => {
                self.store.unbind(&key);
            }
        }
        self.registry.register(event_type, schema_path, category);
    }

    /// Register an event type whose schema is supplied as JSON text.
    pub fn register_event_schema(&self, event_type: &str, schema: impl Into<String>) {
        self.store.bind(
            SchemaKey::event(event_type),
            SchemaSource::Inline(Cow::Owned(schema.into())),
        );
        self.registry.register(event_type, None, SchemaCategory::Events);
    }

    /// The schema registered for `event_type`.
    pub fn schema_for(&self, event_type: &str) -> Result<Arc<SchemaDocument>> {
        let key = self.registry.resolve(event_type)?;
        self.store.get_schema(&key)
    }

    /// Re-read a schema from its source and replace the cached copy.
    pub fn reload_schema(&self, key: &SchemaKey) -> Result<Arc<SchemaDocument>> {
        self.store.reload(key)
    }

    /// Reload the schema registered for `event_type`.
    pub fn reload_event_type(&self, event_type: &str) -> Result<Arc<SchemaDocument>> {
        let key = self.registry.resolve(event_type)?;
        self.store.reload(&key)
    }

    /// Schema names per category, from disk and bundled sources.
    pub fn list_available_schemas(&self) -> BTreeMap<SchemaCategory, Vec<String>> {
        self.store.list_available()
    }

    /// Registered event types, sorted.
    pub fn event_types(&self) -> Vec<String> {
        self.registry.event_types()
    }

    fn check_cloudevent(&self, envelope: &CloudEvent) -> Result<ValidationResult> {
        let attributes = self.envelope.validate_envelope(envelope);

        // A missing type is already reported by the envelope check.
        if envelope.event_type.trim().is_empty() {
            return Ok(attributes);
        }

        let key = match self.registry.resolve(&envelope.event_type) {
            Ok(key) => key,
            Err(ContractError::UnknownEventType(event_type)) => {
                return Ok(attributes.merge(ValidationResult::failure(ValidationError::new(
                    "/type",
                    "registry",
                    format!("unknown CloudEvent type '{}'", event_type),
                ))));
            }
            Err(e) => return Err(e),
        };

        let schema = self.store.get_schema(&key)?;
        let payload = self
            .payload
            .validate_payload(&envelope.data, &schema)
            .prefixed("/data");

        Ok(attributes.merge(payload))
    }

    fn malformed(&self, message: String) -> ValidationResult {
        let result = ValidationResult::failure(ValidationError::new("", "format", message));
        if let Some(metrics) = &self.metrics {
            metrics.record_validation(UNKNOWN_LABEL, &result);
        }
        result
    }

    fn metric_label<'a>(&self, event_type: &'a str) -> &'a str {
        if self.registry.contains(event_type) {
            event_type
        } else {
            UNKNOWN_LABEL
        }
    }

    fn record(&self, label: &str, outcome: &Result<ValidationResult>) {
        match outcome {
            Ok(result) => {
                tracing::debug!(
                    valid = result.is_valid(),
                    errors = result.errors().len(),
                    "Contract validation completed"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_validation(label, result);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Contract validation aborted by configuration error");
                if let Some(metrics) = &self.metrics {
                    metrics.record_outcome(label, Outcome::Error);
                }
            }
        }
    }
}
