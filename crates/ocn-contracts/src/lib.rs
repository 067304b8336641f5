//! CloudEvents contract validation for OCN agent services.
//!
//! Every agent exchanges CloudEvents whose payload must conform to a
//! versioned schema registered for the event type. This crate provides:
//!
//! - [`ContractRegistry`]: event type to schema mapping, with the first-party types built in
//! - [`SchemaStore`]: cached schema loading from disk or bundled sources, with explicit reload
//! - [`EnvelopeValidator`]: CloudEvent attribute checks
//! - [`SchemaValidator`]: payload validation with JSON-pointer error paths
//! - [`ContractValidator`]: the facade combining all of the above
//!
//! Envelopes are correlated with the request that emitted them through the
//! trace id in `subject`; see [`inject_into_envelope`] and [`activate_from_envelope`].
//!
//! # Example
//!
//! ```
//! use ocn_contracts::{validate_cloudevent, CloudEvent};
//! use serde_json::json;
//!
//! let event = CloudEvent::new(
//!     "ocn.orca.decision.v1",
//!     "https://orca.ocn.ai/decide",
//!     json!({"result": "APPROVE", "amount": 10.0, "currency": "USD", "risk_score": 0.1}),
//! );
//! let result = validate_cloudevent(&event).unwrap();
//! assert!(result.is_valid());
//! ```

pub mod builtin;
pub mod config;
pub mod envelope;
pub mod error;
pub mod facade;
pub mod key;
pub mod metrics;
pub mod registry;
pub mod result;
pub mod store;
pub mod validator;

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;

pub use config::ContractsConfig;
pub use envelope::{
    activate_from_envelope, inject_into_envelope, inject_trace_id, CloudEvent, EnvelopeValidator,
};
pub use error::{ContractError, Result};
pub use facade::ContractValidator;
pub use key::{SchemaCategory, SchemaKey};
pub use metrics::ContractMetrics;
pub use registry::{ContractRegistration, ContractRegistry};
pub use result::{ValidationError, ValidationResult};
pub use store::{SchemaDocument, SchemaSource, SchemaStore};
pub use validator::{CompiledSchema, SchemaValidator};

pub use ocn_trace::{
    ensure_trace_id, format_trace_log, get_current_trace_id, set_current_trace_id, TraceId,
};

/// Media type of AP2 documents exchanged between agents.
pub const CONTENT_TYPE: &str = "application/vnd.ocn.ap2+json; version=1";

/// Current schema major version.
pub const SCHEMA_VERSION: &str = "v1";

static CONTRACT_VALIDATOR: OnceLock<ContractValidator> = OnceLock::new();

/// The process-wide validator, configured from the environment on first use.
pub fn get_contract_validator() -> &'static ContractValidator {
    CONTRACT_VALIDATOR.get_or_init(ContractValidator::from_env)
}

/// Validate a CloudEvent with the process-wide validator.
pub fn validate_cloudevent(envelope: &CloudEvent) -> Result<ValidationResult> {
    get_contract_validator().validate_cloudevent(envelope)
}

/// Validate an AP2 mandate document with the process-wide validator.
pub fn validate_json(document: &Value, mandate: &str) -> Result<ValidationResult> {
    get_contract_validator().validate_mandate(mandate, document)
}

/// Register an event type with the process-wide validator.
pub fn register_event_type(event_type: &str, schema_path: Option<PathBuf>, category: SchemaCategory) {
    get_contract_validator().register_event_type(event_type, schema_path, category)
}

/// Schema names per category known to the process-wide validator.
pub fn list_available_schemas() -> BTreeMap<SchemaCategory, Vec<String>> {
    get_contract_validator().list_available_schemas()
}
