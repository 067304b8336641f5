//! CloudEvent envelopes
//!
//! Provides:
//! - [`CloudEvent`]: the CloudEvents 1.0 JSON envelope exchanged between agents
//! - [`EnvelopeValidator`]: attribute checks independent of the payload schema
//! - Trace correlation: every emitted event carries the active trace id in `subject`

use chrono::{SecondsFormat, Utc};
use ocn_trace::{ensure_trace_id, set_current_trace_id, TraceId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::result::{ValidationError, ValidationResult};
use crate::validator::format::{is_rfc3339, is_uri_reference};
use crate::validator::pointer::child_path;

/// The CloudEvents `specversion` this library emits.
pub const SPEC_VERSION: &str = "1.0";

/// A CloudEvents 1.0 envelope in JSON form.
///
/// Required attributes deserialize to an empty string when absent so that
/// the validator can report every missing attribute at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudEvent {
    #[serde(default)]
    pub specversion: String,

    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub source: String,

    #[serde(rename = "type", default)]
    pub event_type: String,

    #[serde(default)]
    pub time: String,

    /// Carries the trace id of the request that emitted the event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataschema: Option<String>,

    #[serde(default)]
    pub data: Value,

    /// Extension attributes
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl CloudEvent {
    /// Create an event with a fresh id and the current time.
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, data: Value) -> Self {
        Self {
            specversion: SPEC_VERSION.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            event_type: event_type.into(),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            subject: None,
            datacontenttype: Some("application/json".to_string()),
            dataschema: None,
            data,
            extensions: BTreeMap::new(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_extension(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(name.into(), value.into());
        self
    }

    /// The trace id carried in `subject`, if any.
    pub fn trace_id(&self) -> Option<TraceId> {
        self.subject.as_deref().and_then(|s| TraceId::parse(s).ok())
    }
}

/// Envelope-level attribute checks
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvelopeValidator;

impl EnvelopeValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check the envelope attributes. Every violated rule yields one error.
    pub fn validate_envelope(&self, envelope: &CloudEvent) -> ValidationResult {
        let mut errors = Vec::new();

        let required = [
            ("specversion", &envelope.specversion),
            ("id", &envelope.id),
            ("source", &envelope.source),
            ("type", &envelope.event_type),
            ("time", &envelope.time),
        ];
        for (attribute, value) in required {
            if value.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("/{}", attribute),
                    "required",
                    format!("'{}' must be present and non-empty", attribute),
                ));
            }
        }

        if !envelope.specversion.is_empty() && !is_supported_specversion(&envelope.specversion) {
            errors.push(ValidationError::new(
                "/specversion",
                "specversion",
                format!(
                    "unsupported specversion '{}', expected {}",
                    envelope.specversion, SPEC_VERSION
                ),
            ));
        }

        if !envelope.time.trim().is_empty() && !is_rfc3339(&envelope.time) {
            errors.push(ValidationError::new(
                "/time",
                "format",
                format!("'{}' is not a valid RFC 3339 timestamp", envelope.time),
            ));
        }

        if let Some(dataschema) = &envelope.dataschema {
            if !is_uri_reference(dataschema) {
                errors.push(ValidationError::new(
                    "/dataschema",
                    "format",
                    format!("'{}' is not a valid URI reference", dataschema),
                ));
            }
        }

        if let Some(subject) = &envelope.subject {
            if subject.trim().is_empty() {
                errors.push(ValidationError::new(
                    "/subject",
                    "minLength",
                    "'subject' must not be empty when present",
                ));
            }
        }

        if let Some(content_type) = &envelope.datacontenttype {
            if !is_json_media_type(content_type) {
                errors.push(ValidationError::new(
                    "/datacontenttype",
                    "datacontenttype",
                    format!("'{}' is not a JSON media type", content_type),
                ));
            }
        }

        for (name, value) in &envelope.extensions {
            if let Some(message) = extension_violation(name, value) {
                errors.push(ValidationError::new(child_path("", name), "extension", message));
            }
        }

        ValidationResult::from_errors(errors)
    }
}

/// `1.0` and its patch releases, e.g. `1.0.2`.
fn is_supported_specversion(version: &str) -> bool {
    match version.strip_prefix(SPEC_VERSION) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('.')
            .map_or(false, |patch| !patch.is_empty() && patch.chars().all(|c| c.is_ascii_digit())),
        None => false,
    }
}

/// `application/json`, any `+json` structured syntax suffix, parameters ignored.
fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.split_once('/') {
        Some((kind, subtype)) => {
            !kind.is_empty() && (subtype == "json" || subtype.ends_with("+json"))
        }
        None => false,
    }
}

fn extension_violation(name: &str, value: &Value) -> Option<String> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
        return Some(format!(
            "extension attribute name '{}' must consist of lowercase letters and digits",
            name
        ));
    }
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => None,
        _ => Some(format!(
            "extension attribute '{}' must be a string, number or boolean",
            name
        )),
    }
}

/// Copy `envelope` with `subject` set to `trace_id`. The input is untouched.
pub fn inject_trace_id(envelope: &CloudEvent, trace_id: &TraceId) -> CloudEvent {
    let mut injected = envelope.clone();
    injected.subject = Some(trace_id.to_string());
    injected
}

/// Copy `envelope` with `subject` set to the current request's trace id,
/// generating one if none is active.
pub fn inject_into_envelope(envelope: &CloudEvent) -> CloudEvent {
    inject_trace_id(envelope, &ensure_trace_id())
}

/// Adopt the trace id of an inbound event for the current request.
///
/// Activates from a non-empty `subject`, otherwise ensures an id. Returns
/// the id now active (or the envelope's id when called outside a request scope).
pub fn activate_from_envelope(envelope: &CloudEvent) -> TraceId {
    match envelope.trace_id() {
        Some(trace_id) => set_current_trace_id(trace_id.clone()).unwrap_or(trace_id),
        None => ensure_trace_id(),
    }
}
