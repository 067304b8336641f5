//! Payload validation against compiled schemas
//!
//! Evaluation never stops at the first violation: every error the schema
//! produces is reported with a JSON pointer to the offending value and the
//! name of the keyword that failed.
//!
//! Two kinds are reported per property rather than per object: a missing
//! `required` property points at the property it names, and each property
//! rejected by `additionalProperties` or `unevaluatedProperties` gets its own
//! error.

pub mod compile;
pub mod format;
pub mod pointer;

use jsonschema::error::ValidationErrorKind;
use serde_json::Value;

pub use compile::{CompiledSchema, InvalidSchema};

use crate::result::{ValidationError, ValidationResult};
use crate::store::SchemaDocument;
use self::pointer::child_path;

/// Structural validator for payload documents
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate `document` against a loaded schema document.
    pub fn validate_payload(&self, document: &Value, schema: &SchemaDocument) -> ValidationResult {
        self.validate_compiled(document, schema.compiled())
    }

    /// Validate `document` against a compiled schema.
    pub fn validate_compiled(&self, document: &Value, schema: &CompiledSchema) -> ValidationResult {
        let mut errors = Vec::new();
        for error in schema.validator().iter_errors(document) {
            collect(&error, &mut errors);
        }
        ValidationResult::from_errors(errors)
    }
}

fn collect(error: &jsonschema::ValidationError<'_>, into: &mut Vec<ValidationError>) {
    let path = error.instance_path.to_string();

    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| property.to_string());
            into.push(ValidationError::new(
                child_path(&path, &name),
                "required",
                format!("missing required property '{}'", name),
            ));
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            for name in unexpected {
                into.push(ValidationError::new(
                    child_path(&path, name),
                    "additionalProperties",
                    format!("additional property '{}' is not allowed", name),
                ));
            }
        }
        ValidationErrorKind::UnevaluatedProperties { unexpected } => {
            for name in unexpected {
                into.push(ValidationError::new(
                    child_path(&path, name),
                    "unevaluatedProperties",
                    format!("unevaluated property '{}' is not allowed", name),
                ));
            }
        }
        ValidationErrorKind::FalseSchema => {
            into.push(ValidationError::new(path, "false", "no value is allowed here"));
        }
        _ => {
            let rule = keyword_of(&error.schema_path.to_string());
            into.push(ValidationError::new(path, rule, error.to_string()));
        }
    }
}

/// The keyword that failed: the last token of the schema path, unescaped.
fn keyword_of(schema_path: &str) -> String {
    match schema_path.rsplit('/').next() {
        Some(token) if !token.is_empty() && !token.bytes().all(|b| b.is_ascii_digit()) => {
            token.replace("~1", "/").replace("~0", "~")
        }
        _ => "schema".to_string(),
    }
}

/// JSON type name of `value`, as used in messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::Bool(_) => "boolean",
        Value::Null => "null",
    }
}
