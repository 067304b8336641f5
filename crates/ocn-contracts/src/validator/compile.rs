//! Schema compilation
//!
//! A schema document is checked against the Draft 2020-12 meta-schema and
//! compiled into a [`jsonschema::Validator`] once, at load time. A document
//! the meta-schema rejects, or one whose references cannot be resolved, is an
//! [`InvalidSchema`], so a schema that compiles can always be evaluated.
//!
//! `format` is asserted, not just annotated: `date-time`, `uri`, `uuid` and
//! friends fail validation when a string does not match.

use jsonschema::{Draft, Validator};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A schema that is not valid JSON Schema
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("at '{at}': {message}")]
pub struct InvalidSchema {
    /// JSON pointer into the schema document
    pub at: String,
    pub message: String,
}

/// A schema compiled for repeated validation
pub struct CompiledSchema {
    validator: Validator,
}

impl CompiledSchema {
    pub fn compile(schema: &Value) -> Result<Self, InvalidSchema> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .should_validate_formats(true)
            .build(schema)
            .map_err(|e| InvalidSchema {
                at: e.instance_path.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self { validator })
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn is_valid(&self, document: &Value) -> bool {
        self.validator.is_valid(document)
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compiles_supported_schema() {
        let schema = json!({
            "$defs": {"currency": {"type": "string", "pattern": "^[A-Z]{3}$"}},
            "type": "object",
            "required": ["currency"],
            "properties": {"currency": {"$ref": "#/$defs/currency"}}
        });
        let compiled = CompiledSchema::compile(&schema).unwrap();
        assert!(compiled.is_valid(&json!({"currency": "USD"})));
        assert!(!compiled.is_valid(&json!({"currency": "usd"})));
    }

    #[test]
    fn test_rejects_unknown_type_name() {
        assert!(CompiledSchema::compile(&json!({"type": "objekt"})).is_err());
    }

    #[test]
    fn test_rejects_malformed_keyword_operands() {
        for schema in [
            json!({"type": "object", "minProperties": "lots"}),
            json!({"required": "amount"}),
            json!({"maxItems": -1}),
            json!({"properties": {"amount": 5}}),
            json!({"patternProperties": {"^x_": "string"}}),
            json!({"dependentRequired": {"card": "cvv"}}),
        ] {
            assert!(CompiledSchema::compile(&schema).is_err(), "{} compiled", schema);
        }
    }

    #[test]
    fn test_accepts_lookaround_patterns() {
        let compiled =
            CompiledSchema::compile(&json!({"type": "string", "pattern": "^(?!test)[a-z]+$"})).unwrap();
        assert!(compiled.is_valid(&json!("prod")));
        assert!(!compiled.is_valid(&json!("testing")));
    }

    #[test]
    fn test_boolean_schemas() {
        assert!(CompiledSchema::compile(&json!(true)).unwrap().is_valid(&json!(1)));
        assert!(!CompiledSchema::compile(&json!(false)).unwrap().is_valid(&json!(1)));
    }
}
