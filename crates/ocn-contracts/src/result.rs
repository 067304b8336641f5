//! Validation outcomes.

use serde::Serialize;
use std::fmt;

/// A single violated rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ValidationError {
    /// JSON pointer (RFC 6901) to the offending value; empty for the document root
    pub path: String,

    /// Human-readable description
    pub message: String,

    /// The rule that was violated, e.g. `required`, `type`, `registry`
    pub schema_rule: String,
}

impl ValidationError {
    pub fn new(
        path: impl Into<String>,
        schema_rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            schema_rule: schema_rule.into(),
        }
    }

    /// Prefix the path with `prefix`, itself a JSON pointer.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.path = format!("{}{}", prefix, self.path);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{}: {} [{}]", path, self.message, self.schema_rule)
    }
}

/// Outcome of validating an envelope or document.
///
/// `valid` is derived from `errors`: a result is valid exactly when it
/// carries no errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    valid: bool,
    errors: Vec<ValidationError>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

impl ValidationResult {
    /// A passing result
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// A failing result with a single error
    pub fn failure(error: ValidationError) -> Self {
        Self::from_errors(vec![error])
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
        self.valid = false;
    }

    /// Append all errors of `other`.
    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.errors.extend(other.errors);
        self.valid = self.errors.is_empty();
        self
    }

    /// Prefix every error path with `prefix`.
    pub fn prefixed(self, prefix: &str) -> Self {
        Self::from_errors(
            self.errors
                .into_iter()
                .map(|e| e.prefixed(prefix))
                .collect(),
        )
    }

    /// Whether any error was raised by `rule`.
    pub fn has_rule(&self, rule: &str) -> bool {
        self.errors.iter().any(|e| e.schema_rule == rule)
    }

    /// Whether any error points at `path`.
    pub fn has_path(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }
}
