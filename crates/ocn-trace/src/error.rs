//! Error types for trace handling.
//!
//! Tracing is best-effort: none of these errors is ever raised on the
//! request path. They surface only from explicit parsing and setup calls.

use thiserror::Error;

/// Errors produced by trace id parsing and tracing setup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    /// A trace id must contain at least one non-whitespace character
    #[error("Trace id must not be empty")]
    EmptyTraceId,

    /// The trace id cannot be carried in an HTTP header
    #[error("Trace id is not a valid header value: {0}")]
    InvalidHeaderValue(String),

    /// A global tracing subscriber could not be installed
    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Result type alias for trace operations
pub type Result<T> = std::result::Result<T, TraceError>;
