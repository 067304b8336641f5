//! Trace-aware log formatting.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

use crate::id::TraceId;
use crate::SERVICE_NAME;

/// Correlation context attached to structured log records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLogContext {
    pub trace_id: TraceId,
    pub service: String,
    pub version: String,
}

/// Build a log context for `trace_id`, generating a fresh id when `None`.
pub fn create_trace_context(trace_id: Option<TraceId>) -> TraceLogContext {
    TraceLogContext {
        trace_id: trace_id.unwrap_or_else(TraceId::generate),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Format a log line prefixed with the trace id.
///
/// Produces `[trace_id=<id>] <message>` followed by ` key=value` for each
/// field in call order. With no fields there is no trailing whitespace.
///
/// ```
/// use ocn_trace::format_trace_log;
///
/// let line = format_trace_log("trace-123", "Processing request", &[("user_id", &456), ("action", &"login")]);
/// assert_eq!(line, "[trace_id=trace-123] Processing request user_id=456 action=login");
/// ```
pub fn format_trace_log(
    trace_id: impl AsRef<str>,
    message: &str,
    fields: &[(&str, &dyn fmt::Display)],
) -> String {
    let mut line = format!("[trace_id={}] {}", trace_id.as_ref(), message);
    for (key, value) in fields {
        // Writing into a String cannot fail.
        let _ = write!(line, " {}={}", key, value);
    }
    line
}
