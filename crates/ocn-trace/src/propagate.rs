//! Outbound trace propagation.

use axum::http::{HeaderMap, HeaderValue};

use crate::context::ensure_trace_id;
use crate::error::{Result, TraceError};
use crate::id::TraceId;
use crate::TRACE_HEADER;

/// Encode a trace id as an HTTP header value.
pub fn header_value(trace_id: &TraceId) -> Result<HeaderValue> {
    HeaderValue::from_str(trace_id.as_str())
        .map_err(|_| TraceError::InvalidHeaderValue(trace_id.to_string()))
}

/// Set `x-ocn-trace-id` on outbound headers from the current request.
///
/// Uses the active trace id, generating one if none is active, and returns
/// it. An id that cannot be encoded as a header value is skipped with a
/// warning; the request still proceeds.
pub fn propagate_headers(headers: &mut HeaderMap) -> TraceId {
    let trace_id = ensure_trace_id();
    match header_value(&trace_id) {
        Ok(value) => {
            headers.insert(TRACE_HEADER, value);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Skipping trace header propagation");
        }
    }
    trace_id
}

/// Attach the trace header to outbound HTTP requests.
pub trait TracePropagation: Sized {
    /// Attach the current request's trace id, generating one if none is active.
    fn with_trace_id(self) -> Self {
        let trace_id = ensure_trace_id();
        self.with_explicit_trace_id(&trace_id)
    }

    /// Attach a specific trace id.
    fn with_explicit_trace_id(self, trace_id: &TraceId) -> Self;
}

impl TracePropagation for reqwest::RequestBuilder {
    fn with_explicit_trace_id(self, trace_id: &TraceId) -> Self {
        self.header(TRACE_HEADER, trace_id.as_str())
    }
}

impl TracePropagation for HeaderMap {
    fn with_explicit_trace_id(mut self, trace_id: &TraceId) -> Self {
        if let Ok(value) = header_value(trace_id) {
            self.insert(TRACE_HEADER, value);
        }
        self
    }
}
