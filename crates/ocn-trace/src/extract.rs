//! Axum extractor for the request's trace id.
//!
//! Reads the id activated by [`crate::trace_middleware`] from request
//! extensions, falling back to the `x-ocn-trace-id` header. A request that
//! carries neither still gets an id: tracing never rejects a request.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;

use crate::context::ensure_trace_id;
use crate::id::TraceId;
use crate::TRACE_HEADER;

/// Axum extractor yielding the current request's trace id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentTrace(pub TraceId);

/// Read a usable trace id from the `x-ocn-trace-id` header.
///
/// Absent, non-UTF-8 or blank values yield `None`.
pub fn trace_id_from_headers(headers: &HeaderMap) -> Option<TraceId> {
    headers
        .get(TRACE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| TraceId::parse(v).ok())
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentTrace {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<TraceId>() {
            return Ok(Self(id.clone()));
        }

        let trace_id = trace_id_from_headers(&parts.headers).unwrap_or_else(ensure_trace_id);
        Ok(Self(trace_id))
    }
}
