//! Inbound trace middleware
//!
//! For every request the middleware:
//! - Extracts the trace id from `x-ocn-trace-id`, or generates one if absent
//! - Activates a fresh [`TraceContext`] for the request and runs the handler in it
//! - Wraps the handler in a `tracing` span carrying the trace id
//! - Echoes the trace id on the response header
//!
//! The context is dropped when the handler future finishes, so a trace id
//! never leaks into a later request served by the same worker.

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::{from_fn_with_state, Next},
    response::Response,
    Router,
};
use tracing::Instrument;

use crate::config::TraceConfig;
use crate::context::TraceContext;
use crate::extract::trace_id_from_headers;
use crate::id::TraceId;
use crate::TRACE_HEADER;

/// Trace middleware for use with [`axum::middleware::from_fn_with_state`].
pub async fn trace_middleware(
    State(config): State<TraceConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    let trace_id = match trace_id_from_headers(request.headers()) {
        Some(id) => id,
        None => {
            let id = TraceId::generate();
            tracing::debug!(trace_id = %id, "No inbound trace id; generated a new one");
            id
        }
    };

    request.extensions_mut().insert(trace_id.clone());

    let span = tracing::info_span!(
        "ocn_request",
        trace_id = %trace_id,
        method = %request.method(),
        path = %request.uri().path(),
        service = %config.service,
        version = %config.version,
    );

    let mut response = TraceContext::with_trace_id(trace_id.clone())
        .scope(next.run(request))
        .instrument(span)
        .await;

    if config.echo_response_header {
        match HeaderValue::from_str(trace_id.as_str()) {
            Ok(value) => {
                response.headers_mut().insert(TRACE_HEADER, value);
            }
            Err(_) => {
                tracing::warn!(trace_id = %trace_id, "Trace id is not a valid header value; not echoed");
            }
        }
    }

    response
}

/// Install the trace middleware on `router`.
pub fn with_tracing<S>(router: Router<S>, config: TraceConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(from_fn_with_state(config, trace_middleware))
}
