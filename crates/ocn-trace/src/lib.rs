//! Trace id propagation for OCN agent services.
//!
//! This crate provides the shared types used by every agent service to keep a
//! single correlation identifier flowing through a request chain: inbound
//! HTTP headers, handler logic, emitted CloudEvents and downstream calls.
//!
//! # Request lifecycle
//!
//! ```text
//! inbound request (x-ocn-trace-id?)
//!   └─ trace_middleware: extract or generate, activate TraceContext
//!       └─ handler: ensure_trace_id / get_current_trace_id / format_trace_log
//!           └─ outbound call: propagate_headers / RequestBuilder::with_trace_id
//!   └─ scope ends: TraceContext cleared, even on failure
//! ```
//!
//! # Usage
//!
//! 1. Wrap the service router with [`middleware::with_tracing`].
//! 2. Read the active id with [`get_current_trace_id`] or the [`CurrentTrace`] extractor.
//! 3. Propagate it downstream with [`propagate_headers`] or [`TracePropagation`].
//!
//! Non-HTTP callers (queue consumers, batch jobs) open a scope explicitly
//! with [`TraceContext::scope`] or [`TraceContext::sync_scope`].

pub mod config;
pub mod context;
pub mod error;
pub mod extract;
pub mod id;
pub mod log;
pub mod middleware;
pub mod propagate;
pub mod telemetry;

pub use config::TraceConfig;
pub use context::{
    clear_current_trace_id, current_state, ensure_trace_id, get_current_trace_id,
    set_current_trace_id, TraceContext, TraceState,
};
pub use error::{Result, TraceError};
pub use extract::{trace_id_from_headers, CurrentTrace};
pub use id::{ensure_trace_field, new_trace_id, TraceId};
pub use log::{create_trace_context, format_trace_log, TraceLogContext};
pub use middleware::{trace_middleware, with_tracing};
pub use propagate::{propagate_headers, TracePropagation};

/// HTTP header carrying the propagated trace id between services.
pub const TRACE_HEADER: &str = "x-ocn-trace-id";

/// Service name reported in trace log contexts.
pub const SERVICE_NAME: &str = "ocn-common";
