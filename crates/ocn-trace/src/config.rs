//! Trace middleware configuration.

use crate::SERVICE_NAME;

/// Configuration for the inbound trace middleware
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Service name recorded on request spans
    pub service: String,

    /// Service version recorded on request spans
    pub version: String,

    /// Echo the trace id on the response header for client correlation
    pub echo_response_header: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            echo_response_header: true,
        }
    }
}

impl TraceConfig {
    /// Create config from environment variables
    ///
    /// - `OCN_SERVICE_NAME`: service name (default `ocn-common`)
    /// - `OCN_SERVICE_VERSION`: service version (default: crate version)
    /// - `OCN_TRACE_ECHO_HEADER`: echo the trace header on responses (default `true`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service: std::env::var("OCN_SERVICE_NAME").unwrap_or(defaults.service),
            version: std::env::var("OCN_SERVICE_VERSION").unwrap_or(defaults.version),
            echo_response_header: std::env::var("OCN_TRACE_ECHO_HEADER")
                .map(|v| v.parse().unwrap_or(true))
                .unwrap_or(true),
        }
    }

    /// Set the service name
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Enable or disable echoing the trace header on responses
    pub fn echo_response_header(mut self, enabled: bool) -> Self {
        self.echo_response_header = enabled;
        self
    }
}
