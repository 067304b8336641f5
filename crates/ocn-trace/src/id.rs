//! The trace id type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Result, TraceError};

/// Key under which a trace id is stored in loosely-typed context maps.
pub const TRACE_ID_FIELD: &str = "trace_id";

/// Opaque correlation identifier for one logical request chain.
///
/// Generated ids are UUIDv4 strings. Caller-supplied ids are kept verbatim
/// as long as they contain a non-whitespace character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TraceId(String);

impl TraceId {
    /// Generate a fresh UUIDv4 trace id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse a caller-supplied trace id.
    pub fn parse(value: impl AsRef<str>) -> Result<Self> {
        let value = value.as_ref();
        if value.trim().is_empty() {
            return Err(TraceError::EmptyTraceId);
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether this id is a canonical UUIDv4, the format this library generates.
    pub fn is_uuid_v4(&self) -> bool {
        Uuid::parse_str(&self.0)
            .map(|uuid| uuid.get_version_num() == 4)
            .unwrap_or(false)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TraceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TraceId {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TraceId {
    type Error = TraceError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<TraceId> for String {
    fn from(id: TraceId) -> Self {
        id.0
    }
}

/// Generate a new UUIDv4 trace id.
pub fn new_trace_id() -> TraceId {
    TraceId::generate()
}

/// Ensure a JSON context map carries a UUIDv4 `trace_id`.
///
/// Missing, empty, non-string or non-UUIDv4 values are replaced with a
/// freshly generated id. Returns the id stored in the map.
pub fn ensure_trace_field(ctx: &mut serde_json::Map<String, serde_json::Value>) -> TraceId {
    let existing = ctx
        .get(TRACE_ID_FIELD)
        .and_then(|v| v.as_str())
        .and_then(|s| TraceId::parse(s).ok())
        .filter(TraceId::is_uuid_v4);

    match existing {
        Some(id) => id,
        None => {
            let id = TraceId::generate();
            ctx.insert(
                TRACE_ID_FIELD.to_string(),
                serde_json::Value::String(id.to_string()),
            );
            id
        }
    }
}
