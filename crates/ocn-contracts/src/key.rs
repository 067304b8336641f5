//! Schema identity.
//!
//! A [`SchemaKey`] names one schema document: the event type (or mandate
//! name) it describes, its major version and its category. Keys map onto the
//! on-disk layout:
//!
//! ```text
//! <root>/events/<version>/<agent>.<event>.v<major>.schema.json
//! <root>/mandates/<name>.schema.json
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::SCHEMA_VERSION;

/// Prefix shared by all first-party event types.
pub const EVENT_TYPE_PREFIX: &str = "ocn.";

/// Suffix of schema files on disk.
pub const SCHEMA_FILE_SUFFIX: &str = ".schema.json";

/// Schema category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaCategory {
    /// CloudEvent payload schemas
    Events,
    /// AP2 mandate document schemas
    Mandates,
}

impl SchemaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaCategory::Events => "events",
            SchemaCategory::Mandates => "mandates",
        }
    }
}

impl fmt::Display for SchemaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one schema document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaKey {
    event_type: String,
    version: String,
    category: SchemaCategory,
}

impl SchemaKey {
    pub fn new(
        event_type: impl Into<String>,
        version: impl Into<String>,
        category: SchemaCategory,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            version: version.into(),
            category,
        }
    }

    /// Key for an event type, taking the version from its `.v<major>` suffix.
    ///
    /// Types without a version suffix fall back to the current schema version.
    pub fn event(event_type: impl Into<String>) -> Self {
        let event_type = event_type.into();
        let version = version_suffix(&event_type).unwrap_or(SCHEMA_VERSION).to_string();
        Self::new(event_type, version, SchemaCategory::Events)
    }

    /// Key for a mandate schema.
    pub fn mandate(name: impl Into<String>) -> Self {
        Self::new(name, SCHEMA_VERSION, SchemaCategory::Mandates)
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn category(&self) -> SchemaCategory {
        self.category
    }

    /// File stem of the schema document, e.g. `orca.decision.v1`.
    pub fn schema_name(&self) -> &str {
        match self.category {
            SchemaCategory::Events => self
                .event_type
                .strip_prefix(EVENT_TYPE_PREFIX)
                .unwrap_or(&self.event_type),
            SchemaCategory::Mandates => &self.event_type,
        }
    }

    /// Conventional location relative to a schema root.
    pub fn relative_path(&self) -> PathBuf {
        let file = format!("{}{}", self.schema_name(), SCHEMA_FILE_SUFFIX);
        match self.category {
            SchemaCategory::Events => [self.category.as_str(), self.version.as_str(), file.as_str()]
                .iter()
                .collect(),
            SchemaCategory::Mandates => [self.category.as_str(), file.as_str()].iter().collect(),
        }
    }
}

impl fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.category, self.version, self.event_type)
    }
}

/// Trailing `v<digits>` segment of a dotted type name.
fn version_suffix(event_type: &str) -> Option<&str> {
    let (_, last) = event_type.rsplit_once('.')?;
    let digits = last.strip_prefix('v')?;
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(last)
    } else {
        None
    }
}
