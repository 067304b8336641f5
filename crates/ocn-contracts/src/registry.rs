//! Event type registry
//!
//! Maps logical event types such as `ocn.orca.decision.v1` to the schema
//! that describes their payload. Registrations are replaced whole under a
//! write lock: concurrent readers see either the old or the new entry.

use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{ContractError, Result};
use crate::key::{SchemaCategory, SchemaKey};

/// Schema binding for one event type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractRegistration {
    pub event_type: String,

    /// Explicit schema location; `None` uses the conventional path
    pub schema_path: Option<PathBuf>,

    pub category: SchemaCategory,
}

impl ContractRegistration {
    /// The key under which this registration's schema is stored.
    pub fn schema_key(&self) -> SchemaKey {
        match self.category {
            SchemaCategory::Events => SchemaKey::event(self.event_type.as_str()),
            SchemaCategory::Mandates => SchemaKey::mandate(self.event_type.as_str()),
        }
    }
}

/// Registry of known event types
#[derive(Debug, Default)]
pub struct ContractRegistry {
    entries: RwLock<HashMap<String, Arc<ContractRegistration>>>,
}

impl ContractRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event type, replacing any previous registration.
    ///
    /// Returns the replaced registration, if any.
    pub fn register(
        &self,
        event_type: impl Into<String>,
        schema_path: Option<PathBuf>,
        category: SchemaCategory,
    ) -> Option<Arc<ContractRegistration>> {
        let registration = Arc::new(ContractRegistration {
            event_type: event_type.into(),
            schema_path,
            category,
        });

        let previous = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(registration.event_type.clone(), Arc::clone(&registration));

        match &previous {
            Some(old) if **old != *registration => {
                tracing::warn!(
                    event_type = %registration.event_type,
                    "Event type already registered; replacing registration"
                );
            }
            Some(_) => {}
            None => {
                tracing::debug!(event_type = %registration.event_type, category = %category, "Event type registered");
            }
        }

        previous
    }

    /// Resolve an event type to its schema key.
    pub fn resolve(&self, event_type: &str) -> Result<SchemaKey> {
        self.registration(event_type)
            .map(|r| r.schema_key())
            .ok_or_else(|| ContractError::unknown_event_type(event_type))
    }

    pub fn registration(&self, event_type: &str) -> Option<Arc<ContractRegistration>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .cloned()
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(event_type)
    }

    /// All registered event types, sorted.
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
