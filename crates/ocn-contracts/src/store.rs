//! Schema storage and caching
//!
//! The [`SchemaStore`] resolves a [`SchemaKey`] to a schema document, parses
//! and compiles it once, and caches the result for the life of the process.
//!
//! # Resolution order
//!
//! 1. A source bound explicitly with [`SchemaStore::bind`]
//! 2. The conventional file under the schema root, if it exists
//! 3. A fallback source bound with [`SchemaStore::bind_fallback`] (bundled schemas)
//!
//! # Caching
//!
//! Documents are immutable and shared as `Arc<SchemaDocument>`. Loads parse
//! outside the cache lock; the write lock is held only to insert or swap an
//! entry, so readers always see either the old or the new document. A failed
//! load never touches the cache.
//!
//! Every key carries a generation, bumped whenever its source changes or its
//! entry is replaced. A lookup only caches what it loaded if the generation
//! it started from is still current, so a load racing with [`SchemaStore::bind`]
//! cannot re-cache a document from the superseded source.

use serde_json::Value;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{ContractError, Result};
use crate::key::{SchemaCategory, SchemaKey, SCHEMA_FILE_SUFFIX};
use crate::metrics::ContractMetrics;
use crate::validator::CompiledSchema;

/// Where a schema document is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// A JSON file on disk
    File(PathBuf),
    /// JSON text held in memory, e.g. a schema bundled into the binary
    Inline(Cow<'static, str>),
}

impl SchemaSource {
    fn describe(&self) -> String {
        match self {
            SchemaSource::File(path) => path.display().to_string(),
            SchemaSource::Inline(_) => "<inline>".to_string(),
        }
    }
}

/// A parsed and compiled schema
#[derive(Debug)]
pub struct SchemaDocument {
    key: SchemaKey,
    source: SchemaSource,
    raw: Value,
    compiled: CompiledSchema,
}

impl SchemaDocument {
    /// Parse and compile schema text.
    pub fn parse(key: SchemaKey, source: SchemaSource, text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|e| ContractError::schema_parse(&key, format!("invalid JSON: {}", e)))?;
        let compiled =
            CompiledSchema::compile(&raw).map_err(|e| ContractError::schema_parse(&key, e.to_string()))?;

        Ok(Self {
            key,
            source,
            raw,
            compiled,
        })
    }

    pub fn key(&self) -> &SchemaKey {
        &self.key
    }

    pub fn source(&self) -> &SchemaSource {
        &self.source
    }

    /// The schema as written.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn compiled(&self) -> &CompiledSchema {
        &self.compiled
    }

    /// The top-level `type` keyword, when it is a single type name.
    pub fn top_level_type(&self) -> Option<&str> {
        self.raw.get("type").and_then(Value::as_str)
    }
}

/// Loads and caches schema documents by key
#[derive(Debug, Default)]
pub struct SchemaStore {
    root: Option<PathBuf>,
    bound: RwLock<HashMap<SchemaKey, SchemaSource>>,
    fallback: RwLock<HashMap<SchemaKey, SchemaSource>>,
    cache: RwLock<Cache>,
    metrics: Option<Arc<ContractMetrics>>,
}

#[derive(Debug, Default)]
struct Cache {
    documents: HashMap<SchemaKey, Arc<SchemaDocument>>,
    generations: HashMap<SchemaKey, u64>,
}

impl Cache {
    fn generation(&self, key: &SchemaKey) -> u64 {
        self.generations.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: &SchemaKey) {
        *self.generations.entry(key.clone()).or_insert(0) += 1;
    }

    /// Drop the entry for `key` and start a new generation.
    fn evict(&mut self, key: &SchemaKey) -> bool {
        self.bump(key);
        self.documents.remove(key).is_some()
    }

    /// Swap in `document` and start a new generation.
    fn replace(&mut self, key: &SchemaKey, document: Arc<SchemaDocument>) {
        self.bump(key);
        self.documents.insert(key.clone(), document);
    }
}

impl SchemaStore {
    /// Create a store reading conventional paths under `root`, if any.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    /// Record cache and reload activity in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<ContractMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Bind `key` to an explicit source, replacing any previous binding.
    ///
    /// Relative file paths resolve against the schema root. A cached document
    /// loaded from a different source is evicted.
    pub fn bind(&self, key: SchemaKey, source: SchemaSource) {
        let source = self.resolve_relative(source);
        let previous = write(&self.bound).insert(key.clone(), source.clone());
        if previous.as_ref() != Some(&source) && write(&self.cache).evict(&key) {
            tracing::debug!(schema = %key, source = %source.describe(), "Schema rebound; evicted cached document");
        }
    }

    /// Remove an explicit binding, evicting the cached document if one was bound.
    pub fn unbind(&self, key: &SchemaKey) -> bool {
        let removed = write(&self.bound).remove(key).is_some();
        if removed {
            write(&self.cache).evict(key);
        }
        removed
    }

    /// Bind a source used only when neither an explicit binding nor a file
    /// under the schema root exists.
    pub fn bind_fallback(&self, key: SchemaKey, source: SchemaSource) {
        write(&self.fallback).insert(key, source);
    }

    /// Return the schema for `key`, loading it on first use.
    pub fn get_schema(&self, key: &SchemaKey) -> Result<Arc<SchemaDocument>> {
        let generation = {
            let cache = read(&self.cache);
            if let Some(document) = cache.documents.get(key) {
                self.record(ContractMetrics::record_cache_hit);
                return Ok(Arc::clone(document));
            }
            cache.generation(key)
        };
        self.record(ContractMetrics::record_cache_miss);

        let loaded = Arc::new(self.load(key)?);
        Ok(self.cache_loaded(key, generation, loaded))
    }

    /// Re-read the schema for `key` and atomically replace the cached entry.
    ///
    /// On failure the previous entry, if any, stays in place.
    pub fn reload(&self, key: &SchemaKey) -> Result<Arc<SchemaDocument>> {
        match self.load(key) {
            Ok(document) => {
                let document = Arc::new(document);
                write(&self.cache).replace(key, Arc::clone(&document));
                self.record(|m| m.record_reload(true));
                tracing::info!(schema = %key, "Schema reloaded");
                Ok(document)
            }
            Err(e) => {
                self.record(|m| m.record_reload(false));
                tracing::warn!(schema = %key, error = %e, "Schema reload failed; keeping cached entry");
                Err(e)
            }
        }
    }

    /// Drop the cached entry for `key` without reloading it.
    pub fn invalidate(&self, key: &SchemaKey) -> bool {
        write(&self.cache).evict(key)
    }

    pub fn is_cached(&self, key: &SchemaKey) -> bool {
        read(&self.cache).documents.contains_key(key)
    }

    pub fn cached_len(&self) -> usize {
        read(&self.cache).documents.len()
    }

    /// Current generation of `key`; changes whenever its source or entry is replaced.
    pub fn generation(&self, key: &SchemaKey) -> u64 {
        read(&self.cache).generation(key)
    }

    /// Schema names per category, found under the schema root or bound in memory.
    pub fn list_available(&self) -> BTreeMap<SchemaCategory, Vec<String>> {
        let mut found: BTreeMap<SchemaCategory, BTreeSet<String>> = BTreeMap::new();
        found.insert(SchemaCategory::Events, BTreeSet::new());
        found.insert(SchemaCategory::Mandates, BTreeSet::new());

        if let Some(root) = &self.root {
            let events = root.join(SchemaCategory::Events.as_str());
            for version_dir in subdirectories(&events) {
                found
                    .entry(SchemaCategory::Events)
                    .or_default()
                    .extend(schema_names(&version_dir));
            }
            found
                .entry(SchemaCategory::Mandates)
                .or_default()
                .extend(schema_names(&root.join(SchemaCategory::Mandates.as_str())));
        }

        for sources in [&self.bound, &self.fallback] {
            for key in read(sources).keys() {
                found
                    .entry(key.category())
                    .or_default()
                    .insert(key.schema_name().to_string());
            }
        }

        found
            .into_iter()
            .map(|(category, names)| (category, names.into_iter().collect()))
            .collect()
    }

    /// Cache a document loaded at `generation`, unless the key moved on meanwhile.
    fn cache_loaded(
        &self,
        key: &SchemaKey,
        generation: u64,
        loaded: Arc<SchemaDocument>,
    ) -> Arc<SchemaDocument> {
        let mut cache = write(&self.cache);
        if cache.generation(key) != generation {
            // Rebound or reloaded while loading; leave the cache to the newer source.
            tracing::debug!(schema = %key, "Schema source changed during load; not caching");
            return match cache.documents.get(key) {
                Some(current) => Arc::clone(current),
                None => loaded,
            };
        }

        // A concurrent load of the same generation may have won; keep its entry.
        let document = cache.documents.entry(key.clone()).or_insert(loaded);
        tracing::debug!(schema = %key, source = %document.source().describe(), "Schema loaded");
        Arc::clone(document)
    }

    fn load(&self, key: &SchemaKey) -> Result<SchemaDocument> {
        let source = self.source_for(key)?;
        let text = match &source {
            SchemaSource::File(path) => std::fs::read_to_string(path).map_err(|e| match e.kind() {
                ErrorKind::NotFound => ContractError::schema_not_found(key),
                _ => ContractError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                },
            })?,
            SchemaSource::Inline(text) => text.to_string(),
        };
        SchemaDocument::parse(key.clone(), source, &text)
    }

    fn source_for(&self, key: &SchemaKey) -> Result<SchemaSource> {
        if let Some(source) = read(&self.bound).get(key) {
            return Ok(source.clone());
        }

        if let Some(root) = &self.root {
            let path = root.join(key.relative_path());
            if path.is_file() {
                return Ok(SchemaSource::File(path));
            }
        }

        read(&self.fallback)
            .get(key)
            .cloned()
            .ok_or_else(|| ContractError::schema_not_found(key))
    }

    fn resolve_relative(&self, source: SchemaSource) -> SchemaSource {
        match (source, &self.root) {
            (SchemaSource::File(path), Some(root)) if path.is_relative() => {
                SchemaSource::File(root.join(path))
            }
            (source, _) => source,
        }
    }

    fn record(&self, f: impl FnOnce(&ContractMetrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }
}

// Entries are only ever swapped whole, so a poisoned lock still guards consistent data.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| path.is_dir())
                .collect()
        })
        .unwrap_or_default()
}

fn schema_names(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| {
                    entry
                        .file_name()
                        .to_str()
                        .and_then(|name| name.strip_suffix(SCHEMA_FILE_SUFFIX))
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const OBJECT_SCHEMA: &str = r#"{"type": "object", "required": ["amount"]}"#;

    fn write_schema(root: &Path, key: &SchemaKey, text: &str) -> PathBuf {
        let path = root.join(key.relative_path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_loads_from_schema_root() {
        let dir = TempDir::new().unwrap();
        let key = SchemaKey::event("ocn.orca.decision.v1");
        write_schema(dir.path(), &key, OBJECT_SCHEMA);

        let store = SchemaStore::new(Some(dir.path().to_path_buf()));
        let document = store.get_schema(&key).unwrap();
        assert_eq!(document.top_level_type(), Some("object"));
        assert!(matches!(document.source(), SchemaSource::File(_)));
    }

    #[test]
    fn test_cached_lookup_returns_same_document() {
        let dir = TempDir::new().unwrap();
        let key = SchemaKey::mandate("intent_mandate");
        let path = write_schema(dir.path(), &key, OBJECT_SCHEMA);

        let store = SchemaStore::new(Some(dir.path().to_path_buf()));
        let first = store.get_schema(&key).unwrap();

        // Storage is not re-read once cached.
        fs::remove_file(path).unwrap();
        let second = store.get_schema(&key).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.cached_len(), 1);
    }

    #[test]
    fn test_missing_schema() {
        let store = SchemaStore::new(None);
        let err = store.get_schema(&SchemaKey::event("ocn.none.v1")).unwrap_err();
        assert!(matches!(err, ContractError::SchemaNotFound { .. }));

        let dir = TempDir::new().unwrap();
        let store = SchemaStore::new(Some(dir.path().to_path_buf()));
        let key = SchemaKey::event("ocn.none.v1");
        store.bind(key.clone(), SchemaSource::File(PathBuf::from("gone.schema.json")));
        assert!(matches!(store.get_schema(&key), Err(ContractError::SchemaNotFound { .. })));
        assert!(!store.is_cached(&key));
    }

    #[test]
    fn test_parse_errors_are_not_cached() {
        let store = SchemaStore::new(None);
        let key = SchemaKey::event("ocn.bad.v1");

        store.bind(key.clone(), SchemaSource::Inline("{not json".into()));
        assert!(matches!(store.get_schema(&key), Err(ContractError::SchemaParseError { .. })));

        store.bind(key.clone(), SchemaSource::Inline(r#"{"type": "objekt"}"#.into()));
        assert!(matches!(store.get_schema(&key), Err(ContractError::SchemaParseError { .. })));
        assert_eq!(store.cached_len(), 0);
    }

    #[test]
    fn test_reload_swaps_entry() {
        let dir = TempDir::new().unwrap();
        let key = SchemaKey::event("ocn.weave.audit.v1");
        write_schema(dir.path(), &key, OBJECT_SCHEMA);

        let store = SchemaStore::new(Some(dir.path().to_path_buf()));
        let before = store.get_schema(&key).unwrap();

        write_schema(dir.path(), &key, r#"{"type": "object"}"#);
        let reloaded = store.reload(&key).unwrap();
        assert!(!Arc::ptr_eq(&before, &reloaded));
        assert!(Arc::ptr_eq(&reloaded, &store.get_schema(&key).unwrap()));

        // A failed reload keeps the previous entry.
        write_schema(dir.path(), &key, "{broken");
        assert!(store.reload(&key).is_err());
        assert!(Arc::ptr_eq(&reloaded, &store.get_schema(&key).unwrap()));
    }

    #[test]
    fn test_resolution_order() {
        let dir = TempDir::new().unwrap();
        let key = SchemaKey::event("ocn.orca.explanation.v1");
        let store = SchemaStore::new(Some(dir.path().to_path_buf()));

        store.bind_fallback(key.clone(), SchemaSource::Inline(r#"{"title": "fallback"}"#.into()));
        assert!(matches!(store.get_schema(&key).unwrap().source(), SchemaSource::Inline(_)));

        write_schema(dir.path(), &key, r#"{"title": "disk"}"#);
        let from_disk = store.reload(&key).unwrap();
        assert_eq!(from_disk.raw()["title"], "disk");

        store.bind(key.clone(), SchemaSource::Inline(r#"{"title": "bound"}"#.into()));
        assert!(!store.is_cached(&key));
        assert_eq!(store.get_schema(&key).unwrap().raw()["title"], "bound");
    }

    #[test]
    fn test_unbind_restores_conventional_source() {
        let dir = TempDir::new().unwrap();
        let key = SchemaKey::event("ocn.orca.decision.v1");
        write_schema(dir.path(), &key, r#"{"title": "disk"}"#);

        let store = SchemaStore::new(Some(dir.path().to_path_buf()));
        store.bind(key.clone(), SchemaSource::Inline(r#"{"title": "bound"}"#.into()));
        assert_eq!(store.get_schema(&key).unwrap().raw()["title"], "bound");

        assert!(store.unbind(&key));
        assert!(!store.unbind(&key));
        assert_eq!(store.get_schema(&key).unwrap().raw()["title"], "disk");
    }

    #[test]
    fn test_relative_binding_resolves_against_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("custom.json"), OBJECT_SCHEMA).unwrap();

        let store = SchemaStore::new(Some(dir.path().to_path_buf()));
        let key = SchemaKey::event("ocn.partner.custom.v1");
        store.bind(key.clone(), SchemaSource::File(PathBuf::from("custom.json")));

        let document = store.get_schema(&key).unwrap();
        assert_eq!(document.source(), &SchemaSource::File(dir.path().join("custom.json")));
    }

    #[test]
    fn test_list_available() {
        let dir = TempDir::new().unwrap();
        write_schema(dir.path(), &SchemaKey::event("ocn.orca.decision.v1"), OBJECT_SCHEMA);
        write_schema(dir.path(), &SchemaKey::event("ocn.orca.decision.v2"), OBJECT_SCHEMA);
        write_schema(dir.path(), &SchemaKey::mandate("cart_mandate"), OBJECT_SCHEMA);
        fs::write(dir.path().join("mandates").join("README.md"), "ignored").unwrap();

        let store = SchemaStore::new(Some(dir.path().to_path_buf()));
        store.bind_fallback(
            SchemaKey::mandate("intent_mandate"),
            SchemaSource::Inline(OBJECT_SCHEMA.into()),
        );

        let available = store.list_available();
        assert_eq!(
            available[&SchemaCategory::Events],
            vec!["orca.decision.v1", "orca.decision.v2"]
        );
        assert_eq!(
            available[&SchemaCategory::Mandates],
            vec!["cart_mandate", "intent_mandate"]
        );
    }

    #[test]
    fn test_source_changes_start_new_generation() {
        let store = SchemaStore::new(None);
        let key = SchemaKey::event("ocn.orca.decision.v1");
        let start = store.generation(&key);

        store.bind(key.clone(), SchemaSource::Inline(OBJECT_SCHEMA.into()));
        let bound = store.generation(&key);
        assert!(bound > start);

        // Rebinding the same source keeps the cached entry and generation.
        store.get_schema(&key).unwrap();
        store.bind(key.clone(), SchemaSource::Inline(OBJECT_SCHEMA.into()));
        assert_eq!(store.generation(&key), bound);
        assert!(store.is_cached(&key));

        store.reload(&key).unwrap();
        let reloaded = store.generation(&key);
        assert!(reloaded > bound);

        assert!(store.invalidate(&key));
        assert!(store.generation(&key) > reloaded);
        assert!(store.unbind(&key));
    }

    #[test]
    fn test_load_racing_with_rebind_is_not_cached() {
        let store = SchemaStore::new(None);
        let key = SchemaKey::event("ocn.partner.rebound.v1");
        store.bind(key.clone(), SchemaSource::Inline(r#"{"title": "old"}"#.into()));

        // A lookup misses and loads the old source...
        let generation = store.generation(&key);
        let stale = Arc::new(store.load(&key).unwrap());

        // ...while the key is rebound before the lookup stores its result.
        store.bind(key.clone(), SchemaSource::Inline(r#"{"title": "new"}"#.into()));
        let returned = store.cache_loaded(&key, generation, stale);
        assert_eq!(returned.raw()["title"], "old");
        assert!(!store.is_cached(&key));

        assert_eq!(store.get_schema(&key).unwrap().raw()["title"], "new");
        assert_eq!(store.get_schema(&key).unwrap().raw()["title"], "new");
    }

    #[test]
    fn test_load_racing_with_reload_keeps_reloaded_entry() {
        let store = SchemaStore::new(None);
        let key = SchemaKey::event("ocn.partner.reloaded.v1");
        store.bind(key.clone(), SchemaSource::Inline(OBJECT_SCHEMA.into()));

        let generation = store.generation(&key);
        let late = Arc::new(store.load(&key).unwrap());
        let reloaded = store.reload(&key).unwrap();

        let returned = store.cache_loaded(&key, generation, late);
        assert!(Arc::ptr_eq(&returned, &reloaded));
        assert!(Arc::ptr_eq(&store.get_schema(&key).unwrap(), &reloaded));
    }

    #[test]
    fn test_readers_see_whole_documents_during_reloads() {
        let dir = TempDir::new().unwrap();
        let key = SchemaKey::event("ocn.orca.decision.v1");
        write_schema(dir.path(), &key, r#"{"type": "object", "title": "first"}"#);

        let store = SchemaStore::new(Some(dir.path().to_path_buf()));
        store.get_schema(&key).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        let document = store.get_schema(&key).unwrap();
                        let title = document.raw()["title"].as_str().unwrap();
                        assert!(title == "first" || title == "second", "saw {}", title);
                        assert_eq!(document.top_level_type(), Some("object"));
                    }
                });
            }

            scope.spawn(|| {
                for round in 0..50 {
                    let title = if round % 2 == 0 { "second" } else { "first" };
                    let text = format!(r#"{{"type": "object", "title": "{}"}}"#, title);
                    write_schema(dir.path(), &key, &text);
                    assert_eq!(store.reload(&key).unwrap().raw()["title"], title);

                    write_schema(dir.path(), &key, "{broken");
                    assert!(store.reload(&key).is_err());
                    assert_eq!(store.get_schema(&key).unwrap().raw()["title"], title);
                }
            });
        });

        assert_eq!(store.cached_len(), 1);
        assert_eq!(store.get_schema(&key).unwrap().raw()["title"], "first");
    }
}
