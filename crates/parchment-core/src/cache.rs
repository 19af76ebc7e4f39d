// crates/parchment-core/src/cache.rs
// ============================================================================
// Module: Tool Cache
// Description: TTL-expiring cache with dependency and mtime invalidation.
// Purpose: Memoize expensive tool computations without serving stale data.
// Dependencies: serde_json, crate::{errors, store}
// ============================================================================

//! ## Overview
//! Caching is a best-effort optimization layered over tool execution. Entries
//! expire on a time-to-live, and two specialized forms add structural
//! invalidation: discovery entries are dropped when the recorded dependency
//! set or runtime version changes, and blueprint-scan entries are dropped when
//! any tracked file moves forward in modification time or disappears.
//!
//! ## Invariants
//! - Cache reads never fail a tool call; any malformed entry reads as a miss.
//! - Keys are namespaced `parchment:{tool}:{operation}` so one tool's entries
//!   can be flushed without touching another's.
//! - A disabled cache computes every call and stores nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde_json::Value;
use serde_json::json;

use crate::errors::ToolFailure;
use crate::store::RuntimeInspector;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default time-to-live for memoized computations.
pub const DEFAULT_MEMOIZE_TTL: Duration = Duration::from_secs(300);

/// Default time-to-live for discovery manifests.
pub const DEFAULT_DISCOVERY_TTL: Duration = Duration::from_secs(3600);

/// Default time-to-live for blueprint scan results.
pub const DEFAULT_SCAN_TTL: Duration = Duration::from_secs(1800);

/// Key namespace prefix shared by every cache entry.
const KEY_NAMESPACE: &str = "parchment";

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Storage backend for cache entries.
///
/// Implementations own expiry: a `get` after the entry's time-to-live has
/// elapsed must behave as a miss.
pub trait CacheBackend: Send + Sync {
    /// Fetches a live entry by key.
    fn get(&self, key: &str) -> Option<Value>;

    /// Stores an entry under a key with the given time-to-live.
    fn put(&self, key: &str, value: Value, ttl: Duration);

    /// Removes one entry; removing a missing key is a no-op.
    fn forget(&self, key: &str);

    /// Removes every entry whose key starts with the prefix.
    ///
    /// Returns the number of entries removed.
    fn forget_prefix(&self, prefix: &str) -> usize;

    /// Removes all entries.
    fn flush(&self);
}

/// Entry held by the in-memory backend.
#[derive(Debug, Clone)]
struct StoredEntry {
    /// Cached payload.
    value: Value,
    /// Instant after which the entry reads as a miss.
    expires_at: Instant,
}

/// Mutex-guarded in-memory cache backend.
#[derive(Default)]
pub struct InMemoryCacheBackend {
    /// Live entries keyed by namespaced cache key.
    entries: Mutex<BTreeMap<String, StoredEntry>>,
}

impl InMemoryCacheBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for InMemoryCacheBackend {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: Value, ttl: Duration) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key.to_string(),
                StoredEntry {
                    value,
                    expires_at: Instant::now() + ttl,
                },
            );
        }
    }

    fn forget(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    fn forget_prefix(&self, prefix: &str) -> usize {
        let Ok(mut entries) = self.entries.lock() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    fn flush(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

// ============================================================================
// SECTION: Tool Cache
// ============================================================================

/// Cache facade used by tools.
///
/// # Invariants
/// - Reads and writes never surface errors; a broken backend degrades to a
///   cache that always misses.
pub struct ToolCache {
    /// Storage backend.
    backend: Arc<dyn CacheBackend>,
    /// Runtime version source for discovery invalidation.
    runtime: Arc<dyn RuntimeInspector>,
    /// Whether caching is active; disabled caches always compute.
    enabled: bool,
}

impl ToolCache {
    /// Creates a cache over the given backend and runtime inspector.
    #[must_use]
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        runtime: Arc<dyn RuntimeInspector>,
        enabled: bool,
    ) -> Self {
        Self {
            backend,
            runtime,
            enabled,
        }
    }

    /// Builds the namespaced key for a tool operation.
    #[must_use]
    pub fn key(tool: &str, operation: &str) -> String {
        format!("{KEY_NAMESPACE}:{tool}:{operation}")
    }

    /// Returns a cached value or computes and stores one.
    ///
    /// The default time-to-live is [`DEFAULT_MEMOIZE_TTL`]. Failed
    /// computations are not cached.
    ///
    /// # Errors
    ///
    /// Propagates the computation's [`ToolFailure`] on a cache miss.
    pub fn remember(
        &self,
        tool: &str,
        operation: &str,
        ttl: Option<Duration>,
        compute: impl FnOnce() -> Result<Value, ToolFailure>,
    ) -> Result<Value, ToolFailure> {
        if !self.enabled {
            return compute();
        }
        let key = Self::key(tool, operation);
        if let Some(hit) = self.backend.get(&key) {
            return Ok(hit);
        }
        let value = compute()?;
        self.backend.put(&key, value.clone(), ttl.unwrap_or(DEFAULT_MEMOIZE_TTL));
        Ok(value)
    }

    /// Stores a discovery result keyed to a dependency set.
    ///
    /// The entry records the sorted dependency identifiers and the current
    /// runtime version alongside the payload. The default time-to-live is
    /// [`DEFAULT_DISCOVERY_TTL`].
    pub fn cache_discovery(
        &self,
        tool: &str,
        operation: &str,
        result: Value,
        dependencies: &[String],
        ttl: Option<Duration>,
    ) {
        if !self.enabled {
            return;
        }
        let mut sorted: Vec<String> = dependencies.to_vec();
        sorted.sort();
        sorted.dedup();
        let entry = json!({
            "result": result,
            "stored_at": now_millis(),
            "dependencies": sorted,
            "runtime_version": self.runtime.versions().runtime_version,
        });
        self.backend.put(
            &Self::key(tool, operation),
            entry,
            ttl.unwrap_or(DEFAULT_DISCOVERY_TTL),
        );
    }

    /// Fetches a discovery result if its recorded context still holds.
    ///
    /// A miss is returned when the entry is absent or malformed, when the
    /// dependency set differs from the recorded one in either direction, or
    /// when the runtime version has changed.
    #[must_use]
    pub fn cached_discovery(
        &self,
        tool: &str,
        operation: &str,
        dependencies: &[String],
    ) -> Option<Value> {
        if !self.enabled {
            return None;
        }
        let entry = self.backend.get(&Self::key(tool, operation))?;
        let recorded: BTreeSet<&str> = entry
            .get("dependencies")?
            .as_array()?
            .iter()
            .map(|value| value.as_str())
            .collect::<Option<BTreeSet<&str>>>()?;
        let current: BTreeSet<&str> = dependencies.iter().map(String::as_str).collect();
        if recorded != current {
            return None;
        }
        let recorded_version = entry.get("runtime_version")?.as_str()?;
        if recorded_version != self.runtime.versions().runtime_version {
            return None;
        }
        entry.get("result").cloned()
    }

    /// Stores a blueprint scan result keyed to file modification times.
    ///
    /// Unreadable paths are recorded with a modification time of zero so a
    /// later successful read invalidates the entry. The default time-to-live
    /// is [`DEFAULT_SCAN_TTL`].
    pub fn cache_blueprint_scan(
        &self,
        tool: &str,
        operation: &str,
        result: Value,
        paths: &[String],
        ttl: Option<Duration>,
    ) {
        if !self.enabled {
            return;
        }
        let mut mod_times = serde_json::Map::new();
        for path in paths {
            mod_times.insert(path.clone(), json!(file_mod_secs(path).unwrap_or(0)));
        }
        let entry = json!({
            "result": result,
            "stored_at": now_millis(),
            "file_mod_times": mod_times,
        });
        self.backend.put(&Self::key(tool, operation), entry, ttl.unwrap_or(DEFAULT_SCAN_TTL));
    }

    /// Fetches a blueprint scan result if every tracked file is unchanged.
    ///
    /// A miss is returned when any supplied path is untracked, missing, or
    /// has a modification time newer than the recorded one.
    #[must_use]
    pub fn cached_blueprint_scan(
        &self,
        tool: &str,
        operation: &str,
        paths: &[String],
    ) -> Option<Value> {
        if !self.enabled {
            return None;
        }
        let entry = self.backend.get(&Self::key(tool, operation))?;
        let mod_times = entry.get("file_mod_times")?.as_object()?;
        for path in paths {
            let recorded = mod_times.get(path)?.as_u64()?;
            let current = file_mod_secs(path)?;
            if current > recorded {
                return None;
            }
        }
        entry.get("result").cloned()
    }

    /// Removes one cached operation.
    pub fn forget(&self, tool: &str, operation: &str) {
        self.backend.forget(&Self::key(tool, operation));
    }

    /// Removes every cached operation for a tool.
    ///
    /// Returns the number of entries removed.
    pub fn clear_tool(&self, tool: &str) -> usize {
        self.backend.forget_prefix(&format!("{KEY_NAMESPACE}:{tool}:"))
    }

    /// Removes every cache entry.
    pub fn flush(&self) {
        self.backend.flush();
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns milliseconds since the Unix epoch, or zero before it.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Returns a file's modification time in seconds since the Unix epoch.
fn file_mod_secs(path: &str) -> Option<u64> {
    let modified = std::fs::metadata(Path::new(path)).ok()?.modified().ok()?;
    let elapsed = modified.duration_since(UNIX_EPOCH).ok()?;
    Some(elapsed.as_secs())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use std::io::Write;
    use std::sync::Arc;
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use serde_json::json;

    use super::CacheBackend;
    use super::InMemoryCacheBackend;
    use super::ToolCache;
    use crate::envelope::RuntimeVersions;
    use crate::store::StaticRuntimeInspector;

    fn cache_with_version(version: &str) -> ToolCache {
        let inspector =
            StaticRuntimeInspector::new(RuntimeVersions::new(version, "0.1.0"));
        ToolCache::new(Arc::new(InMemoryCacheBackend::new()), Arc::new(inspector), true)
    }

    #[test]
    fn remember_computes_once_within_ttl() {
        let cache = cache_with_version("5.0");
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            let value = cache
                .remember("entries", "list", None, || {
                    calls.fetch_add(1, Ordering::Relaxed);
                    Ok(json!({"count": 7}))
                })
                .unwrap();
            assert_eq!(value["count"], 7);
        }
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn remember_does_not_cache_failures() {
        let cache = cache_with_version("5.0");
        let calls = AtomicU32::new(0);
        for _ in 0..2 {
            let result = cache.remember("entries", "list", None, || {
                calls.fetch_add(1, Ordering::Relaxed);
                Err(crate::errors::ToolFailure::internal("backend down"))
            });
            assert!(result.is_err());
        }
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn expired_entries_read_as_misses() {
        let backend = InMemoryCacheBackend::new();
        backend.put("parchment:t:op", json!(1), Duration::from_secs(0));
        assert!(backend.get("parchment:t:op").is_none());
    }

    #[test]
    fn disabled_cache_always_computes() {
        let inspector = StaticRuntimeInspector::unknown();
        let cache =
            ToolCache::new(Arc::new(InMemoryCacheBackend::new()), Arc::new(inspector), false);
        let calls = AtomicU32::new(0);
        for _ in 0..2 {
            let _ = cache
                .remember("entries", "list", None, || {
                    calls.fetch_add(1, Ordering::Relaxed);
                    Ok(json!(true))
                })
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn discovery_hit_requires_matching_dependency_set() {
        let cache = cache_with_version("5.0");
        let deps = vec!["seo-pro".to_string(), "ssg".to_string()];
        cache.cache_discovery("system", "addons", json!({"addons": 2}), &deps, None);
        assert!(cache.cached_discovery("system", "addons", &deps).is_some());

        let reordered = vec!["ssg".to_string(), "seo-pro".to_string()];
        assert!(cache.cached_discovery("system", "addons", &reordered).is_some());

        let grown = vec!["seo-pro".to_string(), "ssg".to_string(), "forms".to_string()];
        assert!(cache.cached_discovery("system", "addons", &grown).is_none());

        let shrunk = vec!["ssg".to_string()];
        assert!(cache.cached_discovery("system", "addons", &shrunk).is_none());
    }

    #[test]
    fn discovery_hit_requires_matching_runtime_version() {
        let backend: Arc<InMemoryCacheBackend> = Arc::new(InMemoryCacheBackend::new());
        let old = ToolCache::new(
            backend.clone(),
            Arc::new(StaticRuntimeInspector::new(RuntimeVersions::new("5.0", "0.1.0"))),
            true,
        );
        let deps = vec!["ssg".to_string()];
        old.cache_discovery("system", "addons", json!({}), &deps, None);

        let upgraded = ToolCache::new(
            backend,
            Arc::new(StaticRuntimeInspector::new(RuntimeVersions::new("5.1", "0.1.0"))),
            true,
        );
        assert!(upgraded.cached_discovery("system", "addons", &deps).is_none());
    }

    #[test]
    fn blueprint_scan_invalidates_on_mtime_advance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("article.yaml");
        std::fs::write(&path, "title: Article\n").unwrap();
        let tracked = vec![path.to_string_lossy().into_owned()];

        let cache = cache_with_version("5.0");
        cache.cache_blueprint_scan("blueprints", "scan", json!({"fields": 3}), &tracked, None);
        assert!(cache.cached_blueprint_scan("blueprints", "scan", &tracked).is_some());

        // Push the mtime past the recorded value.
        let file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        let future = std::time::SystemTime::now() + Duration::from_secs(10);
        file.set_modified(future).unwrap();
        drop(file);
        assert!(cache.cached_blueprint_scan("blueprints", "scan", &tracked).is_none());
    }

    #[test]
    fn blueprint_scan_misses_for_untracked_or_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "title: Page").unwrap();
        drop(file);
        let tracked = vec![path.to_string_lossy().into_owned()];

        let cache = cache_with_version("5.0");
        cache.cache_blueprint_scan("blueprints", "scan", json!({}), &tracked, None);

        let untracked = vec![tracked[0].clone(), "/nonexistent/extra.yaml".to_string()];
        assert!(cache.cached_blueprint_scan("blueprints", "scan", &untracked).is_none());

        std::fs::remove_file(&path).unwrap();
        assert!(cache.cached_blueprint_scan("blueprints", "scan", &tracked).is_none());
    }

    #[test]
    fn clear_tool_only_touches_one_namespace() {
        let cache = cache_with_version("5.0");
        let _ = cache.remember("entries", "list", None, || Ok(json!(1))).unwrap();
        let _ = cache.remember("entries", "get:post-1", None, || Ok(json!(2))).unwrap();
        let _ = cache.remember("assets", "list", None, || Ok(json!(3))).unwrap();

        assert_eq!(cache.clear_tool("entries"), 2);

        let calls = AtomicU32::new(0);
        let _ = cache
            .remember("assets", "list", None, || {
                calls.fetch_add(1, Ordering::Relaxed);
                Ok(json!(0))
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }
}
