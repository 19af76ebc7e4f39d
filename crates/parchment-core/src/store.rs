// crates/parchment-core/src/store.rs
// ============================================================================
// Module: Content Store Interfaces
// Description: Backend-agnostic content repository and runtime inspection.
// Purpose: Define the contract surfaces between tools and the wrapped CMS.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Tools never talk to a CMS runtime directly. All reads and mutations flow
//! through [`ContentStore`], and version discovery flows through
//! [`RuntimeInspector`]. Implementations raise [`StoreError`] on failure and
//! return plain JSON values on success; the dispatch layer converts failures
//! into envelopes. An in-memory store ships for development and tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::envelope::RuntimeVersions;
use crate::errors::ErrorKind;
use crate::errors::ToolFailure;

// ============================================================================
// SECTION: Resource Kinds
// ============================================================================

/// Resource kinds exposed by the content repository.
///
/// # Invariants
/// - Variants are stable; names appear in tool schemas and cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Structured content collection.
    Collection,
    /// Entry within a collection.
    Entry,
    /// Field blueprint definition.
    Blueprint,
    /// Media asset record.
    Asset,
    /// Taxonomy definition.
    Taxonomy,
    /// CMS user account.
    User,
}

impl ResourceKind {
    /// Returns the stable snake_case name for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Entry => "entry",
            Self::Blueprint => "blueprint",
            Self::Asset => "asset",
            Self::Taxonomy => "taxonomy",
            Self::User => "user",
        }
    }

    /// Returns the per-kind not-found error classification.
    #[must_use]
    pub const fn not_found_kind(self) -> ErrorKind {
        match self {
            Self::Collection => ErrorKind::CollectionNotFound,
            Self::Entry => ErrorKind::EntryNotFound,
            Self::Blueprint => ErrorKind::BlueprintNotFound,
            Self::Asset => ErrorKind::AssetNotFound,
            Self::Taxonomy => ErrorKind::TaxonomyNotFound,
            Self::User => ErrorKind::UserNotFound,
        }
    }
}

// ============================================================================
// SECTION: Queries and Errors
// ============================================================================

/// Filter options for list operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    /// Maximum number of records to return.
    pub limit: Option<usize>,
    /// Substring match applied to resource identifiers.
    pub search: Option<String>,
}

/// Content store errors.
///
/// # Invariants
/// - Variants are stable for failure classification at the dispatch layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested resource does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),
    /// The resource identifier already exists.
    #[error("resource conflict: {0}")]
    Conflict(String),
    /// The supplied resource data was rejected.
    #[error("invalid resource data: {0}")]
    Invalid(String),
    /// The backing runtime failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Converts this store error into a classified tool failure.
    #[must_use]
    pub fn into_failure(self, kind: ResourceKind) -> ToolFailure {
        match self {
            Self::NotFound(message) => ToolFailure::new(kind.not_found_kind(), message),
            Self::Conflict(message) => ToolFailure::new(ErrorKind::Conflict, message),
            Self::Invalid(message) => ToolFailure::new(ErrorKind::ValidationFailed, message),
            Self::Backend(message) => ToolFailure::new(ErrorKind::DependencyError, message),
        }
    }
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Backend-agnostic content repository.
///
/// Implementations wrap the real CMS persistence layer. Domain logic such as
/// field validation and relationships lives behind this boundary, not in
/// Parchment.
pub trait ContentStore: Send + Sync {
    /// Lists resources of a kind matching the query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn list(&self, kind: ResourceKind, query: &ListQuery) -> Result<Vec<Value>, StoreError>;

    /// Fetches one resource by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the identifier is unknown.
    fn get(&self, kind: ResourceKind, id: &str) -> Result<Value, StoreError>;

    /// Creates a resource under the given identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the identifier already exists.
    fn create(&self, kind: ResourceKind, id: &str, fields: Value) -> Result<Value, StoreError>;

    /// Replaces the fields of an existing resource.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the identifier is unknown.
    fn update(&self, kind: ResourceKind, id: &str, fields: Value) -> Result<Value, StoreError>;

    /// Deletes a resource by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the identifier is unknown.
    fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), StoreError>;

    /// Renames a resource identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the source is unknown or the target exists.
    fn rename(&self, kind: ResourceKind, from: &str, to: &str) -> Result<Value, StoreError>;
}

/// Version discovery for the wrapped runtime.
pub trait RuntimeInspector: Send + Sync {
    /// Returns the runtime/server version pair; never fails.
    fn versions(&self) -> RuntimeVersions;
}

/// Inspector returning fixed version strings.
#[derive(Debug, Clone)]
pub struct StaticRuntimeInspector {
    /// Version pair handed out on every call.
    versions: RuntimeVersions,
}

impl StaticRuntimeInspector {
    /// Creates an inspector with the given version pair.
    #[must_use]
    pub const fn new(versions: RuntimeVersions) -> Self {
        Self {
            versions,
        }
    }

    /// Creates an inspector with the fallback version pair.
    #[must_use]
    pub fn unknown() -> Self {
        Self::new(RuntimeVersions::unknown())
    }
}

impl RuntimeInspector for StaticRuntimeInspector {
    fn versions(&self) -> RuntimeVersions {
        self.versions.clone()
    }
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Mutex-guarded in-memory content store for development and tests.
///
/// # Invariants
/// - Identifiers are unique per kind; duplicate creation is a conflict.
/// - `mutation_count` increases on every successful write operation.
#[derive(Default)]
pub struct InMemoryContentStore {
    /// Resource records keyed by kind then identifier.
    shelves: Mutex<BTreeMap<ResourceKind, BTreeMap<String, Value>>>,
    /// Count of successful mutating operations, used by safety tests.
    mutations: AtomicU64,
}

impl InMemoryContentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of successful mutating operations so far.
    #[must_use]
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::Relaxed)
    }

    /// Runs a closure against the locked shelves.
    fn with_shelves<T>(
        &self,
        op: impl FnOnce(&mut BTreeMap<ResourceKind, BTreeMap<String, Value>>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut shelves = self
            .shelves
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))?;
        op(&mut shelves)
    }
}

impl ContentStore for InMemoryContentStore {
    fn list(&self, kind: ResourceKind, query: &ListQuery) -> Result<Vec<Value>, StoreError> {
        self.with_shelves(|shelves| {
            let records = shelves.entry(kind).or_default();
            let mut items: Vec<Value> = records
                .iter()
                .filter(|(id, _)| {
                    query.search.as_ref().is_none_or(|needle| id.contains(needle.as_str()))
                })
                .map(|(_, value)| value.clone())
                .collect();
            if let Some(limit) = query.limit {
                items.truncate(limit);
            }
            Ok(items)
        })
    }

    fn get(&self, kind: ResourceKind, id: &str) -> Result<Value, StoreError> {
        self.with_shelves(|shelves| {
            shelves
                .entry(kind)
                .or_default()
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("{} {id}", kind.as_str())))
        })
    }

    fn create(&self, kind: ResourceKind, id: &str, fields: Value) -> Result<Value, StoreError> {
        if id.trim().is_empty() {
            return Err(StoreError::Invalid("identifier must be non-empty".to_string()));
        }
        let record = self.with_shelves(|shelves| {
            let records = shelves.entry(kind).or_default();
            if records.contains_key(id) {
                return Err(StoreError::Conflict(format!("{} {id}", kind.as_str())));
            }
            let record = with_identifier(fields, id);
            records.insert(id.to_string(), record.clone());
            Ok(record)
        })?;
        self.mutations.fetch_add(1, Ordering::Relaxed);
        Ok(record)
    }

    fn update(&self, kind: ResourceKind, id: &str, fields: Value) -> Result<Value, StoreError> {
        let record = self.with_shelves(|shelves| {
            let records = shelves.entry(kind).or_default();
            if !records.contains_key(id) {
                return Err(StoreError::NotFound(format!("{} {id}", kind.as_str())));
            }
            let record = with_identifier(fields, id);
            records.insert(id.to_string(), record.clone());
            Ok(record)
        })?;
        self.mutations.fetch_add(1, Ordering::Relaxed);
        Ok(record)
    }

    fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), StoreError> {
        self.with_shelves(|shelves| {
            let records = shelves.entry(kind).or_default();
            if records.remove(id).is_none() {
                return Err(StoreError::NotFound(format!("{} {id}", kind.as_str())));
            }
            Ok(())
        })?;
        self.mutations.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn rename(&self, kind: ResourceKind, from: &str, to: &str) -> Result<Value, StoreError> {
        if to.trim().is_empty() {
            return Err(StoreError::Invalid("target identifier must be non-empty".to_string()));
        }
        let record = self.with_shelves(|shelves| {
            let records = shelves.entry(kind).or_default();
            if records.contains_key(to) {
                return Err(StoreError::Conflict(format!("{} {to}", kind.as_str())));
            }
            let Some(existing) = records.remove(from) else {
                return Err(StoreError::NotFound(format!("{} {from}", kind.as_str())));
            };
            let record = with_identifier(existing, to);
            records.insert(to.to_string(), record.clone());
            Ok(record)
        })?;
        self.mutations.fetch_add(1, Ordering::Relaxed);
        Ok(record)
    }
}

/// Ensures a record object carries its identifier under `id`.
fn with_identifier(fields: Value, id: &str) -> Value {
    match fields {
        Value::Object(mut map) => {
            map.insert("id".to_string(), Value::String(id.to_string()));
            Value::Object(map)
        }
        other => serde_json::json!({ "id": id, "value": other }),
    }
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

    use serde_json::json;

    use super::ContentStore;
    use super::InMemoryContentStore;
    use super::ListQuery;
    use super::ResourceKind;
    use super::StoreError;
    use crate::errors::ErrorKind;

    #[test]
    fn create_get_round_trip() {
        let store = InMemoryContentStore::new();
        store.create(ResourceKind::Collection, "blog", json!({"title": "Blog"})).unwrap();
        let record = store.get(ResourceKind::Collection, "blog").unwrap();
        assert_eq!(record["id"], "blog");
        assert_eq!(record["title"], "Blog");
    }

    #[test]
    fn duplicate_create_conflicts() {
        let store = InMemoryContentStore::new();
        store.create(ResourceKind::Entry, "post-1", json!({})).unwrap();
        let result = store.create(ResourceKind::Entry, "post-1", json!({}));
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn list_applies_search_and_limit() {
        let store = InMemoryContentStore::new();
        for id in ["alpha", "beta", "alpine"] {
            store.create(ResourceKind::Asset, id, json!({})).unwrap();
        }
        let query = ListQuery {
            limit: Some(1),
            search: Some("alp".to_string()),
        };
        let items = store.list(ResourceKind::Asset, &query).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "alpha");
    }

    #[test]
    fn mutation_count_tracks_writes_only() {
        let store = InMemoryContentStore::new();
        store.create(ResourceKind::User, "admin", json!({})).unwrap();
        let _ = store.get(ResourceKind::User, "admin").unwrap();
        let _ = store.list(ResourceKind::User, &ListQuery::default()).unwrap();
        store.delete(ResourceKind::User, "admin").unwrap();
        assert_eq!(store.mutation_count(), 2);
    }

    #[test]
    fn not_found_maps_to_resource_specific_kind() {
        let error = StoreError::NotFound("entry missing".to_string());
        let failure = error.into_failure(ResourceKind::Entry);
        assert_eq!(failure.kind, ErrorKind::EntryNotFound);
    }

    #[test]
    fn rename_moves_the_record() {
        let store = InMemoryContentStore::new();
        store.create(ResourceKind::Taxonomy, "tags", json!({"label": "Tags"})).unwrap();
        let renamed = store.rename(ResourceKind::Taxonomy, "tags", "topics").unwrap();
        assert_eq!(renamed["id"], "topics");
        assert!(store.get(ResourceKind::Taxonomy, "tags").is_err());
        assert!(store.get(ResourceKind::Taxonomy, "topics").is_ok());
    }
}
