// crates/parchment-mcp/src/domains/content.rs
// ============================================================================
// Module: Content Domain Routers
// Description: CRUD action routers over the content store.
// Purpose: Expose entries, collections, assets, taxonomies, and users.
// Dependencies: parchment-core, serde_json
// ============================================================================

//! ## Overview
//! One router shape serves every stored resource kind: the action table and
//! dispatch logic are shared, and each domain constructor fixes the resource
//! kind, tool name, and related-tool hints. Mutating actions are declared
//! destructive and ride the safety gate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use parchment_core::ActionDescriptor;
use parchment_core::ContentStore;
use parchment_core::ErrorKind;
use parchment_core::ListQuery;
use parchment_core::ResourceKind;
use parchment_core::Router;
use parchment_core::SimulationReport;
use parchment_core::ToolFailure;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Action Table
// ============================================================================

/// Shared CRUD action table for stored resources.
const CONTENT_ACTIONS: &[ActionDescriptor] = &[
    ActionDescriptor {
        name: "list",
        description: "List resources, optionally filtered",
        purpose: "Browse what exists before reading or changing anything",
        required_args: &[],
        optional_args: &["limit", "search"],
        examples: &[r#"{"action": "list", "limit": 10}"#],
        destructive: false,
    },
    ActionDescriptor {
        name: "get",
        description: "Fetch one resource by identifier",
        purpose: "Inspect a single resource in full",
        required_args: &["id"],
        optional_args: &[],
        examples: &[r#"{"action": "get", "id": "blog"}"#],
        destructive: false,
    },
    ActionDescriptor {
        name: "create",
        description: "Create a resource",
        purpose: "Add a new resource under a fresh identifier",
        required_args: &["id"],
        optional_args: &["fields"],
        examples: &[r#"{"action": "create", "id": "blog", "fields": {"title": "Blog"}, "confirm": true}"#],
        destructive: true,
    },
    ActionDescriptor {
        name: "update",
        description: "Replace a resource's fields",
        purpose: "Change an existing resource",
        required_args: &["id", "fields"],
        optional_args: &[],
        examples: &[r#"{"action": "update", "id": "blog", "fields": {"title": "News"}, "confirm": true}"#],
        destructive: true,
    },
    ActionDescriptor {
        name: "delete",
        description: "Delete a resource",
        purpose: "Remove a resource permanently",
        required_args: &["id"],
        optional_args: &[],
        examples: &[r#"{"action": "delete", "id": "blog", "dry_run": true}"#],
        destructive: true,
    },
    ActionDescriptor {
        name: "rename",
        description: "Change a resource's identifier",
        purpose: "Move a resource to a new identifier",
        required_args: &["id", "to"],
        optional_args: &[],
        examples: &[r#"{"action": "rename", "id": "blog", "to": "news", "confirm": true}"#],
        destructive: true,
    },
];

// ============================================================================
// SECTION: Router
// ============================================================================

/// CRUD router over one stored resource kind.
pub struct ContentRouter {
    /// Resource kind this router manages.
    kind: ResourceKind,
    /// Tool name exposed for this domain.
    domain: &'static str,
    /// One-line domain description.
    description: &'static str,
    /// Related tools worth discovering next.
    related: &'static [&'static str],
    /// Backing content store.
    store: Arc<dyn ContentStore>,
}

impl ContentRouter {
    /// Builds the entries router.
    #[must_use]
    pub fn entries(store: Arc<dyn ContentStore>) -> Self {
        Self {
            kind: ResourceKind::Entry,
            domain: "entries",
            description: "Manage entries within collections",
            related: &["collections", "blueprints"],
            store,
        }
    }

    /// Builds the collections router.
    #[must_use]
    pub fn collections(store: Arc<dyn ContentStore>) -> Self {
        Self {
            kind: ResourceKind::Collection,
            domain: "collections",
            description: "Manage content collections",
            related: &["entries", "blueprints"],
            store,
        }
    }

    /// Builds the assets router.
    #[must_use]
    pub fn assets(store: Arc<dyn ContentStore>) -> Self {
        Self {
            kind: ResourceKind::Asset,
            domain: "assets",
            description: "Manage media asset records",
            related: &["entries"],
            store,
        }
    }

    /// Builds the taxonomies router.
    #[must_use]
    pub fn taxonomies(store: Arc<dyn ContentStore>) -> Self {
        Self {
            kind: ResourceKind::Taxonomy,
            domain: "taxonomies",
            description: "Manage taxonomies and their terms",
            related: &["collections", "entries"],
            store,
        }
    }

    /// Builds the users router.
    #[must_use]
    pub fn users(store: Arc<dyn ContentStore>) -> Self {
        Self {
            kind: ResourceKind::User,
            domain: "users",
            description: "Manage CMS user accounts",
            related: &[],
            store,
        }
    }

    /// Reads the current record for simulation previews, if it exists.
    fn current_record(&self, id: &str) -> Option<Value> {
        self.store.get(self.kind, id).ok()
    }
}

impl Router for ContentRouter {
    fn domain(&self) -> &'static str {
        self.domain
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn actions(&self) -> &'static [ActionDescriptor] {
        CONTENT_ACTIONS
    }

    fn related_tools(&self) -> &'static [&'static str] {
        self.related
    }

    fn usage_patterns(&self) -> &'static [&'static str] {
        &[
            "list to find identifiers, then get for the full record",
            "preview destructive changes with dry_run=true before confirming",
            "rename instead of delete-and-create to keep the identifier",
        ]
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["content store"]
    }

    fn execute_action(&self, action: &str, arguments: &Value) -> Result<Value, ToolFailure> {
        match action {
            "list" => {
                let query = ListQuery {
                    limit: arguments
                        .get("limit")
                        .and_then(Value::as_u64)
                        .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX)),
                    search: arguments
                        .get("search")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                };
                let items = self
                    .store
                    .list(self.kind, &query)
                    .map_err(|err| err.into_failure(self.kind))?;
                Ok(json!({ "count": items.len(), "items": items }))
            }
            "get" => {
                let id = required_str(arguments, "id")?;
                self.store.get(self.kind, id).map_err(|err| err.into_failure(self.kind))
            }
            "create" => {
                let id = required_str(arguments, "id")?;
                let fields = arguments.get("fields").cloned().unwrap_or_else(|| json!({}));
                self.store
                    .create(self.kind, id, fields)
                    .map_err(|err| err.into_failure(self.kind))
            }
            "update" => {
                let id = required_str(arguments, "id")?;
                let fields = arguments.get("fields").cloned().unwrap_or_else(|| json!({}));
                self.store
                    .update(self.kind, id, fields)
                    .map_err(|err| err.into_failure(self.kind))
            }
            "delete" => {
                let id = required_str(arguments, "id")?;
                self.store.delete(self.kind, id).map_err(|err| err.into_failure(self.kind))?;
                Ok(json!({ "deleted": true, "id": id }))
            }
            "rename" => {
                let id = required_str(arguments, "id")?;
                let to = required_str(arguments, "to")?;
                self.store
                    .rename(self.kind, id, to)
                    .map_err(|err| err.into_failure(self.kind))
            }
            other => Err(ToolFailure::invalid(format!("unhandled action '{other}'"))),
        }
    }

    fn simulate(&self, action: &str, arguments: &Value) -> SimulationReport {
        let id = arguments.get("id").and_then(Value::as_str).unwrap_or_default();
        let kind = self.kind.as_str();
        match action {
            "delete" => {
                let current = self.current_record(id);
                let exists = current.is_some();
                let mut risks =
                    vec![format!("references to {kind} '{id}' are not checked")];
                if !exists {
                    risks.push(format!("{kind} '{id}' does not currently exist"));
                }
                SimulationReport {
                    preview: current.unwrap_or(Value::Null),
                    expected_changes: vec![format!("{kind} '{id}' would be removed")],
                    risks,
                    recommendations: vec![format!(
                        "re-run delete with confirm=true to remove {kind} '{id}'"
                    )],
                }
            }
            "create" => SimulationReport {
                preview: arguments.get("fields").cloned().unwrap_or_else(|| json!({})),
                expected_changes: vec![format!("{kind} '{id}' would be created")],
                risks: if self.current_record(id).is_some() {
                    vec![format!("{kind} '{id}' already exists; creation would conflict")]
                } else {
                    Vec::new()
                },
                recommendations: vec!["re-run create with confirm=true to apply".to_string()],
            },
            "update" => SimulationReport {
                preview: arguments.get("fields").cloned().unwrap_or_else(|| json!({})),
                expected_changes: vec![format!("{kind} '{id}' fields would be replaced")],
                risks: if self.current_record(id).is_none() {
                    vec![format!("{kind} '{id}' does not currently exist")]
                } else {
                    Vec::new()
                },
                recommendations: vec!["re-run update with confirm=true to apply".to_string()],
            },
            "rename" => {
                let to = arguments.get("to").and_then(Value::as_str).unwrap_or_default();
                SimulationReport {
                    preview: self.current_record(id).unwrap_or(Value::Null),
                    expected_changes: vec![format!("{kind} '{id}' would become '{to}'")],
                    risks: vec![format!("references to {kind} '{id}' are not rewritten")],
                    recommendations: vec!["re-run rename with confirm=true to apply".to_string()],
                }
            }
            other => SimulationReport::generic(other),
        }
    }
}

/// Extracts a required string argument.
fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, ToolFailure> {
    arguments.get(key).and_then(Value::as_str).ok_or_else(|| {
        ToolFailure::new(ErrorKind::ValidationFailed, format!("argument '{key}' must be a string"))
    })
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

    use std::sync::Arc;

    use parchment_core::ErrorKind;
    use parchment_core::InMemoryContentStore;
    use parchment_core::Router;
    use serde_json::json;

    use super::ContentRouter;

    #[test]
    fn crud_actions_round_trip_through_the_store() {
        let store = Arc::new(InMemoryContentStore::new());
        let router = ContentRouter::collections(store);

        let created = router
            .execute_action("create", &json!({"id": "blog", "fields": {"title": "Blog"}}))
            .unwrap();
        assert_eq!(created["title"], "Blog");

        let fetched = router.execute_action("get", &json!({"id": "blog"})).unwrap();
        assert_eq!(fetched["id"], "blog");

        let listed = router.execute_action("list", &json!({})).unwrap();
        assert_eq!(listed["count"], 1);

        let renamed = router.execute_action("rename", &json!({"id": "blog", "to": "news"})).unwrap();
        assert_eq!(renamed["id"], "news");

        let deleted = router.execute_action("delete", &json!({"id": "news"})).unwrap();
        assert_eq!(deleted["deleted"], true);
    }

    #[test]
    fn missing_resources_map_to_domain_not_found() {
        let store = Arc::new(InMemoryContentStore::new());
        let router = ContentRouter::entries(store);
        let error = router.execute_action("get", &json!({"id": "ghost"})).unwrap_err();
        assert_eq!(error.kind, ErrorKind::EntryNotFound);
    }

    #[test]
    fn delete_simulation_previews_the_current_record() {
        let store = Arc::new(InMemoryContentStore::new());
        let router = ContentRouter::users(store);
        router.execute_action("create", &json!({"id": "admin", "fields": {}})).unwrap();

        let report = router.simulate("delete", &json!({"id": "admin"}));
        assert_eq!(report.preview["id"], "admin");
        assert!(report.expected_changes[0].contains("user 'admin'"));

        let missing = router.simulate("delete", &json!({"id": "ghost"}));
        assert!(missing.risks.iter().any(|risk| risk.contains("does not currently exist")));
    }

    #[test]
    fn non_string_id_fails_validation() {
        let store = Arc::new(InMemoryContentStore::new());
        let router = ContentRouter::assets(store);
        let error = router.execute_action("get", &json!({"id": 7})).unwrap_err();
        assert_eq!(error.kind, ErrorKind::ValidationFailed);
    }
}
