// crates/parchment-mcp/src/domains/blueprints.rs
// ============================================================================
// Module: Blueprint Domain Router
// Description: Blueprint CRUD plus a cached filesystem scan.
// Purpose: Expose blueprint definitions and their on-disk footprint.
// Dependencies: parchment-core, serde_json
// ============================================================================

//! ## Overview
//! Blueprints behave like any stored resource for CRUD, with one extra
//! read-only action: `scan` walks the configured blueprint files and reports
//! their footprint. Scan results are cached against file modification times,
//! so editing or removing a tracked file forces a rescan.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use std::time::UNIX_EPOCH;

use parchment_core::ActionDescriptor;
use parchment_core::ContentStore;
use parchment_core::ErrorKind;
use parchment_core::ListQuery;
use parchment_core::ResourceKind;
use parchment_core::Router;
use parchment_core::SimulationReport;
use parchment_core::ToolCache;
use parchment_core::ToolFailure;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Action Table
// ============================================================================

/// Blueprint action table; CRUD plus the cached scan.
const BLUEPRINT_ACTIONS: &[ActionDescriptor] = &[
    ActionDescriptor {
        name: "list",
        description: "List blueprint definitions",
        purpose: "Browse the defined blueprints",
        required_args: &[],
        optional_args: &["limit", "search"],
        examples: &[r#"{"action": "list"}"#],
        destructive: false,
    },
    ActionDescriptor {
        name: "get",
        description: "Fetch one blueprint by handle",
        purpose: "Inspect a blueprint's field definitions",
        required_args: &["id"],
        optional_args: &[],
        examples: &[r#"{"action": "get", "id": "article"}"#],
        destructive: false,
    },
    ActionDescriptor {
        name: "create",
        description: "Create a blueprint",
        purpose: "Define a new blueprint",
        required_args: &["id"],
        optional_args: &["fields"],
        examples: &[r#"{"action": "create", "id": "article", "fields": {"title": "Article"}, "confirm": true}"#],
        destructive: true,
    },
    ActionDescriptor {
        name: "update",
        description: "Replace a blueprint's fields",
        purpose: "Change an existing blueprint",
        required_args: &["id", "fields"],
        optional_args: &[],
        examples: &[r#"{"action": "update", "id": "article", "fields": {}, "confirm": true}"#],
        destructive: true,
    },
    ActionDescriptor {
        name: "delete",
        description: "Delete a blueprint",
        purpose: "Remove a blueprint permanently",
        required_args: &["id"],
        optional_args: &[],
        examples: &[r#"{"action": "delete", "id": "article", "dry_run": true}"#],
        destructive: true,
    },
    ActionDescriptor {
        name: "scan",
        description: "Scan tracked blueprint files on disk",
        purpose: "Check which blueprint files exist and when they changed",
        required_args: &[],
        optional_args: &[],
        examples: &[r#"{"action": "scan"}"#],
        destructive: false,
    },
];

// ============================================================================
// SECTION: Router
// ============================================================================

/// Router for blueprint definitions.
pub struct BlueprintRouter {
    /// Backing content store.
    store: Arc<dyn ContentStore>,
    /// Cache for scan results.
    cache: Arc<ToolCache>,
    /// Blueprint file paths tracked by the scan.
    paths: Vec<String>,
    /// Time-to-live for cached scans.
    scan_ttl: Duration,
}

impl BlueprintRouter {
    /// Creates the router over the given store and scan configuration.
    #[must_use]
    pub fn new(
        store: Arc<dyn ContentStore>,
        cache: Arc<ToolCache>,
        paths: Vec<String>,
        scan_ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            paths,
            scan_ttl,
        }
    }

    /// Scans tracked files, serving from cache while none have changed.
    fn scan(&self) -> Value {
        if let Some(cached) = self.cache.cached_blueprint_scan("blueprints", "scan", &self.paths)
        {
            return cached;
        }
        let files: Vec<Value> = self.paths.iter().map(|path| scan_file(path)).collect();
        let tracked_count = files.len();
        let existing_count =
            files.iter().filter(|file| file["exists"] == Value::Bool(true)).count();
        let result = json!({
            "tracked": tracked_count,
            "existing": existing_count,
            "files": files,
        });
        self.cache.cache_blueprint_scan(
            "blueprints",
            "scan",
            result.clone(),
            &self.paths,
            Some(self.scan_ttl),
        );
        result
    }
}

impl Router for BlueprintRouter {
    fn domain(&self) -> &'static str {
        "blueprints"
    }

    fn description(&self) -> &'static str {
        "Manage blueprint definitions and scan their files"
    }

    fn actions(&self) -> &'static [ActionDescriptor] {
        BLUEPRINT_ACTIONS
    }

    fn related_tools(&self) -> &'static [&'static str] {
        &["collections", "entries"]
    }

    fn usage_patterns(&self) -> &'static [&'static str] {
        &[
            "scan to see which blueprint files changed on disk",
            "get a blueprint before replacing its fields",
            "preview deletes with dry_run=true before confirming",
        ]
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["content store", "blueprint scan cache"]
    }

    fn execute_action(&self, action: &str, arguments: &Value) -> Result<Value, ToolFailure> {
        let kind = ResourceKind::Blueprint;
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
                let items =
                    self.store.list(kind, &query).map_err(|err| err.into_failure(kind))?;
                Ok(json!({ "count": items.len(), "items": items }))
            }
            "get" => {
                let id = required_str(arguments, "id")?;
                self.store.get(kind, id).map_err(|err| err.into_failure(kind))
            }
            "create" => {
                let id = required_str(arguments, "id")?;
                let fields = arguments.get("fields").cloned().unwrap_or_else(|| json!({}));
                self.store.create(kind, id, fields).map_err(|err| err.into_failure(kind))
            }
            "update" => {
                let id = required_str(arguments, "id")?;
                let fields = arguments.get("fields").cloned().unwrap_or_else(|| json!({}));
                self.store.update(kind, id, fields).map_err(|err| err.into_failure(kind))
            }
            "delete" => {
                let id = required_str(arguments, "id")?;
                self.store.delete(kind, id).map_err(|err| err.into_failure(kind))?;
                Ok(json!({ "deleted": true, "id": id }))
            }
            "scan" => Ok(self.scan()),
            other => Err(ToolFailure::invalid(format!("unhandled action '{other}'"))),
        }
    }

    fn simulate(&self, action: &str, arguments: &Value) -> SimulationReport {
        let id = arguments.get("id").and_then(Value::as_str).unwrap_or_default();
        match action {
            "delete" => SimulationReport {
                preview: self.store.get(ResourceKind::Blueprint, id).ok().unwrap_or(Value::Null),
                expected_changes: vec![format!("blueprint '{id}' would be removed")],
                risks: vec![format!(
                    "collections using blueprint '{id}' would lose their field definitions"
                )],
                recommendations: vec![
                    "re-run delete with confirm=true to remove the blueprint".to_string(),
                ],
            },
            other => SimulationReport::generic(other),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the scan record for one tracked path.
fn scan_file(path: &str) -> Value {
    match std::fs::metadata(Path::new(path)) {
        Ok(metadata) => {
            let modified_secs = metadata
                .modified()
                .ok()
                .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
                .map(|elapsed| elapsed.as_secs());
            json!({
                "path": path,
                "exists": true,
                "size_bytes": metadata.len(),
                "modified_secs": modified_secs,
            })
        }
        Err(_) => json!({ "path": path, "exists": false }),
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
