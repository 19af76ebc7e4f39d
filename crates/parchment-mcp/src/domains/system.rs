// crates/parchment-mcp/src/domains/system.rs
// ============================================================================
// Module: System Information Tool
// Description: Runtime and dependency reporting with discovery caching.
// Purpose: Let clients learn what runtime they are talking to.
// Dependencies: parchment-core, serde_json
// ============================================================================

//! ## Overview
//! `system.info` reports the runtime and server versions plus the installed
//! dependency set. The report is expensive to rebuild in real deployments, so
//! it is cached against the dependency set and runtime version; a change to
//! either invalidates the cached copy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parchment_core::RuntimeInspector;
use parchment_core::ToolCache;
use parchment_core::ToolFailure;
use parchment_core::ToolHandler;
use parchment_core::envelope::now_rfc3339;
use serde_json::Value;
use serde_json::json;

use crate::registry::ToolDefinition;

// ============================================================================
// SECTION: Tool
// ============================================================================

/// Direct tool reporting runtime versions and dependencies.
pub struct SystemInfoTool {
    /// Runtime version source.
    runtime: Arc<dyn RuntimeInspector>,
    /// Discovery cache.
    cache: Arc<ToolCache>,
    /// Installed dependency identifiers, e.g. `addon@1.2.0`.
    dependencies: Vec<String>,
    /// Names of every registered tool, including this one.
    tools: Vec<String>,
    /// Time-to-live for the cached report.
    discovery_ttl: Duration,
}

impl SystemInfoTool {
    /// Creates the tool over the given runtime, dependency set, and inventory.
    #[must_use]
    pub fn new(
        runtime: Arc<dyn RuntimeInspector>,
        cache: Arc<ToolCache>,
        dependencies: Vec<String>,
        tools: Vec<String>,
        discovery_ttl: Duration,
    ) -> Self {
        Self {
            runtime,
            cache,
            dependencies,
            tools,
            discovery_ttl,
        }
    }

    /// MCP definition for this tool.
    #[must_use]
    pub fn definition() -> ToolDefinition {
        ToolDefinition {
            name: "system.info".to_string(),
            description: "Report runtime versions and installed dependencies".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false,
            }),
        }
    }
}

impl ToolHandler for SystemInfoTool {
    fn name(&self) -> &str {
        "system.info"
    }

    fn execute(&self, _arguments: &Value) -> Result<Value, ToolFailure> {
        if let Some(cached) = self.cache.cached_discovery("system", "info", &self.dependencies) {
            return Ok(cached);
        }
        let versions = self.runtime.versions();
        let report = json!({
            "runtime_version": versions.runtime_version,
            "server_version": versions.server_version,
            "dependencies": self.dependencies,
            "dependency_count": self.dependencies.len(),
            "tools": self.tools,
            "generated_at": now_rfc3339(),
        });
        self.cache.cache_discovery(
            "system",
            "info",
            report.clone(),
            &self.dependencies,
            Some(self.discovery_ttl),
        );
        Ok(report)
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

    use std::sync::Arc;
    use std::time::Duration;

    use parchment_core::InMemoryCacheBackend;
    use parchment_core::RuntimeVersions;
    use parchment_core::StaticRuntimeInspector;
    use parchment_core::ToolCache;
    use parchment_core::ToolHandler;
    use serde_json::json;

    use super::SystemInfoTool;

    fn tool(dependencies: Vec<String>) -> SystemInfoTool {
        let runtime = Arc::new(StaticRuntimeInspector::new(RuntimeVersions {
            runtime_version: "5.0.0".to_string(),
            server_version: "0.1.0".to_string(),
        }));
        let cache = Arc::new(ToolCache::new(
            Arc::new(InMemoryCacheBackend::new()),
            Arc::clone(&runtime) as Arc<dyn parchment_core::RuntimeInspector>,
            true,
        ));
        SystemInfoTool::new(
            runtime,
            cache,
            dependencies,
            vec!["entries".to_string(), "system.info".to_string()],
            Duration::from_secs(3600),
        )
    }

    #[test]
    fn report_includes_versions_dependencies_and_inventory() {
        let tool = tool(vec!["seo-pro@6.0.0".to_string()]);
        let report = tool.execute(&json!({})).unwrap();
        assert_eq!(report["runtime_version"], "5.0.0");
        assert_eq!(report["server_version"], "0.1.0");
        assert_eq!(report["dependency_count"], 1);
        assert_eq!(report["dependencies"][0], "seo-pro@6.0.0");
        assert_eq!(report["tools"][1], "system.info");
    }

    #[test]
    fn repeated_calls_reuse_the_cached_report() {
        let tool = tool(Vec::new());
        let first = tool.execute(&json!({})).unwrap();
        let second = tool.execute(&json!({})).unwrap();
        assert_eq!(first["generated_at"], second["generated_at"]);
    }
}
