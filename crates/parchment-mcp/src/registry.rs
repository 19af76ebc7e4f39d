// crates/parchment-mcp/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: Named tool registration and dispatch through the executor.
// Purpose: Back the MCP tools/list and tools/call methods.
// Dependencies: parchment-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The registry owns every exposed tool together with its MCP definition.
//! Calls are dispatched through the shared [`ToolExecutor`], so every
//! response is envelope-shaped regardless of how the tool fails.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use parchment_core::Router;
use parchment_core::RuntimeInspector;
use parchment_core::SafetyPolicy;
use parchment_core::router::RouterTool;
use parchment_core::tool::ToolExecutor;
use parchment_core::tool::ToolHandler;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// MCP-facing description of one registered tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// Registered tool name.
    pub name: String,
    /// One-line human description.
    pub description: String,
    /// JSON schema of accepted arguments.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Registry and tool-call errors surfaced to the JSON-RPC layer.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Tool call parameters were malformed.
    #[error("invalid tool params: {0}")]
    InvalidParams(String),
    /// Response serialization failed.
    #[error("serialization failed")]
    Serialization,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// One registered tool with its definition.
struct RegisteredTool {
    /// MCP-facing definition.
    definition: ToolDefinition,
    /// Executable handler.
    handler: Arc<dyn ToolHandler>,
}

/// Registry of all exposed tools.
pub struct ToolRegistry {
    /// Shared lifecycle executor.
    executor: ToolExecutor,
    /// Registered tools keyed by name.
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Creates an empty registry over the given executor.
    #[must_use]
    pub fn new(executor: ToolExecutor) -> Self {
        Self {
            executor,
            tools: BTreeMap::new(),
        }
    }

    /// Registers a tool under its handler name.
    pub fn register(&mut self, definition: ToolDefinition, handler: Arc<dyn ToolHandler>) {
        self.tools.insert(definition.name.clone(), RegisteredTool {
            definition,
            handler,
        });
    }

    /// Registers a domain router as a single tool.
    pub fn register_router(
        &mut self,
        router: Arc<dyn Router>,
        runtime: Arc<dyn RuntimeInspector>,
        safety: SafetyPolicy,
    ) {
        let definition = router_definition(router.as_ref());
        let handler = Arc::new(RouterTool::new(router, runtime, safety));
        self.register(definition, handler);
    }

    /// Returns the definitions of all registered tools.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition.clone()).collect()
    }

    /// Returns whether a tool name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Dispatches one tool call through the executor.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] for unregistered names. Handler
    /// failures never surface here; the executor converts them to envelopes.
    pub fn call(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        let tool =
            self.tools.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        Ok(self.executor.run(tool.handler.as_ref(), arguments))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds an MCP tool definition from a router's declared actions.
#[must_use]
pub fn router_definition(router: &dyn Router) -> ToolDefinition {
    let mut action_names: Vec<&str> = vec!["help", "discover", "examples"];
    action_names.extend(router.actions().iter().map(|action| action.name));

    let mut properties = serde_json::Map::new();
    properties.insert(
        "action".to_string(),
        json!({
            "type": "string",
            "enum": action_names,
            "description": "Action to dispatch within this domain",
        }),
    );
    properties.insert(
        "dry_run".to_string(),
        json!({
            "type": "boolean",
            "description": "Preview a destructive action without executing it",
        }),
    );
    properties.insert(
        "confirm".to_string(),
        json!({
            "type": "boolean",
            "description": "Execute a destructive action for real",
        }),
    );
    for action in router.actions() {
        for arg in action.required_args.iter().chain(action.optional_args) {
            properties
                .entry((*arg).to_string())
                .or_insert_with(|| argument_schema(router.domain(), arg));
        }
    }

    ToolDefinition {
        name: router.domain().to_string(),
        description: router.description().to_string(),
        input_schema: json!({
            "type": "object",
            "properties": properties,
            "required": ["action"],
            "additionalProperties": true,
        }),
    }
}

/// Builds the property schema for one declared router argument.
///
/// Arguments with a single shape across every action get a JSON type; the
/// rest stay description-only so callers are not over-constrained.
fn argument_schema(domain: &str, name: &str) -> Value {
    let description = format!("Argument used by one or more {domain} actions");
    let json_type = match name {
        "limit" => Some("integer"),
        "fields" => Some("object"),
        "id" | "search" | "to" | "collection" => Some("string"),
        _ => None,
    };
    match json_type {
        Some(json_type) => json!({ "type": json_type, "description": description }),
        None => json!({ "description": description }),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
