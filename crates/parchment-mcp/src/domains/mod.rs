// crates/parchment-mcp/src/domains/mod.rs
// ============================================================================
// Module: Tool Domains
// Description: Domain routers and direct tools plus registry wiring.
// Purpose: Assemble the full tool surface from configuration.
// Dependencies: parchment-config, parchment-core
// ============================================================================

//! ## Overview
//! Each submodule owns one slice of the tool surface. [`build_registry`] wires
//! them all into a [`ToolRegistry`] from a validated configuration, which is
//! the single place the server constructs tools.

pub mod blueprints;
pub mod content;
pub mod system;
pub mod templates;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use parchment_config::ParchmentConfig;
use parchment_core::ContentStore;
use parchment_core::ExecutorConfig;
use parchment_core::RuntimeInspector;
use parchment_core::SafetyPolicy;
use parchment_core::ToolCache;
use parchment_core::ToolLogger;
use parchment_core::tool::ToolExecutor;

use crate::domains::blueprints::BlueprintRouter;
use crate::domains::content::ContentRouter;
use crate::domains::system::SystemInfoTool;
use crate::domains::templates::TemplateLintTool;
use crate::registry::ToolRegistry;

// ============================================================================
// SECTION: Registry Wiring
// ============================================================================

/// Builds the complete tool registry from configuration and shared services.
#[must_use]
pub fn build_registry(
    config: &ParchmentConfig,
    store: Arc<dyn ContentStore>,
    runtime: Arc<dyn RuntimeInspector>,
    logger: Arc<ToolLogger>,
    cache: Arc<ToolCache>,
    dependencies: Vec<String>,
) -> ToolRegistry {
    let executor = ToolExecutor::new(logger, Arc::clone(&runtime), ExecutorConfig {
        debug: config.server.debug,
        ..ExecutorConfig::default()
    });
    let safety = SafetyPolicy {
        bypass: config.safety.bypass,
    };
    let mut registry = ToolRegistry::new(executor);

    registry.register_router(
        Arc::new(ContentRouter::entries(Arc::clone(&store))),
        Arc::clone(&runtime),
        safety,
    );
    registry.register_router(
        Arc::new(ContentRouter::collections(Arc::clone(&store))),
        Arc::clone(&runtime),
        safety,
    );
    registry.register_router(
        Arc::new(ContentRouter::assets(Arc::clone(&store))),
        Arc::clone(&runtime),
        safety,
    );
    registry.register_router(
        Arc::new(ContentRouter::taxonomies(Arc::clone(&store))),
        Arc::clone(&runtime),
        safety,
    );
    registry.register_router(
        Arc::new(ContentRouter::users(Arc::clone(&store))),
        Arc::clone(&runtime),
        safety,
    );
    registry.register_router(
        Arc::new(BlueprintRouter::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            config.store.blueprint_paths.clone(),
            config.cache.scan_ttl(),
        )),
        Arc::clone(&runtime),
        safety,
    );

    registry.register(
        TemplateLintTool::definition(),
        Arc::new(TemplateLintTool::new(&config.lint.extra_tags)),
    );

    // Registered last so the inventory covers every tool, itself included.
    let mut tools: Vec<String> =
        registry.definitions().into_iter().map(|definition| definition.name).collect();
    tools.push(SystemInfoTool::definition().name);
    tools.sort();
    registry.register(
        SystemInfoTool::definition(),
        Arc::new(SystemInfoTool::new(
            Arc::clone(&runtime),
            cache,
            dependencies,
            tools,
            config.cache.discovery_ttl(),
        )),
    );

    registry
}
